//! Core error and interval types.
//!
//! This module provides:
//! - `interval`: The domain/range guard and the validated [`Interval`] type
//! - `error`: Structured error types for interpolation, solver and
//!   calibration operations
//!
//! # Re-exports
//!
//! - [`Interval`], [`IntervalKind`], [`validate_domain_range`] from `interval`
//! - [`CalibrationError`], [`InterpolationError`], [`SolverError`] from `error`

pub mod error;
pub mod interval;

pub use error::{CalibrationError, InterpolationError, SolverError};
pub use interval::{validate_domain_range, Interval, IntervalKind, DEFAULT_DOMAIN, DEFAULT_RANGE};

//! # calib_core: Foundation for Calibration Functions
//!
//! ## Layer 1 (Foundation) Role
//!
//! calib_core is the bottom layer of the workspace, providing:
//! - Interval types and the domain/range guard (`types::interval`)
//! - Error types: `CalibrationError`, `SolverError`, `InterpolationError` (`types::error`)
//! - The sandboxed expression language: parsing, canonical formatting,
//!   validation and evaluation (`expr`)
//! - Numerical solvers: Levenberg-Marquardt least squares and Brent root
//!   finding (`math::solvers`)
//! - Piecewise linear interpolation (`math::interpolators`)
//!
//! ## Dependencies
//!
//! Layer 1 has no dependencies on other calib_* crates, with minimal external dependencies:
//! - num-traits: Traits for generic numerical computation
//! - rand: Sampling inputs for smoke evaluation of expressions
//! - thiserror: Error derivation
//! - tracing: Diagnostics
//! - serde: Serialisation support for `Interval` (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use calib_core::expr::{evaluate_scalar, validate_expression, Symbol};
//! use calib_core::types::validate_domain_range;
//!
//! let (domain, range) = validate_domain_range(&[0.0, 4096.0], &[0.0, 3000.0]).unwrap();
//! let params = [0.5, 0.73];
//!
//! let expr = validate_expression("p[0] + p[1]*x", Some(&params[..]), Symbol::X, domain, range).unwrap();
//! assert_eq!(expr.as_str(), "p[0] + p[1] * x");
//!
//! let energy = evaluate_scalar(&expr, &params, 1000.0, Symbol::X, domain, range).unwrap();
//! assert!((energy - 730.5).abs() < 1e-9);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation for `Interval`

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod expr;
pub mod math;
pub mod types;

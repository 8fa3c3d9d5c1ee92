//! # Calib Models (L2: Calibration Aggregate)
//!
//! Calibration functions mapping a raw instrument reading to a physical
//! quantity.
//!
//! This crate provides:
//! - The [`Calibration`](calibration::Calibration) aggregate: validated
//!   expression, parameters, optional closed-form inverse, domain, range,
//!   calibration points and free-form metadata
//! - Point management with a stable sort by `x`
//! - Levenberg-Marquardt fitting of parameters to points
//! - Closed-form or bracketed numerical inversion
//! - Construction presets (linear, polynomial, sqrt-polynomial, interpolated)
//!   and fit diagnostics
//! - Persistence through a key-value dataset interface (`io`)
//! - TOML engine configuration with environment overrides (`config`)
//!
//! ## Design Principles
//!
//! - **Private fields, validating setters**: a failed mutation leaves the
//!   previous state untouched
//! - **One error type**: every failure is a
//!   [`CalibrationError`](calib_core::types::CalibrationError)
//! - **Builder pattern** for construction with sensible defaults
//!
//! ## Usage Examples
//!
//! ```rust
//! use calib_models::calibration::Calibration;
//!
//! let mut cal = Calibration::new("p[0] + p[1] * x", vec![0.0, 1.0]).unwrap();
//! cal.fit_points(&[0.0, 1.0, 2.0, 3.0], &[1.0, 3.0, 5.0, 7.0], None, false).unwrap();
//!
//! assert!((cal.params()[0] - 1.0).abs() < 1e-6);
//! assert!((cal.params()[1] - 2.0).abs() < 1e-6);
//! assert!((cal.evaluate(10.0).unwrap() - 21.0).abs() < 1e-6);
//! assert!((cal.inverse(21.0, None).unwrap() - 10.0).abs() < 1e-6);
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel`: Element-wise numerical inversion of slices with rayon

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod calibration;
pub mod config;
pub mod io;

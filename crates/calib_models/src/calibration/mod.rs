//! Calibration functions.
//!
//! This module provides the calibration aggregate and its operations:
//! - [`Calibration`]: Validated expression, parameters, bounds, points and
//!   metadata with validating setters
//! - [`CalibrationBuilder`]: Construction with presets (linear, polynomial,
//!   sqrt-polynomial, interpolated) and fitting from points
//! - [`check_points`]: Calibration point checks and stable sort
//! - [`fit_expression`]: Levenberg-Marquardt fit of an expression to points
//! - [`InverseOptions`]: Closed-form or bracketed numerical inversion
//! - [`FitDiagnostics`]: Goodness-of-fit statistics
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Calibration Flow                        │
//! │                                                              │
//! │  Expression + Points → Builder → Calibration → Evaluation    │
//! │        │                  │           │             │        │
//! │        ▼                  ▼           ▼             ▼        │
//! │    Validator         L-M fitter    Setters      Inverter     │
//! │   (calib_core)      (residuals)  (re-validate)  (Brent/form) │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use calib_models::calibration::{Calibration, CalibrationBuilder, FitOptions};
//! use calib_core::types::Interval;
//!
//! let channels = [120.0, 800.0, 1460.0, 2614.0];
//! let energies = [59.5, 400.2, 730.1, 1307.3];
//!
//! let (cal, report) = CalibrationBuilder::new("p[0] + p[1] * x", vec![0.0, 0.5])
//!     .domain(Interval::domain(0.0, 4096.0).unwrap())
//!     .range(Interval::range(0.0, 3000.0).unwrap())
//!     .fit_points(&channels, &energies, false, &FitOptions::default())
//!     .unwrap();
//!
//! assert!(report.rmse < 1.0);
//! assert!(cal.fit_r_squared().unwrap() > 0.999);
//! ```

mod aggregate;
mod diagnostics;
mod fitting;
mod inverse;
mod points;
mod presets;

pub use aggregate::{Attrs, Calibration, CalibrationBuilder, PARAM_ATOL, PARAM_RTOL};
pub use diagnostics::FitDiagnostics;
pub use fitting::{fit_expression, FitOptions, FitReport};
pub use inverse::InverseOptions;
pub use points::check_points;
pub use presets::{polynomial_expression, LINEAR_EXPRESSION};

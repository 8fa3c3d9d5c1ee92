//! Numerical building blocks: solvers and interpolators.

pub mod interpolators;
pub mod solvers;

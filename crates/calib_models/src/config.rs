//! Engine configuration management.
//!
//! Handles loading of solver options and default bounds from TOML files
//! with environment variable override support.
//!
//! ```toml
//! domain = [0.0, 8192.0]
//! range = [0.0, 3000.0]
//!
//! [fit]
//! tolerance = 1e-12
//! max_iterations = 200
//!
//! [inverse]
//! check_rtol = 1e-6
//! ```

use crate::calibration::{CalibrationBuilder, FitOptions, InverseOptions};
use calib_core::types::{CalibrationError, Interval, IntervalKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default domain for new calibrations
    pub domain: Interval,
    /// Default range for new calibrations
    pub range: Interval,
    /// Levenberg-Marquardt options
    pub fit: FitOptions,
    /// Inversion options
    pub inverse: InverseOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            domain: Interval::default_domain(),
            range: Interval::default_range(),
            fit: FitOptions::default(),
            inverse: InverseOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Apply environment variable overrides.
    ///
    /// | variable                        | field                     |
    /// |---------------------------------|---------------------------|
    /// | `CALIB_DOMAIN`                  | `domain` (`"lo,hi"`)      |
    /// | `CALIB_RANGE`                   | `range` (`"lo,hi"`)       |
    /// | `CALIB_FIT_TOLERANCE`           | `fit.tolerance`           |
    /// | `CALIB_FIT_MAX_ITERATIONS`      | `fit.max_iterations`      |
    /// | `CALIB_FIT_MAX_EVALUATIONS`     | `fit.max_evaluations`     |
    /// | `CALIB_INVERSE_TOLERANCE`       | `inverse.tolerance`       |
    /// | `CALIB_INVERSE_MAX_ITERATIONS`  | `inverse.max_iterations`  |
    ///
    /// Unparseable values are ignored with a warning.
    pub fn with_env_override(mut self) -> Self {
        if let Some(domain) = env_interval("CALIB_DOMAIN", IntervalKind::Domain) {
            self.domain = domain;
        }
        if let Some(range) = env_interval("CALIB_RANGE", IntervalKind::Range) {
            self.range = range;
        }
        if let Some(v) = env_parse("CALIB_FIT_TOLERANCE") {
            self.fit.tolerance = v;
        }
        if let Some(v) = env_parse("CALIB_FIT_MAX_ITERATIONS") {
            self.fit.max_iterations = v;
        }
        if let Some(v) = env_parse("CALIB_FIT_MAX_EVALUATIONS") {
            self.fit.max_evaluations = Some(v);
        }
        if let Some(v) = env_parse("CALIB_INVERSE_TOLERANCE") {
            self.inverse.tolerance = v;
        }
        if let Some(v) = env_parse("CALIB_INVERSE_MAX_ITERATIONS") {
            self.inverse.max_iterations = v;
        }
        self
    }

    /// Validate the configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = self.fit.problems();
        errors.extend(self.inverse.problems());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load configuration from file and validate.
    pub fn load_and_validate(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file with environment overrides and validate.
    pub fn load_with_env_and_validate(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?.with_env_override();
        config.validate()?;
        Ok(config)
    }

    /// Start a calibration builder with the configured domain and range.
    pub fn builder(&self, expression: impl Into<String>, params: Vec<f64>) -> CalibrationBuilder {
        CalibrationBuilder::new(expression, params)
            .domain(self.domain)
            .range(self.range)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

fn env_interval(key: &str, which: IntervalKind) -> Option<Interval> {
    let raw = std::env::var(key).ok()?;
    let values: Result<Vec<f64>, _> = raw.split(',').map(|s| s.trim().parse::<f64>()).collect();
    match values.map_err(|e| e.to_string()).and_then(|v| {
        Interval::from_slice(which, &v).map_err(|e| e.to_string())
    }) {
        Ok(interval) => Some(interval),
        Err(reason) => {
            warn!(key, value = %raw, %reason, "ignoring invalid environment override");
            None
        }
    }
}

/// Configuration error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    Io(String),
    /// Parse error in config file
    #[error("Parse error: {0}")]
    Parse(String),
    /// Validation error
    #[error("Validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

impl From<ConfigError> for CalibrationError {
    fn from(err: ConfigError) -> Self {
        CalibrationError::config(err.to_string())
    }
}

//! Persistence through a key-value dataset interface.
//!
//! A calibration is stored as named datasets plus a metadata map:
//!
//! | dataset          | kind   | required |
//! |------------------|--------|----------|
//! | `expression`     | text   | yes      |
//! | `params`         | array  | yes      |
//! | `domain`         | array  | yes      |
//! | `range`          | array  | yes      |
//! | `inv_expression` | text   | no       |
//! | `points_x`       | array  | no       |
//! | `points_y`       | array  | no       |
//!
//! Reading is strict: a missing required dataset, a dataset of the wrong
//! kind or an unknown dataset name fails. Writing always emits the points
//! and emits `inv_expression` only when one is set.
//!
//! Backends implement [`DatasetStore`]: [`MemoryStore`] and [`JsonFileStore`]
//! are provided.

mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

use crate::calibration::{Attrs, Calibration, CalibrationBuilder};
use calib_core::types::{CalibrationError, Interval, IntervalKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Dataset names a calibration record may contain.
pub const DATASET_NAMES: [&str; 7] = [
    "expression",
    "params",
    "inv_expression",
    "domain",
    "range",
    "points_x",
    "points_y",
];

/// One stored dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dataset {
    /// Text dataset
    Text(String),
    /// 1-D numeric dataset
    Array(Vec<f64>),
}

impl Dataset {
    fn kind(&self) -> &'static str {
        match self {
            Dataset::Text(_) => "text",
            Dataset::Array(_) => "array",
        }
    }
}

/// Datasets and metadata of one stored calibration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Named datasets
    pub datasets: BTreeMap<String, Dataset>,
    /// Metadata attributes
    #[serde(default)]
    pub attrs: Attrs,
}

/// Key-value dataset backend.
pub trait DatasetStore {
    /// Read the stored record.
    fn read_record(&self) -> Result<Record, CalibrationError>;

    /// Replace the stored record.
    fn write_record(&mut self, record: &Record) -> Result<(), CalibrationError>;
}

impl Calibration {
    /// Read a calibration from a dataset store.
    pub fn read<S: DatasetStore + ?Sized>(store: &S) -> Result<Self, CalibrationError> {
        let record = store.read_record()?;
        Self::from_record(record)
    }

    /// Write this calibration to a dataset store.
    pub fn write<S: DatasetStore + ?Sized>(&self, store: &mut S) -> Result<(), CalibrationError> {
        store.write_record(&self.to_record())
    }

    /// Datasets and metadata describing this calibration.
    pub fn to_record(&self) -> Record {
        let mut datasets = BTreeMap::new();
        datasets.insert(
            "expression".to_string(),
            Dataset::Text(self.expression().as_str().to_string()),
        );
        datasets.insert("params".to_string(), Dataset::Array(self.params().to_vec()));
        if let Some(inv) = self.inv_expression() {
            datasets.insert("inv_expression".to_string(), Dataset::Text(inv.as_str().to_string()));
        }
        datasets.insert("domain".to_string(), Dataset::Array(<[f64; 2]>::from(self.domain()).to_vec()));
        datasets.insert("range".to_string(), Dataset::Array(<[f64; 2]>::from(self.range()).to_vec()));
        datasets.insert("points_x".to_string(), Dataset::Array(self.points_x().to_vec()));
        datasets.insert("points_y".to_string(), Dataset::Array(self.points_y().to_vec()));
        Record {
            datasets,
            attrs: self.attrs().clone(),
        }
    }

    /// Build a calibration from a stored record, validating everything.
    pub fn from_record(record: Record) -> Result<Self, CalibrationError> {
        let Record { mut datasets, attrs } = record;

        let unexpected: Vec<&str> = datasets
            .keys()
            .map(String::as_str)
            .filter(|k| !DATASET_NAMES.contains(k))
            .collect();
        if !unexpected.is_empty() {
            return Err(CalibrationError::format(format!(
                "Unexpected dataset names: {:?}",
                unexpected
            )));
        }

        let expression = take_text(&mut datasets, "expression")?;
        let params = take_array(&mut datasets, "params")?;
        let domain = Interval::from_slice(IntervalKind::Domain, &take_array(&mut datasets, "domain")?)?;
        let range = Interval::from_slice(IntervalKind::Range, &take_array(&mut datasets, "range")?)?;
        let inv_expression = take_optional_text(&mut datasets, "inv_expression")?;
        let points_x = take_optional_array(&mut datasets, "points_x")?;
        let points_y = take_optional_array(&mut datasets, "points_y")?;

        let mut builder = CalibrationBuilder::new(expression, params)
            .domain(domain)
            .range(range)
            .attrs(attrs);
        if let Some(inv) = inv_expression {
            builder = builder.inv_expression(inv);
        }
        match (points_x, points_y) {
            (Some(xs), Some(ys)) => builder = builder.points(&xs, &ys),
            (None, None) => {}
            _ => {
                return Err(CalibrationError::format(
                    "Datasets \"points_x\" and \"points_y\" must be stored together",
                ))
            }
        }

        let cal = builder.build()?;
        debug!(expression = cal.expression().as_str(), "calibration read from dataset store");
        Ok(cal)
    }
}

fn take(datasets: &mut BTreeMap<String, Dataset>, name: &str) -> Result<Dataset, CalibrationError> {
    datasets
        .remove(name)
        .ok_or_else(|| CalibrationError::format(format!("Expected dataset \"{}\"", name)))
}

fn take_text(datasets: &mut BTreeMap<String, Dataset>, name: &str) -> Result<String, CalibrationError> {
    match take(datasets, name)? {
        Dataset::Text(s) => Ok(s),
        other => Err(wrong_kind(name, "text", &other)),
    }
}

fn take_array(datasets: &mut BTreeMap<String, Dataset>, name: &str) -> Result<Vec<f64>, CalibrationError> {
    match take(datasets, name)? {
        Dataset::Array(v) => Ok(v),
        other => Err(wrong_kind(name, "array", &other)),
    }
}

fn take_optional_text(
    datasets: &mut BTreeMap<String, Dataset>,
    name: &str,
) -> Result<Option<String>, CalibrationError> {
    if datasets.contains_key(name) {
        take_text(datasets, name).map(Some)
    } else {
        Ok(None)
    }
}

fn take_optional_array(
    datasets: &mut BTreeMap<String, Dataset>,
    name: &str,
) -> Result<Option<Vec<f64>>, CalibrationError> {
    if datasets.contains_key(name) {
        take_array(datasets, name).map(Some)
    } else {
        Ok(None)
    }
}

fn wrong_kind(name: &str, expected: &str, got: &Dataset) -> CalibrationError {
    CalibrationError::format(format!(
        "Dataset \"{}\" must be {}, got {}",
        name,
        expected,
        got.kind()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Calibration {
        let mut cal = Calibration::builder("p[0] + p[1] * x", vec![1.0, 2.0])
            .inv_expression("(y - p[0]) / p[1]")
            .domain(Interval::domain(0.0, 100.0).unwrap())
            .range(Interval::range(0.0, 500.0).unwrap())
            .attr("detector", "HPGe")
            .build()
            .unwrap();
        cal.set_points(&[10.0, 20.0], &[21.0, 41.0]).unwrap();
        cal
    }

    #[test]
    fn test_record_contents() {
        let record = sample().to_record();
        let names: Vec<&str> = record.datasets.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["domain", "expression", "inv_expression", "params", "points_x", "points_y", "range"]
        );
        assert_eq!(record.datasets["domain"], Dataset::Array(vec![0.0, 100.0]));
        assert_eq!(record.attrs["detector"], "HPGe");
    }

    #[test]
    fn test_points_always_written() {
        let cal = Calibration::new("p[0] * x", vec![1.0]).unwrap();
        let record = cal.to_record();
        assert_eq!(record.datasets["points_x"], Dataset::Array(vec![]));
        assert!(!record.datasets.contains_key("inv_expression"));
    }

    #[test]
    fn test_record_round_trip() {
        let cal = sample();
        let back = Calibration::from_record(cal.to_record()).unwrap();
        assert_eq!(back, cal);
        assert_eq!(back.inv_expression(), cal.inv_expression());
        assert_eq!(back.domain(), cal.domain());
        assert_eq!(back.points_y(), cal.points_y());
        assert_eq!(back.attrs(), cal.attrs());
    }

    #[test]
    fn test_missing_required_dataset() {
        for name in ["expression", "params", "domain", "range"] {
            let mut record = sample().to_record();
            record.datasets.remove(name);
            let err = Calibration::from_record(record).unwrap_err();
            assert!(matches!(err, CalibrationError::Format(_)));
            assert!(err.to_string().contains(name));
        }
    }

    #[test]
    fn test_unknown_dataset_rejected() {
        let mut record = sample().to_record();
        record.datasets.insert("gain".to_string(), Dataset::Array(vec![1.0]));
        let err = Calibration::from_record(record).unwrap_err();
        assert!(err.to_string().contains("gain"));
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let mut record = sample().to_record();
        record.datasets.insert("params".to_string(), Dataset::Text("1, 2".to_string()));
        assert!(matches!(Calibration::from_record(record), Err(CalibrationError::Format(_))));
    }

    #[test]
    fn test_unpaired_points_rejected() {
        let mut record = sample().to_record();
        record.datasets.remove("points_y");
        assert!(Calibration::from_record(record).is_err());
    }

    #[test]
    fn test_invalid_stored_values_rejected() {
        let mut record = sample().to_record();
        record.datasets.insert("domain".to_string(), Dataset::Array(vec![5.0, 1.0]));
        assert!(matches!(
            Calibration::from_record(record),
            Err(CalibrationError::IntervalNotAscending { .. })
        ));
    }
}

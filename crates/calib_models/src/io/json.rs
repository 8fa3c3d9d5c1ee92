//! JSON file dataset store.

use super::{DatasetStore, Record};
use calib_core::types::CalibrationError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Dataset store backed by a JSON file.
///
/// The file holds one object with `datasets` and `attrs` members; text
/// datasets are JSON strings and array datasets are JSON number arrays.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at `path`. The file need not exist until read.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetStore for JsonFileStore {
    fn read_record(&self) -> Result<Record, CalibrationError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| CalibrationError::Store(format!("cannot read {}: {}", self.path.display(), e)))?;
        let record: Record = serde_json::from_str(&content)
            .map_err(|e| CalibrationError::format(format!("{}: {}", self.path.display(), e)))?;
        debug!(path = %self.path.display(), datasets = record.datasets.len(), "read calibration record");
        Ok(record)
    }

    fn write_record(&mut self, record: &Record) -> Result<(), CalibrationError> {
        let content = serde_json::to_string_pretty(record)
            .map_err(|e| CalibrationError::format(format!("cannot serialise record: {}", e)))?;
        fs::write(&self.path, content)
            .map_err(|e| CalibrationError::Store(format!("cannot write {}: {}", self.path.display(), e)))?;
        debug!(path = %self.path.display(), "wrote calibration record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Calibration;
    use crate::io::Dataset;

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("cal.json"));

        let mut cal = Calibration::builder("sqrt(p[0] + p[1] * x)", vec![1.0, 2.0])
            .attr("operator", "bench-3")
            .build()
            .unwrap();
        cal.set_points(&[1.0, 4.0], &[1.8, 3.0]).unwrap();
        cal.write(&mut store).unwrap();

        let back = Calibration::read(&store).unwrap();
        assert_eq!(back, cal);
        assert_eq!(back.points_x(), cal.points_x());
        assert_eq!(back.attrs(), cal.attrs());
    }

    #[test]
    fn test_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal.json");
        let mut store = JsonFileStore::new(&path);
        Calibration::from_linear(vec![1.0, 2.0]).unwrap().write(&mut store).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["datasets"]["expression"], "p[0] + p[1] * x");
        assert_eq!(value["datasets"]["params"], serde_json::json!([1.0, 2.0]));

        let record = store.read_record().unwrap();
        assert_eq!(record.datasets["expression"], Dataset::Text("p[0] + p[1] * x".to_string()));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.read_record(), Err(CalibrationError::Store(_))));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{\"datasets\": {\"params\": {\"a\": 1}}}").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.read_record(), Err(CalibrationError::Format(_))));
    }
}

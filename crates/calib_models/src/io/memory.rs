//! In-memory dataset store.

use super::{DatasetStore, Record};
use calib_core::types::CalibrationError;

/// Dataset store holding one record in memory.
///
/// # Example
///
/// ```
/// use calib_models::calibration::Calibration;
/// use calib_models::io::MemoryStore;
///
/// let cal = Calibration::from_linear(vec![0.5, 0.25]).unwrap();
/// let mut store = MemoryStore::new();
/// cal.write(&mut store).unwrap();
///
/// let back = Calibration::read(&store).unwrap();
/// assert_eq!(back, cal);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: Option<Record>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `record`.
    pub fn with_record(record: Record) -> Self {
        Self { record: Some(record) }
    }

    /// Stored record, if any.
    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }
}

impl DatasetStore for MemoryStore {
    fn read_record(&self) -> Result<Record, CalibrationError> {
        self.record
            .clone()
            .ok_or_else(|| CalibrationError::Store("store is empty".to_string()))
    }

    fn write_record(&mut self, record: &Record) -> Result<(), CalibrationError> {
        self.record = Some(record.clone());
        Ok(())
    }
}

//! Tier reader seam.
//!
//! The engine never touches the on-disk columnar format itself; it asks
//! a [`TierReader`] for one field of one file at a time. [`MemoryReader`]
//! backs tests and synthetic pipelines.

use std::collections::HashMap;

use crate::column::Column;
use crate::error::{PassError, Result};

/// Reads one field from one tier file as a column.
pub trait TierReader {
    /// Read the field at `field` (full spec path) from `file`.
    ///
    /// A missing field must surface as [`PassError::FieldNotFound`],
    /// never be swallowed.
    fn read(&self, field: &str, file: &str) -> Result<Column>;
}

/// In-memory tier reader keyed by `(file, field)`.
#[derive(Debug, Default)]
pub struct MemoryReader {
    fields: HashMap<(String, String), Column>,
}

impl MemoryReader {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a column under `(file, field)`.
    pub fn insert(&mut self, file: impl Into<String>, field: impl Into<String>, col: Column) {
        self.fields.insert((file.into(), field.into()), col);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, file: impl Into<String>, field: impl Into<String>, col: Column) -> Self {
        self.insert(file, field, col);
        self
    }
}

impl TierReader for MemoryReader {
    fn read(&self, field: &str, file: &str) -> Result<Column> {
        self.fields
            .get(&(file.to_string(), field.to_string()))
            .cloned()
            .ok_or_else(|| PassError::FieldNotFound {
                field: field.to_string(),
                file: file.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_is_typed_error() {
        let reader = MemoryReader::new().with("f.lh5", "/evt/energy", Column::from(vec![1.0]));
        assert!(reader.read("/evt/energy", "f.lh5").is_ok());
        let err = reader.read("/evt/missing", "f.lh5").unwrap_err();
        assert!(matches!(err, PassError::FieldNotFound { .. }), "got {err:?}");
    }
}

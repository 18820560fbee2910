//! The per-file-set array store.
//!
//! Short names map to loaded or derived columns. A store lives for
//! exactly one file set; it is rebuilt from scratch for the next one.

use std::collections::HashMap;

use crate::column::Column;
use crate::error::{PassError, Result};

/// One truncation performed by [`ArrayStore::crop_to_min`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crop {
    /// Short name of the truncated column.
    pub name: String,
    /// Row count before truncation.
    pub from: usize,
    /// Row count after truncation.
    pub to: usize,
}

/// Insertion-ordered mapping from short names to columns.
#[derive(Debug, Default)]
pub struct ArrayStore {
    order: Vec<String>,
    columns: HashMap<String, Column>,
}

impl ArrayStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored columns.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if no columns are stored.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Insert or replace a column under `name`.
    pub fn insert(&mut self, name: impl Into<String>, col: Column) {
        let name = name.into();
        if !self.columns.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.columns.insert(name, col);
    }

    /// Look up one column by short name.
    pub fn get(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| PassError::UnknownArray(name.to_string()))
    }

    /// Resolve a list of short names to columns, order-preserving.
    pub fn select(&self, names: &[String]) -> Result<Vec<&Column>> {
        names.iter().map(|n| self.get(n)).collect()
    }

    /// Null out masked rows in every stored column.
    ///
    /// Rows where `mask` is not `Some(true)` become null; lengths are
    /// preserved. Every column must match the mask's length.
    pub fn mask_all(&mut self, mask: &[Option<bool>]) -> Result<()> {
        for name in &self.order {
            let col = self
                .columns
                .get_mut(name)
                .ok_or_else(|| PassError::UnknownArray(name.clone()))?;
            col.apply_mask(mask, name)?;
        }
        Ok(())
    }

    /// Truncate every column to the minimum row count across the store.
    ///
    /// Returns one [`Crop`] record per column that actually changed, in
    /// store order. Purely positional; no alignment by event index.
    pub fn crop_to_min(&mut self) -> Vec<Crop> {
        let min_len = match self.order.iter().filter_map(|n| self.columns.get(n)).map(Column::len).min()
        {
            Some(n) => n,
            None => return Vec::new(),
        };
        let mut crops = Vec::new();
        for name in &self.order {
            if let Some(col) = self.columns.get_mut(name) {
                let len = col.len();
                if len > min_len {
                    col.truncate(min_len);
                    crops.push(Crop { name: name.clone(), from: len, to: min_len });
                }
            }
        }
        crops
    }

    /// Iterate `(name, column)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.order.iter().filter_map(|n| self.columns.get(n).map(|c| (n.as_str(), c)))
    }
}

//! Columnar arrays with per-row null masking.
//!
//! A [`Column`] holds one field's values across the events of a single
//! file set. Rank-1 columns carry one value per event, rank-2 columns a
//! variable-length list per event. A `None` row is a masked-out event:
//! masking preserves array length, it never removes rows.

use crate::error::{PassError, Result};

/// A columnar array of rank 1 or 2, with nullable rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Rank-1 booleans (selection masks).
    Bool(Vec<Option<bool>>),
    /// Rank-1 floating point values.
    F64(Vec<Option<f64>>),
    /// Rank-1 unsigned integers (channel rawids and the like).
    U32(Vec<Option<u32>>),
    /// Rank-1 category labels.
    Str(Vec<Option<String>>),
    /// Rank-2 jagged floating point values.
    JaggedF64(Vec<Option<Vec<f64>>>),
    /// Rank-2 jagged unsigned integers (rawids per event).
    JaggedU32(Vec<Option<Vec<u32>>>),
}

impl Column {
    /// Number of rows (events), including masked ones.
    pub fn len(&self) -> usize {
        match self {
            Column::Bool(v) => v.len(),
            Column::F64(v) => v.len(),
            Column::U32(v) => v.len(),
            Column::Str(v) => v.len(),
            Column::JaggedF64(v) => v.len(),
            Column::JaggedU32(v) => v.len(),
        }
    }

    /// True if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Array rank: 1 for scalar-per-event, 2 for list-per-event.
    pub fn rank(&self) -> usize {
        match self {
            Column::Bool(_) | Column::F64(_) | Column::U32(_) | Column::Str(_) => 1,
            Column::JaggedF64(_) | Column::JaggedU32(_) => 2,
        }
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Column::Bool(_) => "bool",
            Column::F64(_) => "f64",
            Column::U32(_) => "u32",
            Column::Str(_) => "str",
            Column::JaggedF64(_) => "jagged f64",
            Column::JaggedU32(_) => "jagged u32",
        }
    }

    fn check_rank(&self, what: &str, expected: usize) -> Result<()> {
        if self.rank() != expected {
            return Err(PassError::Dimension {
                what: what.to_string(),
                expected,
                got: self.rank(),
            });
        }
        Ok(())
    }

    fn type_mismatch<T>(&self, expected: &str) -> Result<T> {
        Err(PassError::TypeMismatch {
            expected: expected.to_string(),
            got: self.type_name().to_string(),
        })
    }

    /// Borrow as rank-1 booleans. `what` names the role for diagnostics.
    pub fn as_bool(&self, what: &str) -> Result<&[Option<bool>]> {
        self.check_rank(what, 1)?;
        match self {
            Column::Bool(v) => Ok(v),
            _ => self.type_mismatch("bool"),
        }
    }

    /// Borrow as rank-1 floats.
    pub fn as_f64(&self, what: &str) -> Result<&[Option<f64>]> {
        self.check_rank(what, 1)?;
        match self {
            Column::F64(v) => Ok(v),
            _ => self.type_mismatch("f64"),
        }
    }

    /// Borrow as rank-1 unsigned integers.
    pub fn as_u32(&self, what: &str) -> Result<&[Option<u32>]> {
        self.check_rank(what, 1)?;
        match self {
            Column::U32(v) => Ok(v),
            _ => self.type_mismatch("u32"),
        }
    }

    /// Borrow as rank-2 jagged unsigned integers.
    pub fn as_jagged_u32(&self, what: &str) -> Result<&[Option<Vec<u32>>]> {
        self.check_rank(what, 2)?;
        match self {
            Column::JaggedU32(v) => Ok(v),
            _ => self.type_mismatch("jagged u32"),
        }
    }

    /// Materialize rank-1 category labels. String columns are borrowed
    /// as-is, rawid columns are stringified.
    pub fn categories(&self, what: &str) -> Result<Vec<Option<String>>> {
        self.check_rank(what, 1)?;
        match self {
            Column::Str(v) => Ok(v.clone()),
            Column::U32(v) => Ok(v.iter().map(|r| r.map(|x| x.to_string())).collect()),
            _ => self.type_mismatch("str or u32"),
        }
    }

    /// Materialize rank-2 category labels from jagged rawids.
    pub fn categories_jagged(&self, what: &str) -> Result<Vec<Option<Vec<String>>>> {
        self.check_rank(what, 2)?;
        match self {
            Column::JaggedU32(v) => Ok(v
                .iter()
                .map(|r| r.as_ref().map(|row| row.iter().map(|x| x.to_string()).collect()))
                .collect()),
            _ => self.type_mismatch("jagged u32"),
        }
    }

    /// Null out every row whose mask entry is not `Some(true)`.
    ///
    /// Length is preserved; a `false` and a null mask entry both mask
    /// the row. `name` identifies this column in mismatch diagnostics.
    pub fn apply_mask(&mut self, mask: &[Option<bool>], name: &str) -> Result<()> {
        if mask.len() != self.len() {
            return Err(PassError::LengthMismatch {
                left: name.to_string(),
                left_len: self.len(),
                right: "mask".to_string(),
                right_len: mask.len(),
            });
        }
        fn null_rows<T>(rows: &mut [Option<T>], mask: &[Option<bool>]) {
            for (row, keep) in rows.iter_mut().zip(mask) {
                if *keep != Some(true) {
                    *row = None;
                }
            }
        }
        match self {
            Column::Bool(v) => null_rows(v, mask),
            Column::F64(v) => null_rows(v, mask),
            Column::U32(v) => null_rows(v, mask),
            Column::Str(v) => null_rows(v, mask),
            Column::JaggedF64(v) => null_rows(v, mask),
            Column::JaggedU32(v) => null_rows(v, mask),
        }
        Ok(())
    }

    /// Drop all rows past `n`. A no-op if the column is already shorter.
    pub fn truncate(&mut self, n: usize) {
        match self {
            Column::Bool(v) => v.truncate(n),
            Column::F64(v) => v.truncate(n),
            Column::U32(v) => v.truncate(n),
            Column::Str(v) => v.truncate(n),
            Column::JaggedF64(v) => v.truncate(n),
            Column::JaggedU32(v) => v.truncate(n),
        }
    }
}

impl From<Vec<bool>> for Column {
    fn from(v: Vec<bool>) -> Self {
        Column::Bool(v.into_iter().map(Some).collect())
    }
}

impl From<Vec<f64>> for Column {
    fn from(v: Vec<f64>) -> Self {
        Column::F64(v.into_iter().map(Some).collect())
    }
}

impl From<Vec<u32>> for Column {
    fn from(v: Vec<u32>) -> Self {
        Column::U32(v.into_iter().map(Some).collect())
    }
}

impl From<Vec<&str>> for Column {
    fn from(v: Vec<&str>) -> Self {
        Column::Str(v.into_iter().map(|s| Some(s.to_string())).collect())
    }
}

impl From<Vec<Vec<f64>>> for Column {
    fn from(v: Vec<Vec<f64>>) -> Self {
        Column::JaggedF64(v.into_iter().map(Some).collect())
    }
}

impl From<Vec<Vec<u32>>> for Column {
    fn from(v: Vec<Vec<u32>>) -> Self {
        Column::JaggedU32(v.into_iter().map(Some).collect())
    }
}

//! Error types for the streaming pass engine.

use thiserror::Error;

/// Errors that can occur while running an analysis pass.
#[derive(Error, Debug)]
pub enum PassError {
    /// I/O error from a tier reader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Neither the first nor the second path segment of a field spec
    /// names a tier present in the file set.
    #[error("cannot identify tier for field spec '{0}'")]
    NoSuchTier(String),

    /// The tier resolved but the field does not exist in its file.
    #[error("cannot find field '{field}' in file '{file}'")]
    FieldNotFound {
        /// Full field path that was requested.
        field: String,
        /// File the resolved tier pointed at.
        file: String,
    },

    /// A derivation or sink referenced a short name not in the store.
    #[error("array '{0}' not found in store")]
    UnknownArray(String),

    /// An array had an unexpected rank.
    #[error("{what} has to be {expected}-dim, got {got}-dim")]
    Dimension {
        /// What was being inspected (e.g. "mask", "histogram values").
        what: String,
        /// Required rank.
        expected: usize,
        /// Actual rank.
        got: usize,
    },

    /// An array held an unexpected element type.
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Required column type.
        expected: String,
        /// Actual column type.
        got: String,
    },

    /// Two arrays required to align row-for-row differ in length.
    #[error("length mismatch: '{left}' has {left_len} rows, '{right}' has {right_len}")]
    LengthMismatch {
        /// Name of the first array.
        left: String,
        /// Rows in the first array.
        left_len: usize,
        /// Name of the second array.
        right: String,
        /// Rows in the second array.
        right_len: usize,
    },

    /// No rawid maps to a known channel key.
    #[error("could not find rawid {0} in channel map")]
    UnknownChannel(u32),

    /// The file-set iterator produced nothing but sinks require data.
    #[error("no file sets to process, but {0} sink task(s) require data")]
    NoFileSets(usize),

    /// A selection reduced a non-empty accumulator to zero rows.
    #[error("selection '{0}' reduced the accumulated entries to zero")]
    EmptyReduction(String),
}

/// Result type alias for pass operations.
pub type Result<T> = std::result::Result<T, PassError>;

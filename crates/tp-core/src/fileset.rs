//! File sets and tier resolution for field specs.
//!
//! One [`FileSet`] groups the tier files (raw/dsp/evt/...) belonging to
//! the same unit of acquisition. A field spec like `/evt/energy` or
//! `ch1104000/dsp/trapEmax` is resolved to a tier by inspecting its
//! leading path segments.

use crate::error::{PassError, Result};

/// Ordered mapping from tier name to file identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSet {
    tiers: Vec<(String, String)>,
}

impl FileSet {
    /// Build a file set from `(tier, file)` pairs, keeping their order.
    pub fn new<T, F>(tiers: impl IntoIterator<Item = (T, F)>) -> Self
    where
        T: Into<String>,
        F: Into<String>,
    {
        FileSet {
            tiers: tiers.into_iter().map(|(t, f)| (t.into(), f.into())).collect(),
        }
    }

    /// File identifier for `tier`, if present.
    pub fn get(&self, tier: &str) -> Option<&str> {
        self.tiers.iter().find(|(t, _)| t == tier).map(|(_, f)| f.as_str())
    }

    /// True if `tier` is a key of this file set.
    pub fn contains(&self, tier: &str) -> bool {
        self.get(tier).is_some()
    }

    /// The raw tier's file identifier, used as provenance label for
    /// sink tasks.
    pub fn raw_id(&self) -> Result<&str> {
        self.get("raw").ok_or_else(|| PassError::NoSuchTier("raw".to_string()))
    }

    /// Iterate over `(tier, file)` pairs in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tiers.iter().map(|(t, f)| (t.as_str(), f.as_str()))
    }
}

/// Resolve which tier a field spec lives in.
///
/// The spec's first path segment names the tier; if that does not match
/// any key of the file set, the second segment is tried (specs of the
/// form `<channel>/<tier>/<field>`). Returns the matching tier's file
/// identifier.
pub fn resolve_tier<'a>(spec: &str, fileset: &'a FileSet) -> Result<&'a str> {
    let mut segments = spec.trim_matches('/').split('/');
    if let Some(first) = segments.next() {
        if let Some(file) = fileset.get(first) {
            return Ok(file);
        }
    }
    if let Some(second) = segments.next() {
        if let Some(file) = fileset.get(second) {
            return Ok(file);
        }
    }
    Err(PassError::NoSuchTier(spec.to_string()))
}

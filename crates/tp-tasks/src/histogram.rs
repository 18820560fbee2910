//! 1D and 2D histogram sinks with uniform binning.
//!
//! Instead of drawing, finalize logs a short report; the accumulated
//! bins are exposed as serializable snapshots for whatever rendering or
//! persistence the caller wants.

use serde::Serialize;

use tp_core::{ArrayFn, Column, PassError, Result, SinkTask, TaskSignal};

fn uniform_edges(min: f64, max: f64, nbins: usize) -> Vec<f64> {
    let width = (max - min) / nbins as f64;
    (0..=nbins).map(|i| min + width * i as f64).collect()
}

/// Bin index for `v` under uniform binning, `None` for out-of-range.
///
/// Half-open bins: `v < min` and `v >= max` are dropped.
fn uniform_bin(v: f64, min: f64, max: f64, nbins: usize) -> Option<usize> {
    if nbins == 0 || !v.is_finite() || v < min || v >= max {
        return None;
    }
    let bin = ((v - min) / (max - min) * nbins as f64) as usize;
    Some(bin.min(nbins - 1))
}

/// Accumulated state of a [`HistogramTask`].
#[derive(Debug, Clone, Serialize)]
pub struct HistogramSnapshot {
    /// Optional label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Bin edges (length = nbins + 1).
    pub bin_edges: Vec<f64>,
    /// Counts per bin.
    pub counts: Vec<u64>,
    /// Total values filled (in-range and out-of-range, non-null only).
    pub entries: u64,
}

/// Uniform-binning 1D histogram sink.
///
/// The value closure (default: the first input column) must produce a
/// rank-1 f64 column; null rows are skipped. With a
/// `min_entries_required` threshold the task signals `Stop` once the
/// threshold is reached, otherwise it always vetoes.
pub struct HistogramTask {
    min: f64,
    max: f64,
    nbins: usize,
    fcn: ArrayFn,
    min_entries_required: Option<u64>,
    label: Option<String>,
    counts: Vec<u64>,
    entries: u64,
}

impl HistogramTask {
    /// Make a histogram over `[min, max)` with `nbins` uniform bins.
    pub fn new(min: f64, max: f64, nbins: usize) -> Self {
        HistogramTask {
            min,
            max,
            nbins,
            fcn: Box::new(|cols| Ok(cols[0].clone())),
            min_entries_required: None,
            label: None,
            counts: vec![0; nbins],
            entries: 0,
        }
    }

    /// Replace the value-extracting closure.
    pub fn with_fcn(mut self, fcn: impl Fn(&[&Column]) -> Result<Column> + 'static) -> Self {
        self.fcn = Box::new(fcn);
        self
    }

    /// Stop the loop once this many entries have been filled.
    pub fn with_min_entries(mut self, n: u64) -> Self {
        self.min_entries_required = Some(n);
        self
    }

    /// Label used in reports.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Entries filled so far.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Snapshot of the accumulated bins.
    pub fn snapshot(&self) -> HistogramSnapshot {
        HistogramSnapshot {
            label: self.label.clone(),
            bin_edges: uniform_edges(self.min, self.max, self.nbins),
            counts: self.counts.clone(),
            entries: self.entries,
        }
    }
}

impl SinkTask for HistogramTask {
    fn initialize(&mut self) {
        self.counts = vec![0; self.nbins];
        self.entries = 0;
    }

    fn call(&mut self, inputs: &[&Column], _raw_id: &str) -> Result<TaskSignal> {
        let values = (self.fcn)(inputs)?;
        let values = values.as_f64("histogram values")?;
        for v in values.iter().flatten() {
            if let Some(bin) = uniform_bin(*v, self.min, self.max, self.nbins) {
                self.counts[bin] += 1;
            }
            self.entries += 1;
        }
        match self.min_entries_required {
            Some(goal) if self.entries >= goal => Ok(TaskSignal::Stop),
            _ => Ok(TaskSignal::Continue),
        }
    }

    fn finalize(&mut self) -> Result<()> {
        let label = self.label.as_deref().unwrap_or("histogram");
        if self.entries == 0 {
            log::info!("{label}: no entries accumulated, nothing to report");
            return Ok(());
        }
        log::info!("{label}: {} entries in {} bins over [{}, {})", self.entries, self.nbins, self.min, self.max);
        Ok(())
    }

    fn required(&self) -> bool {
        self.min_entries_required.is_some()
    }
}

/// Accumulated state of a [`Histogram2DTask`].
#[derive(Debug, Clone, Serialize)]
pub struct Histogram2DSnapshot {
    /// X bin edges.
    pub x_edges: Vec<f64>,
    /// Y bin edges.
    pub y_edges: Vec<f64>,
    /// Row-major counts (`x_nbins` rows of `y_nbins`).
    pub counts: Vec<u64>,
    /// Total pairs filled.
    pub entries: u64,
}

/// Uniform-binning 2D histogram sink.
///
/// X and y closures default to the first and second input column. Both
/// must be rank-1 f64 and the same length; with
/// `autocrop_input_arrays` a mismatch silently truncates the longer
/// side instead (positional, use with care).
pub struct Histogram2DTask {
    x_min: f64,
    x_max: f64,
    x_nbins: usize,
    y_min: f64,
    y_max: f64,
    y_nbins: usize,
    x_fcn: ArrayFn,
    y_fcn: ArrayFn,
    min_entries_required: Option<u64>,
    autocrop_input_arrays: bool,
    counts: Vec<u64>,
    entries: u64,
}

impl Histogram2DTask {
    /// Make a 2D histogram over `[x_min, x_max) x [y_min, y_max)`.
    pub fn new(
        x_min: f64,
        x_max: f64,
        x_nbins: usize,
        y_min: f64,
        y_max: f64,
        y_nbins: usize,
    ) -> Self {
        Histogram2DTask {
            x_min,
            x_max,
            x_nbins,
            y_min,
            y_max,
            y_nbins,
            x_fcn: Box::new(|cols| Ok(cols[0].clone())),
            y_fcn: Box::new(|cols| Ok(cols[1].clone())),
            min_entries_required: None,
            autocrop_input_arrays: false,
            counts: vec![0; x_nbins * y_nbins],
            entries: 0,
        }
    }

    /// Replace the x value closure.
    pub fn with_x_fcn(mut self, fcn: impl Fn(&[&Column]) -> Result<Column> + 'static) -> Self {
        self.x_fcn = Box::new(fcn);
        self
    }

    /// Replace the y value closure.
    pub fn with_y_fcn(mut self, fcn: impl Fn(&[&Column]) -> Result<Column> + 'static) -> Self {
        self.y_fcn = Box::new(fcn);
        self
    }

    /// Stop the loop once this many pairs have been filled.
    pub fn with_min_entries(mut self, n: u64) -> Self {
        self.min_entries_required = Some(n);
        self
    }

    /// Truncate mismatched x/y inputs to the shorter one instead of
    /// failing. Purely positional; known to matter when the evt tier
    /// has fewer rows than raw/dsp.
    pub fn with_autocrop(mut self) -> Self {
        self.autocrop_input_arrays = true;
        self
    }

    /// Pairs filled so far.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Snapshot of the accumulated grid.
    pub fn snapshot(&self) -> Histogram2DSnapshot {
        Histogram2DSnapshot {
            x_edges: uniform_edges(self.x_min, self.x_max, self.x_nbins),
            y_edges: uniform_edges(self.y_min, self.y_max, self.y_nbins),
            counts: self.counts.clone(),
            entries: self.entries,
        }
    }

    /// Count in the `(x_bin, y_bin)` cell.
    pub fn count_at(&self, x_bin: usize, y_bin: usize) -> u64 {
        self.counts[x_bin * self.y_nbins + y_bin]
    }
}

impl SinkTask for Histogram2DTask {
    fn initialize(&mut self) {
        self.counts = vec![0; self.x_nbins * self.y_nbins];
        self.entries = 0;
    }

    fn call(&mut self, inputs: &[&Column], _raw_id: &str) -> Result<TaskSignal> {
        let x_col = (self.x_fcn)(inputs)?;
        let y_col = (self.y_fcn)(inputs)?;
        let mut x_vals = x_col.as_f64("2d histogram x values")?;
        let mut y_vals = y_col.as_f64("2d histogram y values")?;
        if x_vals.len() != y_vals.len() {
            if !self.autocrop_input_arrays {
                return Err(PassError::LengthMismatch {
                    left: "x".to_string(),
                    left_len: x_vals.len(),
                    right: "y".to_string(),
                    right_len: y_vals.len(),
                });
            }
            let n = x_vals.len().min(y_vals.len());
            x_vals = &x_vals[..n];
            y_vals = &y_vals[..n];
        }
        for (x, y) in x_vals.iter().zip(y_vals) {
            let (Some(x), Some(y)) = (x, y) else { continue };
            let xb = uniform_bin(*x, self.x_min, self.x_max, self.x_nbins);
            let yb = uniform_bin(*y, self.y_min, self.y_max, self.y_nbins);
            if let (Some(xb), Some(yb)) = (xb, yb) {
                self.counts[xb * self.y_nbins + yb] += 1;
            }
            self.entries += 1;
        }
        match self.min_entries_required {
            Some(goal) if self.entries >= goal => Ok(TaskSignal::Stop),
            _ => Ok(TaskSignal::Continue),
        }
    }

    fn finalize(&mut self) -> Result<()> {
        if self.entries == 0 {
            log::info!("2d histogram: no entries accumulated, nothing to report");
            return Ok(());
        }
        log::info!(
            "2d histogram: {} entries in {}x{} bins",
            self.entries,
            self.x_nbins,
            self.y_nbins
        );
        Ok(())
    }

    fn required(&self) -> bool {
        self.min_entries_required.is_some()
    }
}

//! Categorical histogram sinks: frequency counts over label-valued
//! columns (detector names, rawids, flags).

use std::collections::HashMap;

use serde::Serialize;

use tp_core::{ArrayFn, Column, PassError, Result, SinkTask, TaskSignal};

/// Closure mapping a raw category key to a display key (e.g. rawid to
/// detector name).
pub type KeymapFn = Box<dyn Fn(&str) -> String>;

/// First-seen-ordered category counter shared by the 1D and 2D tasks.
#[derive(Debug, Default)]
struct CatCounts {
    order: Vec<String>,
    counts: HashMap<String, u64>,
}

impl CatCounts {
    fn add(&mut self, cat: &str, n: u64) {
        if !self.counts.contains_key(cat) {
            self.order.push(cat.to_string());
        }
        *self.counts.entry(cat.to_string()).or_insert(0) += n;
    }

    /// Remap keys; colliding mapped keys merge by summation.
    fn map_keys(&mut self, f: &KeymapFn) {
        let mut mapped = CatCounts::default();
        for key in &self.order {
            mapped.add(&f(key), self.counts[key]);
        }
        *self = mapped;
    }

    fn items(&self, sorted: bool) -> Vec<(String, u64)> {
        let mut order: Vec<&String> = self.order.iter().collect();
        if sorted {
            order.sort();
        }
        order.iter().map(|k| ((*k).clone(), self.counts[*k])).collect()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.counts.clear();
    }
}

/// Accumulated state of a [`CategoricalHistogramTask`].
#[derive(Debug, Clone, Serialize)]
pub struct CategoricalSnapshot {
    /// Category labels.
    pub labels: Vec<String>,
    /// Count per label, aligned with `labels`.
    pub counts: Vec<u64>,
    /// Total counted entries.
    pub entries: u64,
}

/// Frequency histogram over a rank-1 category column.
///
/// The category closure must produce a rank-1 string or rawid column;
/// null rows are skipped. An optional keymap renames categories at
/// finalize time (colliding names merge).
pub struct CategoricalHistogramTask {
    fcn: ArrayFn,
    keymap_fcn: Option<KeymapFn>,
    sorted: bool,
    min_entries_required: Option<u64>,
    cats: CatCounts,
    entries: u64,
}

impl CategoricalHistogramTask {
    /// Make a categorical histogram with the given category closure.
    pub fn new(fcn: impl Fn(&[&Column]) -> Result<Column> + 'static) -> Self {
        CategoricalHistogramTask {
            fcn: Box::new(fcn),
            keymap_fcn: None,
            sorted: true,
            min_entries_required: None,
            cats: CatCounts::default(),
            entries: 0,
        }
    }

    /// Rename categories at finalize time.
    pub fn with_keymap(mut self, f: impl Fn(&str) -> String + 'static) -> Self {
        self.keymap_fcn = Some(Box::new(f));
        self
    }

    /// Keep first-seen category order instead of sorting.
    pub fn unsorted(mut self) -> Self {
        self.sorted = false;
        self
    }

    /// Stop the loop once this many entries have been counted.
    pub fn with_min_entries(mut self, n: u64) -> Self {
        self.min_entries_required = Some(n);
        self
    }

    /// Entries counted so far.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Count for one category label.
    pub fn count_of(&self, label: &str) -> u64 {
        self.cats.counts.get(label).copied().unwrap_or(0)
    }

    /// Snapshot of the accumulated categories.
    pub fn snapshot(&self) -> CategoricalSnapshot {
        let items = self.cats.items(self.sorted);
        CategoricalSnapshot {
            labels: items.iter().map(|(k, _)| k.clone()).collect(),
            counts: items.iter().map(|(_, n)| *n).collect(),
            entries: self.entries,
        }
    }
}

impl SinkTask for CategoricalHistogramTask {
    fn initialize(&mut self) {
        self.cats.clear();
        self.entries = 0;
    }

    fn call(&mut self, inputs: &[&Column], _raw_id: &str) -> Result<TaskSignal> {
        let cats = (self.fcn)(inputs)?;
        let cats = cats.categories("categories")?;
        for cat in cats.iter().flatten() {
            self.cats.add(cat, 1);
            self.entries += 1;
        }
        match self.min_entries_required {
            Some(goal) if self.entries >= goal => Ok(TaskSignal::Stop),
            _ => Ok(TaskSignal::Continue),
        }
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(f) = &self.keymap_fcn {
            self.cats.map_keys(f);
        }
        if self.entries == 0 {
            log::info!("categorical histogram: no entries accumulated");
            return Ok(());
        }
        log::info!(
            "categorical histogram: {} entries over {} categories",
            self.entries,
            self.cats.order.len()
        );
        Ok(())
    }

    fn required(&self) -> bool {
        self.min_entries_required.is_some()
    }
}

/// How the 2D categorical task pairs its x and y columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairMode {
    /// Rank-1 columns, paired row by row.
    Normal,
    /// Rank-2 columns; per row, the cartesian product of the two lists.
    Cartesian,
}

/// Accumulated state of a [`CategoricalHistogram2DTask`].
#[derive(Debug, Clone, Serialize)]
pub struct CategoricalSnapshot2D {
    /// X-axis labels.
    pub x_labels: Vec<String>,
    /// Y-axis labels.
    pub y_labels: Vec<String>,
    /// Row-major counts (`x_labels.len()` rows of `y_labels.len()`).
    pub counts: Vec<u64>,
    /// Total counted pairs.
    pub entries: u64,
}

/// Frequency histogram over pairs of categories.
pub struct CategoricalHistogram2DTask {
    x_fcn: ArrayFn,
    y_fcn: ArrayFn,
    mode: PairMode,
    keymap_fcn: Option<KeymapFn>,
    sorted: bool,
    min_entries_required: Option<u64>,
    autocrop_input_arrays: bool,
    x_order: Vec<String>,
    y_order: Vec<String>,
    counts: HashMap<(String, String), u64>,
    entries: u64,
}

impl CategoricalHistogram2DTask {
    /// Make a 2D categorical histogram from x and y category closures.
    pub fn new(
        x_fcn: impl Fn(&[&Column]) -> Result<Column> + 'static,
        y_fcn: impl Fn(&[&Column]) -> Result<Column> + 'static,
        mode: PairMode,
    ) -> Self {
        CategoricalHistogram2DTask {
            x_fcn: Box::new(x_fcn),
            y_fcn: Box::new(y_fcn),
            mode,
            keymap_fcn: None,
            sorted: true,
            min_entries_required: None,
            autocrop_input_arrays: false,
            x_order: Vec::new(),
            y_order: Vec::new(),
            counts: HashMap::new(),
            entries: 0,
        }
    }

    /// Rename categories on both axes at finalize time.
    pub fn with_keymap(mut self, f: impl Fn(&str) -> String + 'static) -> Self {
        self.keymap_fcn = Some(Box::new(f));
        self
    }

    /// Keep first-seen label order instead of sorting.
    pub fn unsorted(mut self) -> Self {
        self.sorted = false;
        self
    }

    /// Stop the loop once this many pairs have been counted.
    pub fn with_min_entries(mut self, n: u64) -> Self {
        self.min_entries_required = Some(n);
        self
    }

    /// Truncate mismatched x/y inputs to the shorter one instead of
    /// failing. Purely positional, use with care.
    pub fn with_autocrop(mut self) -> Self {
        self.autocrop_input_arrays = true;
        self
    }

    /// Pairs counted so far.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Count for one `(x, y)` label pair.
    pub fn count_of(&self, x: &str, y: &str) -> u64 {
        self.counts.get(&(x.to_string(), y.to_string())).copied().unwrap_or(0)
    }

    fn add(&mut self, x: &str, y: &str, n: u64) {
        if !self.x_order.iter().any(|k| k == x) {
            self.x_order.push(x.to_string());
        }
        if !self.y_order.iter().any(|k| k == y) {
            self.y_order.push(y.to_string());
        }
        *self.counts.entry((x.to_string(), y.to_string())).or_insert(0) += n;
        self.entries += n;
    }

    /// Snapshot of the accumulated label grid.
    pub fn snapshot(&self) -> CategoricalSnapshot2D {
        let mut x_labels = self.x_order.clone();
        let mut y_labels = self.y_order.clone();
        if self.sorted {
            x_labels.sort();
            y_labels.sort();
        }
        let mut counts = vec![0u64; x_labels.len() * y_labels.len()];
        for (xi, x) in x_labels.iter().enumerate() {
            for (yi, y) in y_labels.iter().enumerate() {
                counts[xi * y_labels.len() + yi] = self.count_of(x, y);
            }
        }
        CategoricalSnapshot2D { x_labels, y_labels, counts, entries: self.entries }
    }

    fn check_lengths<T>(&self, x: &[T], y: &[T]) -> Result<usize> {
        if x.len() == y.len() {
            return Ok(x.len());
        }
        if self.autocrop_input_arrays {
            return Ok(x.len().min(y.len()));
        }
        Err(PassError::LengthMismatch {
            left: "x".to_string(),
            left_len: x.len(),
            right: "y".to_string(),
            right_len: y.len(),
        })
    }
}

impl SinkTask for CategoricalHistogram2DTask {
    fn initialize(&mut self) {
        self.x_order.clear();
        self.y_order.clear();
        self.counts.clear();
        self.entries = 0;
    }

    fn call(&mut self, inputs: &[&Column], _raw_id: &str) -> Result<TaskSignal> {
        let x_col = (self.x_fcn)(inputs)?;
        let y_col = (self.y_fcn)(inputs)?;
        match self.mode {
            PairMode::Normal => {
                let x_cats = x_col.categories("x categories")?;
                let y_cats = y_col.categories("y categories")?;
                let n = self.check_lengths(&x_cats, &y_cats)?;
                for i in 0..n {
                    if let (Some(x), Some(y)) = (&x_cats[i], &y_cats[i]) {
                        self.add(x, y, 1);
                    }
                }
            }
            PairMode::Cartesian => {
                let x_rows = x_col.categories_jagged("x categories")?;
                let y_rows = y_col.categories_jagged("y categories")?;
                let n = self.check_lengths(&x_rows, &y_rows)?;
                for i in 0..n {
                    let (Some(x_row), Some(y_row)) = (&x_rows[i], &y_rows[i]) else { continue };
                    for x in x_row {
                        for y in y_row {
                            self.add(x, y, 1);
                        }
                    }
                }
            }
        }
        match self.min_entries_required {
            Some(goal) if self.entries >= goal => Ok(TaskSignal::Stop),
            _ => Ok(TaskSignal::Continue),
        }
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(f) = self.keymap_fcn.take() {
            let old_counts = std::mem::take(&mut self.counts);
            self.x_order.clear();
            self.y_order.clear();
            self.entries = 0;
            // re-adding merges colliding mapped keys
            for ((x, y), n) in old_counts {
                self.add(&f(&x), &f(&y), n);
            }
            self.keymap_fcn = Some(f);
        }
        if self.entries == 0 {
            log::info!("2d categorical histogram: no entries accumulated");
            return Ok(());
        }
        log::info!(
            "2d categorical histogram: {} entries over {}x{} categories",
            self.entries,
            self.x_order.len(),
            self.y_order.len()
        );
        Ok(())
    }

    fn required(&self) -> bool {
        self.min_entries_required.is_some()
    }
}

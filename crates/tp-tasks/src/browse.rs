//! Waveform browse selector sinks.
//!
//! These tasks do not read waveforms themselves; they collect which
//! events of which raw files are worth looking at, and hand the final
//! plan to an injected [`WaveformBrowser`]. The shipped implementation
//! just logs the plan.

use serde::Serialize;

use tp_core::{ArrayFn, Column, PassError, Result, SinkTask, TaskSignal};

use crate::channel::{detector_system_for_channel, ChannelMap};

/// What a browser should display: per-file entry lists plus the group
/// and waveform line to read.
#[derive(Debug, Clone, Serialize)]
pub struct BrowsePlan {
    /// Raw files holding the selected events, in encounter order.
    pub files: Vec<String>,
    /// Selected event indices per file, aligned with `files`.
    pub entries: Vec<Vec<usize>>,
    /// How many waveforms to actually draw.
    pub n_drawn: usize,
    /// LH5 group to read waveforms from, e.g. `/V01234A/raw`.
    pub group: String,
    /// Waveform field to display.
    pub line: String,
    /// Optional plot title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Renders a [`BrowsePlan`]. The rendering itself is out of scope for
/// this crate; inject whatever suits the environment.
pub trait WaveformBrowser {
    /// Display the plan.
    fn draw(&mut self, plan: &BrowsePlan) -> Result<()>;
}

/// Default browser: logs the plan instead of drawing.
#[derive(Debug, Default)]
pub struct LogBrowser;

impl WaveformBrowser for LogBrowser {
    fn draw(&mut self, plan: &BrowsePlan) -> Result<()> {
        log::info!(
            "browse {} (line {}): {} waveform(s) from {} file(s)",
            plan.group,
            plan.line,
            plan.n_drawn,
            plan.files.len()
        );
        for (file, entries) in plan.files.iter().zip(&plan.entries) {
            log::debug!("  {file}: entries {entries:?}");
        }
        Ok(())
    }
}

/// Plot title choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BrowseTitle {
    /// No title.
    #[default]
    Off,
    /// Use the detector name.
    Detector,
    /// Use a fixed string.
    Text(String),
}

/// Per-run accumulation shared by the browse tasks: which entries of
/// which files matched, and how many in total.
#[derive(Debug, Clone, Default)]
struct EntryBuffer {
    files: Vec<String>,
    entries: Vec<Vec<usize>>,
    nr_entries: usize,
}

impl EntryBuffer {
    fn clear(&mut self) {
        self.files.clear();
        self.entries.clear();
        self.nr_entries = 0;
    }

    /// Buffer the hits of one file's mask. Zero hits is a veto; a
    /// total at or past `max_entries` is the stop signal.
    fn add_mask(&mut self, mask: &[Option<bool>], raw: &str, max_entries: usize) -> TaskSignal {
        let hits: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == Some(true))
            .map(|(i, _)| i)
            .collect();
        if hits.is_empty() {
            return TaskSignal::Continue;
        }
        log::debug!("want to draw file {raw}, entries {hits:?}");
        self.nr_entries += hits.len();
        self.files.push(raw.to_string());
        self.entries.push(hits);
        if self.nr_entries >= max_entries {
            TaskSignal::Stop
        } else {
            TaskSignal::Continue
        }
    }
}

/// Hand a buffered plan to the browser; empty buffers degrade to a log
/// line, never an error.
fn draw_plan(
    browser: &mut dyn WaveformBrowser,
    buffer: &EntryBuffer,
    max_entries_drawn: usize,
    detector: &str,
    title: Option<String>,
) -> Result<()> {
    if buffer.files.is_empty() {
        log::info!("No files found!");
        return Ok(());
    }
    let n_drawn = buffer.nr_entries.min(max_entries_drawn);
    log::info!("we have {} entries; plotting {} of them", buffer.nr_entries, n_drawn);
    let system = detector_system_for_channel(detector);
    browser.draw(&BrowsePlan {
        files: buffer.files.clone(),
        entries: buffer.entries.clone(),
        n_drawn,
        group: format!("/{detector}/raw"),
        line: system.default_display_wf_name.to_string(),
        title,
    })
}

/// Collects events of one detector whose waveforms should be browsed.
///
/// The selection closure must produce a rank-1 bool mask; matching
/// entry indices are buffered per raw file. The task signals `Stop`
/// once `max_entries` events are buffered and `Continue` otherwise.
pub struct BrowseTask {
    fcn: ArrayFn,
    detector: String,
    max_entries: usize,
    max_entries_drawn: usize,
    autodraw: bool,
    title: BrowseTitle,
    browser: Box<dyn WaveformBrowser>,
    buffer: EntryBuffer,
}

impl BrowseTask {
    /// Default collection/drawing goal.
    pub const DEFAULT_MAX_ENTRIES: usize = 7;

    /// Make a browse task for one detector.
    pub fn new(
        fcn: impl Fn(&[&Column]) -> Result<Column> + 'static,
        detector: impl Into<String>,
    ) -> Self {
        BrowseTask {
            fcn: Box::new(fcn),
            detector: detector.into(),
            max_entries: Self::DEFAULT_MAX_ENTRIES,
            max_entries_drawn: Self::DEFAULT_MAX_ENTRIES,
            autodraw: true,
            title: BrowseTitle::Off,
            browser: Box::new(LogBrowser),
            buffer: EntryBuffer::default(),
        }
    }

    /// Stop collecting (and drawing) after this many events.
    pub fn with_max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self.max_entries_drawn = n;
        self
    }

    /// Title for the plot.
    pub fn with_title(mut self, title: BrowseTitle) -> Self {
        self.title = title;
        self
    }

    /// Do not draw at finalize; call [`draw`](Self::draw) manually.
    pub fn manual_draw(mut self) -> Self {
        self.autodraw = false;
        self
    }

    /// Replace the browser implementation.
    pub fn with_browser(mut self, browser: impl WaveformBrowser + 'static) -> Self {
        self.browser = Box::new(browser);
        self
    }

    /// Events buffered so far.
    pub fn buffered_entries(&self) -> usize {
        self.buffer.nr_entries
    }

    fn title_text(&self) -> Option<String> {
        match &self.title {
            BrowseTitle::Off => None,
            BrowseTitle::Detector => Some(self.detector.clone()),
            BrowseTitle::Text(t) => Some(t.clone()),
        }
    }

    /// Hand the buffered plan to the browser.
    pub fn draw(&mut self) -> Result<()> {
        let title = self.title_text();
        draw_plan(&mut *self.browser, &self.buffer, self.max_entries_drawn, &self.detector, title)
    }
}

impl SinkTask for BrowseTask {
    fn initialize(&mut self) {
        self.buffer.clear();
    }

    fn call(&mut self, inputs: &[&Column], raw_id: &str) -> Result<TaskSignal> {
        let mask = (self.fcn)(inputs)?;
        let mask = mask.as_bool("browse mask")?;
        Ok(self.buffer.add_mask(mask, raw_id, self.max_entries))
    }

    fn finalize(&mut self) -> Result<()> {
        if self.autodraw {
            self.draw()?;
        }
        Ok(())
    }
}

/// Collects browsable events across all detectors at once.
///
/// The closure must produce a rank-2 rawid column (per event, the
/// rawids worth looking at). Because a browser can only show one
/// detector at a time, finalize runs `cycle` rounds: pick the first
/// not-yet-shown detector among the buffered rawids, reduce the buffer
/// to events containing it, draw, and blacklist it for the next round.
pub struct BrowseAnydetTask {
    fcn: ArrayFn,
    channelmap: ChannelMap,
    max_entries: usize,
    max_entries_drawn: usize,
    autodraw: bool,
    cycle: usize,
    blacklist: Vec<String>,
    browser: Box<dyn WaveformBrowser>,
    buffer: EntryBuffer,
    /// Kept rawid rows per buffered file, aligned with the buffer.
    detector_rawids: Vec<Vec<Vec<u32>>>,
}

impl BrowseAnydetTask {
    /// How many extra events to collect beyond the drawing goal, so
    /// the per-detector reduction still has material to work with.
    pub const DEFAULT_OVERSEARCH: usize = 1000;

    /// Make an any-detector browse task.
    pub fn new(
        fcn: impl Fn(&[&Column]) -> Result<Column> + 'static,
        channelmap: ChannelMap,
    ) -> Self {
        BrowseAnydetTask {
            fcn: Box::new(fcn),
            channelmap,
            max_entries: Self::DEFAULT_OVERSEARCH,
            max_entries_drawn: BrowseTask::DEFAULT_MAX_ENTRIES,
            autodraw: true,
            cycle: 1,
            blacklist: Vec::new(),
            browser: Box::new(LogBrowser),
            buffer: EntryBuffer::default(),
            detector_rawids: Vec::new(),
        }
    }

    /// Draw at most this many events per detector round.
    pub fn with_max_entries(mut self, n: usize) -> Self {
        self.max_entries_drawn = n;
        self
    }

    /// Collect up to `n` events before stopping (0 disables the
    /// oversearch and collects exactly the drawing goal).
    pub fn with_oversearch(mut self, n: usize) -> Self {
        self.max_entries = if n == 0 { self.max_entries_drawn } else { n };
        self
    }

    /// Show this many different detectors at finalize.
    pub fn with_cycle(mut self, n: usize) -> Self {
        self.cycle = n;
        self
    }

    /// Never show these detectors.
    pub fn with_blacklist<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.blacklist = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Do not draw at finalize; call [`draw`](Self::draw) manually.
    pub fn manual_draw(mut self) -> Self {
        self.autodraw = false;
        self
    }

    /// Replace the browser implementation.
    pub fn with_browser(mut self, browser: impl WaveformBrowser + 'static) -> Self {
        self.browser = Box::new(browser);
        self
    }

    /// Events buffered so far.
    pub fn buffered_entries(&self) -> usize {
        self.buffer.nr_entries
    }

    /// Detectors shown so far (grows by one per draw round).
    pub fn blacklist(&self) -> &[String] {
        &self.blacklist
    }

    /// First buffered rawid whose channel key is not blacklisted.
    fn select_rawid(&self) -> Result<(u32, String)> {
        for per_file in &self.detector_rawids {
            for row in per_file {
                for rawid in row {
                    let key = self.channelmap.key_for_rawid(*rawid)?;
                    if !self.blacklist.iter().any(|b| b == key) {
                        return Ok((*rawid, key.to_string()));
                    }
                }
            }
        }
        Err(PassError::EmptyReduction("all buffered detectors are blacklisted".to_string()))
    }

    /// Reduce the buffer to events containing one drawable detector.
    fn singularize(&self) -> Result<(String, EntryBuffer)> {
        let (rawid, key) = self.select_rawid()?;
        log::info!("selected {key}");
        let mut reduced = EntryBuffer::default();
        for ((file, entries), rawids) in
            self.buffer.files.iter().zip(&self.buffer.entries).zip(&self.detector_rawids)
        {
            let kept: Vec<usize> = entries
                .iter()
                .zip(rawids)
                .filter(|(_, row)| row.contains(&rawid))
                .map(|(e, _)| *e)
                .collect();
            if !kept.is_empty() {
                reduced.nr_entries += kept.len();
                reduced.files.push(file.clone());
                reduced.entries.push(kept);
            }
        }
        if reduced.files.is_empty() {
            return Err(PassError::EmptyReduction(key));
        }
        Ok((key, reduced))
    }

    /// Run the per-detector draw rounds.
    pub fn draw(&mut self) -> Result<()> {
        if self.buffer.files.is_empty() {
            log::info!("No files found!");
            return Ok(());
        }
        for _ in 0..self.cycle {
            let (key, reduced) = self.singularize()?;
            draw_plan(&mut *self.browser, &reduced, self.max_entries_drawn, &key, None)?;
            self.blacklist.push(key);
        }
        Ok(())
    }
}

impl SinkTask for BrowseAnydetTask {
    fn initialize(&mut self) {
        self.buffer.clear();
        self.detector_rawids.clear();
    }

    fn call(&mut self, inputs: &[&Column], raw_id: &str) -> Result<TaskSignal> {
        let rawids = (self.fcn)(inputs)?;
        let rawids = rawids.as_jagged_u32("browse rawids")?;
        // an event is browsable if any of its rawids is nonzero
        let mask: Vec<Option<bool>> = rawids
            .iter()
            .map(|row| Some(matches!(row, Some(r) if r.iter().any(|id| *id != 0))))
            .collect();
        let kept: Vec<Vec<u32>> = rawids
            .iter()
            .zip(&mask)
            .filter(|(_, keep)| **keep == Some(true))
            .filter_map(|(row, _)| row.clone())
            .collect();
        if !kept.is_empty() {
            self.detector_rawids.push(kept);
        }
        Ok(self.buffer.add_mask(&mask, raw_id, self.max_entries))
    }

    fn finalize(&mut self) -> Result<()> {
        if self.autodraw {
            self.draw()?;
        }
        Ok(())
    }
}

//! # tp-tasks
//!
//! Sink tasks for the tierpass streaming loop: event counters, 1D/2D
//! and categorical histograms, and waveform browse selectors, plus the
//! channel-map utilities they rely on.
//!
//! Every task implements [`tp_core::SinkTask`]: accumulator state is
//! allocated in `initialize`, grows monotonically during the loop, and
//! is reported in `finalize` — gracefully, even when nothing was
//! accumulated. Rendering is out of scope; histogram tasks expose
//! serializable snapshots, browse tasks hand their plan to an injected
//! [`WaveformBrowser`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod browse;
pub mod categorical;
pub mod channel;
pub mod count;
pub mod histogram;

pub use browse::{BrowseAnydetTask, BrowsePlan, BrowseTask, BrowseTitle, LogBrowser, WaveformBrowser};
pub use categorical::{
    CategoricalHistogram2DTask, CategoricalHistogramTask, CategoricalSnapshot,
    CategoricalSnapshot2D, KeymapFn, PairMode,
};
pub use channel::{detector_system_for_channel, ChannelMap, DetectorSystem};
pub use count::CountTask;
pub use histogram::{Histogram2DSnapshot, Histogram2DTask, HistogramSnapshot, HistogramTask};

//! # tp-core
//!
//! Single-pass streaming analysis engine for tiered columnar event
//! data (raw/dsp/evt and friends).
//!
//! The engine streams file sets one at a time, keeping memory bounded
//! to a single file set's columns: fields are loaded through a
//! [`TierReader`], optionally cropped and masked, run through ordered
//! derivations, and handed to sink tasks that accumulate results and
//! vote on early termination.
//!
//! ## Example
//!
//! ```
//! use tp_core::{
//!     main_loop, Column, Derive, FileSet, InputSpec, MemoryReader, Sink, SinkFn, TaskSignal,
//! };
//!
//! let reader = MemoryReader::new().with("f0", "/evt/energy", Column::from(vec![1.0, 2.0]));
//! let inputs = [InputSpec::new("energy", "/evt/energy")];
//! let derives = [Derive::new(["energy"], "energy_kev", |cols| {
//!     let vals = cols[0].as_f64("energy")?;
//!     Ok(tp_core::Column::F64(vals.iter().map(|v| v.map(|x| x * 1000.0)).collect()))
//! })];
//! let mut printer = SinkFn(|cols: &[&Column], raw: &str| {
//!     println!("{raw}: {} rows", cols[0].len());
//!     Ok(TaskSignal::NoOpinion)
//! });
//! let mut sinks = vec![Sink::new(["energy_kev"], &mut printer)];
//! let filesets = [FileSet::new([("raw", "f0"), ("evt", "f0")])];
//! let outcome =
//!     main_loop(&reader, &inputs, &derives, &mut sinks, filesets, Default::default()).unwrap();
//! assert_eq!(outcome.filesets_processed, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod column;
pub mod error;
pub mod fileset;
pub mod pass;
pub mod reader;
pub mod store;
pub mod task;

pub use column::Column;
pub use error::{PassError, Result};
pub use fileset::{resolve_tier, FileSet};
pub use pass::{main_loop, ArrayFn, Derive, InputSpec, MainLoopOptions, PassOutcome, PreReducer};
pub use reader::{MemoryReader, TierReader};
pub use store::{ArrayStore, Crop};
pub use task::{should_stop, Sink, SinkFn, SinkTask, TaskSignal};

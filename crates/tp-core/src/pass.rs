//! The single-pass streaming analysis loop.
//!
//! One pass streams file sets from an iterator, rebuilding the array
//! store for each: load declared fields through the tier reader, crop
//! (optional), mask (optional), evaluate derivations in order, then
//! dispatch to every sink and let the termination policy decide whether
//! to pull the next file set. Peak memory is one file set's columns
//! plus whatever the sinks accumulate.

use crate::column::Column;
use crate::error::{PassError, Result};
use crate::fileset::{resolve_tier, FileSet};
use crate::reader::TierReader;
use crate::store::ArrayStore;
use crate::task::{should_stop, Sink};

/// Function contract shared by the array-producing roles: derivations,
/// mask producers, and the value/category extractors of sink tasks.
pub type ArrayFn = Box<dyn Fn(&[&Column]) -> Result<Column>>;

/// One field to load into the store: short name plus field spec path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    /// Short name the column is stored under.
    pub name: String,
    /// Field spec path, e.g. `/evt/energy` (see [`resolve_tier`]).
    pub field: String,
}

impl InputSpec {
    /// Make an input spec.
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        InputSpec { name: name.into(), field: field.into() }
    }
}

/// One derivation: consume named columns, store one new column.
pub struct Derive {
    /// Short names of the input columns, in the order handed to `func`.
    pub inputs: Vec<String>,
    /// Short name the produced column is stored under.
    pub output: String,
    /// The derivation function.
    pub func: ArrayFn,
}

impl Derive {
    /// Make a derivation.
    pub fn new<I, S>(
        inputs: I,
        output: impl Into<String>,
        func: impl Fn(&[&Column]) -> Result<Column> + 'static,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Derive {
            inputs: inputs.into_iter().map(Into::into).collect(),
            output: output.into(),
            func: Box::new(func),
        }
    }
}

/// Pre-reduction mask producer, applied to the whole store before any
/// derivation runs.
pub struct PreReducer {
    /// Short names of the columns the mask function consumes.
    pub inputs: Vec<String>,
    /// Must produce a rank-1 bool column.
    pub func: ArrayFn,
}

impl PreReducer {
    /// Make a pre-reducer.
    pub fn new<I, S>(inputs: I, func: impl Fn(&[&Column]) -> Result<Column> + 'static) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PreReducer { inputs: inputs.into_iter().map(Into::into).collect(), func: Box::new(func) }
    }
}

/// Optional stages of the loop.
#[derive(Default)]
pub struct MainLoopOptions {
    /// Mask producer evaluated once per file set, before derivations.
    pub pre_reducer: Option<PreReducer>,
    /// Truncate all loaded columns to the shortest one. USE WITH CARE:
    /// purely positional, no alignment by event index.
    pub crop: bool,
}

/// What the loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOutcome {
    /// Number of file sets fully processed.
    pub filesets_processed: usize,
    /// True if the termination policy ended the loop before the
    /// iterator was exhausted.
    pub stopped_early: bool,
}

/// Resolve a field spec against a file set and read it.
fn read_spec(reader: &dyn TierReader, spec: &str, fileset: &FileSet) -> Result<Column> {
    let file = resolve_tier(spec, fileset)?;
    reader.read(spec, file)
}

/// Run the analysis loop: a single pass through the data, file by file.
///
/// For every file set yielded by `filesets`, the declared `inputs` are
/// loaded into a fresh store, optionally cropped and masked, the
/// `derives` are evaluated in order (later ones may use earlier
/// outputs), and every sink is called with its declared columns plus
/// the file set's raw identifier. The loop ends when the iterator is
/// exhausted or when at least one sink signals `Stop` and none signals
/// `Continue`.
///
/// `initialize` hooks run once before the first file set, `finalize`
/// hooks once after the loop, both in declared sink order. Any fatal
/// error aborts the run and propagates unmodified; no partial results
/// are salvaged for the file set in progress.
pub fn main_loop<I>(
    reader: &dyn TierReader,
    inputs: &[InputSpec],
    derives: &[Derive],
    sinks: &mut [Sink<'_>],
    filesets: I,
    options: MainLoopOptions,
) -> Result<PassOutcome>
where
    I: IntoIterator<Item = FileSet>,
{
    for sink in sinks.iter_mut() {
        sink.task.initialize();
    }

    let mut processed = 0usize;
    let mut stopped_early = false;

    for fileset in filesets {
        let mut store = ArrayStore::new();
        for input in inputs {
            let col = read_spec(reader, &input.field, &fileset)?;
            store.insert(input.name.clone(), col);
        }

        if options.crop {
            for crop in store.crop_to_min() {
                log::warn!("cropping {} from {} to {} rows", crop.name, crop.from, crop.to);
            }
        }

        if let Some(pre) = &options.pre_reducer {
            let mask = {
                let ins = store.select(&pre.inputs)?;
                (pre.func)(&ins)?
            };
            let mask = mask.as_bool("pre-reducer mask")?.to_vec();
            store.mask_all(&mask)?;
        }

        for derive in derives {
            let out = {
                let ins = store.select(&derive.inputs)?;
                (derive.func)(&ins)?
            };
            store.insert(derive.output.clone(), out);
        }

        let raw_id = fileset.raw_id()?.to_string();
        let mut signals = Vec::with_capacity(sinks.len());
        for sink in sinks.iter_mut() {
            let ins = store.select(&sink.inputs)?;
            signals.push(sink.task.call(&ins, &raw_id)?);
        }

        processed += 1;
        if should_stop(&signals) {
            stopped_early = true;
            break;
        }
    }

    for sink in sinks.iter_mut() {
        sink.task.finalize()?;
    }

    if processed == 0 {
        let required = sinks.iter().filter(|s| s.task.required()).count();
        if required > 0 {
            return Err(PassError::NoFileSets(required));
        }
    }

    Ok(PassOutcome { filesets_processed: processed, stopped_early })
}

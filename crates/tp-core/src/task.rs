//! Sink task protocol and termination policy.
//!
//! Every consumer of the loop implements [`SinkTask`]. The lifecycle is
//! Uninitialized → Accumulating → Finalized: `initialize` once before
//! the first file set, one `call` per file set, `finalize` once after
//! the loop. Both hooks default to no-ops, so stateless tasks only
//! implement `call`.

use crate::column::Column;
use crate::error::Result;

/// What a sink task wants the loop to do after one file set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSignal {
    /// Task reached its goal; stop unless another task vetoes.
    Stop,
    /// Task needs more data; vetoes early termination.
    Continue,
    /// Task has no opinion on termination.
    NoOpinion,
}

/// A consumer task fed once per file set.
pub trait SinkTask {
    /// Reset/allocate accumulator state. Called once before the first
    /// file set, so one task instance can be reused across runs.
    fn initialize(&mut self) {}

    /// Consume the declared input columns for one file set.
    ///
    /// `raw_id` is the file set's raw-tier file identifier, a
    /// provenance label for diagnostics.
    fn call(&mut self, inputs: &[&Column], raw_id: &str) -> Result<TaskSignal>;

    /// Final aggregation/reporting. Called once after the loop ends,
    /// even when no file set was processed; must be graceful on empty
    /// accumulators.
    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }

    /// True if this task cannot produce a meaningful result without
    /// data (e.g. it has a minimum-entries goal). Used to surface the
    /// empty-iterator condition as an error.
    fn required(&self) -> bool {
        false
    }
}

/// Adapter turning a plain closure into a stateless [`SinkTask`].
pub struct SinkFn<F>(pub F)
where
    F: FnMut(&[&Column], &str) -> Result<TaskSignal>;

impl<F> SinkTask for SinkFn<F>
where
    F: FnMut(&[&Column], &str) -> Result<TaskSignal>,
{
    fn call(&mut self, inputs: &[&Column], raw_id: &str) -> Result<TaskSignal> {
        (self.0)(inputs, raw_id)
    }
}

/// One sink wired into the loop: input short names plus the task.
pub struct Sink<'a> {
    /// Short names of the store columns handed to the task, in order.
    pub inputs: Vec<String>,
    /// The task itself, borrowed so callers keep access after the run.
    pub task: &'a mut dyn SinkTask,
}

impl<'a> Sink<'a> {
    /// Wire `task` to the named store columns.
    pub fn new<I, S>(inputs: I, task: &'a mut dyn SinkTask) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Sink { inputs: inputs.into_iter().map(Into::into).collect(), task }
    }
}

/// Termination policy: stop iff at least one task signaled [`Stop`]
/// and no task signaled [`Continue`].
///
/// [`Stop`]: TaskSignal::Stop
/// [`Continue`]: TaskSignal::Continue
pub fn should_stop(signals: &[TaskSignal]) -> bool {
    signals.iter().any(|s| *s == TaskSignal::Stop)
        && !signals.iter().any(|s| *s == TaskSignal::Continue)
}

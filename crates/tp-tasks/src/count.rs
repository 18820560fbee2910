//! Event counting sink.

use tp_core::{ArrayFn, Column, Result, SinkTask, TaskSignal};

/// Counts selected events across the whole run.
///
/// The selection closure turns the input columns into a rank-1 bool
/// mask; every `true` row adds one to the counter. The task always
/// signals `Continue`.
pub struct CountTask {
    fcn: ArrayFn,
    name: Option<String>,
    counter: u64,
}

impl CountTask {
    /// Make a counter with the given selection closure.
    pub fn new(fcn: impl Fn(&[&Column]) -> Result<Column> + 'static) -> Self {
        CountTask { fcn: Box::new(fcn), name: None, counter: 0 }
    }

    /// Label used in the finalize report.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Events counted so far.
    pub fn total(&self) -> u64 {
        self.counter
    }
}

impl SinkTask for CountTask {
    fn initialize(&mut self) {
        self.counter = 0;
    }

    fn call(&mut self, inputs: &[&Column], _raw_id: &str) -> Result<TaskSignal> {
        let mask = (self.fcn)(inputs)?;
        let mask = mask.as_bool("counter mask")?;
        self.counter += mask.iter().filter(|v| **v == Some(true)).count() as u64;
        // TODO: optional min-entries threshold so the counter can stop
        // the loop early once it has seen enough events
        Ok(TaskSignal::Continue)
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(name) = &self.name {
            log::info!("Counter {name}: {}", self.counter);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass_through() -> CountTask {
        CountTask::new(|cols| Ok(cols[0].clone()))
    }

    #[test]
    fn counts_true_rows_only() {
        let mut task = pass_through();
        task.initialize();
        let mask = Column::Bool(vec![Some(true), Some(false), None, Some(true)]);
        let signal = task.call(&[&mask], "f0").unwrap();
        assert_eq!(signal, TaskSignal::Continue);
        assert_eq!(task.total(), 2);
    }

    #[test]
    fn count_accumulates_across_calls() {
        let mut task = pass_through();
        task.initialize();
        task.call(&[&Column::from(vec![true, true])], "f0").unwrap();
        task.call(&[&Column::from(vec![false, true])], "f1").unwrap();
        assert_eq!(task.total(), 3);
    }

    #[test]
    fn rejects_jagged_mask() {
        let mut task = CountTask::new(|cols| Ok(cols[0].clone()));
        task.initialize();
        let jagged = Column::from(vec![vec![1u32], vec![2]]);
        assert!(task.call(&[&jagged], "f0").is_err());
    }

    #[test]
    fn initialize_resets_between_runs() {
        let mut task = pass_through();
        task.initialize();
        task.call(&[&Column::from(vec![true])], "f0").unwrap();
        task.initialize();
        assert_eq!(task.total(), 0);
    }

    #[test]
    fn finalize_on_empty_is_graceful() {
        let mut task = pass_through().with_name("empty");
        task.initialize();
        task.finalize().expect("finalize must not fail on zero calls");
    }
}

//! Loop-level behavior of the pass engine: termination policy across
//! file sets, crop/mask interaction, and the empty-iterator surface.

use tp_core::{
    main_loop, Column, FileSet, InputSpec, MainLoopOptions, MemoryReader, PassError, PreReducer,
    Sink, SinkFn, SinkTask, TaskSignal,
};

fn reader_with_files(n: usize) -> MemoryReader {
    let mut reader = MemoryReader::new();
    for i in 0..n {
        reader.insert(format!("f{i}"), "/evt/energy", Column::from(vec![1.0, 2.0, 3.0, 4.0]));
    }
    reader
}

fn filesets(n: usize) -> Vec<FileSet> {
    (0..n)
        .map(|i| FileSet::new([("raw", format!("f{i}")), ("evt", format!("f{i}"))]))
        .collect()
}

fn energy_input() -> [InputSpec; 1] {
    [InputSpec::new("energy", "/evt/energy")]
}

#[test]
fn veto_forces_loop_to_continue() {
    let reader = reader_with_files(4);
    let mut done = SinkFn(|_: &[&Column], _: &str| Ok(TaskSignal::Stop));
    let mut veto = SinkFn(|_: &[&Column], _: &str| Ok(TaskSignal::Continue));
    let mut sinks = vec![Sink::new(["energy"], &mut done), Sink::new(["energy"], &mut veto)];
    let outcome = main_loop(
        &reader,
        &energy_input(),
        &[],
        &mut sinks,
        filesets(4),
        Default::default(),
    )
    .expect("loop failed");
    assert_eq!(outcome.filesets_processed, 4, "veto must keep the loop running");
    assert!(!outcome.stopped_early);
}

#[test]
fn all_no_opinion_runs_to_exhaustion() {
    let reader = reader_with_files(3);
    let mut a = SinkFn(|_: &[&Column], _: &str| Ok(TaskSignal::NoOpinion));
    let mut b = SinkFn(|_: &[&Column], _: &str| Ok(TaskSignal::NoOpinion));
    let mut sinks = vec![Sink::new(["energy"], &mut a), Sink::new(["energy"], &mut b)];
    let outcome = main_loop(
        &reader,
        &energy_input(),
        &[],
        &mut sinks,
        filesets(3),
        Default::default(),
    )
    .expect("loop failed");
    assert_eq!(outcome.filesets_processed, 3);
    assert!(!outcome.stopped_early);
}

#[test]
fn stop_without_veto_ends_immediately() {
    let reader = reader_with_files(5);
    let mut calls = 0usize;
    let mut satisfied = SinkFn(|_: &[&Column], _: &str| {
        calls += 1;
        // satisfied from the second file set on
        Ok(if calls >= 2 { TaskSignal::Stop } else { TaskSignal::Continue })
    });
    let mut bystander = SinkFn(|_: &[&Column], _: &str| Ok(TaskSignal::NoOpinion));
    let mut sinks =
        vec![Sink::new(["energy"], &mut satisfied), Sink::new(["energy"], &mut bystander)];
    let outcome = main_loop(
        &reader,
        &energy_input(),
        &[],
        &mut sinks,
        filesets(5),
        Default::default(),
    )
    .expect("loop failed");
    assert_eq!(outcome.filesets_processed, 2, "must stop right after the satisfying file set");
    assert!(outcome.stopped_early);
}

#[test]
fn crop_equalizes_misaligned_tiers() {
    let mut reader = MemoryReader::new();
    reader.insert("f0", "/dsp/trapEmax", Column::from(vec![1.0, 2.0, 3.0, 4.0, 5.0]));
    reader.insert("f0", "/evt/energy", Column::from(vec![1.0, 2.0, 3.0]));
    let inputs = [
        InputSpec::new("trap", "/dsp/trapEmax"),
        InputSpec::new("energy", "/evt/energy"),
    ];
    let mut lengths = Vec::new();
    let mut task = SinkFn(|cols: &[&Column], _: &str| {
        lengths.push((cols[0].len(), cols[1].len()));
        Ok(TaskSignal::NoOpinion)
    });
    let mut sinks = vec![Sink::new(["trap", "energy"], &mut task)];
    let fs = FileSet::new([("raw", "f0"), ("dsp", "f0"), ("evt", "f0")]);
    main_loop(
        &reader,
        &inputs,
        &[],
        &mut sinks,
        [fs],
        MainLoopOptions { pre_reducer: None, crop: true },
    )
    .expect("loop failed");
    assert_eq!(lengths, vec![(3, 3)]);
}

#[test]
fn crop_runs_before_mask() {
    // mask is derived from the cropped store, so its length matches
    let mut reader = MemoryReader::new();
    reader.insert("f0", "/dsp/trapEmax", Column::from(vec![1.0, 2.0, 3.0, 4.0]));
    reader.insert("f0", "/evt/keep", Column::from(vec![true, false]));
    let inputs = [
        InputSpec::new("trap", "/dsp/trapEmax"),
        InputSpec::new("keep", "/evt/keep"),
    ];
    let mut seen = Vec::new();
    let mut task = SinkFn(|cols: &[&Column], _: &str| {
        seen.push(cols[0].clone());
        Ok(TaskSignal::NoOpinion)
    });
    let mut sinks = vec![Sink::new(["trap"], &mut task)];
    let fs = FileSet::new([("raw", "f0"), ("dsp", "f0"), ("evt", "f0")]);
    let options = MainLoopOptions {
        pre_reducer: Some(PreReducer::new(["keep"], |cols| Ok(cols[0].clone()))),
        crop: true,
    };
    main_loop(&reader, &inputs, &[], &mut sinks, [fs], options).expect("loop failed");
    assert_eq!(seen, vec![Column::F64(vec![Some(1.0), None])]);
}

#[test]
fn lifecycle_hooks_run_once_around_the_loop() {
    struct Lifecycle {
        initialized: usize,
        called: usize,
        finalized: usize,
    }
    impl SinkTask for Lifecycle {
        fn initialize(&mut self) {
            self.initialized += 1;
        }
        fn call(&mut self, _: &[&Column], _: &str) -> tp_core::Result<TaskSignal> {
            self.called += 1;
            Ok(TaskSignal::NoOpinion)
        }
        fn finalize(&mut self) -> tp_core::Result<()> {
            self.finalized += 1;
            Ok(())
        }
    }

    let reader = reader_with_files(3);
    let mut task = Lifecycle { initialized: 0, called: 0, finalized: 0 };
    let mut sinks = vec![Sink::new(["energy"], &mut task)];
    main_loop(&reader, &energy_input(), &[], &mut sinks, filesets(3), Default::default())
        .expect("loop failed");
    drop(sinks);
    assert_eq!(task.initialized, 1);
    assert_eq!(task.called, 3);
    assert_eq!(task.finalized, 1);
}

#[test]
fn finalize_runs_on_empty_iterator() {
    struct Finalizer {
        finalized: bool,
    }
    impl SinkTask for Finalizer {
        fn call(&mut self, _: &[&Column], _: &str) -> tp_core::Result<TaskSignal> {
            Ok(TaskSignal::NoOpinion)
        }
        fn finalize(&mut self) -> tp_core::Result<()> {
            self.finalized = true;
            Ok(())
        }
    }

    let reader = reader_with_files(0);
    let mut task = Finalizer { finalized: false };
    let mut sinks = vec![Sink::new(["energy"], &mut task)];
    main_loop(&reader, &energy_input(), &[], &mut sinks, [], Default::default())
        .expect("no required task, empty iterator must be ok");
    drop(sinks);
    assert!(task.finalized, "finalize must run even with zero file sets");
}

#[test]
fn empty_iterator_with_required_task_is_an_error() {
    struct Needy;
    impl SinkTask for Needy {
        fn call(&mut self, _: &[&Column], _: &str) -> tp_core::Result<TaskSignal> {
            Ok(TaskSignal::Continue)
        }
        fn required(&self) -> bool {
            true
        }
    }

    let reader = reader_with_files(0);
    let mut task = Needy;
    let mut sinks = vec![Sink::new(["energy"], &mut task)];
    let err = main_loop(&reader, &energy_input(), &[], &mut sinks, [], Default::default())
        .unwrap_err();
    assert!(matches!(err, PassError::NoFileSets(1)), "got {err:?}");
}

#[test]
fn raw_id_reaches_sinks() {
    let reader = reader_with_files(2);
    let mut raws = Vec::new();
    let mut task = SinkFn(|_: &[&Column], raw: &str| {
        raws.push(raw.to_string());
        Ok(TaskSignal::NoOpinion)
    });
    let mut sinks = vec![Sink::new(["energy"], &mut task)];
    main_loop(&reader, &energy_input(), &[], &mut sinks, filesets(2), Default::default())
        .expect("loop failed");
    assert_eq!(raws, ["f0", "f1"]);
}

//! Full pipeline runs: real tasks wired into `main_loop` over an
//! in-memory tier reader.

use tp_core::{
    main_loop, Column, Derive, FileSet, InputSpec, MainLoopOptions, MemoryReader, PassError,
    PreReducer, Sink,
};
use tp_tasks::{CategoricalHistogramTask, ChannelMap, CountTask, HistogramTask};

fn reader_with_energy(files: &[(&str, Vec<f64>)]) -> MemoryReader {
    let mut reader = MemoryReader::new();
    for (file, energies) in files {
        reader.insert(*file, "/evt/energy", Column::from(energies.clone()));
    }
    reader
}

fn filesets(names: &[&str]) -> Vec<FileSet> {
    names.iter().map(|n| FileSet::new([("raw", *n), ("evt", *n)])).collect()
}

#[test]
fn count_task_sums_mask_hits_and_never_stops_early() {
    let reader = reader_with_energy(&[
        ("f0", vec![100.0, 2000.0, 50.0]),
        ("f1", vec![3000.0, 10.0]),
    ]);
    let inputs = [InputSpec::new("energy", "/evt/energy")];
    // derived mask: energy above 1 MeV
    let derives = [Derive::new(["energy"], "is_high", |cols| {
        let vals = cols[0].as_f64("energy")?;
        Ok(Column::Bool(vals.iter().map(|v| v.map(|x| x > 1000.0)).collect()))
    })];

    let mut count = CountTask::new(|cols| Ok(cols[0].clone())).with_name("high-energy");
    let mut sinks = vec![Sink::new(["is_high"], &mut count)];
    let outcome = main_loop(
        &reader,
        &inputs,
        &derives,
        &mut sinks,
        filesets(&["f0", "f1"]),
        Default::default(),
    )
    .expect("loop failed");
    drop(sinks);

    assert_eq!(outcome.filesets_processed, 2, "counter must not stop the loop early");
    assert!(!outcome.stopped_early);
    assert_eq!(count.total(), 2, "one hit in f0, one in f1");
}

#[test]
fn histogram_threshold_stops_after_third_fileset() {
    // 4 entries per file set, threshold 10: 4, 8, 12 -> stop after #3
    let files: Vec<(&str, Vec<f64>)> = ["f0", "f1", "f2", "f3", "f4"]
        .iter()
        .map(|n| (*n, vec![1.0, 2.0, 3.0, 4.0]))
        .collect();
    let reader = reader_with_energy(&files);
    let inputs = [InputSpec::new("energy", "/evt/energy")];

    let mut hist = HistogramTask::new(0.0, 5.0, 5).with_min_entries(10);
    let mut sinks = vec![Sink::new(["energy"], &mut hist)];
    let outcome = main_loop(
        &reader,
        &inputs,
        &[],
        &mut sinks,
        filesets(&["f0", "f1", "f2", "f3", "f4"]),
        Default::default(),
    )
    .expect("loop failed");
    drop(sinks);

    assert_eq!(outcome.filesets_processed, 3, "12 >= 10 after the third file set");
    assert!(outcome.stopped_early);
    assert_eq!(hist.entries(), 12);
    let snap = hist.snapshot();
    assert_eq!(snap.counts, vec![0, 3, 3, 3, 3]);
}

#[test]
fn masking_flows_through_to_tasks() {
    let mut reader = reader_with_energy(&[("f0", vec![1.0, 2.0, 3.0])]);
    reader.insert("f0", "/evt/is_good", Column::from(vec![true, false, true]));
    let inputs = [
        InputSpec::new("energy", "/evt/energy"),
        InputSpec::new("good", "/evt/is_good"),
    ];
    let options = MainLoopOptions {
        pre_reducer: Some(PreReducer::new(["good"], |cols| Ok(cols[0].clone()))),
        crop: false,
    };

    let mut hist = HistogramTask::new(0.0, 5.0, 5);
    let mut sinks = vec![Sink::new(["energy"], &mut hist)];
    main_loop(&reader, &inputs, &[], &mut sinks, filesets(&["f0"]), options)
        .expect("loop failed");
    drop(sinks);

    assert_eq!(hist.entries(), 2, "masked row must not be filled");
    assert_eq!(hist.snapshot().counts, vec![0, 1, 0, 1, 0]);
}

#[test]
fn empty_iterator_with_required_histogram_fails_after_graceful_finalize() {
    let reader = MemoryReader::new();
    let inputs = [InputSpec::new("energy", "/evt/energy")];
    let mut hist = HistogramTask::new(0.0, 5.0, 5).with_min_entries(10);
    let mut sinks = vec![Sink::new(["energy"], &mut hist)];
    let err = main_loop(&reader, &inputs, &[], &mut sinks, [], Default::default())
        .unwrap_err();
    assert!(matches!(err, PassError::NoFileSets(1)), "got {err:?}");
}

#[test]
fn categorical_histogram_over_rawids_with_channelmap_keymap() {
    let mut reader = MemoryReader::new();
    reader.insert("f0", "/evt/rawid", Column::from(vec![1104000u32, 1104001, 1104000]));
    let inputs = [InputSpec::new("rawid", "/evt/rawid")];

    let channelmap = ChannelMap::new([("V01234A", 1104000u32), ("B00012B", 1104001)]);
    let mut cats = CategoricalHistogramTask::new(|cols| Ok(cols[0].clone())).with_keymap(
        move |raw| match raw.parse::<u32>() {
            Ok(id) => channelmap
                .key_for_rawid(id)
                .map(str::to_string)
                .unwrap_or_else(|_| raw.to_string()),
            Err(_) => raw.to_string(),
        },
    );
    let mut sinks = vec![Sink::new(["rawid"], &mut cats)];
    main_loop(&reader, &inputs, &[], &mut sinks, filesets(&["f0"]), Default::default())
        .expect("loop failed");
    drop(sinks);

    assert_eq!(cats.count_of("V01234A"), 2);
    assert_eq!(cats.count_of("B00012B"), 1);
}

#[test]
fn snapshot_serializes_to_json() {
    let hist = HistogramTask::new(0.0, 2.0, 2).with_label("energy");
    let json = serde_json::to_value(hist.snapshot()).expect("snapshot must serialize");
    assert_eq!(json["label"], "energy");
    assert_eq!(json["bin_edges"], serde_json::json!([0.0, 1.0, 2.0]));
    assert_eq!(json["entries"], 0);
}

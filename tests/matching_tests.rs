//! End-to-end matching runs over real containers on disk.

use std::fs;
use std::io::Write;

use evmatch_core::config::MatchConfig;
use evmatch_core::schema::{Field, ScalarKind};
use evmatch_core::summary::RunSummary;
use evmatch_engine::Engine;
use evmatch_io::chunk::{build_chunk, Column};
use evmatch_io::container;
use evmatch_io::FsStorage;

fn temp_dir(tag: &str) -> String {
    let dir = std::env::temp_dir().join(format!("evmatch_{}_{}", tag, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create temp dir");
    dir.to_string_lossy().into_owned()
}

/// Chunk with run/event keys plus a variable-length jet array.
fn write_jet_chunk(storage: &FsStorage, path: &str, keys: &[(u32, u64)], jets: &[Vec<f32>]) {
    assert_eq!(keys.len(), jets.len());
    let fields = vec![
        Field::singleton("run", ScalarKind::UInt32),
        Field::singleton("event", ScalarKind::UInt64),
        Field::singleton("nJet", ScalarKind::Int32),
        Field::array("Jet_pt", ScalarKind::Float32, "nJet"),
    ];
    let columns = vec![
        Column::new("run", keys.iter().map(|k| k.0).collect::<Vec<u32>>()),
        Column::new("event", keys.iter().map(|k| k.1).collect::<Vec<u64>>()),
        Column::new(
            "nJet",
            jets.iter().map(|j| j.len() as i32).collect::<Vec<i32>>(),
        ),
        Column::new(
            "Jet_pt",
            jets.iter().flatten().copied().collect::<Vec<f32>>(),
        ),
    ];
    let (schema, data) = build_chunk(fields, columns).expect("build jet chunk");
    container::write(storage, path, &schema, &data).expect("write jet chunk");
}

/// Chunk with run/event keys plus a singleton met value.
fn write_met_chunk(storage: &FsStorage, path: &str, keys: &[(u32, u64)], met: &[f32]) {
    assert_eq!(keys.len(), met.len());
    let fields = vec![
        Field::singleton("run", ScalarKind::UInt32),
        Field::singleton("event", ScalarKind::UInt64),
        Field::singleton("met", ScalarKind::Float32),
    ];
    let columns = vec![
        Column::new("run", keys.iter().map(|k| k.0).collect::<Vec<u32>>()),
        Column::new("event", keys.iter().map(|k| k.1).collect::<Vec<u64>>()),
        Column::new("met", met.to_vec()),
    ];
    let (schema, data) = build_chunk(fields, columns).expect("build met chunk");
    container::write(storage, path, &schema, &data).expect("write met chunk");
}

fn write_filelist(dir: &str, name: &str, paths: &[String]) -> String {
    let list = format!("{dir}/{name}");
    let mut f = fs::File::create(&list).expect("create filelist");
    for p in paths {
        writeln!(f, "{p}").expect("write filelist line");
    }
    list
}

fn config(dir: &str, filelist_a: String, filelist_b: String) -> MatchConfig {
    MatchConfig {
        filelist_a,
        filelist_b,
        prefix_a: "AlCa.".to_string(),
        prefix_b: "ZB.".to_string(),
        out_dir: format!("{dir}/out"),
        out_prefix: "merge".to_string(),
        verbose: 0,
        ..MatchConfig::default()
    }
}

#[test]
fn matches_across_chunks_and_grows_arrays() {
    let dir = temp_dir("match_grow");
    let storage = FsStorage::new();

    // Dataset A: 3 records over 2 chunks; jet multiplicity grows from 1
    // in the first chunk to 2 in the second.
    let a1 = format!("{dir}/a1.evc");
    let a2 = format!("{dir}/a2.evc");
    write_jet_chunk(&storage, &a1, &[(1, 100)], &[vec![10.0]]);
    write_jet_chunk(
        &storage,
        &a2,
        &[(1, 101), (1, 102)],
        &[vec![20.0, 21.0], vec![]],
    );

    // Dataset B: 3 records, two of which match. Equal totals index A.
    let b1 = format!("{dir}/b1.evc");
    write_met_chunk(&storage, &b1, &[(1, 100), (1, 101), (1, 999)], &[7.0, 8.0, 9.0]);

    let la = write_filelist(&dir, "a.txt", &[a1, a2]);
    let lb = write_filelist(&dir, "b.txt", &[b1]);
    let cfg = config(&dir, la, lb);

    let summary = Engine::new(cfg).run().expect("run");
    assert_eq!(summary.total_a, 3);
    assert_eq!(summary.total_b, 3);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.segments_written, 1);

    let (schema, data) = container::read(&storage, &format!("{dir}/out/merge_1.evc")).expect("read merged");
    assert_eq!(data.n_records, 2);

    // Driving side first, then the indexed side, in source field order.
    let names: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "ZB.run",
            "ZB.event",
            "ZB.met",
            "AlCa.run",
            "AlCa.event",
            "nAlCa.Jet",
            "AlCa.Jet_pt",
        ]
    );

    let events = data.column("ZB.event").expect("ZB.event");
    assert_eq!(events.get_u64(0), Some(100));
    assert_eq!(events.get_u64(1), Some(101));

    let met = data.column("ZB.met").expect("ZB.met");
    assert_eq!(met.get_f64(1), Some(8.0));

    let counts = data.column("nAlCa.Jet").expect("nAlCa.Jet");
    assert_eq!(counts.get_u32(0), Some(1));
    assert_eq!(counts.get_u32(1), Some(2));

    let pts = data.column("AlCa.Jet_pt").expect("AlCa.Jet_pt");
    assert_eq!(pts.len(), 3);
    assert_eq!(pts.get_f64(0), Some(10.0));
    assert_eq!(pts.get_f64(1), Some(20.0));
    assert_eq!(pts.get_f64(2), Some(21.0));

    // The crossed-chunk resync widened the counter's declared bound.
    assert_eq!(schema.counter_max.get("nAlCa.Jet"), Some(&2));
}

#[test]
fn writes_machine_readable_summary() {
    let dir = temp_dir("match_summary");
    let storage = FsStorage::new();

    let a1 = format!("{dir}/a1.evc");
    write_jet_chunk(&storage, &a1, &[(2, 7)], &[vec![1.5]]);
    let b1 = format!("{dir}/b1.evc");
    write_met_chunk(&storage, &b1, &[(2, 7), (2, 8)], &[3.0, 4.0]);

    let la = write_filelist(&dir, "a.txt", &[a1]);
    let lb = write_filelist(&dir, "b.txt", &[b1]);
    let cfg = config(&dir, la, lb);

    let summary = Engine::new(cfg).run().expect("run");

    let bytes = fs::read(format!("{dir}/out/merge_summary.json")).expect("summary file");
    let on_disk: RunSummary = serde_json::from_slice(&bytes).expect("parse summary");
    assert_eq!(on_disk.matched, summary.matched);
    assert_eq!(on_disk.matched, 1);
    assert_eq!(on_disk.processed, 2);
    assert_eq!(on_disk.segments_written, 1);
    assert!(on_disk.finished_ms >= on_disk.started_ms);
}

#[test]
fn larger_dataset_drives_with_its_own_prefix() {
    let dir = temp_dir("match_roles");
    let storage = FsStorage::new();

    // A is larger, so it drives and B gets indexed; prefixes follow roles.
    let a1 = format!("{dir}/a1.evc");
    write_met_chunk(
        &storage,
        &a1,
        &[(5, 1), (5, 2), (5, 3), (5, 4)],
        &[1.0, 2.0, 3.0, 4.0],
    );
    let b1 = format!("{dir}/b1.evc");
    write_jet_chunk(&storage, &b1, &[(5, 2), (5, 4)], &[vec![9.0], vec![8.0]]);

    let la = write_filelist(&dir, "a.txt", &[a1]);
    let lb = write_filelist(&dir, "b.txt", &[b1]);
    let cfg = config(&dir, la, lb);

    let summary = Engine::new(cfg).run().expect("run");
    assert_eq!(summary.processed, 4);
    assert_eq!(summary.matched, 2);

    let (schema, data) = container::read(&storage, &format!("{dir}/out/merge_1.evc")).expect("read merged");
    let names: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "AlCa.run",
            "AlCa.event",
            "AlCa.met",
            "ZB.run",
            "ZB.event",
            "nZB.Jet",
            "ZB.Jet_pt",
        ]
    );

    let events = data.column("AlCa.event").expect("AlCa.event");
    assert_eq!(events.get_u64(0), Some(2));
    assert_eq!(events.get_u64(1), Some(4));
}

#[test]
fn duplicate_indexed_keys_resolve_to_one_match() {
    let dir = temp_dir("match_dupes");
    let storage = FsStorage::new();

    let a1 = format!("{dir}/a1.evc");
    write_jet_chunk(&storage, &a1, &[(3, 5), (3, 5)], &[vec![1.0], vec![2.0]]);
    let b1 = format!("{dir}/b1.evc");
    write_met_chunk(&storage, &b1, &[(3, 5), (3, 6), (3, 7)], &[0.5, 0.6, 0.7]);

    let la = write_filelist(&dir, "a.txt", &[a1]);
    let lb = write_filelist(&dir, "b.txt", &[b1]);
    let cfg = config(&dir, la, lb);

    let summary = Engine::new(cfg).run().expect("run");
    assert_eq!(summary.matched, 1);

    let (_, data) = container::read(&storage, &format!("{dir}/out/merge_1.evc")).expect("read merged");
    assert_eq!(data.n_records, 1);
    let pts = data.column("AlCa.Jet_pt").expect("AlCa.Jet_pt");
    assert_eq!(pts.len(), 1);
}

#[test]
fn no_matches_writes_no_segments() {
    let dir = temp_dir("match_none");
    let storage = FsStorage::new();

    let a1 = format!("{dir}/a1.evc");
    write_jet_chunk(&storage, &a1, &[(1, 1)], &[vec![5.0]]);
    let b1 = format!("{dir}/b1.evc");
    write_met_chunk(&storage, &b1, &[(2, 2), (2, 3)], &[1.0, 2.0]);

    let la = write_filelist(&dir, "a.txt", &[a1]);
    let lb = write_filelist(&dir, "b.txt", &[b1]);
    let cfg = config(&dir, la, lb);

    let summary = Engine::new(cfg).run().expect("run");
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.matched, 0);
    assert_eq!(summary.segments_written, 0);
    assert!(!std::path::Path::new(&format!("{dir}/out/merge_1.evc")).exists());
}

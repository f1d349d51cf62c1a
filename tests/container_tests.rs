//! Container format round trips and corruption detection.

use std::fs;

use evmatch_core::schema::{Field, ScalarKind};
use evmatch_io::chunk::{build_chunk, Column};
use evmatch_io::container;
use evmatch_io::{Error, FsStorage};

fn temp_dir(tag: &str) -> String {
    let dir = std::env::temp_dir().join(format!("evmatch_{}_{}", tag, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create temp dir");
    dir.to_string_lossy().into_owned()
}

fn jet_fields() -> Vec<Field> {
    vec![
        Field::singleton("run", ScalarKind::UInt32),
        Field::singleton("event", ScalarKind::UInt64),
        Field::singleton("nJet", ScalarKind::Int32),
        Field::array("Jet_pt", ScalarKind::Float32, "nJet"),
    ]
}

fn jet_columns() -> Vec<Column> {
    vec![
        Column::new("run", vec![1u32, 1]),
        Column::new("event", vec![100u64, 101]),
        Column::new("nJet", vec![2i32, 1]),
        Column::new("Jet_pt", vec![30.5f32, 21.0, 45.25]),
    ]
}

#[test]
fn round_trips_schema_and_payload() {
    let dir = temp_dir("container_roundtrip");
    let storage = FsStorage::new();
    let path = format!("{dir}/chunk.evc");

    let (schema, data) = build_chunk(jet_fields(), jet_columns()).expect("build chunk");
    container::write(&storage, &path, &schema, &data).expect("write");

    let header = container::read_header(&storage, &path).expect("read header");
    assert_eq!(header.n_records, 2);

    let (read_schema, read_data) = container::read(&storage, &path).expect("read");
    assert_eq!(read_schema, schema);
    assert_eq!(read_data.n_records, 2);

    let pt = read_data.column("Jet_pt").expect("Jet_pt column");
    assert_eq!(pt.len(), 3);
    assert_eq!(pt.get_f64(2), Some(45.25));
    assert_eq!(read_schema.counter_max.get("nJet"), Some(&2));
}

#[test]
fn detects_payload_corruption() {
    let dir = temp_dir("container_corrupt");
    let storage = FsStorage::new();
    let path = format!("{dir}/chunk.evc");

    let (schema, data) = build_chunk(jet_fields(), jet_columns()).expect("build chunk");
    container::write(&storage, &path, &schema, &data).expect("write");

    let mut bytes = fs::read(&path).expect("read back");
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    fs::write(&path, &bytes).expect("rewrite");

    let err = container::read(&storage, &path).expect_err("corrupt read must fail");
    assert!(matches!(err, Error::ChecksumMismatch(_)));
}

#[test]
fn rejects_wrong_magic() {
    let dir = temp_dir("container_magic");
    let storage = FsStorage::new();
    let path = format!("{dir}/chunk.evc");

    let (schema, data) = build_chunk(jet_fields(), jet_columns()).expect("build chunk");
    container::write(&storage, &path, &schema, &data).expect("write");

    let mut bytes = fs::read(&path).expect("read back");
    bytes[0] = b'X';
    fs::write(&path, &bytes).expect("rewrite");

    let err = container::read_header(&storage, &path).expect_err("bad magic must fail");
    assert!(matches!(err, Error::BadContainer { .. }));
}

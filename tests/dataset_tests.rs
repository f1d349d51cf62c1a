//! Dataset cursors: ordinal mapping and chunk-generation tracking.

use std::fs;
use std::io::Write;
use std::sync::Arc;

use evmatch_core::schema::{Field, ScalarKind};
use evmatch_io::chunk::{build_chunk, Column};
use evmatch_io::container;
use evmatch_io::{Dataset, DatasetCursor, Error, FsStorage};

fn temp_dir(tag: &str) -> String {
    let dir = std::env::temp_dir().join(format!("evmatch_{}_{}", tag, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create temp dir");
    dir.to_string_lossy().into_owned()
}

fn write_chunk(storage: &FsStorage, path: &str, first_event: u64, n: usize) {
    let fields = vec![
        Field::singleton("run", ScalarKind::UInt32),
        Field::singleton("event", ScalarKind::UInt64),
    ];
    let columns = vec![
        Column::new("run", vec![1u32; n]),
        Column::new(
            "event",
            (first_event..first_event + n as u64).collect::<Vec<u64>>(),
        ),
    ];
    let (schema, data) = build_chunk(fields, columns).expect("build chunk");
    container::write(storage, path, &schema, &data).expect("write chunk");
}

fn two_chunk_cursor(dir: &str) -> DatasetCursor {
    let storage = FsStorage::new();
    let c0 = format!("{dir}/c0.evc");
    let c1 = format!("{dir}/c1.evc");
    write_chunk(&storage, &c0, 0, 2);
    write_chunk(&storage, &c1, 2, 3);

    let list = format!("{dir}/list.txt");
    let mut f = fs::File::create(&list).expect("create filelist");
    writeln!(f, "{c0}").expect("write line");
    writeln!(f, "{c1}").expect("write line");

    let dataset = Dataset::open(&storage, "ds", &list).expect("open dataset");
    DatasetCursor::new(Arc::new(storage), dataset)
}

#[test]
fn generation_bumps_exactly_on_chunk_switches() {
    let dir = temp_dir("cursor_gen");
    let mut cursor = two_chunk_cursor(&dir);
    assert_eq!(cursor.generation(), 0);

    cursor.seek_chunk(0).expect("seek chunk 0");
    assert_eq!(cursor.generation(), 1);

    // Same chunk again, by index and by ordinal: no bump.
    cursor.seek_chunk(0).expect("seek chunk 0 again");
    assert_eq!(cursor.generation(), 1);
    assert_eq!(cursor.seek_ordinal(1).expect("ordinal 1"), 1);
    assert_eq!(cursor.generation(), 1);

    // Crossing into chunk 1 bumps once.
    assert_eq!(cursor.seek_ordinal(2).expect("ordinal 2"), 0);
    assert_eq!(cursor.generation(), 2);
    assert_eq!(cursor.seek_ordinal(4).expect("ordinal 4"), 2);
    assert_eq!(cursor.generation(), 2);

    // Returning to an earlier chunk is a switch like any other.
    cursor.seek_chunk(0).expect("seek back to chunk 0");
    assert_eq!(cursor.generation(), 3);
}

#[test]
fn ordinal_past_the_dataset_is_rejected() {
    let dir = temp_dir("cursor_range");
    let mut cursor = two_chunk_cursor(&dir);
    assert_eq!(cursor.dataset().total_records(), 5);

    let err = cursor.seek_ordinal(5).expect_err("past-end ordinal");
    assert!(matches!(err, Error::OrdinalOutOfRange { ordinal: 5, total: 5 }));
}

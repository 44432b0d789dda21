use super::*;
use crate::CheckpointError;

fn store_in(dir: &tempfile::TempDir) -> CheckpointStore {
    CheckpointStore::open(dir.path().join("slave.info")).unwrap()
}

#[test]
fn load_should_reject_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    assert!(matches!(store.load(), Err(CheckpointError::Empty)));
}

#[test]
fn flush_then_load_should_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let checkpoint = Checkpoint {
        source_name: "binlog.000042".to_string(),
        offset: 987654,
    };
    store.flush(&checkpoint).unwrap();

    assert_eq!(store.load().unwrap(), checkpoint);
}

#[test]
fn flush_shorter_record_should_leave_no_residual_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slave.info");
    let store = CheckpointStore::open(&path).unwrap();

    for record in ["a,1", "ab,22", "a,1"] {
        let checkpoint = Checkpoint::parse(record.as_bytes()).unwrap();
        store.flush(&checkpoint).unwrap();
    }

    let loaded = store.load().unwrap();
    assert_eq!(loaded.source_name, "a");
    assert_eq!(loaded.offset, 1);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 3);
}

#[test]
fn parse_should_reject_missing_source_segment() {
    assert!(matches!(
        Checkpoint::parse(b",123"),
        Err(CheckpointError::Malformed)
    ));
}

#[test]
fn parse_should_default_offset_without_comma() {
    let checkpoint = Checkpoint::parse(b"binlog.000001").unwrap();

    assert_eq!(checkpoint.source_name, "binlog.000001");
    assert_eq!(checkpoint.offset, 0);
}

#[test]
fn parse_should_ignore_trailing_garbage_in_offset() {
    let checkpoint = Checkpoint::parse(b"binlog.000001,123abc").unwrap();

    assert_eq!(checkpoint.offset, 123);
}

#[test]
fn parse_should_tolerate_operator_seeded_newline() {
    let checkpoint = Checkpoint::parse(b"binlog.000001,77\n").unwrap();

    assert_eq!(checkpoint.source_name, "binlog.000001");
    assert_eq!(checkpoint.offset, 77);
}

#[test]
fn parse_should_truncate_oversized_source_name() {
    let long_name = "x".repeat(crate::constants::SOURCE_NAME_MAX + 10);
    let record = format!("{long_name},5");

    let checkpoint = Checkpoint::parse(record.as_bytes()).unwrap();

    assert_eq!(checkpoint.source_name.len(), crate::constants::SOURCE_NAME_MAX);
    assert_eq!(checkpoint.offset, 5);
}

#[test]
fn load_should_work_repeatedly_on_the_same_handle() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let checkpoint = Checkpoint {
        source_name: "f".to_string(),
        offset: 10,
    };
    store.flush(&checkpoint).unwrap();

    assert_eq!(store.load().unwrap(), checkpoint);
    assert_eq!(store.load().unwrap(), checkpoint);
}

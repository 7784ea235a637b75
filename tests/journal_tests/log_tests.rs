//! Log Writer/Reader Tests
//!
//! Tests verify:
//! - Header and sequential LSNs
//! - Reading back what was written
//! - Torn tail detection
//! - Resuming a log after replay

use std::fs::OpenOptions;
use std::path::PathBuf;

use bytes::Bytes;
use emberkv::config::WalSyncStrategy;
use emberkv::journal::{LogReader, LogWriter, Operation, ReadEntry, LOG_HEADER_SIZE};
use emberkv::EmberError;
use tempfile::TempDir;

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("journal_000001.log");
    (temp_dir, path)
}

fn set(i: usize) -> Operation {
    Operation::Set {
        key: format!("key{}", i),
        value: Bytes::from(format!("value{}", i)),
    }
}

// =============================================================================
// Writer
// =============================================================================

#[test]
fn test_create_writes_header() {
    let (_temp, path) = setup_temp_log();
    let writer = LogWriter::create(&path, 1, WalSyncStrategy::EveryWrite).unwrap();

    assert_eq!(writer.next_lsn(), 1);
    assert_eq!(writer.generation(), 1);
    assert_eq!(
        std::fs::metadata(&path).unwrap().len(),
        LOG_HEADER_SIZE as u64
    );

    let reader = LogReader::open(&path).unwrap().unwrap();
    assert_eq!(reader.generation(), 1);
}

#[test]
fn test_append_assigns_sequential_lsns() {
    let (_temp, path) = setup_temp_log();
    let mut writer = LogWriter::create(&path, 1, WalSyncStrategy::EveryWrite).unwrap();

    for expected in 1..=5 {
        assert_eq!(writer.append(&set(expected as usize)).unwrap(), expected);
    }
    assert_eq!(writer.next_lsn(), 6);
    assert!(!writer.is_failed());
}

#[test]
fn test_read_back_in_order() {
    let (_temp, path) = setup_temp_log();
    let mut writer = LogWriter::create(&path, 1, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..10 {
        writer.append(&set(i)).unwrap();
    }
    drop(writer);

    let entries = LogReader::open(&path).unwrap().unwrap().read_all().unwrap();
    assert_eq!(entries.len(), 10);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.lsn, i as u64 + 1);
        assert_eq!(entry.operation, set(i));
    }
}

#[test]
fn test_batched_sync_strategy() {
    let (_temp, path) = setup_temp_log();
    let mut writer =
        LogWriter::create(&path, 1, WalSyncStrategy::EveryNEntries { count: 4 }).unwrap();
    for i in 0..6 {
        writer.append(&set(i)).unwrap();
    }
    writer.sync().unwrap();

    let entries = LogReader::open(&path).unwrap().unwrap().read_all().unwrap();
    assert_eq!(entries.len(), 6);
}

// =============================================================================
// Reader
// =============================================================================

#[test]
fn test_empty_log_reads_end() {
    let (_temp, path) = setup_temp_log();
    LogWriter::create(&path, 3, WalSyncStrategy::EveryWrite).unwrap();

    let mut reader = LogReader::open(&path).unwrap().unwrap();
    assert_eq!(reader.read_next().unwrap(), ReadEntry::End);
    assert_eq!(reader.position(), LOG_HEADER_SIZE as u64);
}

#[test]
fn test_torn_header_reported_as_none() {
    let (_temp, path) = setup_temp_log();
    std::fs::write(&path, b"EKV").unwrap();

    assert!(LogReader::open(&path).unwrap().is_none());
}

#[test]
fn test_bad_magic_is_corruption() {
    let (_temp, path) = setup_temp_log();
    std::fs::write(&path, [0u8; LOG_HEADER_SIZE]).unwrap();

    assert!(matches!(
        LogReader::open(&path),
        Err(EmberError::Corruption(_))
    ));
}

#[test]
fn test_torn_tail_detected() {
    let (_temp, path) = setup_temp_log();
    let mut writer = LogWriter::create(&path, 1, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(&set(1)).unwrap();
    writer.append(&set(2)).unwrap();
    drop(writer);

    let full_len = std::fs::metadata(&path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(full_len - 3).unwrap();
    drop(file);

    let mut reader = LogReader::open(&path).unwrap().unwrap();
    assert!(matches!(reader.read_next().unwrap(), ReadEntry::Entry(_)));
    let good_len = reader.position();
    assert_eq!(
        reader.read_next().unwrap(),
        ReadEntry::TornTail { offset: good_len }
    );

    let reader = LogReader::open(&path).unwrap().unwrap();
    assert!(matches!(reader.read_all(), Err(EmberError::Corruption(_))));
}

#[test]
fn test_checksum_mismatch_is_corruption() {
    let (_temp, path) = setup_temp_log();
    let mut writer = LogWriter::create(&path, 1, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(&set(1)).unwrap();
    drop(writer);

    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&path, bytes).unwrap();

    let mut reader = LogReader::open(&path).unwrap().unwrap();
    assert!(matches!(reader.read_next(), Err(EmberError::Corruption(_))));
}

// =============================================================================
// Resume
// =============================================================================

#[test]
fn test_resume_cuts_torn_tail_and_continues() {
    let (_temp, path) = setup_temp_log();
    let mut writer = LogWriter::create(&path, 1, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(&set(1)).unwrap();
    drop(writer);

    let valid_len = std::fs::metadata(&path).unwrap().len();
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    std::io::Write::write_all(&mut file, &[0xAB; 5]).unwrap();
    drop(file);

    let mut writer =
        LogWriter::resume(&path, 1, 2, valid_len, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.append(&set(2)).unwrap(), 2);
    drop(writer);

    let entries = LogReader::open(&path).unwrap().unwrap().read_all().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].operation, set(2));
}

#[test]
fn test_resume_missing_file_creates_it() {
    let (_temp, path) = setup_temp_log();
    let mut writer = LogWriter::resume(&path, 4, 1, 0, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(&set(0)).unwrap();
    drop(writer);

    let reader = LogReader::open(&path).unwrap().unwrap();
    assert_eq!(reader.generation(), 4);
    assert_eq!(reader.read_all().unwrap().len(), 1);
}

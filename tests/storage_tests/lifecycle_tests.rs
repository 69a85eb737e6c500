//! Tests for close semantics
//!
//! These tests verify:
//! - Reads after close fail with `Closed`, never a raw access error
//! - Close is idempotent and safe to race from many threads
//! - Cursors created before close report `Closed` when advanced after it
//! - Slices handed out before close stay readable
//! - Real corruption is still reported as corruption while open

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use genkv::storage::files;
use genkv::{GenKvError, Storage};

use super::common::{bound, entries, numbered, setup_temp_storage};

fn loaded_with(count: usize) -> (tempfile::TempDir, Storage) {
    let (temp, config) = setup_temp_storage();
    Storage::load(&config).unwrap().save(&numbered(count, "v")).unwrap();
    let storage = Storage::load(&config).unwrap();
    (temp, storage)
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_get_after_close_is_closed_error() {
    let (_temp, storage) = loaded_with(10);

    storage.close();

    assert!(storage.is_closed());
    assert!(matches!(storage.get(b"key00001"), Err(GenKvError::Closed)));
}

#[test]
fn test_iterate_after_close_is_closed_error() {
    let (_temp, storage) = loaded_with(10);

    storage.close();

    assert!(matches!(storage.iterate(None, None), Err(GenKvError::Closed)));
    assert!(matches!(storage.range(bound("a"), None), Err(GenKvError::Closed)));
    assert!(matches!(storage.generations(), Err(GenKvError::Closed)));
}

#[test]
fn test_close_is_idempotent() {
    let (_temp, storage) = loaded_with(3);

    assert!(!storage.is_closed());
    storage.close();
    storage.close();
    storage.close();

    assert!(storage.is_closed());
}

#[test]
fn test_close_empty_storage() {
    let (_temp, config) = setup_temp_storage();
    let storage = Storage::load(&config).unwrap();

    storage.close();

    assert!(storage.is_closed());
    assert!(storage.get(b"k").unwrap_err().is_closed());
}

#[test]
fn test_metadata_survives_close() {
    let (_temp, storage) = loaded_with(3);

    storage.close();

    assert_eq!(storage.generation_count(), 1);
    assert!(storage.is_compacted());
}

// =============================================================================
// Cursor Lifecycle Tests
// =============================================================================

#[test]
fn test_cursor_advanced_after_close_reports_closed() {
    let (_temp, storage) = loaded_with(5);
    let mut cursor = storage.iterate(None, None).unwrap().remove(0);

    assert!(cursor.next().unwrap().is_ok());

    storage.close();

    assert!(cursor.next().unwrap().unwrap_err().is_closed());
    assert!(cursor.next().is_none());
}

#[test]
fn test_merged_range_after_close_reports_closed() {
    let (_temp, storage) = loaded_with(5);
    let mut range = storage.range(None, None).unwrap();

    // The merge pre-fetches one entry per generation
    assert!(range.next().unwrap().is_ok());

    storage.close();

    let rest: Vec<_> = range.collect();
    assert!(rest.iter().any(|r| matches!(r, Err(GenKvError::Closed))));
    assert!(rest.last().unwrap().is_err());
}

#[test]
fn test_cursor_outliving_storage_reports_closed() {
    let (_temp, storage) = loaded_with(5);
    let mut cursor = storage.iterate(None, None).unwrap().remove(0);

    drop(storage);

    assert!(cursor.next().unwrap().unwrap_err().is_closed());
}

#[test]
fn test_entries_read_before_close_stay_valid() {
    let (_temp, storage) = loaded_with(5);
    let entry = storage.get(b"key00003").unwrap().unwrap();

    storage.close();
    drop(storage);

    assert_eq!(entry.key(), b"key00003");
    assert_eq!(entry.value(), Some(&b"v3"[..]));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_readers() {
    let (_temp, storage) = loaded_with(1_000);
    let storage = Arc::new(storage);

    thread::scope(|s| {
        for t in 0..8 {
            let storage = Arc::clone(&storage);
            s.spawn(move || {
                for i in (t..1_000).step_by(8) {
                    let key = format!("key{:05}", i);
                    let entry = storage.get(key.as_bytes()).unwrap().unwrap();
                    assert_eq!(entry.value(), Some(format!("v{}", i).as_bytes()));
                }
            });
        }
    });
}

#[test]
fn test_close_racing_readers_and_closers() {
    let (_temp, storage) = loaded_with(500);
    let storage = Arc::new(storage);
    let barrier = Arc::new(Barrier::new(8));
    let closed_errors = Arc::new(AtomicUsize::new(0));

    thread::scope(|s| {
        for t in 0..6 {
            let storage = Arc::clone(&storage);
            let barrier = Arc::clone(&barrier);
            let closed_errors = Arc::clone(&closed_errors);
            s.spawn(move || {
                barrier.wait();
                for round in 0.. {
                    let i = (t * 37 + round * 11) % 500;
                    let key = format!("key{:05}", i);
                    match storage.get(key.as_bytes()) {
                        // Any answer served must still be the right one
                        Ok(Some(entry)) => {
                            assert_eq!(entry.value(), Some(format!("v{}", i).as_bytes()))
                        }
                        Ok(None) => panic!("key {} vanished", i),
                        Err(GenKvError::Closed) => {
                            closed_errors.fetch_add(1, Ordering::SeqCst);
                            break;
                        }
                        Err(e) => panic!("unexpected error: {}", e),
                    }
                }
            });
        }

        for _ in 0..2 {
            let storage = Arc::clone(&storage);
            let barrier = Arc::clone(&barrier);
            s.spawn(move || {
                barrier.wait();
                storage.close();
                storage.close();
            });
        }
    });

    assert!(storage.is_closed());
    assert_eq!(closed_errors.load(Ordering::SeqCst), 6);
}

// =============================================================================
// Error Classification Tests
// =============================================================================

#[test]
fn test_corruption_is_not_reported_as_closed() {
    let (_temp, config) = setup_temp_storage();
    Storage::load(&config)
        .unwrap()
        .save(&entries(&[("a", Some("1")), ("b", Some("2"))]))
        .unwrap();

    // Point entry 0 far past the end of the file
    let path = files::generation_path(&config.data_dir, 0);
    let mut bytes = std::fs::read(&path).unwrap();
    bytes[24..32].copy_from_slice(&1_000_000i64.to_ne_bytes());
    std::fs::write(&path, &bytes).unwrap();

    let storage = Storage::load(&config).unwrap();
    let err = storage.get(b"a").unwrap_err();

    assert!(matches!(err, GenKvError::Corruption(_)));
    assert!(!err.is_closed());
}

//! Thread-safety checks for the snapshot store under real contention.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{Duration, Utc};

use voidwatch::application::{PutRequest, SnapshotStore};
use voidwatch::domain::entry::SnapshotKind;
use voidwatch::domain::id::CacheKey;

const WRITERS: usize = 8;
const ENTRIES_PER_WRITER: usize = 25;

fn orders_put(key: &str, payload: String) -> PutRequest {
    PutRequest::new(
        CacheKey::new(key.to_string()),
        SnapshotKind::Orders,
        payload,
        Duration::hours(1),
    )
}

#[test]
fn parallel_writers_land_every_entry() {
    let store = Arc::new(SnapshotStore::new());
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..ENTRIES_PER_WRITER {
                    let key = format!("orders:w{writer}:{i}");
                    store.put(orders_put(&key, format!("payload-{writer}-{i}")), Utc::now());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), WRITERS * ENTRIES_PER_WRITER);
    assert_eq!(store.metrics().inserts as usize, WRITERS * ENTRIES_PER_WRITER);
    for entry in store.entries() {
        assert!(entry.verify_checksum(), "checksum broken for {}", entry.key);
    }
}

#[test]
fn readers_never_observe_torn_entries() {
    let store = Arc::new(SnapshotStore::new());
    let key = CacheKey::new("orders:10000002:34".to_string());
    store.put(orders_put(key.as_str(), "a".repeat(64)), Utc::now());

    let done = Arc::new(AtomicBool::new(false));
    let mut handles = Vec::new();

    for _ in 0..4 {
        let store = Arc::clone(&store);
        let key = key.clone();
        let done = Arc::clone(&done);
        handles.push(thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                let entry = store.get(&key, Utc::now()).expect("entry stays present");
                assert!(entry.verify_checksum());
                let all_a = entry.payload.len() == 64 && entry.payload.bytes().all(|b| b == b'a');
                let all_b = entry.payload.len() == 128 && entry.payload.bytes().all(|b| b == b'b');
                assert!(all_a || all_b, "torn payload: {} bytes", entry.payload.len());
            }
        }));
    }

    for round in 0..400 {
        let payload = if round % 2 == 0 {
            "b".repeat(128)
        } else {
            "a".repeat(64)
        };
        store.put(orders_put(key.as_str(), payload), Utc::now());
    }
    done.store(true, Ordering::Release);

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn refresh_claim_has_a_single_winner() {
    let store = Arc::new(SnapshotStore::new());
    let key = CacheKey::new("orders:10000002:34".to_string());
    store.put(orders_put(key.as_str(), "[]".to_string()), Utc::now());

    let later = Utc::now() + Duration::hours(2);
    let barrier = Arc::new(Barrier::new(WRITERS));
    let wins = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let store = Arc::clone(&store);
            let key = key.clone();
            let barrier = Arc::clone(&barrier);
            let wins = Arc::clone(&wins);
            thread::spawn(move || {
                barrier.wait();
                if store.try_begin_refresh(&key, later) {
                    wins.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(wins.load(Ordering::Relaxed), 1);
}

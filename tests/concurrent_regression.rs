//! Concurrent operation regression tests.
//!
//! These tests mix snapshots, range scans and inserts across threads to catch
//! lost keys, torn snapshots, and structural corruption.
//!
//! Run with: `cargo test --test concurrent_regression`
//! Run with release: `cargo test --test concurrent_regression --release`
//!
//! ## Tracing
//!
//! Enable tracing to debug race conditions:
//!
//! ```bash
//! # Console output only (debug level for snaptree crate)
//! RUST_LOG=snaptree=debug cargo test --test concurrent_regression --features tracing
//!
//! # Full trace to file, no console
//! RUST_LOG=trace SNAPTREE_LOG_CONSOLE=0 cargo test --features tracing
//! ```
//!
//! Logs are written to `logs/` directory (gitignored).

#![allow(clippy::pedantic)]
#![expect(clippy::unwrap_used)]

mod common;

use snaptree::ConcurrentBTree;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

// =============================================================================
// Snapshot Isolation Under Writes
// =============================================================================

#[test]
fn snapshot_is_frozen_while_writers_continue() {
    common::init_tracing();

    let tree = Arc::new(common::tree_with(3, 0..500));
    let snap = tree.snapshot();
    assert_eq!(snap.len(), 500);

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                for i in 0..1000u64 {
                    tree.insert(10_000 + i * 4 + t);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(snap.len(), 500);
    assert_eq!(snap.keys(), (0..500).collect::<Vec<_>>());
    assert!(!snap.search(&10_000));
    common::assert_invariants(&snap, "frozen snapshot");

    assert_eq!(tree.len(), 4500);
    common::assert_invariants(&tree, "live tree");
}

#[test]
fn snapshots_taken_during_writes_are_consistent() {
    common::init_tracing();

    const WRITERS: usize = 4;
    const KEYS_PER_WRITER: usize = 2000;

    let tree = Arc::new(ConcurrentBTree::<u64>::new(2));
    // Per-writer count of inserts that have returned.
    let committed: Arc<Vec<AtomicUsize>> =
        Arc::new((0..WRITERS).map(|_| AtomicUsize::new(0)).collect());
    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..WRITERS)
        .map(|t| {
            let tree = Arc::clone(&tree);
            let committed = Arc::clone(&committed);
            thread::spawn(move || {
                for i in 0..KEYS_PER_WRITER {
                    tree.insert((i * WRITERS + t) as u64);
                    committed[t].store(i + 1, Ordering::Release);
                }
            })
        })
        .collect();

    let snapshotter = {
        let tree = Arc::clone(&tree);
        let committed = Arc::clone(&committed);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut taken = 0usize;
            while !done.load(Ordering::Acquire) || taken == 0 {
                // Keys committed before the snapshot must be in it.
                let before: Vec<usize> =
                    committed.iter().map(|c| c.load(Ordering::Acquire)).collect();
                let snap = tree.snapshot();

                if let Err(violation) = snap.check_invariants() {
                    panic!("snapshot {taken}: {violation}");
                }
                for (t, &upto) in before.iter().enumerate() {
                    for i in 0..upto {
                        let key = (i * WRITERS + t) as u64;
                        assert!(snap.search(&key), "snapshot {taken} missing {key}");
                    }
                }
                assert_eq!(snap.keys().len(), snap.len());
                taken += 1;
            }
            taken
        })
    };

    for h in writers {
        h.join().unwrap();
    }
    done.store(true, Ordering::Release);
    assert!(snapshotter.join().unwrap() > 0);

    assert_eq!(tree.len(), WRITERS * KEYS_PER_WRITER);
    common::assert_invariants(&tree, "after snapshots");
}

#[test]
fn snapshot_and_source_diverge_independently() {
    let tree = Arc::new(common::tree_with(2, (0..200).map(|k| k * 2)));
    let snap = Arc::new(tree.snapshot());
    let barrier = Arc::new(Barrier::new(2));

    let live_writer = {
        let tree = Arc::clone(&tree);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for k in 0..200 {
                tree.insert(k * 2 + 1);
            }
        })
    };
    let snap_writer = {
        let snap = Arc::clone(&snap);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for k in 1000..1200 {
                snap.insert(k);
            }
        })
    };

    live_writer.join().unwrap();
    snap_writer.join().unwrap();

    assert_eq!(tree.keys(), (0..400).collect::<Vec<_>>());
    let expected: Vec<u64> = (0..200).map(|k| k * 2).chain(1000..1200).collect();
    assert_eq!(snap.keys(), expected);
    common::assert_invariants(&tree, "live");
    common::assert_invariants(&snap, "snapshot");
}

// =============================================================================
// Range Scans Under Writes
// =============================================================================

#[test]
fn bounded_range_sees_only_keys_in_bounds() {
    common::init_tracing();

    let tree = Arc::new(ConcurrentBTree::<u64>::new(3));
    let done = Arc::new(AtomicBool::new(false));

    let scanner = {
        let tree = Arc::clone(&tree);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                let got = tree.range_query(&1000, &2000);
                assert!(got.iter().all(|k| (1000..=2000).contains(k)));
                assert!(got.windows(2).all(|w| w[0] < w[1]));
            }
        })
    };

    let writers: Vec<_> = (0..4u64)
        .map(|t| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                for i in 0..1000u64 {
                    tree.insert(i * 4 + t);
                }
            })
        })
        .collect();

    for h in writers {
        h.join().unwrap();
    }
    done.store(true, Ordering::Release);
    scanner.join().unwrap();

    assert_eq!(
        tree.range_query(&1000, &2000),
        (1000..=2000).collect::<Vec<_>>()
    );
    common::assert_invariants(&tree, "bounded range");
}

// =============================================================================
// Root Replacement Races
// =============================================================================

#[test]
fn racing_root_splits_keep_every_key() {
    // Degree 2 with an empty start: the first few inserts race to split the root.
    for round in 0..200 {
        let tree = Arc::new(ConcurrentBTree::<u64>::new(2));
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let tree = Arc::clone(&tree);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..8u64 {
                        tree.insert(i * 4 + t);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let keys: HashSet<u64> = tree.keys().into_iter().collect();
        assert_eq!(keys.len(), 32, "round {round}");
        let stats = tree.check_invariants().unwrap();
        assert_eq!(tree.root_split_count(), stats.height - 1, "round {round}");
    }
}

#[test]
fn readers_survive_root_replacement() {
    let tree = Arc::new(ConcurrentBTree::<u64>::new(2));
    tree.insert(0);
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let tree = Arc::clone(&tree);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut misses = 0usize;
                while !done.load(Ordering::Acquire) {
                    if !tree.search(&0) {
                        misses += 1;
                    }
                    let _ = tree.first();
                    let _ = tree.height();
                }
                misses
            })
        })
        .collect();

    for k in 1..5000u64 {
        tree.insert(k);
    }
    done.store(true, Ordering::Release);

    for h in readers {
        // Key 0 was present before any reader started.
        assert_eq!(h.join().unwrap(), 0);
    }
    assert!(tree.search(&0));
    assert_eq!(tree.first(), Some(0));
    assert_eq!(tree.last(), Some(4999));
    common::assert_invariants(&tree, "after root churn");
}

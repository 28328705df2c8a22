//! Debug binary for concurrent workloads.
//!
//! Diagnoses hangs and lost keys under concurrent inserts, range scans and
//! snapshots. A watchdog reports any worker that stops making progress.
//!
//! Run with:
//! ```bash
//! cargo run --release
//! ```

#![allow(clippy::unwrap_used)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use snaptree::ConcurrentBTree;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Watchdog stall threshold.
const STALL_MS: u64 = 2000;

// =============================================================================
// Thread progress tracking for hang detection
// =============================================================================

struct ThreadProgress {
    /// Current operation index for each thread
    current_op: Vec<AtomicUsize>,
    /// Current key being processed by each thread
    current_key: Vec<AtomicU64>,
    /// Last time each thread made progress
    last_progress_ms: Vec<AtomicU64>,
    /// Whether each thread is done
    done: Vec<AtomicBool>,
    start: Instant,
}

impl ThreadProgress {
    fn new(num_threads: usize) -> Self {
        Self {
            current_op: (0..num_threads).map(|_| AtomicUsize::new(0)).collect(),
            current_key: (0..num_threads).map(|_| AtomicU64::new(0)).collect(),
            last_progress_ms: (0..num_threads).map(|_| AtomicU64::new(0)).collect(),
            done: (0..num_threads).map(|_| AtomicBool::new(false)).collect(),
            start: Instant::now(),
        }
    }

    fn update(&self, thread_id: usize, op: usize, key: u64) {
        self.current_op[thread_id].store(op, Ordering::Relaxed);
        self.current_key[thread_id].store(key, Ordering::Relaxed);
        self.last_progress_ms[thread_id]
            .store(self.start.elapsed().as_millis() as u64, Ordering::Relaxed);
    }

    fn mark_done(&self, thread_id: usize) {
        self.done[thread_id].store(true, Ordering::Relaxed);
    }

    fn report_stuck(&self, timeout_ms: u64) -> Vec<(usize, usize, u64, u64)> {
        let now_ms = self.start.elapsed().as_millis() as u64;

        (0..self.done.len())
            .filter(|&i| !self.done[i].load(Ordering::Relaxed))
            .filter_map(|i| {
                let last = self.last_progress_ms[i].load(Ordering::Relaxed);
                (now_ms.saturating_sub(last) > timeout_ms).then(|| {
                    (
                        i,
                        self.current_op[i].load(Ordering::Relaxed),
                        self.current_key[i].load(Ordering::Relaxed),
                        now_ms - last,
                    )
                })
            })
            .collect()
    }

    fn all_done(&self) -> bool {
        self.done.iter().all(|d| d.load(Ordering::Relaxed))
    }
}

/// Spawn a watchdog that reports stalled workers until `stop` is set.
fn spawn_watchdog(progress: Arc<ThreadProgress>, stop: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(500));
            for (tid, op, key, stall_ms) in progress.report_stuck(STALL_MS) {
                eprintln!("!!! STUCK: Thread {tid} at op {op} key={key} for {stall_ms}ms");
            }
            if progress.all_done() {
                break;
            }
        }
    })
}

/// Validate and report the final tree state.
fn report(label: &str, tree: &ConcurrentBTree<u64>, expected: usize, elapsed: Duration) {
    match tree.check_invariants() {
        Ok(stats) => println!(
            "{label} DONE: {expected} keys in {elapsed:?} ({:.0} ops/sec), len={}, height={}, leaves={}, splits={}",
            expected as f64 / elapsed.as_secs_f64(),
            tree.len(),
            stats.height,
            stats.leaves,
            tree.split_count()
        ),
        Err(violation) => println!("{label} INVARIANT VIOLATION: {violation}"),
    }

    if tree.len() != expected {
        println!("{label} KEY COUNT MISMATCH: len={} expected={expected}", tree.len());
    }
}

// =============================================================================
// Scenario 01: Concurrent Writes - Disjoint Ranges
// =============================================================================

fn run_01_disjoint_writes(threads: usize, ops_per_thread: usize, degree: usize) {
    println!("\n{}", "=".repeat(80));
    println!("01: DISJOINT WRITES ({threads} threads, {ops_per_thread} ops/thread, degree {degree})");
    println!("{}", "=".repeat(80));

    let tree = Arc::new(ConcurrentBTree::<u64>::new(degree));
    let progress = Arc::new(ThreadProgress::new(threads));
    let stop_watchdog = Arc::new(AtomicBool::new(false));
    let watchdog = spawn_watchdog(Arc::clone(&progress), Arc::clone(&stop_watchdog));

    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let tree = Arc::clone(&tree);
            let progress = Arc::clone(&progress);
            thread::spawn(move || {
                let base = t * ops_per_thread;

                for i in 0..ops_per_thread {
                    let key = (base + i) as u64;
                    progress.update(t, i, key);

                    let op_start = Instant::now();
                    tree.insert(key);
                    let op_elapsed = op_start.elapsed();

                    if op_elapsed > Duration::from_millis(100) {
                        eprintln!("[T{t:02}] SLOW op {i} key={key} took {op_elapsed:?}");
                    }
                    if !tree.search(&key) {
                        eprintln!("[T{t:02}] LOST key={key} right after insert");
                    }
                }

                progress.mark_done(t);
            })
        })
        .collect();

    for h in handles {
        let _ = h.join();
    }

    stop_watchdog.store(true, Ordering::Relaxed);
    let _ = watchdog.join();

    report("01", &tree, threads * ops_per_thread, start.elapsed());
}

// =============================================================================
// Scenario 02: Writers + Range Scanners + Snapshotters
// =============================================================================

fn run_02_mixed(writers: usize, ops_per_writer: usize, degree: usize) {
    println!("\n{}", "=".repeat(80));
    println!("02: MIXED ({writers} writers, {ops_per_writer} ops/writer, scanners + snapshotter)");
    println!("{}", "=".repeat(80));

    let tree = Arc::new(ConcurrentBTree::<u64>::new(degree));
    let progress = Arc::new(ThreadProgress::new(writers));
    let stop = Arc::new(AtomicBool::new(false));
    let watchdog = spawn_watchdog(Arc::clone(&progress), Arc::clone(&stop));
    let scans = Arc::new(AtomicUsize::new(0));
    let snapshots = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let writer_handles: Vec<_> = (0..writers)
        .map(|t| {
            let tree = Arc::clone(&tree);
            let progress = Arc::clone(&progress);
            thread::spawn(move || {
                for i in 0..ops_per_writer {
                    // Odd multiplier: a bijection, so keys stay distinct.
                    let key = ((i * writers + t) as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
                    progress.update(t, i, key);
                    tree.insert(key);
                }
                progress.mark_done(t);
            })
        })
        .collect();

    let scanner = {
        let tree = Arc::clone(&tree);
        let stop = Arc::clone(&stop);
        let scans = Arc::clone(&scans);
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let got = tree.range_query(&0, &u64::MAX);
                if got.windows(2).any(|w| w[0] >= w[1]) {
                    eprintln!("!!! UNORDERED range scan result");
                }
                scans.fetch_add(1, Ordering::Relaxed);
            }
        })
    };

    let snapshotter = {
        let tree = Arc::clone(&tree);
        let stop = Arc::clone(&stop);
        let snapshots = Arc::clone(&snapshots);
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let snap = tree.snapshot();
                if let Err(violation) = snap.check_invariants() {
                    eprintln!("!!! SNAPSHOT INVARIANT VIOLATION: {violation}");
                }
                snapshots.fetch_add(1, Ordering::Relaxed);
                thread::sleep(Duration::from_millis(5));
            }
        })
    };

    for h in writer_handles {
        let _ = h.join();
    }
    stop.store(true, Ordering::Relaxed);
    let _ = scanner.join();
    let _ = snapshotter.join();
    let _ = watchdog.join();

    println!(
        "02: {} full scans, {} snapshots",
        scans.load(Ordering::Relaxed),
        snapshots.load(Ordering::Relaxed)
    );
    report("02", &tree, writers * ops_per_writer, start.elapsed());
}

// =============================================================================
// Main
// =============================================================================

fn main() {
    eprintln!("snaptree Concurrent Workload Hang Detector");
    eprintln!("==========================================");
    eprintln!("Watchdog will report any thread stuck for >{}ms.", STALL_MS);
    eprintln!();

    for run in 1..=3 {
        eprintln!("\n--- Run {run}/3 ---");
        run_01_disjoint_writes(8, 50_000, 16);
        run_01_disjoint_writes(8, 10_000, 2);
        run_02_mixed(4, 20_000, 8);
    }

    eprintln!("\nAll scenarios completed!");
}

//! Stress helpers for arenaq.
//!
//! Drive a queue with many appends, sequentially or from several threads,
//! and report how many landed and how fast.

use arenaq_core::{Queue, LENGTH_HEADER_SIZE};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of an enqueue run.
#[derive(Debug, Clone, PartialEq)]
pub struct EnqueueRun {
    /// Records that were committed.
    pub committed: usize,
    /// Records whose enqueue returned an error.
    pub rejected: usize,
    /// Header and payload bytes of the committed records.
    pub bytes: u64,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

impl EnqueueRun {
    fn finish(committed: usize, rejected: usize, payload_size: usize, start: Instant) -> Self {
        Self {
            committed,
            rejected,
            bytes: (committed * (LENGTH_HEADER_SIZE + payload_size)) as u64,
            elapsed: start.elapsed(),
        }
    }

    /// Committed records per second, or zero for an instant run.
    #[must_use]
    pub fn records_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.committed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Shape of an enqueue run.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Records to enqueue in total.
    pub records: usize,
    /// Writer threads for concurrent runs.
    pub threads: usize,
    /// Size of each payload in bytes.
    pub payload_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            records: 10_000,
            threads: 4,
            payload_size: 256,
        }
    }
}

/// Enqueues `config.records` payloads from the calling thread.
pub fn stress_sequential_enqueues(queue: &Queue, config: &StressConfig) -> EnqueueRun {
    let payload = vec![0xABu8; config.payload_size];
    let start = Instant::now();

    let committed = (0..config.records)
        .filter(|_| queue.enqueue(&payload).is_ok())
        .count();

    EnqueueRun::finish(
        committed,
        config.records - committed,
        config.payload_size,
        start,
    )
}

/// Enqueues from `config.threads` writers sharing one queue.
///
/// Each writer fills its payloads with its own index, so interleaved
/// records can be told apart when read back. Records are split evenly;
/// any remainder is not enqueued.
pub fn stress_concurrent_enqueues(queue: Arc<Queue>, config: &StressConfig) -> EnqueueRun {
    let committed = Arc::new(AtomicUsize::new(0));
    let per_thread = config.records / config.threads;
    let start = Instant::now();

    let writers: Vec<_> = (0..config.threads)
        .map(|writer| {
            let queue = Arc::clone(&queue);
            let committed = Arc::clone(&committed);
            let payload = vec![writer as u8; config.payload_size];

            thread::spawn(move || {
                let ok = (0..per_thread)
                    .filter(|_| queue.enqueue(&payload).is_ok())
                    .count();
                committed.fetch_add(ok, Ordering::Relaxed);
            })
        })
        .collect();

    for writer in writers {
        writer.join().expect("writer thread panicked");
    }

    let committed = committed.load(Ordering::Relaxed);
    EnqueueRun::finish(
        committed,
        per_thread * config.threads - committed,
        config.payload_size,
        start,
    )
}

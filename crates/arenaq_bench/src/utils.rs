//! Benchmark utilities.

use arenaq_core::{MemoryIndex, Queue, QueueConfig};
use arenaq_storage::InMemoryProvider;
use rand::Rng;
use std::sync::Arc;

/// Generate random payload data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate `count` random payloads of `size` bytes.
pub fn random_payloads(count: usize, size: usize) -> Vec<Vec<u8>> {
    (0..count).map(|_| random_data(size)).collect()
}

/// Configuration with `arena` byte arenas and a window of `window` arenas.
pub fn bench_config(arena: usize, window: usize) -> QueueConfig {
    QueueConfig::new()
        .arena_size(arena)
        .memory_size((window + 1) * arena)
}

/// Opens a fresh queue over in-memory arenas.
pub fn memory_queue(config: QueueConfig) -> Queue {
    Queue::with_parts(
        config,
        Box::new(InMemoryProvider::new()),
        Arc::new(MemoryIndex::new()),
    )
    .expect("Failed to open in-memory queue")
}

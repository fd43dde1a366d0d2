//! Test fixtures and queue helpers.
//!
//! Provides convenience functions for setting up test queues
//! and common test scenarios.

use crate::integration::{read_records, ArenaSource, DirSource};
use arenaq_core::{MemoryIndex, Queue, QueueConfig};
use arenaq_storage::InMemoryProvider;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Builds a configuration with `arena` byte arenas and a window of
/// `window` arenas.
#[must_use]
pub fn small_config(arena: usize, window: usize) -> QueueConfig {
    QueueConfig::new()
        .arena_size(arena)
        .memory_size((window + 1) * arena)
}

enum Backing {
    File(TempDir),
    Memory(InMemoryProvider),
}

/// A test queue with automatic cleanup.
pub struct TestQueue {
    queue: Option<Queue>,
    backing: Backing,
    config: QueueConfig,
}

impl TestQueue {
    /// Creates a queue backed by arena files in a temporary directory.
    pub fn file(config: QueueConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let queue = Queue::open(temp_dir.path(), config.clone()).expect("Failed to open queue");

        Self {
            queue: Some(queue),
            backing: Backing::File(temp_dir),
            config,
        }
    }

    /// Creates a queue backed by in-memory arenas.
    pub fn memory(config: QueueConfig) -> Self {
        Self::memory_with(config, InMemoryProvider::new(), Arc::new(MemoryIndex::new()))
    }

    /// Creates an in-memory queue over an existing provider and index.
    pub fn memory_with(
        config: QueueConfig,
        provider: InMemoryProvider,
        index: Arc<MemoryIndex>,
    ) -> Self {
        let queue = Queue::with_parts(config.clone(), Box::new(provider.clone()), index)
            .expect("Failed to open in-memory queue");

        Self {
            queue: Some(queue),
            backing: Backing::Memory(provider),
            config,
        }
    }

    /// Returns the queue directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::File(dir) => Some(dir.path()),
            Backing::Memory(_) => None,
        }
    }

    /// Returns the provider if in-memory, None if file-based.
    pub fn provider(&self) -> Option<&InMemoryProvider> {
        match &self.backing {
            Backing::File(_) => None,
            Backing::Memory(provider) => Some(provider),
        }
    }

    /// Returns the queue.
    pub fn queue(&self) -> &Queue {
        self.queue.as_ref().expect("queue already closed")
    }

    /// Flushes the queue and decodes every record between head and tail.
    pub fn read_back(&self) -> Vec<Vec<u8>> {
        let queue = self.queue();
        queue.flush().expect("Failed to flush queue");

        let source: Box<dyn ArenaSource + '_> = match &self.backing {
            Backing::File(dir) => Box::new(DirSource::new(dir.path(), self.config.arena_size)),
            Backing::Memory(provider) => Box::new(provider.clone()),
        };
        read_records(
            &*source,
            self.config.arena_size,
            queue.head(),
            queue.tail(),
        )
        .expect("Failed to read records")
    }

    /// Closes the queue and opens it again over the same storage.
    pub fn reopen(mut self) -> Self {
        let queue = self.queue.take().expect("queue already closed");
        let head = queue.head();
        let tail = queue.tail();
        queue.close().expect("Failed to close queue");

        match &self.backing {
            Backing::File(dir) => {
                let queue =
                    Queue::open(dir.path(), self.config.clone()).expect("Failed to reopen queue");
                self.queue = Some(queue);
            }
            Backing::Memory(provider) => {
                let index = Arc::new(MemoryIndex::with_positions(head, tail));
                let queue =
                    Queue::with_parts(self.config.clone(), Box::new(provider.clone()), index)
                        .expect("Failed to reopen queue");
                self.queue = Some(queue);
            }
        }
        self
    }

    /// Closes the queue, keeping the backing storage until drop.
    pub fn close(&mut self) {
        if let Some(queue) = self.queue.take() {
            queue.close().expect("Failed to close queue");
        }
    }
}

impl std::ops::Deref for TestQueue {
    type Target = Queue;

    fn deref(&self) -> &Self::Target {
        self.queue()
    }
}

/// Runs a test with a temporary in-memory queue.
///
/// # Example
///
/// ```rust
/// use arenaq_testkit::{small_config, with_temp_queue};
///
/// with_temp_queue(small_config(16, 2), |queue| {
///     queue.enqueue(b"0123456789").unwrap();
/// });
/// ```
pub fn with_temp_queue<F, R>(config: QueueConfig, f: F) -> R
where
    F: FnOnce(&Queue) -> R,
{
    let test_queue = TestQueue::memory(config);
    f(test_queue.queue())
}

/// Runs a test with a temporary file-based queue.
pub fn with_file_queue<F, R>(config: QueueConfig, f: F) -> R
where
    F: FnOnce(&Queue, &Path) -> R,
{
    let test_queue = TestQueue::file(config);
    let path = test_queue.path().expect("File queue should have a path");
    f(test_queue.queue(), path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates an in-memory queue holding `count` records of `size` bytes,
    /// the i-th filled with `i as u8`.
    pub fn populated_queue(config: QueueConfig, count: usize, size: usize) -> TestQueue {
        let test_queue = TestQueue::memory(config);
        for i in 0..count {
            test_queue
                .enqueue(&vec![i as u8; size])
                .expect("Failed to enqueue");
        }
        test_queue
    }

    /// Creates a file-based queue holding `count` records of `size` bytes.
    pub fn populated_file_queue(config: QueueConfig, count: usize, size: usize) -> TestQueue {
        let test_queue = TestQueue::file(config);
        for i in 0..count {
            test_queue
                .enqueue(&vec![i as u8; size])
                .expect("Failed to enqueue");
        }
        test_queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arenaq_core::{ArenaId, Position};

    #[test]
    fn test_memory_queue() {
        let queue = TestQueue::memory(small_config(16, 2));
        assert!(queue.is_empty());
        assert!(queue.path().is_none());
        assert!(queue.provider().is_some());
    }

    #[test]
    fn test_file_queue_has_path() {
        let queue = TestQueue::file(small_config(16, 2));
        let path = queue.path().unwrap();
        assert!(path.join("index.dat").exists());
    }

    #[test]
    fn test_with_temp_queue() {
        let tail = with_temp_queue(small_config(16, 2), |queue| {
            queue.enqueue(&[7u8; 10]).unwrap();
            queue.tail()
        });
        assert_eq!(tail, Position::new(ArenaId::new(1), 2));
    }

    #[test]
    fn test_with_file_queue() {
        let files = with_file_queue(small_config(16, 2), |queue, path| {
            queue.enqueue(&[1u8; 20]).unwrap();
            queue.flush().unwrap();
            ["arena_0.dat", "arena_1.dat", "arena_2.dat"].map(|name| path.join(name).exists())
        });
        assert_eq!(files, [true, true, false]);
    }

    #[test]
    fn test_populated_scenario() {
        let queue = scenarios::populated_queue(small_config(32, 2), 5, 4);
        let records = queue.read_back();
        assert_eq!(records.len(), 5);
        assert_eq!(records[3], vec![3u8; 4]);
    }

    #[test]
    fn test_memory_reopen_keeps_records() {
        let queue = scenarios::populated_queue(small_config(16, 1), 3, 12);
        let tail = queue.tail();

        let queue = queue.reopen();
        assert_eq!(queue.tail(), tail);
        assert_eq!(queue.read_back().len(), 3);
    }
}

//! Queue facade.
//!
//! ## Record Format
//!
//! ```text
//! | length (8, little-endian u64) | payload (length) |
//! ```
//!
//! The length header always sits inside a single arena: if fewer than 8
//! bytes remain, the rest of the arena is skipped. The payload may span
//! several arenas.

mod appender;

pub use appender::Appender;

use crate::arena::ArenaManager;
use crate::config::QueueConfig;
use crate::dir::QueueDir;
use crate::error::{CoreError, CoreResult};
use crate::index::{FileIndex, PositionIndex};
use crate::types::{ArenaId, Position, WindowSize};
use arenaq_storage::{MmapProvider, SegmentProvider, U64_SIZE};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Size of the length header that precedes every payload.
pub const LENGTH_HEADER_SIZE: usize = U64_SIZE;

/// A persistent, arena-backed queue.
///
/// Appends are serialized by an internal mutex, so a `Queue` can be shared
/// between threads. Only a bounded window of arenas is kept mapped,
/// controlled by [`QueueConfig::memory_size`].
///
/// # Example
///
/// ```rust,no_run
/// use arenaq_core::{Queue, QueueConfig};
/// use std::path::Path;
///
/// let config = QueueConfig::new().arena_size(4096).memory_size(4 * 4096);
/// let queue = Queue::open(Path::new("my_queue"), config)?;
/// queue.enqueue(b"hello")?;
/// queue.close()?;
/// # Ok::<(), arenaq_core::CoreError>(())
/// ```
#[derive(Debug)]
pub struct Queue {
    appender: Mutex<Appender>,
    index: Arc<dyn PositionIndex>,
    config: QueueConfig,
    // Dropped last so the lock outlives every mapping.
    dir: Option<QueueDir>,
}

impl Queue {
    /// Opens or creates a queue in the directory at `path`.
    ///
    /// Arena files and the `index.dat` position index live directly in the
    /// directory, which is locked for the lifetime of the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the configuration is invalid
    /// - the directory is missing and `create_if_missing` is false
    /// - another process holds the directory lock (`QueueLocked`)
    /// - the index or an arena cannot be mapped
    pub fn open(path: &Path, config: QueueConfig) -> CoreResult<Self> {
        config.validate()?;
        let dir = QueueDir::open(path, config.create_if_missing)?;
        let index: Arc<dyn PositionIndex> = Arc::new(FileIndex::open(&dir.index_path())?);
        let provider = Box::new(MmapProvider::new(dir.path()));

        let mut queue = Self::with_parts(config, provider, index)?;
        queue.dir = Some(dir);

        info!(
            path = %path.display(),
            head = %queue.head(),
            tail = %queue.tail(),
            "opened queue"
        );
        Ok(queue)
    }

    /// Builds a queue over caller-supplied arena storage and index.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the stored head or
    /// tail offset does not fit in an arena (`InvalidFormat`), or the
    /// initial arenas cannot be activated.
    pub fn with_parts(
        config: QueueConfig,
        provider: Box<dyn SegmentProvider>,
        index: Arc<dyn PositionIndex>,
    ) -> CoreResult<Self> {
        config.validate()?;
        for (name, position) in [("head", index.head()), ("tail", index.tail())] {
            if position.offset >= config.arena_size {
                return Err(CoreError::invalid_format(format!(
                    "{name} {position} lies past the end of a {}-byte arena",
                    config.arena_size
                )));
            }
        }
        let head = index.head().aid;
        let tail = index.tail().aid;
        let manager = ArenaManager::new(&config, provider, head, tail, Arc::clone(&index))?;

        Ok(Self {
            appender: Mutex::new(Appender::new(manager, Arc::clone(&index))),
            index,
            config,
            dir: None,
        })
    }

    /// Appends `payload` to the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written; the queue is left
    /// as it was and the same payload may be retried.
    pub fn enqueue(&self, payload: &[u8]) -> CoreResult<()> {
        self.appender.lock().enqueue(payload)
    }

    /// Returns `true` if head and tail coincide.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.head() == self.index.tail()
    }

    /// Returns the head position.
    #[must_use]
    pub fn head(&self) -> Position {
        self.index.head()
    }

    /// Returns the tail position.
    #[must_use]
    pub fn tail(&self) -> Position {
        self.index.tail()
    }

    /// Returns the ids of currently mapped arenas.
    #[must_use]
    pub fn resident_arenas(&self) -> Vec<ArenaId> {
        self.appender.lock().manager().resident_arenas()
    }

    /// Returns the active window.
    #[must_use]
    pub fn window_size(&self) -> WindowSize {
        self.config.window_size()
    }

    /// Returns the configuration the queue was opened with.
    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Flushes mapped arenas and the index to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if any flush fails.
    pub fn flush(&self) -> CoreResult<()> {
        self.appender.lock().flush()?;
        self.index.flush()?;
        if let Some(dir) = &self.dir {
            dir.sync()?;
        }
        Ok(())
    }

    /// Unmaps every arena, flushes the index and releases the directory.
    ///
    /// # Errors
    ///
    /// Returns `CloseFailed` listing every arena that could not be released,
    /// or the index flush error.
    pub fn close(self) -> CoreResult<()> {
        let Self {
            appender,
            index,
            dir,
            ..
        } = self;

        let released = appender.into_inner().close();
        let flushed = index.flush();
        drop(index);
        if let Some(dir) = &dir {
            info!(path = %dir.path().display(), "closed queue");
        }
        released?;
        flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FileIndex, MemoryIndex};
    use arenaq_storage::InMemoryProvider;
    use std::thread;
    use tempfile::tempdir;

    fn small() -> QueueConfig {
        QueueConfig::new().arena_size(64).memory_size(3 * 64)
    }

    #[test]
    fn open_creates_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("q");

        let queue = Queue::open(&path, small()).unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.config(), &small());
        assert_eq!(queue.window_size(), WindowSize::Bounded(2));
        assert!(path.join("index.dat").exists());
        assert!(path.join("arena_0.dat").exists());
        queue.close().unwrap();
    }

    #[test]
    fn open_missing_without_create_fails() {
        let dir = tempdir().unwrap();
        let config = small().create_if_missing(false);

        let result = Queue::open(&dir.path().join("missing"), config);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn open_rejects_invalid_config() {
        let dir = tempdir().unwrap();
        let config = QueueConfig::new().arena_size(4);

        let result = Queue::open(dir.path(), config);
        assert!(matches!(result, Err(CoreError::InvalidConfig { .. })));
    }

    #[test]
    fn stored_offset_past_arena_is_rejected() {
        let index = Arc::new(MemoryIndex::with_positions(
            Position::default(),
            Position::new(ArenaId::new(0), usize::MAX - 2),
        ));
        let result = Queue::with_parts(small(), Box::new(InMemoryProvider::new()), index);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));

        let index = Arc::new(MemoryIndex::with_positions(
            Position::default(),
            Position::new(ArenaId::new(1), 64),
        ));
        let result = Queue::with_parts(small(), Box::new(InMemoryProvider::new()), index);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn corrupt_index_offset_fails_open() {
        let dir = tempdir().unwrap();
        {
            let index = FileIndex::open(&dir.path().join("index.dat")).unwrap();
            index
                .put_tail(Position::new(ArenaId::new(2), usize::MAX))
                .unwrap();
            index.flush().unwrap();
        }

        let result = Queue::open(dir.path(), small());
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn enqueue_survives_reopen() {
        let dir = tempdir().unwrap();

        {
            let queue = Queue::open(dir.path(), small()).unwrap();
            for i in 0..10u8 {
                queue.enqueue(&[i; 20]).unwrap();
            }
            assert!(!queue.is_empty());
            queue.close().unwrap();
        }

        // the tenth header does not fit after (3, 60) and moves to arena 4
        let queue = Queue::open(dir.path(), small()).unwrap();
        let tail = queue.tail();
        assert_eq!(tail, Position::new(ArenaId::new(4), 28));
        assert_eq!(
            queue.resident_arenas(),
            vec![ArenaId::new(0), ArenaId::new(1), ArenaId::new(4)]
        );

        queue.enqueue(b"more").unwrap();
        assert_eq!(queue.tail(), Position::new(ArenaId::new(4), 40));
    }

    #[test]
    fn second_open_is_locked() {
        let dir = tempdir().unwrap();
        let _queue = Queue::open(dir.path(), small()).unwrap();

        let result = Queue::open(dir.path(), small());
        assert!(matches!(result, Err(CoreError::QueueLocked)));
    }

    #[test]
    fn concurrent_enqueues_are_serialized() {
        let provider = InMemoryProvider::new();
        let index = Arc::new(MemoryIndex::new());
        let config = QueueConfig::new().arena_size(32).memory_size(4 * 32);
        let queue = Arc::new(Queue::with_parts(config, Box::new(provider), index).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for _ in 0..25 {
                        queue.enqueue(&[1u8; 8]).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 100 records of 16 bytes fill exactly 50 arenas of 32 bytes
        assert_eq!(queue.tail(), Position::new(ArenaId::new(50), 0));
    }
}

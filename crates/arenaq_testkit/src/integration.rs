//! Cross-crate integration test helpers.
//!
//! Decodes records straight from arena storage, independently of the
//! append path, so tests can check what actually landed on disk.

use arenaq_core::{ArenaId, Position, Queue, LENGTH_HEADER_SIZE};
use arenaq_storage::{
    arena_file_name, InMemoryProvider, MmapSegment, Segment, StorageError, StorageResult,
};
use std::path::{Path, PathBuf};

/// Somewhere arena bytes can be read from.
pub trait ArenaSource {
    /// Returns the full contents of arena `aid`.
    ///
    /// # Errors
    ///
    /// Returns `Unmapped` if the arena does not exist.
    fn arena(&self, aid: ArenaId) -> StorageResult<Vec<u8>>;
}

impl ArenaSource for InMemoryProvider {
    fn arena(&self, aid: ArenaId) -> StorageResult<Vec<u8>> {
        self.contents(aid.as_u64())
            .ok_or(StorageError::Unmapped { aid: aid.as_u64() })
    }
}

/// Reads arena files from a queue directory through a private mapping.
#[derive(Debug, Clone)]
pub struct DirSource {
    dir: PathBuf,
    arena_size: usize,
}

impl DirSource {
    /// Creates a source over the arena files in `dir`.
    pub fn new(dir: &Path, arena_size: usize) -> Self {
        Self {
            dir: dir.to_path_buf(),
            arena_size,
        }
    }
}

impl ArenaSource for DirSource {
    fn arena(&self, aid: ArenaId) -> StorageResult<Vec<u8>> {
        let path = self.dir.join(arena_file_name(aid.as_u64()));
        if !path.exists() {
            return Err(StorageError::Unmapped { aid: aid.as_u64() });
        }
        let mut segment = MmapSegment::open(&path, aid.as_u64(), self.arena_size)?;
        let bytes = segment.read_at(0, self.arena_size)?;
        segment.unmap()?;
        Ok(bytes)
    }
}

/// Reads `len` bytes starting at `position`, moving it past them.
fn take(
    source: &dyn ArenaSource,
    arena_size: usize,
    position: &mut Position,
    len: usize,
) -> StorageResult<Vec<u8>> {
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let bytes = source.arena(position.aid)?;
        let n = (len - out.len()).min(arena_size - position.offset);
        out.extend_from_slice(&bytes[position.offset..position.offset + n]);
        position.offset += n;
        if position.offset == arena_size {
            *position = Position::start_of(position.aid.next());
        }
    }
    Ok(out)
}

/// Decodes every record between `from` and `to`.
///
/// # Errors
///
/// Returns an error if an arena is missing or a header points past `to`.
pub fn read_records(
    source: &dyn ArenaSource,
    arena_size: usize,
    from: Position,
    to: Position,
) -> StorageResult<Vec<Vec<u8>>> {
    let mut position = from;
    let mut records = Vec::new();
    while position < to {
        if position.offset + LENGTH_HEADER_SIZE > arena_size {
            position = Position::start_of(position.aid.next());
        }
        let header = take(source, arena_size, &mut position, LENGTH_HEADER_SIZE)?;
        let mut buf = [0u8; LENGTH_HEADER_SIZE];
        buf.copy_from_slice(&header);
        let len = u64::from_le_bytes(buf) as usize;

        records.push(take(source, arena_size, &mut position, len)?);
        if position > to {
            return Err(StorageError::Corrupted(format!(
                "record ends at {position}, past tail {to}"
            )));
        }
    }
    Ok(records)
}

/// A test harness that remembers every payload it enqueues.
pub struct EnqueueHarness<'a> {
    queue: &'a Queue,
    expected: Vec<Vec<u8>>,
    bytes: u64,
}

impl<'a> EnqueueHarness<'a> {
    /// Creates a harness appending to `queue`.
    pub fn new(queue: &'a Queue) -> Self {
        Self {
            queue,
            expected: Vec::new(),
            bytes: 0,
        }
    }

    /// Enqueues `payload` and tracks it for later verification.
    pub fn enqueue(&mut self, payload: &[u8]) {
        self.queue.enqueue(payload).expect("Failed to enqueue");
        self.bytes += (LENGTH_HEADER_SIZE + payload.len()) as u64;
        self.expected.push(payload.to_vec());
    }

    /// Returns the payloads enqueued so far.
    pub fn expected(&self) -> &[Vec<u8>] {
        &self.expected
    }

    /// Returns the header and payload bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Verifies `records` matches the tracked payloads in order.
    pub fn verify(&self, records: &[Vec<u8>]) {
        assert_eq!(
            records.len(),
            self.expected.len(),
            "record count mismatch"
        );
        for (i, (actual, expected)) in records.iter().zip(&self.expected).enumerate() {
            assert_eq!(actual, expected, "record {i} mismatch");
        }
    }

    /// Verifies the tail never sits at the very end of an arena and that
    /// every resident arena is either admitted or the tail's.
    pub fn verify_positions(&self, arena_size: usize) {
        let tail = self.queue.tail();
        assert!(tail.offset < arena_size, "tail {tail} not rolled over");

        let head = self.queue.head().aid;
        let window = self.queue.window_size();
        for aid in self.queue.resident_arenas() {
            assert!(
                aid == tail.aid || window.admits(head, aid),
                "{aid} resident outside window {window}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{small_config, TestQueue};

    #[test]
    fn harness_tracks_and_verifies() {
        let queue = TestQueue::memory(small_config(16, 2));
        let mut harness = EnqueueHarness::new(&queue);

        harness.enqueue(b"abc");
        harness.enqueue(&[9u8; 30]);
        harness.enqueue(b"");

        assert_eq!(harness.bytes_written(), 3 * 8 + 33);
        harness.verify(&queue.read_back());
        harness.verify_positions(16);
    }

    #[test]
    fn missing_arena_is_reported() {
        let provider = InMemoryProvider::new();
        let result = read_records(
            &provider,
            16,
            Position::default(),
            Position::new(ArenaId::new(0), 8),
        );
        assert!(matches!(result, Err(StorageError::Unmapped { aid: 0 })));
    }

    #[test]
    fn dir_source_reads_live_arenas() {
        let queue = TestQueue::file(small_config(32, 1));
        queue.enqueue(b"first").unwrap();
        queue.enqueue(&[1u8; 40]).unwrap();

        let records = queue.read_back();
        assert_eq!(records, vec![b"first".to_vec(), vec![1u8; 40]]);
    }
}

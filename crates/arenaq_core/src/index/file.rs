//! File-backed position index.
//!
//! ## Layout
//!
//! ```text
//! | head aid (8) | head offset (8) | tail aid (8) | tail offset (8) |
//! ```
//!
//! All fields are little-endian `u64`. A freshly created file is zero-filled
//! and therefore reads as an empty queue at `(0, 0)`.

use super::PositionIndex;
use crate::error::{CoreError, CoreResult};
use crate::types::{ArenaId, Position};
use arenaq_storage::{MmapSegment, Segment, U64_SIZE};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use tracing::warn;

/// Size of the index file in bytes.
pub const INDEX_FILE_SIZE: usize = 4 * U64_SIZE;

const HEAD_AID: usize = 0;
const HEAD_OFFSET: usize = 8;
const TAIL_AID: usize = 16;
const TAIL_OFFSET: usize = 24;

/// A position index persisted in a memory-mapped file.
///
/// Positions are cached in memory and written through to the mapping on
/// every `put_*`. The mapping is flushed on [`PositionIndex::flush`] and
/// when the index is dropped.
#[derive(Debug)]
pub struct FileIndex {
    segment: Mutex<MmapSegment>,
    head: RwLock<Position>,
    tail: RwLock<Position>,
}

impl FileIndex {
    /// Opens or creates the index file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be mapped or holds offsets that
    /// do not fit in memory.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let segment = MmapSegment::open(path, 0, INDEX_FILE_SIZE)?;
        let head = read_position(&segment, HEAD_AID, HEAD_OFFSET)?;
        let tail = read_position(&segment, TAIL_AID, TAIL_OFFSET)?;

        if tail < head {
            return Err(CoreError::invalid_format(format!(
                "index tail {tail} is behind head {head}"
            )));
        }

        Ok(Self {
            segment: Mutex::new(segment),
            head: RwLock::new(head),
            tail: RwLock::new(tail),
        })
    }

    fn store(&self, aid_at: usize, offset_at: usize, position: Position) -> CoreResult<()> {
        let mut segment = self.segment.lock();
        segment.write_u64(aid_at, position.aid.as_u64())?;
        segment.write_u64(offset_at, position.offset as u64)?;
        Ok(())
    }
}

fn read_position(segment: &MmapSegment, aid_at: usize, offset_at: usize) -> CoreResult<Position> {
    let aid = segment.read_u64(aid_at)?;
    let offset = segment.read_u64(offset_at)?;
    let offset = usize::try_from(offset)
        .map_err(|_| CoreError::invalid_format(format!("index offset {offset} too large")))?;
    Ok(Position::new(ArenaId::new(aid), offset))
}

impl PositionIndex for FileIndex {
    fn head(&self) -> Position {
        *self.head.read()
    }

    fn tail(&self) -> Position {
        *self.tail.read()
    }

    fn put_head(&self, position: Position) -> CoreResult<()> {
        self.store(HEAD_AID, HEAD_OFFSET, position)?;
        *self.head.write() = position;
        Ok(())
    }

    fn put_tail(&self, position: Position) -> CoreResult<()> {
        self.store(TAIL_AID, TAIL_OFFSET, position)?;
        *self.tail.write() = position;
        Ok(())
    }

    fn flush(&self) -> CoreResult<()> {
        self.segment.lock().flush()?;
        Ok(())
    }
}

impl Drop for FileIndex {
    fn drop(&mut self) {
        if let Err(e) = self.segment.get_mut().unmap() {
            warn!(error = %e, "failed to flush queue index on drop");
        }
    }
}

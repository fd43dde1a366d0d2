//! Append path: writes length-prefixed records across arenas.

use super::LENGTH_HEADER_SIZE;
use crate::arena::ArenaManager;
use crate::error::{CoreError, CoreResult};
use crate::index::PositionIndex;
use crate::types::{ArenaId, Position};
use std::sync::Arc;
use tracing::debug;

/// Writes records at the tail of a queue.
///
/// Each record is an 8-byte little-endian length followed by the payload.
/// A header never straddles two arenas; a payload may span any number of
/// them. The tail is committed to the index only after the whole record
/// has been written, so a failed append leaves the queue unchanged.
///
/// Not internally synchronized: `enqueue` takes `&mut self`.
#[derive(Debug)]
pub struct Appender {
    manager: ArenaManager,
    index: Arc<dyn PositionIndex>,
    arena_size: usize,
}

impl Appender {
    /// Creates an appender writing through `manager` and committing to
    /// `index`.
    #[must_use]
    pub fn new(manager: ArenaManager, index: Arc<dyn PositionIndex>) -> Self {
        let arena_size = manager.arena_size();
        Self {
            manager,
            index,
            arena_size,
        }
    }

    /// Appends `payload` to the tail and commits the new tail position.
    ///
    /// # Errors
    ///
    /// Returns an error if an arena cannot be activated, released or
    /// written. The committed tail is left unchanged; bytes already written
    /// past it are unreachable and will be overwritten by the next append.
    pub fn enqueue(&mut self, payload: &[u8]) -> CoreResult<()> {
        let tail = self.index.tail();
        let position = self.write_length(tail, payload.len() as u64)?;
        let position = self.write_bytes(position, payload)?;
        self.index.put_tail(position)?;
        Ok(())
    }

    fn write_length(&mut self, mut position: Position, length: u64) -> CoreResult<Position> {
        if position.offset + LENGTH_HEADER_SIZE > self.arena_size {
            position = self.next_arena(position.aid)?;
        }

        self.manager
            .get_arena(position.aid)?
            .write_u64(position.offset, length)?;

        position.offset += LENGTH_HEADER_SIZE;
        if position.offset == self.arena_size {
            position = self.next_arena(position.aid)?;
        }
        Ok(position)
    }

    fn write_bytes(&mut self, mut position: Position, payload: &[u8]) -> CoreResult<Position> {
        let mut written = 0;
        while written < payload.len() {
            let n = self
                .manager
                .get_arena(position.aid)?
                .write_at(position.offset, &payload[written..])?;
            if n == 0 {
                return Err(CoreError::WriteStalled {
                    aid: position.aid,
                    offset: position.offset,
                });
            }
            written += n;
            position.offset += n;

            if position.offset == self.arena_size {
                position = self.next_arena(position.aid)?;
            }
        }
        Ok(position)
    }

    /// Rolls over from `prev` to the arena after it.
    ///
    /// The next arena is mapped before `prev` is released, so a failed
    /// activation leaves the committed tail's arena resident.
    fn next_arena(&mut self, prev: ArenaId) -> CoreResult<Position> {
        let next = prev.next();
        self.manager.add_arena(next)?;
        self.manager.unmap_arena(prev, false)?;
        debug!(from = prev.as_u64(), to = next.as_u64(), "rolled over to next arena");
        Ok(Position::start_of(next))
    }

    /// Returns the committed tail.
    #[must_use]
    pub fn tail(&self) -> Position {
        self.index.tail()
    }

    /// Returns the arena manager.
    #[must_use]
    pub fn manager(&self) -> &ArenaManager {
        &self.manager
    }

    /// Flushes resident arenas.
    ///
    /// # Errors
    ///
    /// Returns an error if an arena fails to flush.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.manager.flush()
    }

    /// Unmaps every resident arena.
    ///
    /// # Errors
    ///
    /// Returns `CloseFailed` listing every arena that could not be released.
    pub fn close(&mut self) -> CoreResult<()> {
        self.manager.close()
    }
}

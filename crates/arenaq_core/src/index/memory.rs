//! In-memory position index.

use super::PositionIndex;
use crate::error::CoreResult;
use crate::types::Position;
use parking_lot::RwLock;

/// A position index that lives only in memory.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    head: RwLock<Position>,
    tail: RwLock<Position>,
}

impl MemoryIndex {
    /// Creates an index with head and tail at `(0, 0)`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index with the given head and tail.
    #[must_use]
    pub fn with_positions(head: Position, tail: Position) -> Self {
        Self {
            head: RwLock::new(head),
            tail: RwLock::new(tail),
        }
    }
}

impl PositionIndex for MemoryIndex {
    fn head(&self) -> Position {
        *self.head.read()
    }

    fn tail(&self) -> Position {
        *self.tail.read()
    }

    fn put_head(&self, position: Position) -> CoreResult<()> {
        *self.head.write() = position;
        Ok(())
    }

    fn put_tail(&self, position: Position) -> CoreResult<()> {
        *self.tail.write() = position;
        Ok(())
    }

    fn flush(&self) -> CoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArenaId;

    #[test]
    fn memory_index_starts_empty() {
        let index = MemoryIndex::new();
        assert_eq!(index.head(), Position::default());
        assert_eq!(index.tail(), Position::default());
    }

    #[test]
    fn memory_index_put() {
        let index = MemoryIndex::new();
        index.put_tail(Position::new(ArenaId::new(2), 7)).unwrap();
        index.put_head(Position::new(ArenaId::new(1), 3)).unwrap();
        assert_eq!(index.tail(), Position::new(ArenaId::new(2), 7));
        assert_eq!(index.head(), Position::new(ArenaId::new(1), 3));
    }
}

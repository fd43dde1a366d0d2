//! Position index: durable head and tail bookkeeping.
//!
//! The queue core never stores head or tail itself. It reads both from a
//! [`PositionIndex`] and commits a new tail once an append has been fully
//! written, so a failed append leaves the durable tail where it was.
//!
//! # Implementations
//!
//! - [`FileIndex`]: memory-mapped `index.dat` file
//! - [`MemoryIndex`]: in-memory, for tests

mod file;
mod memory;

pub use file::{FileIndex, INDEX_FILE_SIZE};
pub use memory::MemoryIndex;

use crate::error::CoreResult;
use crate::types::Position;
use std::fmt;

/// Stores the head and tail positions of a queue.
///
/// Implementations use interior mutability so the window manager and the
/// append path can share one index behind an `Arc`.
pub trait PositionIndex: Send + Sync + fmt::Debug {
    /// Returns the position of the oldest record.
    fn head(&self) -> Position;

    /// Returns the position where the next record will be written.
    fn tail(&self) -> Position;

    /// Records a new head position.
    ///
    /// # Errors
    ///
    /// Returns an error if the position cannot be stored.
    fn put_head(&self, position: Position) -> CoreResult<()>;

    /// Records a new tail position.
    ///
    /// # Errors
    ///
    /// Returns an error if the position cannot be stored.
    fn put_tail(&self, position: Position) -> CoreResult<()>;

    /// Flushes stored positions to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&self) -> CoreResult<()>;
}

//! Error types for segment operations.

use std::io;
use thiserror::Error;

/// Result type for segment operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while creating, accessing or releasing a segment.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to access bytes outside the segment.
    #[error("access out of bounds: offset {offset}, len {len}, capacity {capacity}")]
    OutOfBounds {
        /// The requested offset.
        offset: usize,
        /// The requested length.
        len: usize,
        /// The segment capacity.
        capacity: usize,
    },

    /// The segment mapping has already been released.
    #[error("segment {aid} is unmapped")]
    Unmapped {
        /// Id of the released segment.
        aid: u64,
    },

    /// The backing file does not match the expected layout.
    #[error("segment corrupted: {0}")]
    Corrupted(String),

    /// A failure injected by a test provider.
    #[error("injected failure: {0}")]
    Injected(String),
}

//! Segment capability definitions.

use crate::error::{StorageError, StorageResult};
use std::fmt;

/// Size in bytes of an integer written with [`Segment::write_u64`].
pub const U64_SIZE: usize = 8;

/// A fixed-capacity byte region backing one arena of a queue.
///
/// Segments are **opaque byte regions**. They know their id and capacity,
/// accept writes at arbitrary offsets and can release their mapping. They
/// do not understand record headers or queue positions; the queue core
/// owns all interpretation of the bytes.
///
/// # Invariants
///
/// - `write_at` never writes past `capacity()`; it returns the count written
/// - `unmap` flushes pending writes before releasing the mapping
/// - after a successful `unmap` every access fails with `Unmapped`
/// - a second `unmap` is a no-op
///
/// # Implementors
///
/// - [`super::MmapSegment`] - memory-mapped file
/// - [`super::InMemorySegment`] - for testing
pub trait Segment: Send + fmt::Debug {
    /// Returns the id this segment was created for.
    fn id(&self) -> u64;

    /// Returns the fixed capacity of the segment in bytes.
    fn capacity(&self) -> usize;

    /// Returns `true` while the mapping has not been released.
    fn is_mapped(&self) -> bool;

    /// Writes as much of `data` as fits starting at `offset`.
    ///
    /// Returns the number of bytes actually written, which is
    /// `min(data.len(), capacity - offset)`.
    ///
    /// # Errors
    ///
    /// Returns an error if `offset` is beyond the capacity or the
    /// segment has been unmapped.
    fn write_at(&mut self, offset: usize, data: &[u8]) -> StorageResult<usize>;

    /// Writes `value` as 8 little-endian bytes at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the 8 bytes do not fit entirely or the segment
    /// has been unmapped.
    fn write_u64(&mut self, offset: usize, value: u64) -> StorageResult<()>;

    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is outside the segment or the segment
    /// has been unmapped.
    fn read_at(&self, offset: usize, len: usize) -> StorageResult<Vec<u8>>;

    /// Reads an 8-byte little-endian integer at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is outside the segment or the segment
    /// has been unmapped.
    fn read_u64(&self, offset: usize) -> StorageResult<u64> {
        let bytes = self.read_at(offset, U64_SIZE)?;
        let mut buf = [0u8; U64_SIZE];
        buf.copy_from_slice(&bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Flushes pending writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails or the segment has been unmapped.
    fn flush(&mut self) -> StorageResult<()>;

    /// Flushes pending writes and releases the mapping.
    ///
    /// On failure the segment stays mapped so the caller may retry.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush or the release fails.
    fn unmap(&mut self) -> StorageResult<()>;
}

/// Creates segments for arena ids.
///
/// A provider decides where the bytes of a segment live. Creating a segment
/// whose backing storage already exists re-activates it with its previous
/// contents.
pub trait SegmentProvider: Send {
    /// Creates (or re-opens) the segment for `aid` with the given capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be allocated or mapped.
    fn create(&mut self, aid: u64, capacity: usize) -> StorageResult<Box<dyn Segment>>;
}

/// Validates a write or read range against a capacity.
pub(crate) fn check_range(offset: usize, len: usize, capacity: usize) -> StorageResult<()> {
    if offset > capacity || len > capacity - offset {
        return Err(StorageError::OutOfBounds {
            offset,
            len,
            capacity,
        });
    }
    Ok(())
}

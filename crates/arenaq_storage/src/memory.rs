//! In-memory segments for testing.

use crate::error::{StorageError, StorageResult};
use crate::segment::{check_range, Segment, SegmentProvider, U64_SIZE};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Shared state standing in for a directory of arena files.
#[derive(Debug, Default)]
struct Disk {
    files: HashMap<u64, Vec<u8>>,
    creations: HashMap<u64, usize>,
    mapped: HashMap<u64, usize>,
    fail_create: HashSet<u64>,
    fail_unmap: HashMap<u64, u32>,
}

/// An in-memory segment.
///
/// The segment works on a private copy of its bytes while mapped and writes
/// them back to the shared disk on `flush` and `unmap`. This mirrors the
/// visibility rules of a memory-mapped file closely enough for tests:
/// bytes written to a segment that is re-created without an unmap in
/// between are lost.
#[derive(Debug)]
pub struct InMemorySegment {
    id: u64,
    capacity: usize,
    data: Option<Vec<u8>>,
    disk: Arc<Mutex<Disk>>,
}

impl InMemorySegment {
    /// Creates a standalone zero-filled segment.
    ///
    /// # Example
    ///
    /// ```rust
    /// use arenaq_storage::{InMemorySegment, Segment};
    ///
    /// let mut segment = InMemorySegment::new(0, 16);
    /// assert_eq!(segment.write_at(12, b"overflow").unwrap(), 4);
    /// ```
    #[must_use]
    pub fn new(id: u64, capacity: usize) -> Self {
        Self {
            id,
            capacity,
            data: Some(vec![0; capacity]),
            disk: Arc::default(),
        }
    }

    fn data(&self) -> StorageResult<&[u8]> {
        self.data
            .as_deref()
            .ok_or(StorageError::Unmapped { aid: self.id })
    }

    fn data_mut(&mut self) -> StorageResult<&mut [u8]> {
        self.data
            .as_deref_mut()
            .ok_or(StorageError::Unmapped { aid: self.id })
    }
}

impl Segment for InMemorySegment {
    fn id(&self) -> u64 {
        self.id
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn is_mapped(&self) -> bool {
        self.data.is_some()
    }

    fn write_at(&mut self, offset: usize, bytes: &[u8]) -> StorageResult<usize> {
        check_range(offset, 0, self.capacity)?;
        let n = bytes.len().min(self.capacity - offset);
        let data = self.data_mut()?;
        data[offset..offset + n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }

    fn write_u64(&mut self, offset: usize, value: u64) -> StorageResult<()> {
        check_range(offset, U64_SIZE, self.capacity)?;
        let data = self.data_mut()?;
        data[offset..offset + U64_SIZE].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn read_at(&self, offset: usize, len: usize) -> StorageResult<Vec<u8>> {
        check_range(offset, len, self.capacity)?;
        Ok(self.data()?[offset..offset + len].to_vec())
    }

    fn flush(&mut self) -> StorageResult<()> {
        let data = self.data()?.to_vec();
        self.disk.lock().files.insert(self.id, data);
        Ok(())
    }

    fn unmap(&mut self) -> StorageResult<()> {
        if self.data.is_none() {
            return Ok(());
        }

        {
            let mut disk = self.disk.lock();
            if let Some(remaining) = disk.fail_unmap.get_mut(&self.id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(StorageError::Injected(format!(
                        "unmap of segment {}",
                        self.id
                    )));
                }
            }
        }

        self.flush()?;
        self.data = None;
        if let Some(count) = self.disk.lock().mapped.get_mut(&self.id) {
            *count = count.saturating_sub(1);
        }
        Ok(())
    }
}

/// Creates [`InMemorySegment`]s over a shared in-memory disk.
///
/// Clones share the same disk, so a test can keep a handle to inspect
/// flushed contents and creation counts, or to inject failures, after
/// handing the provider to a queue.
///
/// # Example
///
/// ```rust
/// use arenaq_storage::{InMemoryProvider, SegmentProvider};
///
/// let mut provider = InMemoryProvider::new();
/// let handle = provider.clone();
/// provider.create(0, 32).unwrap();
/// assert_eq!(handle.creations(0), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    disk: Arc<Mutex<Disk>>,
}

impl InMemoryProvider {
    /// Creates a provider with an empty disk.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent creation of `aid` fail.
    pub fn fail_create(&self, aid: u64) {
        self.disk.lock().fail_create.insert(aid);
    }

    /// Lets creations of `aid` succeed again.
    pub fn allow_create(&self, aid: u64) {
        self.disk.lock().fail_create.remove(&aid);
    }

    /// Makes the next `times` unmaps of `aid` fail.
    pub fn fail_unmap(&self, aid: u64, times: u32) {
        self.disk.lock().fail_unmap.insert(aid, times);
    }

    /// Returns how many times a segment for `aid` has been created.
    #[must_use]
    pub fn creations(&self, aid: u64) -> usize {
        self.disk.lock().creations.get(&aid).copied().unwrap_or(0)
    }

    /// Returns the number of live mappings of `aid`.
    #[must_use]
    pub fn mapped(&self, aid: u64) -> usize {
        self.disk.lock().mapped.get(&aid).copied().unwrap_or(0)
    }

    /// Returns the ids that currently have at least one live mapping.
    #[must_use]
    pub fn mapped_ids(&self) -> Vec<u64> {
        let disk = self.disk.lock();
        let mut ids: Vec<u64> = disk
            .mapped
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(&aid, _)| aid)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the flushed bytes of `aid`, if its file exists.
    #[must_use]
    pub fn contents(&self, aid: u64) -> Option<Vec<u8>> {
        self.disk.lock().files.get(&aid).cloned()
    }

    /// Returns the number of files on the disk.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.disk.lock().files.len()
    }
}

impl SegmentProvider for InMemoryProvider {
    fn create(&mut self, aid: u64, capacity: usize) -> StorageResult<Box<dyn Segment>> {
        let mut disk = self.disk.lock();
        if disk.fail_create.contains(&aid) {
            return Err(StorageError::Injected(format!("create of segment {aid}")));
        }

        let file = disk.files.entry(aid).or_insert_with(|| vec![0; capacity]);
        if file.len() != capacity {
            return Err(StorageError::Corrupted(format!(
                "segment {aid} has length {}, expected {capacity}",
                file.len()
            )));
        }
        let data = file.clone();
        *disk.creations.entry(aid).or_insert(0) += 1;
        *disk.mapped.entry(aid).or_insert(0) += 1;

        Ok(Box::new(InMemorySegment {
            id: aid,
            capacity,
            data: Some(data),
            disk: Arc::clone(&self.disk),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn memory_write_and_read() {
        let mut segment = InMemorySegment::new(0, 16);
        assert_eq!(segment.write_at(0, b"hello").unwrap(), 5);
        assert_eq!(segment.read_at(0, 5).unwrap(), b"hello");
    }

    #[test]
    fn memory_partial_write() {
        let mut segment = InMemorySegment::new(0, 8);
        assert_eq!(segment.write_at(5, b"abcdef").unwrap(), 3);
        assert_eq!(segment.read_at(5, 3).unwrap(), b"abc");
    }

    #[test]
    fn memory_u64_roundtrip() {
        let mut segment = InMemorySegment::new(0, 8);
        segment.write_u64(0, u64::MAX - 1).unwrap();
        assert_eq!(segment.read_u64(0).unwrap(), u64::MAX - 1);
    }

    #[test]
    fn memory_read_past_end_fails() {
        let segment = InMemorySegment::new(0, 8);
        let result = segment.read_at(4, 5);
        assert!(matches!(result, Err(StorageError::OutOfBounds { .. })));
    }

    #[test]
    fn provider_reactivation_sees_unmapped_bytes() {
        let mut provider = InMemoryProvider::new();

        let mut segment = provider.create(1, 16).unwrap();
        segment.write_at(0, b"kept").unwrap();
        segment.unmap().unwrap();

        let segment = provider.create(1, 16).unwrap();
        assert_eq!(segment.read_at(0, 4).unwrap(), b"kept");
        assert_eq!(provider.creations(1), 2);
        assert_eq!(provider.mapped(1), 1);
        assert_eq!(provider.mapped_ids(), vec![1]);
        assert_eq!(provider.file_count(), 1);
    }

    #[test]
    fn provider_injected_create_failure() {
        let mut provider = InMemoryProvider::new();
        provider.fail_create(2);
        assert!(matches!(
            provider.create(2, 16),
            Err(StorageError::Injected(_))
        ));
        assert_eq!(provider.creations(2), 0);

        provider.allow_create(2);
        assert!(provider.create(2, 16).is_ok());
    }

    #[test]
    fn boxed_segment_results_can_be_unwrapped() {
        let mut provider = InMemoryProvider::new();
        provider.fail_create(3);

        let err = provider.create(3, 16).unwrap_err();
        assert!(matches!(err, StorageError::Injected(_)));

        let segment: Box<dyn Segment> = provider.create(4, 16).unwrap();
        assert!(format!("{segment:?}").contains("InMemorySegment"));
    }

    #[test]
    fn provider_injected_unmap_failure_keeps_mapping() {
        let mut provider = InMemoryProvider::new();
        provider.fail_unmap(0, 1);

        let mut segment = provider.create(0, 16).unwrap();
        assert!(segment.unmap().is_err());
        assert!(segment.is_mapped());
        assert!(segment.unmap().is_ok());
        assert!(!segment.is_mapped());
    }

    proptest! {
        #[test]
        fn write_count_is_bounded_by_remaining_capacity(
            capacity in 1usize..256,
            offset_seed in any::<usize>(),
            data in prop::collection::vec(any::<u8>(), 0..512),
        ) {
            let offset = offset_seed % (capacity + 1);
            let mut segment = InMemorySegment::new(0, capacity);

            let written = segment.write_at(offset, &data).unwrap();
            prop_assert_eq!(written, data.len().min(capacity - offset));
            prop_assert_eq!(segment.read_at(offset, written).unwrap(), &data[..written]);
        }
    }
}

//! Memory-mapped file segments for persistent arenas.

use crate::error::{StorageError, StorageResult};
use crate::segment::{check_range, Segment, SegmentProvider, U64_SIZE};
use memmap2::MmapMut;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Returns the file name used for the arena with the given id.
#[must_use]
pub fn arena_file_name(aid: u64) -> String {
    format!("arena_{aid}.dat")
}

/// A segment backed by a memory-mapped file.
///
/// The file is allocated at full capacity when it is first created and is
/// never truncated afterwards, so re-opening a segment maps the bytes that
/// were flushed by an earlier mapping.
///
/// # Durability
///
/// - `flush()` calls `MmapMut::flush()` to write dirty pages to disk
/// - `unmap()` flushes and then drops the mapping
///
/// # Example
///
/// ```no_run
/// use arenaq_storage::{MmapSegment, Segment};
/// use std::path::Path;
///
/// let mut segment = MmapSegment::open(Path::new("arena_0.dat"), 0, 4096).unwrap();
/// segment.write_u64(0, 42).unwrap();
/// segment.unmap().unwrap();
/// ```
#[derive(Debug)]
pub struct MmapSegment {
    id: u64,
    path: PathBuf,
    capacity: usize,
    map: Option<MmapMut>,
}

impl MmapSegment {
    /// Opens or creates the file at `path` and maps `capacity` bytes of it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `capacity` is zero
    /// - the file exists with a length other than `capacity`
    /// - the file cannot be created, resized or mapped
    pub fn open(path: &Path, id: u64, capacity: usize) -> StorageResult<Self> {
        if capacity == 0 {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot map a zero-capacity segment",
            )));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let len = file.metadata()?.len();
        if len == 0 {
            file.set_len(capacity as u64)?;
        } else if len != capacity as u64 {
            return Err(StorageError::Corrupted(format!(
                "{} has length {len}, expected {capacity}",
                path.display()
            )));
        }

        // SAFETY: the file is opened read-write and sized to `capacity`. The
        // queue directory is locked by its owner, so no other process
        // truncates the file while it is mapped.
        #[allow(unsafe_code)]
        let map = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self {
            id,
            path: path.to_path_buf(),
            capacity,
            map: Some(map),
        })
    }

    /// Returns the path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn map(&self) -> StorageResult<&MmapMut> {
        self.map
            .as_ref()
            .ok_or(StorageError::Unmapped { aid: self.id })
    }

    fn map_mut(&mut self) -> StorageResult<&mut MmapMut> {
        self.map
            .as_mut()
            .ok_or(StorageError::Unmapped { aid: self.id })
    }
}

impl Segment for MmapSegment {
    fn id(&self) -> u64 {
        self.id
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn is_mapped(&self) -> bool {
        self.map.is_some()
    }

    fn write_at(&mut self, offset: usize, data: &[u8]) -> StorageResult<usize> {
        check_range(offset, 0, self.capacity)?;
        let n = data.len().min(self.capacity - offset);
        let map = self.map_mut()?;
        map[offset..offset + n].copy_from_slice(&data[..n]);
        Ok(n)
    }

    fn write_u64(&mut self, offset: usize, value: u64) -> StorageResult<()> {
        check_range(offset, U64_SIZE, self.capacity)?;
        let map = self.map_mut()?;
        map[offset..offset + U64_SIZE].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn read_at(&self, offset: usize, len: usize) -> StorageResult<Vec<u8>> {
        check_range(offset, len, self.capacity)?;
        let map = self.map()?;
        Ok(map[offset..offset + len].to_vec())
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.map()?.flush()?;
        Ok(())
    }

    fn unmap(&mut self) -> StorageResult<()> {
        let Some(map) = self.map.as_ref() else {
            return Ok(());
        };
        map.flush()?;
        self.map = None;
        Ok(())
    }
}

/// Creates [`MmapSegment`]s as `arena_<aid>.dat` files inside a directory.
#[derive(Debug, Clone)]
pub struct MmapProvider {
    dir: PathBuf,
}

impl MmapProvider {
    /// Creates a provider for the given directory.
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Creates a provider, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_create_dir(dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self::new(dir))
    }

    /// Returns the backing file path for `aid`.
    #[must_use]
    pub fn path_for(&self, aid: u64) -> PathBuf {
        self.dir.join(arena_file_name(aid))
    }
}

impl SegmentProvider for MmapProvider {
    fn create(&mut self, aid: u64, capacity: usize) -> StorageResult<Box<dyn Segment>> {
        let segment = MmapSegment::open(&self.path_for(aid), aid, capacity)?;
        Ok(Box::new(segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn mmap_create_allocates_capacity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("arena_0.dat");

        let segment = MmapSegment::open(&path, 0, 64).unwrap();
        assert!(segment.is_mapped());
        assert_eq!(segment.capacity(), 64);
        assert_eq!(fs::metadata(&path).unwrap().len(), 64);
    }

    #[test]
    fn mmap_zero_capacity_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("arena_0.dat");

        let result = MmapSegment::open(&path, 0, 0);
        assert!(matches!(result, Err(StorageError::Io(_))));
    }

    #[test]
    fn mmap_write_is_bounded_by_capacity() {
        let dir = tempdir().unwrap();
        let mut segment = MmapSegment::open(&dir.path().join("a.dat"), 0, 16).unwrap();

        assert_eq!(segment.write_at(10, b"hello world").unwrap(), 6);
        assert_eq!(segment.read_at(10, 6).unwrap(), b"hello ");
        assert_eq!(segment.write_at(16, b"x").unwrap(), 0);
        assert!(matches!(
            segment.write_at(17, b"x"),
            Err(StorageError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn mmap_write_u64_must_fit() {
        let dir = tempdir().unwrap();
        let mut segment = MmapSegment::open(&dir.path().join("a.dat"), 0, 16).unwrap();

        segment.write_u64(8, 0xDEAD_BEEF).unwrap();
        assert_eq!(segment.read_u64(8).unwrap(), 0xDEAD_BEEF);
        assert!(matches!(
            segment.write_u64(9, 1),
            Err(StorageError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn mmap_unmap_persists_and_blocks_access() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("arena_3.dat");

        {
            let mut segment = MmapSegment::open(&path, 3, 32).unwrap();
            segment.write_at(0, b"persistent").unwrap();
            segment.unmap().unwrap();
            assert!(!segment.is_mapped());
            assert!(matches!(
                segment.read_at(0, 1),
                Err(StorageError::Unmapped { aid: 3 })
            ));
            // second unmap is a no-op
            segment.unmap().unwrap();
        }

        let segment = MmapSegment::open(&path, 3, 32).unwrap();
        assert_eq!(segment.read_at(0, 10).unwrap(), b"persistent");
    }

    #[test]
    fn mmap_wrong_length_is_corrupted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("arena_0.dat");
        fs::write(&path, [0u8; 10]).unwrap();

        let result = MmapSegment::open(&path, 0, 32);
        assert!(matches!(result, Err(StorageError::Corrupted(_))));
    }

    #[test]
    fn provider_names_files_by_id() {
        let dir = tempdir().unwrap();
        let mut provider = MmapProvider::with_create_dir(&dir.path().join("q")).unwrap();

        let segment = provider.create(7, 128).unwrap();
        assert_eq!(segment.id(), 7);
        assert!(dir.path().join("q").join("arena_7.dat").exists());
        assert_eq!(provider.path_for(7), dir.path().join("q").join("arena_7.dat"));
    }
}

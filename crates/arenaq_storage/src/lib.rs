//! # arenaq Storage
//!
//! Segment capability for arenaq.
//!
//! This crate provides the lowest-level storage abstraction for arenaq:
//! fixed-capacity byte regions ("arenas") identified by an integer id.
//! Segments are **opaque byte regions** - they do not interpret the data
//! they hold.
//!
//! ## Design Principles
//!
//! - Segments are simple byte regions (write at offset, flush, unmap)
//! - No knowledge of record headers, queue positions or windows
//! - A [`SegmentProvider`] decides where the bytes of a segment live
//! - The queue core owns all format interpretation
//!
//! ## Available Segments
//!
//! - [`MmapSegment`] - memory-mapped `arena_<aid>.dat` files
//! - [`InMemorySegment`] - for testing, with fault injection via
//!   [`InMemoryProvider`]
//!
//! ## Example
//!
//! ```rust
//! use arenaq_storage::{InMemoryProvider, SegmentProvider};
//!
//! let mut provider = InMemoryProvider::new();
//! let mut segment = provider.create(0, 16).unwrap();
//! segment.write_u64(0, 5).unwrap();
//! assert_eq!(segment.write_at(8, b"hello world").unwrap(), 8);
//! segment.unmap().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod mmap;
mod segment;

pub use error::{StorageError, StorageResult};
pub use memory::{InMemoryProvider, InMemorySegment};
pub use mmap::{arena_file_name, MmapProvider, MmapSegment};
pub use segment::{Segment, SegmentProvider, U64_SIZE};

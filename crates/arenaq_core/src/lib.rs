//! # arenaq Core
//!
//! Storage core of a persistent, disk-backed queue.
//!
//! This crate provides:
//! - Arena window management: a bounded set of memory-mapped arenas that
//!   follows the head of the queue, with the tail arena always resident
//! - The append path: length-prefixed records written across arenas with
//!   transparent rollover
//! - Position index implementations for head and tail bookkeeping
//! - A thread-safe [`Queue`] facade over a locked queue directory
//!
//! The read path is not part of this crate.
//!
//! ## Example
//!
//! ```rust
//! use arenaq_core::{ArenaId, MemoryIndex, Position, Queue, QueueConfig};
//! use arenaq_storage::InMemoryProvider;
//! use std::sync::Arc;
//!
//! let config = QueueConfig::new().arena_size(16).memory_size(48);
//! let queue = Queue::with_parts(
//!     config,
//!     Box::new(InMemoryProvider::new()),
//!     Arc::new(MemoryIndex::new()),
//! )
//! .unwrap();
//!
//! queue.enqueue(&[0u8; 10]).unwrap();
//! assert_eq!(queue.tail(), Position::new(ArenaId::new(1), 2));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod arena;
mod config;
mod dir;
mod error;
pub mod index;
pub mod queue;
mod types;

pub use arena::ArenaManager;
pub use config::{QueueConfig, DEFAULT_ARENA_SIZE};
pub use dir::QueueDir;
pub use error::{CoreError, CoreResult, ReleaseFailure};
pub use index::{FileIndex, MemoryIndex, PositionIndex};
pub use queue::{Appender, Queue, LENGTH_HEADER_SIZE};
pub use types::{ArenaId, Position, WindowSize};

//! # arenaq Testkit
//!
//! Test utilities for arenaq.
//!
//! This crate provides:
//! - Test fixtures for file-backed and in-memory queues
//! - Property-based test generators using proptest
//! - A record reader that decodes arena files without the queue
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust
//! use arenaq_testkit::prelude::*;
//!
//! let queue = TestQueue::file(small_config(64, 2));
//! queue.enqueue(b"hello").unwrap();
//! let records = queue.read_back();
//! assert_eq!(records, vec![b"hello".to_vec()]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;

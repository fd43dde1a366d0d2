//! Benchmarks for arenaq.
//!
//! The benchmarks live under `benches/`; this crate only carries the
//! shared helpers they use.

pub mod utils;

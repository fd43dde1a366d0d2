//! Property-based test generators using proptest.
//!
//! Provides strategies for generating payloads and queue shapes
//! that respect the configuration rules.

use arenaq_core::{QueueConfig, LENGTH_HEADER_SIZE};
use proptest::prelude::*;

/// Strategy for generating a single payload of up to `max_len` bytes.
pub fn payload_strategy(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Strategy for generating a sequence of payloads.
pub fn payloads_strategy(
    max_len: usize,
    min_count: usize,
    max_count: usize,
) -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(payload_strategy(max_len), min_count..max_count)
}

/// Strategy for generating valid arena sizes.
///
/// Sizes start at the header size and stay small so records cross
/// arena boundaries often.
pub fn arena_size_strategy() -> impl Strategy<Value = usize> {
    LENGTH_HEADER_SIZE..=64
}

/// Strategy for generating window lengths, including the empty window.
pub fn window_strategy() -> impl Strategy<Value = usize> {
    0usize..6
}

/// Strategy for generating valid queue configurations.
///
/// Roughly one in five configurations has an unbounded window.
pub fn config_strategy() -> impl Strategy<Value = QueueConfig> {
    (arena_size_strategy(), window_strategy(), 0u8..5).prop_map(|(arena, window, pick)| {
        let config = QueueConfig::new().arena_size(arena);
        if pick == 0 {
            config.unbounded_memory()
        } else {
            config.memory_size((window + 1) * arena)
        }
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn payload_respects_bound(payload in payload_strategy(40)) {
            prop_assert!(payload.len() <= 40);
        }

        #[test]
        fn generated_config_is_valid(config in config_strategy()) {
            prop_assert!(config.validate().is_ok());
            prop_assert!(config.arena_size >= LENGTH_HEADER_SIZE);
        }

        #[test]
        fn payload_count_in_range(payloads in payloads_strategy(8, 2, 5)) {
            prop_assert!((2..5).contains(&payloads.len()));
        }
    }
}

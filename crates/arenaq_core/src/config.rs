//! Queue configuration.

use crate::error::{CoreError, CoreResult};
use crate::queue::LENGTH_HEADER_SIZE;
use crate::types::WindowSize;

/// Default arena size: 128 MiB.
pub const DEFAULT_ARENA_SIZE: usize = 128 * 1024 * 1024;

/// Configuration for opening a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Size of a single arena file in bytes.
    pub arena_size: usize,

    /// Memory budget for mapped arenas in bytes (`None` = unbounded).
    pub memory_size: Option<usize>,

    /// Whether to create the queue directory if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            arena_size: DEFAULT_ARENA_SIZE,
            memory_size: None,
            create_if_missing: true,
        }
    }
}

impl QueueConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the arena size.
    #[must_use]
    pub const fn arena_size(mut self, size: usize) -> Self {
        self.arena_size = size;
        self
    }

    /// Sets the memory budget. Zero means unbounded.
    #[must_use]
    pub const fn memory_size(mut self, size: usize) -> Self {
        self.memory_size = if size == 0 { None } else { Some(size) };
        self
    }

    /// Removes the memory budget.
    #[must_use]
    pub const fn unbounded_memory(mut self) -> Self {
        self.memory_size = None;
        self
    }

    /// Sets whether to create the queue directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Returns the active window derived from the memory budget.
    ///
    /// One arena's worth of the budget is held back, so a budget of `m`
    /// bytes allows `m / arena_size - 1` arenas ahead of the head.
    #[must_use]
    pub fn window_size(&self) -> WindowSize {
        match self.memory_size {
            Some(memory) => {
                let arenas = memory.checked_div(self.arena_size).unwrap_or(0);
                WindowSize::Bounded(arenas.saturating_sub(1) as u64)
            }
            None => WindowSize::Unbounded,
        }
    }

    /// Checks that the configuration can back a queue.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if an arena cannot hold a length header.
    pub fn validate(&self) -> CoreResult<()> {
        if self.arena_size < LENGTH_HEADER_SIZE {
            return Err(CoreError::invalid_config(format!(
                "arena size {} is smaller than the {LENGTH_HEADER_SIZE}-byte length header",
                self.arena_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = QueueConfig::default();
        assert_eq!(config.arena_size, DEFAULT_ARENA_SIZE);
        assert_eq!(config.memory_size, None);
        assert!(config.create_if_missing);
        assert_eq!(config.window_size(), WindowSize::Unbounded);
    }

    #[test]
    fn builder_pattern() {
        let config = QueueConfig::new()
            .arena_size(1024)
            .memory_size(4096)
            .create_if_missing(false);

        assert_eq!(config.arena_size, 1024);
        assert_eq!(config.memory_size, Some(4096));
        assert!(!config.create_if_missing);
        assert_eq!(config.window_size(), WindowSize::Bounded(3));
    }

    #[test]
    fn zero_memory_is_unbounded() {
        let config = QueueConfig::new().arena_size(16).memory_size(0);
        assert_eq!(config.window_size(), WindowSize::Unbounded);

        let config = QueueConfig::new().memory_size(64).unbounded_memory();
        assert_eq!(config.memory_size, None);
    }

    #[test]
    fn small_budget_gives_empty_window() {
        let config = QueueConfig::new().arena_size(16).memory_size(20);
        assert_eq!(config.window_size(), WindowSize::Bounded(0));

        let config = QueueConfig::new().arena_size(16).memory_size(8);
        assert_eq!(config.window_size(), WindowSize::Bounded(0));
    }

    #[test]
    fn arena_must_hold_header() {
        assert!(QueueConfig::new().arena_size(8).validate().is_ok());
        let err = QueueConfig::new().arena_size(7).validate().unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }
}

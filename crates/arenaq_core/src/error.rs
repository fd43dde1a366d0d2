//! Error types for arenaq core.

use crate::types::{ArenaId, WindowSize};
use arenaq_storage::StorageError;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in arenaq core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Segment read or write error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The requested arena is outside the window and cannot be activated.
    #[error("trying to access inactive {aid} (head {head}, window {window})")]
    InactiveArena {
        /// The requested arena.
        aid: ArenaId,
        /// Head arena at the time of the request.
        head: ArenaId,
        /// The active window.
        window: WindowSize,
    },

    /// Creating or mapping an arena failed.
    #[error("failed to activate {aid}: {source}")]
    Activation {
        /// The arena being activated.
        aid: ArenaId,
        /// The underlying segment error.
        #[source]
        source: StorageError,
    },

    /// Flushing or unmapping an arena failed.
    #[error("failed to release {aid}: {source}")]
    Release {
        /// The arena being released.
        aid: ArenaId,
        /// The underlying segment error.
        #[source]
        source: StorageError,
    },

    /// One or more arenas could not be released while closing.
    #[error("failed to release {} arena(s) on close: {}", .failures.len(), ReleaseFailures(.failures))]
    CloseFailed {
        /// Every failure, in arena order.
        failures: Vec<ReleaseFailure>,
    },

    /// The configuration is not usable.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// Another process holds the queue directory lock.
    #[error("queue locked: another process has exclusive access")]
    QueueLocked,

    /// The queue directory or index file is malformed.
    #[error("invalid queue format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// A segment accepted no bytes where space was expected.
    #[error("write stalled at {aid} offset {offset}")]
    WriteStalled {
        /// The arena being written.
        aid: ArenaId,
        /// The offset of the stalled write.
        offset: usize,
    },
}

impl CoreError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Returns `true` for the inactive-arena error.
    #[must_use]
    pub fn is_inactive_arena(&self) -> bool {
        matches!(self, Self::InactiveArena { .. })
    }
}

/// A single arena that could not be released.
#[derive(Debug, Error)]
#[error("{aid}: {source}")]
pub struct ReleaseFailure {
    /// The arena that stayed mapped.
    pub aid: ArenaId,
    /// Why the release failed.
    #[source]
    pub source: StorageError,
}

struct ReleaseFailures<'a>(&'a [ReleaseFailure]);

impl fmt::Display for ReleaseFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_failed_lists_every_arena() {
        let err = CoreError::CloseFailed {
            failures: vec![
                ReleaseFailure {
                    aid: ArenaId::new(1),
                    source: StorageError::Injected("a".into()),
                },
                ReleaseFailure {
                    aid: ArenaId::new(4),
                    source: StorageError::Injected("b".into()),
                },
            ],
        };
        let message = err.to_string();
        assert!(message.starts_with("failed to release 2 arena(s)"));
        assert!(message.contains("arena:1"));
        assert!(message.contains("arena:4"));
    }

    #[test]
    fn inactive_arena_message() {
        let err = CoreError::InactiveArena {
            aid: ArenaId::new(9),
            head: ArenaId::new(2),
            window: WindowSize::Bounded(3),
        };
        assert!(err.is_inactive_arena());
        assert_eq!(
            err.to_string(),
            "trying to access inactive arena:9 (head arena:2, window 3 arenas)"
        );
    }
}

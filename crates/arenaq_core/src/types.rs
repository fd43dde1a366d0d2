//! Core type definitions for arenaq.

use std::fmt;

/// Identifier of an arena (one fixed-size segment of the queue).
///
/// Arena IDs start at zero, grow by exactly one as new arenas are created
/// and are never reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArenaId(pub u64);

impl ArenaId {
    /// Creates a new arena ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the ID of the arena that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arena:{}", self.0)
    }
}

/// A location in the queue: an arena and a byte offset inside it.
///
/// Positions produced by the write path always satisfy
/// `offset < arena_size`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// The arena holding the position.
    pub aid: ArenaId,
    /// Byte offset within the arena.
    pub offset: usize,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(aid: ArenaId, offset: usize) -> Self {
        Self { aid, offset }
    }

    /// Returns the first byte of the given arena.
    #[must_use]
    pub const fn start_of(aid: ArenaId) -> Self {
        Self { aid, offset: 0 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.aid.0, self.offset)
    }
}

/// How many arenas may stay mapped ahead of the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSize {
    /// No memory budget: arenas are never evicted by the window policy.
    Unbounded,
    /// At most this many arenas, counted from the head arena.
    Bounded(u64),
}

impl WindowSize {
    /// Returns `true` if `aid` may be resident while the head is at `head`.
    ///
    /// Arenas behind the head are always admitted.
    #[must_use]
    pub fn admits(self, head: ArenaId, aid: ArenaId) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Bounded(n) => match head.0.checked_add(n) {
                Some(end) => aid.0 < end,
                None => true,
            },
        }
    }

    /// Returns `true` if the whole inclusive range `head..=tail` fits.
    #[must_use]
    pub fn covers(self, head: ArenaId, tail: ArenaId) -> bool {
        self.admits(head, tail)
    }

    /// Returns the window bound, or `None` when unbounded.
    #[must_use]
    pub const fn limit(self) -> Option<u64> {
        match self {
            Self::Unbounded => None,
            Self::Bounded(n) => Some(n),
        }
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("unbounded"),
            Self::Bounded(n) => write!(f, "{n} arenas"),
        }
    }
}

//! Windowed arena manager.

use crate::config::QueueConfig;
use crate::error::{CoreError, CoreResult, ReleaseFailure};
use crate::index::PositionIndex;
use crate::types::{ArenaId, WindowSize};
use arenaq_storage::{Segment, SegmentProvider};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Keeps a bounded window of arenas mapped in memory.
///
/// Arenas from the head onwards stay resident while they fit in the
/// window; the arena holding the tail is always resident, even when it
/// lies outside the window. Resident arenas are keyed directly by id, so
/// ids may be activated in any order.
///
/// # Concurrency
///
/// The manager performs no locking. All mutating methods take `&mut self`;
/// callers sharing a queue between threads must serialize access, as
/// [`crate::Queue`] does with a mutex around each append.
pub struct ArenaManager {
    provider: Box<dyn SegmentProvider>,
    index: Arc<dyn PositionIndex>,
    arena_size: usize,
    window: WindowSize,
    arenas: BTreeMap<ArenaId, Box<dyn Segment>>,
}

impl ArenaManager {
    /// Creates a manager for a queue whose head is in `head` and tail in
    /// `tail`.
    ///
    /// Activates every arena from `head` that fits in the window, up to the
    /// tail, then the tail arena itself if the window stops short of it.
    ///
    /// # Errors
    ///
    /// Returns an activation error if any arena cannot be mapped. Arenas
    /// activated before the failure are released first.
    pub fn new(
        config: &QueueConfig,
        provider: Box<dyn SegmentProvider>,
        head: ArenaId,
        tail: ArenaId,
        index: Arc<dyn PositionIndex>,
    ) -> CoreResult<Self> {
        let mut manager = Self {
            provider,
            index,
            arena_size: config.arena_size,
            window: config.window_size(),
            arenas: BTreeMap::new(),
        };

        if let Err(e) = manager.activate_initial(head, tail) {
            if let Err(close_err) = manager.close() {
                warn!(error = %close_err, "failed to release arenas after activation error");
            }
            return Err(e);
        }

        debug!(
            head = head.as_u64(),
            tail = tail.as_u64(),
            window = %manager.window,
            resident = manager.arenas.len(),
            "arena manager ready"
        );
        Ok(manager)
    }

    fn activate_initial(&mut self, head: ArenaId, tail: ArenaId) -> CoreResult<()> {
        let mut aid = head;
        while aid <= tail && self.window.admits(head, aid) {
            self.add_arena(aid)?;
            aid = aid.next();
        }

        if !self.window.covers(head, tail) {
            self.add_arena(tail)?;
        }
        Ok(())
    }

    /// Returns the resident arena `aid`, activating it if the window
    /// allows.
    ///
    /// # Errors
    ///
    /// Returns `InactiveArena` if `aid` is not resident and lies beyond the
    /// window measured from the current head, or an activation error if
    /// mapping fails.
    pub fn get_arena(&mut self, aid: ArenaId) -> CoreResult<&mut dyn Segment> {
        if !self.arenas.contains_key(&aid) {
            let head = self.index.head().aid;
            if !self.window.admits(head, aid) {
                return Err(CoreError::InactiveArena {
                    aid,
                    head,
                    window: self.window,
                });
            }
        }
        self.add_arena(aid)
    }

    /// Activates every arena in `start..=end`.
    ///
    /// # Errors
    ///
    /// Stops at the first arena that cannot be activated.
    pub fn activate_range(&mut self, start: ArenaId, end: ArenaId) -> CoreResult<()> {
        for aid in start.as_u64()..=end.as_u64() {
            self.get_arena(ArenaId::new(aid))?;
        }
        Ok(())
    }

    /// Returns the highest arena guaranteed to be resident.
    ///
    /// This is the tail arena, or the last arena of the window when the
    /// window ends before the tail. With an empty window the result is the
    /// arena just behind the head.
    #[must_use]
    pub fn max_active_aid(&self) -> ArenaId {
        let head = self.index.head().aid;
        let tail = self.index.tail().aid;
        match self.window.limit() {
            Some(n) => {
                let last = head.as_u64().saturating_add(n).saturating_sub(1);
                ArenaId::new(last).min(tail)
            }
            None => tail,
        }
    }

    /// Returns arena `aid`, creating and mapping its file if it is not
    /// resident.
    ///
    /// Unlike [`Self::get_arena`] this ignores the window; the append path
    /// uses it to activate the next tail arena.
    ///
    /// # Errors
    ///
    /// Returns an activation error if the file cannot be created or mapped.
    pub fn add_arena(&mut self, aid: ArenaId) -> CoreResult<&mut dyn Segment> {
        let segment = match self.arenas.entry(aid) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let segment = self
                    .provider
                    .create(aid.as_u64(), self.arena_size)
                    .map_err(|source| CoreError::Activation { aid, source })?;
                debug!(aid = aid.as_u64(), "activated arena");
                entry.insert(segment)
            }
        };
        Ok(segment.as_mut())
    }

    /// Releases arena `aid`.
    ///
    /// Without `strict`, an arena the window still admits stays resident.
    /// Arenas that are not resident are ignored.
    ///
    /// # Errors
    ///
    /// Returns a release error if the unmap fails; the arena then stays
    /// resident.
    pub fn unmap_arena(&mut self, aid: ArenaId, strict: bool) -> CoreResult<()> {
        let Some(segment) = self.arenas.get_mut(&aid) else {
            return Ok(());
        };

        if !strict && self.window.admits(self.index.head().aid, aid) {
            return Ok(());
        }

        segment
            .unmap()
            .map_err(|source| CoreError::Release { aid, source })?;
        self.arenas.remove(&aid);
        debug!(aid = aid.as_u64(), strict, "released arena");
        Ok(())
    }

    /// Releases every arena in `start..=end`.
    ///
    /// # Errors
    ///
    /// Stops at the first arena that fails to unmap.
    pub fn unmap_range(&mut self, start: ArenaId, end: ArenaId, strict: bool) -> CoreResult<()> {
        for aid in start.as_u64()..=end.as_u64() {
            self.unmap_arena(ArenaId::new(aid), strict)?;
        }
        Ok(())
    }

    /// Flushes every resident arena.
    ///
    /// # Errors
    ///
    /// Stops at the first arena that fails to flush.
    pub fn flush(&mut self) -> CoreResult<()> {
        for (&aid, segment) in &mut self.arenas {
            segment
                .flush()
                .map_err(|source| CoreError::Release { aid, source })?;
        }
        Ok(())
    }

    /// Unmaps every resident arena.
    ///
    /// Keeps going after a failure. Arenas that failed stay resident and
    /// are all reported in a single `CloseFailed` error.
    ///
    /// # Errors
    ///
    /// Returns `CloseFailed` if any arena could not be unmapped.
    pub fn close(&mut self) -> CoreResult<()> {
        let mut failures = Vec::new();

        self.arenas.retain(|&aid, segment| match segment.unmap() {
            Ok(()) => false,
            Err(source) => {
                warn!(aid = aid.as_u64(), error = %source, "failed to release arena");
                failures.push(ReleaseFailure { aid, source });
                true
            }
        });

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CoreError::CloseFailed { failures })
        }
    }

    /// Returns `true` if `aid` is currently mapped.
    #[must_use]
    pub fn is_resident(&self, aid: ArenaId) -> bool {
        self.arenas.contains_key(&aid)
    }

    /// Returns the ids of all mapped arenas in ascending order.
    #[must_use]
    pub fn resident_arenas(&self) -> Vec<ArenaId> {
        self.arenas.keys().copied().collect()
    }

    /// Returns the active window.
    #[must_use]
    pub fn window(&self) -> WindowSize {
        self.window
    }

    /// Returns the arena size in bytes.
    #[must_use]
    pub fn arena_size(&self) -> usize {
        self.arena_size
    }
}

impl Drop for ArenaManager {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "arenas left mapped on drop");
        }
    }
}

impl std::fmt::Debug for ArenaManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaManager")
            .field("arena_size", &self.arena_size)
            .field("window", &self.window)
            .field("resident", &self.resident_arenas())
            .finish_non_exhaustive()
    }
}

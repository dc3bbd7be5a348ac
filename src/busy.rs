use std::hash::Hash;

use dashmap::DashSet;
use log;

// --- Busy Guard ---

/// Registry of owners that currently have a stacking run in flight.
///
/// Process-wide shared state with an explicit lifecycle: the host creates one
/// guard at startup, hands a reference to every `consolidate` call, and drops
/// it at shutdown. Membership mutations are atomic per owner, so an owner can
/// never be admitted to two concurrently-active runs.
#[derive(Debug)]
pub struct BusyGuard<K: Eq + Hash> {
    active: DashSet<K>,
}

impl<K: Eq + Hash> BusyGuard<K> {
    pub fn new() -> Self {
        BusyGuard {
            active: DashSet::new(),
        }
    }

    /// Admits the owner if it has no active run. Returns false (and changes
    /// nothing) when a run is already in flight for this owner.
    pub fn try_enter(&self, owner: K) -> bool {
        self.active.insert(owner)
    }

    /// Unconditionally removes the owner's membership. Success and failure
    /// paths alike must end up here.
    pub fn leave(&self, owner: &K) {
        let _ = self.active.remove(owner);
    }

    pub fn is_busy(&self, owner: &K) -> bool {
        self.active.contains(owner)
    }

    /// Number of owners with a run in flight.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

impl<K: Eq + Hash> Default for BusyGuard<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope guard that releases a busy entry on drop, so the entry is removed
/// whether the run completes, errors, or unwinds.
pub(crate) struct BusyPass<'a, K: Eq + Hash + std::fmt::Debug> {
    guard: &'a BusyGuard<K>,
    owner: &'a K,
}

impl<'a, K: Eq + Hash + std::fmt::Debug> BusyPass<'a, K> {
    pub(crate) fn new(guard: &'a BusyGuard<K>, owner: &'a K) -> Self {
        BusyPass { guard, owner }
    }
}

impl<K: Eq + Hash + std::fmt::Debug> Drop for BusyPass<'_, K> {
    fn drop(&mut self) {
        log::debug!("[BusyGuard] Releasing owner {:?}", self.owner);
        self.guard.leave(self.owner);
    }
}

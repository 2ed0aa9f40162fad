//! The registry of independent GC families.
//!
//! A family is an application-defined root namespace: registering one hands
//! the collector a [`RootsProvider`] callback that enumerates the hashes the
//! application currently considers directly live (branch heads, named
//! snapshots, pins). Each family carries its own generation counter, so
//! families sweep at their own pace with no cross-family coordination.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use grove_types::{FamilyId, Generation, NodeHash};

use crate::error::{GcError, GcResult};

/// Enumerates a family's current root hashes.
///
/// Supplied by the application at registration time. Called once per sweep,
/// at the start of the marking phase; the returned set defines what that
/// sweep considers directly live. Roots that no longer resolve in the store
/// are skipped by the sweep, not fatal.
pub trait RootsProvider: Send + Sync {
    /// The family's current root hashes.
    fn current_roots(&self) -> Vec<NodeHash>;
}

impl<F> RootsProvider for F
where
    F: Fn() -> Vec<NodeHash> + Send + Sync,
{
    fn current_roots(&self) -> Vec<NodeHash> {
        self()
    }
}

struct FamilyEntry {
    roots: Arc<dyn RootsProvider>,
    /// Last allocated generation; 0 means no sweep has been allocated yet.
    generation: AtomicU64,
    /// Last generation whose marking phase ran to completion; 0 means none.
    completed: AtomicU64,
}

/// Tracks the set of registered GC families and their generation counters.
pub struct FamilyRegistry {
    families: RwLock<HashMap<FamilyId, Arc<FamilyEntry>>>,
    next_id: AtomicU64,
}

impl FamilyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            families: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new family with its roots provider. Family ids are never
    /// reused.
    pub fn register_family(&self, roots: Arc<dyn RootsProvider>) -> FamilyId {
        let id = FamilyId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let entry = Arc::new(FamilyEntry {
            roots,
            generation: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        });
        self.families
            .write()
            .expect("lock poisoned")
            .insert(id, entry);
        debug!(family = %id, "registered family");
        id
    }

    /// Deregister a family. Returns `true` if it was registered.
    ///
    /// Crate-internal: deregistration must also purge the family's mark
    /// records and sweep token, so the public path is
    /// [`GcCoordinator::deregister_family`](crate::GcCoordinator::deregister_family).
    pub(crate) fn deregister_family(&self, family: FamilyId) -> bool {
        let removed = self
            .families
            .write()
            .expect("lock poisoned")
            .remove(&family)
            .is_some();
        if removed {
            debug!(family = %family, "deregistered family");
        }
        removed
    }

    /// Allocate the next generation for a family. Monotonically increasing
    /// per family, never reused; the first allocated generation is 1.
    pub fn next_generation(&self, family: FamilyId) -> GcResult<Generation> {
        let entry = self.entry(family)?;
        Ok(entry.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The family's most recently allocated generation, or `None` if no
    /// sweep has been allocated yet.
    pub fn current_generation(&self, family: FamilyId) -> Option<Generation> {
        let entry = self.entry(family).ok()?;
        match entry.generation.load(Ordering::SeqCst) {
            0 => None,
            g => Some(g),
        }
    }

    /// Record that a family's marking phase completed at `generation`.
    pub fn mark_completed(&self, family: FamilyId, generation: Generation) -> GcResult<()> {
        let entry = self.entry(family)?;
        entry.completed.fetch_max(generation, Ordering::SeqCst);
        Ok(())
    }

    /// The family's most recently *completed* generation, or `None` if no
    /// sweep has ever run to completion. Reclamation decisions consult this,
    /// never the allocated counter, so an aborted or cancelled sweep's
    /// partial marks are never treated as a complete reachability picture.
    pub fn last_completed(&self, family: FamilyId) -> Option<Generation> {
        let entry = self.entry(family).ok()?;
        match entry.completed.load(Ordering::SeqCst) {
            0 => None,
            g => Some(g),
        }
    }

    /// Enumerate the family's current roots via its provider.
    pub fn roots_of(&self, family: FamilyId) -> GcResult<Vec<NodeHash>> {
        let entry = self.entry(family)?;
        Ok(entry.roots.current_roots())
    }

    /// All registered family ids, in sorted order.
    pub fn families(&self) -> Vec<FamilyId> {
        let families = self.families.read().expect("lock poisoned");
        let mut ids: Vec<FamilyId> = families.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Returns `true` if the family is registered.
    pub fn contains(&self, family: FamilyId) -> bool {
        self.families
            .read()
            .expect("lock poisoned")
            .contains_key(&family)
    }

    /// Number of registered families.
    pub fn len(&self) -> usize {
        self.families.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no families are registered.
    pub fn is_empty(&self) -> bool {
        self.families.read().expect("lock poisoned").is_empty()
    }

    fn entry(&self, family: FamilyId) -> GcResult<Arc<FamilyEntry>> {
        self.families
            .read()
            .expect("lock poisoned")
            .get(&family)
            .cloned()
            .ok_or(GcError::UnknownFamily(family))
    }
}

impl Default for FamilyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FamilyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FamilyRegistry")
            .field("family_count", &self.len())
            .finish()
    }
}

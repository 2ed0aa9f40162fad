//! The sweep coordinator.
//!
//! A sweep for one family moves through three phases: Idle, Marking (allocate
//! a generation, traverse the DAG from the family's current roots, mark every
//! reached node), and Reclaiming (delete nodes no registered family's last
//! completed sweep reached), then back to Idle. Sweeps for the same family
//! are serialized by a per-family token; sweeps for different families run
//! concurrently and never touch each other's mark state.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use grove_store::{BlobStore, HashStore, StoreError};
use grove_types::{FamilyId, Generation, NodeHash, NodeId};

use crate::error::{GcError, GcResult};
use crate::marks::MarkTable;
use crate::registry::FamilyRegistry;

/// Counts reported by a completed (or cancelled) sweep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SweepReport {
    /// The family this sweep ran for.
    pub family: FamilyId,
    /// The generation allocated for this sweep.
    pub generation: Generation,
    /// Nodes marked during the traversal.
    pub marked: usize,
    /// Nodes deleted during reclamation.
    pub reclaimed: usize,
    /// Roots that no longer resolved in the store and were skipped.
    pub stale_roots: usize,
    /// Reclamation candidates kept because a surviving node still referenced
    /// them — this signals a root-provider bug, not normal operation.
    pub unexpected_live_children: usize,
    /// `true` if the sweep was cancelled; no reclamation was performed.
    pub cancelled: bool,
}

impl SweepReport {
    fn new(family: FamilyId, generation: Generation) -> Self {
        Self {
            family,
            generation,
            marked: 0,
            reclaimed: 0,
            stale_roots: 0,
            unexpected_live_children: 0,
            cancelled: false,
        }
    }
}

/// Orchestrates garbage-collection sweeps over a shared [`HashStore`].
///
/// The coordinator owns the mark table and consults the [`FamilyRegistry`]
/// for roots and generation counters. Reclamation decisions only ever consult
/// each family's last *completed* generation, so partial marks left by an
/// aborted or cancelled sweep are harmless garbage regenerated by the next
/// sweep.
pub struct GcCoordinator<B: BlobStore> {
    store: Arc<HashStore<B>>,
    registry: Arc<FamilyRegistry>,
    marks: Arc<MarkTable>,
    /// Per-family mutual-exclusion tokens: two sweeps for the same family
    /// must never interleave generation allocation.
    sweep_tokens: Mutex<HashMap<FamilyId, Arc<Mutex<()>>>>,
}

impl<B: BlobStore> GcCoordinator<B> {
    /// Create a coordinator over the given store and family registry.
    pub fn new(store: Arc<HashStore<B>>, registry: Arc<FamilyRegistry>) -> Self {
        Self {
            store,
            registry,
            marks: Arc::new(MarkTable::new()),
            sweep_tokens: Mutex::new(HashMap::new()),
        }
    }

    /// The mark table this coordinator records liveness in.
    pub fn marks(&self) -> &MarkTable {
        &self.marks
    }

    /// The family registry this coordinator consults.
    pub fn registry(&self) -> &FamilyRegistry {
        &self.registry
    }

    /// Deregister a family and purge all of its mark records.
    pub fn deregister_family(&self, family: FamilyId) -> bool {
        let removed = self.registry.deregister_family(family);
        if removed {
            let purged = self.marks.purge_family(family);
            self.sweep_tokens
                .lock()
                .expect("lock poisoned")
                .remove(&family);
            debug!(family = %family, purged, "purged mark records for deregistered family");
        }
        removed
    }

    /// Run one full sweep for a family.
    pub fn sweep(&self, family: FamilyId) -> GcResult<SweepReport> {
        self.sweep_with_cancel(family, &AtomicBool::new(false))
    }

    /// Run one sweep for a family with cooperative cancellation.
    ///
    /// The flag is checked at every node visit. On cancellation the sweep
    /// returns immediately with `cancelled = true` and performs no
    /// reclamation; any marks already recorded are left behind for the next
    /// sweep to regenerate.
    pub fn sweep_with_cancel(
        &self,
        family: FamilyId,
        cancel: &AtomicBool,
    ) -> GcResult<SweepReport> {
        if !self.registry.contains(family) {
            return Err(GcError::UnknownFamily(family));
        }

        // Serialize sweeps per family. Other families proceed in parallel.
        let token = {
            let mut tokens = self.sweep_tokens.lock().expect("lock poisoned");
            Arc::clone(tokens.entry(family).or_default())
        };
        let _running = token.lock().expect("lock poisoned");

        // --- Marking ---
        let generation = self.registry.next_generation(family)?;
        let epoch = self.store.advance_epoch();
        let mut report = SweepReport::new(family, generation);
        debug!(family = %family, generation, epoch, "marking started");

        let mut stack: Vec<NodeId> = Vec::new();
        for root in self.registry.roots_of(family)? {
            if cancel.load(Ordering::Relaxed) {
                return Ok(self.cancel_sweep(report));
            }
            match self.store.get_by_hash(&root) {
                Ok(node) => stack.push(node.id),
                Err(StoreError::NotFound(_)) => {
                    warn!(family = %family, root = %root.short_hex(), "skipping stale root");
                    report.stale_roots += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        while let Some(id) = stack.pop() {
            if cancel.load(Ordering::Relaxed) {
                return Ok(self.cancel_sweep(report));
            }
            if self.marks.is_live_as_of(id, family, generation) {
                continue;
            }
            self.marks.mark(id, family, generation);
            report.marked += 1;
            for child in self.store.children_of(id)? {
                if !self.marks.is_live_as_of(child, family, generation) {
                    stack.push(child);
                }
            }
        }

        self.registry.mark_completed(family, generation)?;
        debug!(family = %family, generation, marked = report.marked, "marking completed");

        // --- Reclaiming ---
        self.reclaim(&mut report, epoch, cancel)?;

        info!(
            family = %family,
            generation,
            marked = report.marked,
            reclaimed = report.reclaimed,
            stale_roots = report.stale_roots,
            "sweep completed"
        );
        Ok(report)
    }

    fn cancel_sweep(&self, mut report: SweepReport) -> SweepReport {
        report.cancelled = true;
        debug!(
            family = %report.family,
            generation = report.generation,
            marked = report.marked,
            "sweep cancelled; no reclamation performed"
        );
        report
    }

    fn reclaim(
        &self,
        report: &mut SweepReport,
        epoch: u64,
        cancel: &AtomicBool,
    ) -> GcResult<()> {
        let families = self.registry.families();

        // A family that has never completed a sweep has no mark state yet;
        // reclaiming now could delete nodes only its roots reach. Skip
        // reclamation until every registered family has swept at least once.
        let unswept: Vec<FamilyId> = families
            .iter()
            .copied()
            .filter(|f| self.registry.last_completed(*f).is_none())
            .collect();
        if !unswept.is_empty() {
            warn!(
                family = %report.family,
                unswept = ?unswept,
                "skipping reclamation: some families have never completed a sweep"
            );
            return Ok(());
        }

        let completed: Vec<(FamilyId, Generation)> = families
            .iter()
            .filter_map(|f| self.registry.last_completed(*f).map(|g| (*f, g)))
            .collect();

        // Partition the node table into survivors and reclamation candidates.
        // A node survives if any family's last completed sweep reached it, or
        // if it is too young for a full sweep to have had the chance to (the
        // two-epoch grace period protects nodes still being linked by an
        // in-flight insert).
        let mut dead = HashMap::new();
        let mut survivor_childs: HashSet<NodeHash> = HashSet::new();
        for id in self.store.all_ids() {
            if cancel.load(Ordering::Relaxed) {
                report.cancelled = true;
                debug!(
                    family = %report.family,
                    generation = report.generation,
                    "sweep cancelled during reclamation scan; nothing reclaimed"
                );
                return Ok(());
            }
            let node = match self.store.get_by_id(id) {
                Ok(node) => node,
                Err(StoreError::IdNotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            let live = completed
                .iter()
                .any(|(f, g)| self.marks.is_live_as_of(id, *f, *g))
                || epoch.saturating_sub(node.birth_epoch) < 2;
            if live {
                survivor_childs.extend(node.childs.iter().copied());
            } else {
                dead.insert(id, node);
            }
        }

        // Defensive re-check: no surviving node may reference a candidate.
        // Under correct root enumeration this never fires; it guards against
        // root-provider bugs. A rescued candidate's own children become
        // survivor-referenced, so iterate to a fixpoint.
        loop {
            let rescued: Vec<NodeId> = dead
                .iter()
                .filter(|(_, node)| survivor_childs.contains(&node.hash))
                .map(|(id, _)| *id)
                .collect();
            if rescued.is_empty() {
                break;
            }
            for id in rescued {
                if let Some(node) = dead.remove(&id) {
                    warn!(
                        family = %report.family,
                        node = %node.hash.short_hex(),
                        "unexpected live child: a surviving node still references \
                         this reclamation candidate; keeping it"
                    );
                    report.unexpected_live_children += 1;
                    survivor_childs.extend(node.childs.iter().copied());
                }
            }
        }

        for (id, _node) in dead {
            if self.store.remove(id)? {
                report.reclaimed += 1;
            }
            self.marks.purge_node(id);
        }
        Ok(())
    }
}

impl<B: BlobStore> std::fmt::Debug for GcCoordinator<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcCoordinator")
            .field("families", &self.registry.len())
            .field("mark_records", &self.marks.len())
            .finish()
    }
}

//! Per-(node, family) mark state.
//!
//! Each record answers "was this node reached by family F's sweep at
//! generation G" without a table rewrite per sweep step. The record holds the
//! newest generation that marked the node plus a sliding 64-generation bit
//! window over older generations, so a slow sweep at generation G and a newer
//! sweep at G+1 can both be answered from one record. That window is what
//! lets sweeps of the same family overlap in mark state without serializing
//! the whole table.

use std::collections::HashMap;
use std::sync::RwLock;

use grove_types::{FamilyId, Generation, NodeId};

/// Width of the generation bit window.
const WINDOW_BITS: u64 = 64;

/// Mark state for one (node, family) pair.
///
/// Bit `k` of `window` means "reached at generation `generation - k`". Bit 0
/// is always set. Generations more than 63 behind the newest mark fall out of
/// the window and read as unmarked, which only ever errs toward keeping a
/// node alive one sweep longer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkRecord {
    /// Newest generation that reached the node.
    pub generation: Generation,
    /// Bit window over `generation` and the 63 generations before it.
    pub window: u64,
}

impl MarkRecord {
    fn new(generation: Generation) -> Self {
        Self {
            generation,
            window: 1,
        }
    }

    fn mark(&mut self, generation: Generation) {
        if generation > self.generation {
            let shift = generation - self.generation;
            self.window = if shift >= WINDOW_BITS {
                0
            } else {
                self.window << shift
            };
            self.window |= 1;
            self.generation = generation;
        } else {
            let delta = self.generation - generation;
            if delta < WINDOW_BITS {
                self.window |= 1 << delta;
            }
        }
    }

    fn is_marked(&self, generation: Generation) -> bool {
        if generation > self.generation {
            return false;
        }
        let delta = self.generation - generation;
        delta < WINDOW_BITS && (self.window >> delta) & 1 == 1
    }
}

/// The mark table: liveness witnesses for every (node, family) pair a sweep
/// has ever reached.
///
/// Records are created lazily on first mark — a node with no record for a
/// family simply reads as never visited. The (node, family) pair is the map
/// key, so uniqueness is structural.
pub struct MarkTable {
    records: RwLock<HashMap<(NodeId, FamilyId), MarkRecord>>,
}

impl MarkTable {
    /// Create an empty mark table.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Record that `node` was reached by `family`'s sweep at `generation`.
    ///
    /// Creates the record if none exists; otherwise extends the existing
    /// record's window. Idempotent per (node, family, generation).
    pub fn mark(&self, node: NodeId, family: FamilyId, generation: Generation) {
        let mut records = self.records.write().expect("lock poisoned");
        records
            .entry((node, family))
            .and_modify(|r| r.mark(generation))
            .or_insert_with(|| MarkRecord::new(generation));
    }

    /// Was `node` reached by `family`'s sweep at `generation`?
    ///
    /// Used during traversal to skip already-visited nodes and during
    /// reclamation to decide liveness.
    pub fn is_live_as_of(&self, node: NodeId, family: FamilyId, generation: Generation) -> bool {
        let records = self.records.read().expect("lock poisoned");
        records
            .get(&(node, family))
            .is_some_and(|r| r.is_marked(generation))
    }

    /// All families holding a mark record for `node`, in sorted order.
    ///
    /// An empty result means no sweep of any family has ever reached the
    /// node.
    pub fn families_tracking(&self, node: NodeId) -> Vec<FamilyId> {
        let records = self.records.read().expect("lock poisoned");
        let mut families: Vec<FamilyId> = records
            .keys()
            .filter(|(n, _)| *n == node)
            .map(|(_, f)| *f)
            .collect();
        families.sort();
        families
    }

    /// Fetch the raw record for a (node, family) pair.
    pub fn record(&self, node: NodeId, family: FamilyId) -> Option<MarkRecord> {
        let records = self.records.read().expect("lock poisoned");
        records.get(&(node, family)).copied()
    }

    /// Remove all records for a reclaimed node. Returns the count removed.
    pub fn purge_node(&self, node: NodeId) -> usize {
        let mut records = self.records.write().expect("lock poisoned");
        let before = records.len();
        records.retain(|(n, _), _| *n != node);
        before - records.len()
    }

    /// Remove all records for a deregistered family. Returns the count
    /// removed.
    pub fn purge_family(&self, family: FamilyId) -> usize {
        let mut records = self.records.write().expect("lock poisoned");
        let before = records.len();
        records.retain(|(_, f), _| *f != family);
        before - records.len()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no records exist.
    pub fn is_empty(&self) -> bool {
        self.records.read().expect("lock poisoned").is_empty()
    }
}

impl Default for MarkTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MarkTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkTable")
            .field("record_count", &self.len())
            .finish()
    }
}

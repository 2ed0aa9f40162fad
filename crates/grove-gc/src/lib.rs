//! Family-scoped tracing garbage collection for the Grove node store.
//!
//! Liveness in Grove is derived, never counted: each *family* (an independent
//! GC namespace with its own application-defined root set) periodically runs
//! a sweep that traverses the DAG from its current roots and records a mark
//! per reached node. A node is reclaimed only when no registered family's
//! most recently completed sweep reached it and the node is old enough to
//! have been covered by a full sweep since its insertion.
//!
//! Families are independent: marks are keyed per (node, family), generation
//! counters are per family, and sweeps for different families run
//! concurrently without blocking each other. Sweeps for the *same* family
//! are serialized by the coordinator.
//!
//! - [`MarkTable`] — per-(node, family) generation mark records
//! - [`FamilyRegistry`] — known families, their root providers, and their
//!   generation counters
//! - [`GcCoordinator`] — the sweep state machine (Idle, Marking, Reclaiming)

pub mod coordinator;
pub mod error;
pub mod marks;
pub mod registry;

pub use coordinator::{GcCoordinator, SweepReport};
pub use error::{GcError, GcResult};
pub use marks::{MarkRecord, MarkTable};
pub use registry::{FamilyRegistry, RootsProvider};

//! Composite adapters over the per-concern stores.
//!
//! An operation on an attachment touches several stores. The adapter asks
//! each store for its units of work, groups them by the resource they need
//! and runs each group under one root transaction.

mod composite;
mod locks;
mod plan;

pub use composite::{CompositeStoreAdapter, CompositeStoreAdapterBuilder, Operation, Outcome};
pub use locks::{ReferenceGuard, ReferenceLocks};
pub use plan::{Composition, Facet, Group};

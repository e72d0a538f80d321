//! In-process serialization of operations on the same attachment.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

use crate::model::AttachmentRef;

type Slot = Arc<Mutex<()>>;

/// One mutex per attachment reference, created on demand.
///
/// Entries are dropped again when the last guard for a reference goes away,
/// so the map only holds references with an operation in flight.
#[derive(Debug, Default)]
pub struct ReferenceLocks {
    slots: Mutex<HashMap<AttachmentRef, Slot>>,
}

/// Held while an operation on one reference runs.
pub struct ReferenceGuard<'a> {
    locks: &'a ReferenceLocks,
    reference: AttachmentRef,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl std::fmt::Debug for ReferenceGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceGuard")
            .field("reference", &self.reference)
            .finish_non_exhaustive()
    }
}

impl ReferenceLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `reference` is free, then hold it.
    pub fn lock(&self, reference: &AttachmentRef) -> ReferenceGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(reference.clone()).or_default())
        };
        let guard = slot.lock_arc();
        ReferenceGuard {
            locks: self,
            reference: reference.clone(),
            guard: Some(guard),
        }
    }

    /// Lock several references in sorted order, skipping duplicates.
    pub fn lock_all<'r>(
        &self,
        references: impl IntoIterator<Item = &'r AttachmentRef>,
    ) -> Vec<ReferenceGuard<'_>> {
        let mut references: Vec<&AttachmentRef> = references.into_iter().collect();
        references.sort();
        references.dedup();
        references.into_iter().map(|r| self.lock(r)).collect()
    }

    /// References with a live guard or a waiter.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.slots.lock().len()
    }
}

impl Drop for ReferenceGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.locks.slots.lock();
        if slots
            .get(&self.reference)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.reference);
        }
    }
}

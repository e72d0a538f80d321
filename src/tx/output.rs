//! Result slots filled by load work.

use std::sync::Arc;

use parking_lot::Mutex;

/// A shared slot a unit of work writes its result into while the tree runs.
///
/// The caller keeps one handle and passes a clone into the store call; once
/// the root transaction has committed, `take` yields the loaded value.
#[derive(Debug)]
pub struct Output<T>(Arc<Mutex<Option<T>>>);

impl<T> Output<T> {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }

    pub fn set(&self, value: T) {
        *self.0.lock() = Some(value);
    }

    #[must_use]
    pub fn take(&self) -> Option<T> {
        self.0.lock().take()
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.lock().is_some()
    }
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Default for Output<T> {
    fn default() -> Self {
        Self::new()
    }
}

//! File-backed stores under one [`StoreLayout`].
//!
//! File stores compensate their own effects, so they run under any context
//! (`Unbound`) unless configured to require the store lock (`Filesystem`).

mod archive;
mod container;
mod content;
mod deleted;
mod metadata;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

pub use archive::FileArchiveStore;
pub use container::FileContainerStore;
pub use content::FileContentStore;
pub use deleted::{FileDeletedContentStore, FileDeletedMetadataStore};
pub use metadata::FileMetadataStore;

use crate::error::{AtticError, Result};
use crate::fs::{FsSession, StoreLayout};
use crate::tx::{ResourceContext, ResourceKind, UnitOfWork, Work};

/// What every file store shares: where files live and what context they require.
#[derive(Debug, Clone)]
pub struct FileBacking {
    layout: Arc<StoreLayout>,
    requires: ResourceKind,
}

impl FileBacking {
    /// `requires` must be `Unbound` or `Filesystem`.
    pub fn new(layout: Arc<StoreLayout>, requires: ResourceKind) -> Result<Self> {
        if requires == ResourceKind::Sqlite {
            return Err(AtticError::Config(
                "file stores cannot require a sqlite context".to_string(),
            ));
        }
        Ok(Self { layout, requires })
    }

    #[must_use]
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    #[must_use]
    pub const fn requires(&self) -> ResourceKind {
        self.requires
    }

    /// A side-effect-free unit, bound to the store lock when required.
    pub(crate) fn reader(
        &self,
        label: impl Into<String>,
        mut read: impl FnMut() -> Result<()> + 'static,
    ) -> UnitOfWork {
        match self.requires {
            ResourceKind::Filesystem => {
                UnitOfWork::bound_fn::<FsSession>(label, move |_session| read())
            }
            _ => UnitOfWork::from_fn(label, read),
        }
    }

    pub(crate) fn sequence(&self, label: impl Into<String>, units: Vec<UnitOfWork>) -> UnitOfWork {
        let mut group = UnitOfWork::group(label, self.requires);
        for unit in units {
            debug_assert!(unit.requires().is_satisfied_by(self.requires));
            group.push(unit);
        }
        group
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub(crate) fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Work that fails validation, for requests a store can already tell are impossible.
struct Reject(String);

impl Work for Reject {
    fn pre_run(&mut self) -> Result<()> {
        debug!(reason = %self.0, "rejecting unit of work");
        Err(AtticError::StorageCorrupted(self.0.clone()))
    }

    fn run(&mut self, _ctx: &mut dyn ResourceContext) -> Result<()> {
        Err(AtticError::StorageCorrupted(self.0.clone()))
    }
}

pub(crate) fn reject(label: impl Into<String>, reason: String) -> UnitOfWork {
    UnitOfWork::unbound(label, Reject(reason))
}

/// Runs child work created at run time, compensating it as one unit.
#[derive(Default)]
pub(crate) struct Steps {
    steps: Vec<Box<dyn Work>>,
}

impl Steps {
    pub(crate) fn run(&mut self, mut step: impl Work + 'static, ctx: &mut dyn ResourceContext) -> Result<()> {
        let result = step.run(ctx);
        self.steps.push(Box::new(step));
        result
    }

    pub(crate) fn commit(&mut self) {
        for step in &mut self.steps {
            step.commit();
        }
        self.steps.clear();
    }

    /// Undo in reverse order; reports the first failure after trying all.
    pub(crate) fn rollback(&mut self) -> Result<()> {
        let mut first_error = None;
        while let Some(mut step) = self.steps.pop() {
            if let Err(err) = step.rollback() {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backing_rejects_sqlite_kind() {
        let layout = Arc::new(StoreLayout::new("/tmp/unused"));
        assert!(FileBacking::new(Arc::clone(&layout), ResourceKind::Sqlite).is_err());
        assert!(FileBacking::new(layout, ResourceKind::Filesystem).is_ok());
    }

    #[test]
    fn reader_binds_to_filesystem_when_required() {
        let layout = Arc::new(StoreLayout::new("/tmp/unused"));
        let locked = FileBacking::new(Arc::clone(&layout), ResourceKind::Filesystem).unwrap();
        let free = FileBacking::new(layout, ResourceKind::Unbound).unwrap();

        assert_eq!(locked.reader("r", || Ok(())).requires(), ResourceKind::Filesystem);
        assert_eq!(free.reader("r", || Ok(())).requires(), ResourceKind::Unbound);
    }
}

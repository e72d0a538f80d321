//! Filesystem resource context: the store lock held for one transaction.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use super::lock::StoreLock;
use crate::error::{AtticError, Result};
use crate::tx::{ResourceContext, ResourceKind, TransactionProvider, TypedContext};

/// Holds the storage-root lock while a filesystem transaction runs.
///
/// The filesystem has no native rollback; units running under this context
/// compensate their own effects.
#[derive(Debug)]
pub struct FsSession {
    root: PathBuf,
    lock: Option<StoreLock>,
}

impl FsSession {
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

}

impl ResourceContext for FsSession {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Filesystem
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    fn release(&mut self) {
        if self.lock.take().is_some() {
            debug!(root = %self.root.display(), "filesystem session closed");
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl TypedContext for FsSession {
    const KIND: ResourceKind = ResourceKind::Filesystem;
}

/// Opens [`FsSession`]s on one storage root.
#[derive(Debug, Clone)]
pub struct FsProvider {
    root: PathBuf,
    lock_timeout: Duration,
}

impl FsProvider {
    pub fn new(root: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            lock_timeout,
        }
    }
}

impl TransactionProvider for FsProvider {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Filesystem
    }

    fn name(&self) -> String {
        format!("filesystem:{}", self.root.display())
    }

    fn preflight(&self) -> Result<()> {
        if self.root.exists() && !self.root.is_dir() {
            return Err(AtticError::Config(format!(
                "storage root {} is not a directory",
                self.root.display()
            )));
        }
        Ok(())
    }

    fn acquire(&self) -> Result<Box<dyn ResourceContext>> {
        let lock = StoreLock::acquire_timeout(&self.root, self.lock_timeout)?;
        Ok(Box::new(FsSession {
            root: self.root.clone(),
            lock: Some(lock),
        }))
    }
}

//! Resource kinds and the contexts that carry them.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The kind of transactional resource a unit of work needs.
///
/// `Unbound` work can run under any context; bound work only under a
/// context of exactly its own kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Unbound,
    Filesystem,
    Sqlite,
}

impl ResourceKind {
    /// True when a parent providing `provided` can host work requiring `self`.
    #[must_use]
    pub const fn is_satisfied_by(self, provided: Self) -> bool {
        matches!(
            (self, provided),
            (Self::Unbound, _) | (Self::Filesystem, Self::Filesystem) | (Self::Sqlite, Self::Sqlite)
        )
    }

    #[must_use]
    pub const fn is_bound(self) -> bool {
        !matches!(self, Self::Unbound)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unbound => "unbound",
            Self::Filesystem => "filesystem",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live handle on a transactional resource, owned by a running root transaction.
pub trait ResourceContext: Any {
    fn kind(&self) -> ResourceKind;

    /// Make the resource's own changes durable.
    fn commit(&mut self) -> Result<()>;

    /// Discard the resource's own changes.
    fn rollback(&mut self) -> Result<()>;

    /// Give up any exclusive hold on the resource.
    ///
    /// Called once the root has finished, after unit commit or rollback
    /// hooks, so those still run under the hold.
    fn release(&mut self) {}

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A concrete context type with a fixed kind, usable by typed work.
pub trait TypedContext: ResourceContext + Sized {
    const KIND: ResourceKind;
}

/// Context for roots whose work needs no shared resource.
#[derive(Debug, Default)]
pub struct DetachedContext;

impl ResourceContext for DetachedContext {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Unbound
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

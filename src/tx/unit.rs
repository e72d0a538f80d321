//! Units of work and the trees they form.

use std::marker::PhantomData;

use serde::Serialize;
use tracing::{debug, error};

use super::resource::{ResourceContext, ResourceKind, TypedContext};
use crate::error::{AtticError, Result};

/// Lifecycle of a unit of work.
///
/// `Created -> Attached -> Running -> (Committed | RolledBack)`. Units that
/// were attached but never reached go straight to `RolledBack` when their
/// tree fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Created,
    Attached,
    Running,
    Committed,
    RolledBack,
}

impl UnitState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }

    #[must_use]
    pub const fn has_started(self) -> bool {
        !matches!(self, Self::Created | Self::Attached)
    }
}

/// Behaviour of one unit, against whatever context its root provides.
///
/// Hooks run in this order: every `pre_run` in the tree, then `run` in
/// pre-order, then either every `commit` or `rollback` in reverse run order.
pub trait Work {
    /// Validate without side effects.
    fn pre_run(&mut self) -> Result<()> {
        Ok(())
    }

    fn run(&mut self, ctx: &mut dyn ResourceContext) -> Result<()>;

    /// Discard compensation state after the root committed. Must not fail.
    fn commit(&mut self) {}

    /// Undo what `run` did, including a partial `run`.
    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Work written against a concrete context type.
pub trait TypedWork<C: TypedContext> {
    fn pre_run(&mut self) -> Result<()> {
        Ok(())
    }

    fn run(&mut self, ctx: &mut C) -> Result<()>;

    fn commit(&mut self) {}

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }
}

struct Typed<C, W> {
    work: W,
    label: String,
    _context: PhantomData<fn(&mut C)>,
}

impl<C: TypedContext, W: TypedWork<C>> Work for Typed<C, W> {
    fn pre_run(&mut self) -> Result<()> {
        self.work.pre_run()
    }

    fn run(&mut self, ctx: &mut dyn ResourceContext) -> Result<()> {
        let provided = ctx.kind();
        let ctx = ctx.as_any_mut().downcast_mut::<C>().ok_or_else(|| {
            AtticError::IncompatibleResourceType {
                unit: self.label.clone(),
                required: C::KIND,
                provided,
            }
        })?;
        self.work.run(ctx)
    }

    fn commit(&mut self) {
        self.work.commit();
    }

    fn rollback(&mut self) -> Result<()> {
        self.work.rollback()
    }
}

struct FnWork<F>(F);

impl<F: FnMut() -> Result<()>> Work for FnWork<F> {
    fn run(&mut self, _ctx: &mut dyn ResourceContext) -> Result<()> {
        (self.0)()
    }
}

struct TypedFnWork<F>(F);

impl<C: TypedContext, F: FnMut(&mut C) -> Result<()>> TypedWork<C> for TypedFnWork<F> {
    fn run(&mut self, ctx: &mut C) -> Result<()> {
        (self.0)(ctx)
    }
}

struct Noop;

impl Work for Noop {
    fn run(&mut self, _ctx: &mut dyn ResourceContext) -> Result<()> {
        Ok(())
    }
}

/// A node in a unit-of-work tree.
pub struct UnitOfWork {
    label: String,
    requires: ResourceKind,
    work: Box<dyn Work>,
    children: Vec<UnitOfWork>,
    state: UnitState,
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("label", &self.label)
            .field("requires", &self.requires)
            .field("state", &self.state)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

impl UnitOfWork {
    pub fn new(label: impl Into<String>, requires: ResourceKind, work: impl Work + 'static) -> Self {
        Self {
            label: label.into(),
            requires,
            work: Box::new(work),
            children: Vec::new(),
            state: UnitState::Created,
        }
    }

    /// Work that needs no particular context.
    pub fn unbound(label: impl Into<String>, work: impl Work + 'static) -> Self {
        Self::new(label, ResourceKind::Unbound, work)
    }

    /// Work bound to context type `C`.
    pub fn bound<C, W>(label: impl Into<String>, work: W) -> Self
    where
        C: TypedContext + 'static,
        W: TypedWork<C> + 'static,
    {
        let label = label.into();
        let typed = Typed {
            work,
            label: label.clone(),
            _context: PhantomData,
        };
        Self::new(label, C::KIND, typed)
    }

    /// Unbound work from a closure with nothing to compensate.
    pub fn from_fn(label: impl Into<String>, f: impl FnMut() -> Result<()> + 'static) -> Self {
        Self::unbound(label, FnWork(f))
    }

    /// Bound work from a closure whose effects the context itself rolls back.
    pub fn bound_fn<C>(label: impl Into<String>, f: impl FnMut(&mut C) -> Result<()> + 'static) -> Self
    where
        C: TypedContext + 'static,
    {
        Self::bound::<C, _>(label, TypedFnWork(f))
    }

    /// An empty node, used to group children or as a no-op result.
    pub fn noop(label: impl Into<String>) -> Self {
        Self::unbound(label, Noop)
    }

    /// An empty node that only accepts children compatible with `requires`.
    pub fn group(label: impl Into<String>, requires: ResourceKind) -> Self {
        Self::new(label, requires, Noop)
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn requires(&self) -> ResourceKind {
        self.requires
    }

    #[must_use]
    pub const fn state(&self) -> UnitState {
        self.state
    }

    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Number of nodes in this subtree, including this one.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    /// Add `child` to this node. Its requirement must be satisfied by ours.
    pub fn attach(&mut self, child: Self) -> Result<()> {
        if self.state.has_started() {
            return Err(AtticError::AlreadyRunning(self.label.clone()));
        }
        child.check_attachable(self.requires)?;
        self.push(child);
        Ok(())
    }

    pub(crate) fn check_attachable(&self, provided: ResourceKind) -> Result<()> {
        if self.state != UnitState::Created {
            return Err(AtticError::InvalidState(format!(
                "unit '{}' is already attached",
                self.label
            )));
        }
        if !self.requires.is_satisfied_by(provided) {
            return Err(AtticError::IncompatibleResourceType {
                unit: self.label.clone(),
                required: self.requires,
                provided,
            });
        }
        Ok(())
    }

    pub(crate) fn push(&mut self, mut child: Self) {
        child.state = UnitState::Attached;
        self.children.push(child);
    }

    pub(crate) fn mark_attached(&mut self) {
        self.state = UnitState::Attached;
    }

    // ===== Tree execution, driven by RootTransaction =====

    pub(crate) fn pre_run_all(&mut self) -> Result<()> {
        self.work.pre_run()?;
        self.children.iter_mut().try_for_each(Self::pre_run_all)
    }

    pub(crate) fn run_all(&mut self, ctx: &mut dyn ResourceContext) -> Result<()> {
        self.state = UnitState::Running;
        debug!(unit = %self.label, "running unit of work");
        self.work.run(ctx)?;
        self.children.iter_mut().try_for_each(|child| child.run_all(ctx))
    }

    pub(crate) fn commit_all(&mut self) {
        if self.state == UnitState::Running {
            self.work.commit();
            self.state = UnitState::Committed;
        }
        self.children.iter_mut().for_each(Self::commit_all);
    }

    /// Roll back in reverse run order, continuing past individual failures.
    pub(crate) fn rollback_all(&mut self, failures: &mut Vec<AtticError>) {
        for child in self.children.iter_mut().rev() {
            child.rollback_all(failures);
        }
        match self.state {
            UnitState::Running => {
                if let Err(err) = self.work.rollback() {
                    error!(unit = %self.label, error = %err, "rollback of unit failed");
                    failures.push(AtticError::RollbackFailed {
                        unit: self.label.clone(),
                        reason: err.to_string(),
                    });
                }
                self.state = UnitState::RolledBack;
            }
            UnitState::Created | UnitState::Attached => self.state = UnitState::RolledBack,
            UnitState::Committed | UnitState::RolledBack => {}
        }
    }
}

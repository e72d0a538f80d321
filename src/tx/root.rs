//! Root transactions: own a resource context and drive a unit-of-work tree.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::provider::TransactionProvider;
use super::resource::ResourceKind;
use super::unit::{UnitOfWork, UnitState};
use crate::error::{AtticError, Result};

/// The top of a unit-of-work tree.
///
/// Nothing runs until [`RootTransaction::start`]. A root can be started at
/// most once; afterwards it only reports its final state.
pub struct RootTransaction {
    label: String,
    provider: Arc<dyn TransactionProvider>,
    children: Vec<UnitOfWork>,
    state: UnitState,
}

impl std::fmt::Debug for RootTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootTransaction")
            .field("label", &self.label)
            .field("provider", &self.provider.name())
            .field("state", &self.state)
            .field("children", &self.children)
            .finish()
    }
}

impl RootTransaction {
    pub fn new(label: impl Into<String>, provider: Arc<dyn TransactionProvider>) -> Self {
        Self {
            label: label.into(),
            provider,
            children: Vec::new(),
            state: UnitState::Created,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.provider.kind()
    }

    #[must_use]
    pub const fn state(&self) -> UnitState {
        self.state
    }

    #[must_use]
    pub fn children(&self) -> &[UnitOfWork] {
        &self.children
    }

    /// Attach a unit directly under the root.
    pub fn attach(&mut self, mut unit: UnitOfWork) -> Result<()> {
        if self.state.has_started() {
            return Err(AtticError::AlreadyRunning(self.label.clone()));
        }
        unit.check_attachable(self.kind())?;
        unit.mark_attached();
        self.children.push(unit);
        self.state = UnitState::Attached;
        Ok(())
    }

    /// Run the whole tree in one transaction of the provider's resource.
    ///
    /// On any failure every unit that ran is rolled back in reverse run
    /// order, the context is rolled back, and the first error is returned
    /// wrapped in [`AtticError::TransactionFailed`].
    pub fn start(&mut self) -> Result<()> {
        if self.state.has_started() {
            return Err(AtticError::AlreadyRunning(self.label.clone()));
        }
        self.state = UnitState::Running;
        debug!(root = %self.label, provider = %self.provider.name(), "starting root transaction");

        // ===== PRE-RUN: validation only, nothing to undo =====
        if let Err(err) = self.pre_run() {
            debug!(root = %self.label, error = %err, "pre-run validation failed");
            self.abandon();
            return Err(self.failed(err, 0));
        }

        let mut ctx = match self.provider.acquire() {
            Ok(ctx) => ctx,
            Err(err) => {
                self.abandon();
                return Err(self.failed(err, 0));
            }
        };

        // ===== RUN =====
        let outcome = self
            .children
            .iter_mut()
            .try_for_each(|child| child.run_all(ctx.as_mut()))
            .and_then(|()| ctx.commit());

        match outcome {
            Ok(()) => {
                // ===== COMMIT HOOKS =====
                self.children.iter_mut().for_each(UnitOfWork::commit_all);
                ctx.release();
                self.state = UnitState::Committed;
                debug!(root = %self.label, "root transaction committed");
                Ok(())
            }
            Err(cause) => {
                warn!(root = %self.label, error = %cause, "root transaction failed, rolling back");
                let mut failures = Vec::new();
                for child in self.children.iter_mut().rev() {
                    child.rollback_all(&mut failures);
                }
                if let Err(err) = ctx.rollback() {
                    error!(root = %self.label, error = %err, "context rollback failed");
                    failures.push(err);
                }
                ctx.release();
                self.state = UnitState::RolledBack;
                if !failures.is_empty() {
                    info!(
                        root = %self.label,
                        count = failures.len(),
                        "rollback finished with failures"
                    );
                }
                Err(self.failed(cause, failures.len()))
            }
        }
    }

    /// Run the pre-run pass alone, leaving the root ready to start.
    pub fn validate(&mut self) -> Result<()> {
        if self.state.has_started() {
            return Err(AtticError::AlreadyRunning(self.label.clone()));
        }
        self.pre_run().map_err(|err| self.failed(err, 0))
    }

    fn pre_run(&mut self) -> Result<()> {
        self.provider.preflight()?;
        self.children
            .iter_mut()
            .try_for_each(UnitOfWork::pre_run_all)
    }

    fn abandon(&mut self) {
        let mut failures = Vec::new();
        for child in &mut self.children {
            child.rollback_all(&mut failures);
        }
        self.state = UnitState::RolledBack;
    }

    fn failed(&self, cause: AtticError, rollback_failures: usize) -> AtticError {
        AtticError::TransactionFailed {
            label: self.label.clone(),
            source: Box::new(cause),
            rollback_failures,
        }
    }
}

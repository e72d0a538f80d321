//! Transaction providers: factories for resource contexts, one per kind.

use std::sync::Arc;

use super::resource::{DetachedContext, ResourceContext, ResourceKind};
use super::root::RootTransaction;
use crate::error::{AtticError, Result};

/// Opens contexts of one resource kind.
pub trait TransactionProvider: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Short human-readable name for logs and `attic plan`.
    fn name(&self) -> String;

    /// Checks that need no resource, run during the pre-run pass.
    fn preflight(&self) -> Result<()> {
        Ok(())
    }

    /// Open a context; its transaction is already begun.
    fn acquire(&self) -> Result<Box<dyn ResourceContext>>;
}

/// Begin a new root transaction on `provider`.
pub fn begin(provider: &Arc<dyn TransactionProvider>, label: impl Into<String>) -> RootTransaction {
    RootTransaction::new(label, Arc::clone(provider))
}

/// Provider for roots that only carry unbound work.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedProvider;

impl TransactionProvider for DetachedProvider {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Unbound
    }

    fn name(&self) -> String {
        "detached".to_string()
    }

    fn acquire(&self) -> Result<Box<dyn ResourceContext>> {
        Ok(Box::new(DetachedContext))
    }
}

/// Providers available to a composite adapter, looked up by kind.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn TransactionProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, provider: Arc<dyn TransactionProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Register a provider. A later provider of the same kind replaces the earlier one.
    pub fn register(&mut self, provider: Arc<dyn TransactionProvider>) {
        let kind = provider.kind();
        if let Some(slot) = self.providers.iter_mut().find(|p| p.kind() == kind) {
            *slot = provider;
        } else {
            self.providers.push(provider);
        }
    }

    /// Provider for `kind`. `Unbound` resolves to the default provider.
    pub fn get(&self, kind: ResourceKind) -> Result<Arc<dyn TransactionProvider>> {
        if !kind.is_bound() {
            return Ok(self.default_provider());
        }
        self.providers
            .iter()
            .find(|p| p.kind() == kind)
            .cloned()
            .ok_or(AtticError::ProviderMissing(kind))
    }

    /// The first registered provider, or a detached one when none is registered.
    #[must_use]
    pub fn default_provider(&self) -> Arc<dyn TransactionProvider> {
        self.providers
            .first()
            .cloned()
            .unwrap_or_else(|| Arc::new(DetachedProvider))
    }

    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.providers.iter().map(|p| p.kind())
    }
}

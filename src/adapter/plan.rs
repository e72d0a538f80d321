//! Grouping participating stores into root transactions.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{AtticError, Result};
use crate::tx::{begin, ProviderRegistry, ResourceKind, RootTransaction, UnitOfWork};

/// One persisted concern of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Metadata,
    Content,
    Archive,
    DeletedMetadata,
    DeletedContent,
    Container,
}

impl Facet {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Content => "content",
            Self::Archive => "archive",
            Self::DeletedMetadata => "deleted_metadata",
            Self::DeletedContent => "deleted_content",
            Self::Container => "container",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facets that run together in one root transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub kind: ResourceKind,
    pub facets: Vec<Facet>,
}

/// How one operation's facets map onto root transactions.
///
/// A single group is atomic. Several groups mean the stores need different
/// resources and the operation runs degraded: groups commit one after the
/// other, in consultation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Composition {
    groups: Vec<Group>,
}

impl Composition {
    /// Plan `participants` in consultation order.
    ///
    /// Bound facets are grouped by kind, groups ordered by first appearance.
    /// Unbound facets join the group of the nearest preceding bound facet,
    /// or the first group when none precedes them.
    #[must_use]
    pub fn plan(participants: &[(Facet, ResourceKind)]) -> Self {
        let mut groups: Vec<Group> = Vec::new();
        let mut leading: Vec<Facet> = Vec::new();
        let mut current: Option<usize> = None;

        for &(facet, kind) in participants {
            if groups.iter().any(|g| g.facets.contains(&facet)) || leading.contains(&facet) {
                continue;
            }
            if kind.is_bound() {
                let idx = if let Some(idx) = groups.iter().position(|g| g.kind == kind) {
                    idx
                } else {
                    let mut facets = Vec::new();
                    if groups.is_empty() {
                        facets.append(&mut leading);
                    }
                    groups.push(Group { kind, facets });
                    groups.len() - 1
                };
                groups[idx].facets.push(facet);
                current = Some(idx);
            } else if let Some(idx) = current {
                groups[idx].facets.push(facet);
            } else {
                leading.push(facet);
            }
        }

        if groups.is_empty() {
            groups.push(Group {
                kind: ResourceKind::Unbound,
                facets: leading,
            });
        }
        Self { groups }
    }

    #[must_use]
    pub fn is_atomic(&self) -> bool {
        self.groups.len() <= 1
    }

    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    fn group_of(&self, facet: Facet) -> Option<usize> {
        self.groups.iter().position(|g| g.facets.contains(&facet))
    }

    fn facets_of(groups: &[Group]) -> Vec<Facet> {
        groups.iter().flat_map(|g| g.facets.iter().copied()).collect()
    }

    /// Run `units` according to this plan.
    ///
    /// Every root is built and validated before the first one starts. When a
    /// group after the first fails, earlier groups stay committed and the
    /// error is [`AtticError::PartialCompositeFailure`].
    pub(crate) fn execute(
        &self,
        label: &str,
        providers: &ProviderRegistry,
        units: Vec<(Facet, UnitOfWork)>,
    ) -> Result<()> {
        let mut buckets: Vec<Vec<UnitOfWork>> = self.groups.iter().map(|_| Vec::new()).collect();
        for (facet, unit) in units {
            let idx = self.group_of(facet).ok_or_else(|| {
                AtticError::InvalidState(format!("facet {facet} is not part of this operation"))
            })?;
            buckets[idx].push(unit);
        }

        let mut roots: Vec<Option<RootTransaction>> = Vec::with_capacity(self.groups.len());
        for (group, units) in self.groups.iter().zip(buckets) {
            if units.is_empty() {
                roots.push(None);
                continue;
            }
            let provider = providers.get(group.kind)?;
            let mut root = begin(&provider, label);
            for unit in units {
                root.attach(unit)?;
            }
            root.validate()?;
            roots.push(Some(root));
        }

        for (idx, root) in roots.iter_mut().enumerate() {
            let Some(root) = root else { continue };
            if let Err(err) = root.start() {
                if idx == 0 || self.is_atomic() {
                    return Err(err);
                }
                let committed = Self::facets_of(&self.groups[..idx]);
                let failed = self.groups[idx].facets.clone();
                let pending = Self::facets_of(&self.groups[idx + 1..]);
                error!(
                    operation = %label,
                    ?committed,
                    ?failed,
                    "degraded operation failed after earlier transactions committed"
                );
                return Err(AtticError::PartialCompositeFailure {
                    committed,
                    failed,
                    pending,
                    source: Box::new(err),
                });
            }
            debug!(operation = %label, group = idx, "composite group committed");
        }
        Ok(())
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = self
            .groups
            .iter()
            .map(|g| {
                let facets: Vec<&str> = g.facets.iter().map(|f| f.as_str()).collect();
                format!("{}[{}]", g.kind, facets.join(", "))
            })
            .collect();
        f.write_str(&groups.join(" -> "))
    }
}

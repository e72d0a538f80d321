//! The composite store adapter: one attachment, five stores, one operation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::locks::ReferenceLocks;
use super::plan::{Composition, Facet};
use crate::error::{AtticError, Result};
use crate::model::{
    ArchivedVersion, Attachment, AttachmentMetadata, AttachmentRef, DeletedAttachment, DeletedKey,
    DocumentRef, VersionContent,
};
use crate::storage::{
    ArchiveStore, ContainerStore, ContentStore, DeletedContentStore, DeletedMetadataStore,
    MetadataStore,
};
use crate::tx::{Output, ProviderRegistry, ResourceKind, UnitOfWork};

/// Operations the adapter composes, each with its facets in consultation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Save,
    Load,
    Archive,
    Delete,
    DeletePermanently,
    ListDeleted,
    Purge,
    ListAttachments,
}

impl Operation {
    pub const ALL: [Self; 8] = [
        Self::Save,
        Self::Load,
        Self::Archive,
        Self::Delete,
        Self::DeletePermanently,
        Self::ListDeleted,
        Self::Purge,
        Self::ListAttachments,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Load => "load",
            Self::Archive => "archive",
            Self::Delete => "delete",
            Self::DeletePermanently => "delete_permanently",
            Self::ListDeleted => "list_deleted",
            Self::Purge => "purge",
            Self::ListAttachments => "list_attachments",
        }
    }

    /// Facets touched, with the container included when `container` is set.
    #[must_use]
    pub fn facets(self, container: bool) -> Vec<Facet> {
        let mut facets = match self {
            Self::Save | Self::DeletePermanently => {
                vec![Facet::Metadata, Facet::Content, Facet::Archive]
            }
            Self::Load => vec![Facet::Metadata, Facet::Content],
            Self::Archive => vec![Facet::Archive],
            Self::Delete => vec![
                Facet::DeletedMetadata,
                Facet::DeletedContent,
                Facet::Metadata,
                Facet::Content,
                Facet::Archive,
            ],
            Self::ListDeleted | Self::Purge => vec![Facet::DeletedMetadata, Facet::DeletedContent],
            Self::ListAttachments => return vec![Facet::Container],
        };
        if container && matches!(self, Self::Save | Self::Delete | Self::DeletePermanently) {
            facets.push(Facet::Container);
        }
        facets
    }
}

/// How a write ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Whether every participating store shared one transaction.
    pub atomic: bool,
    /// Root transactions used; zero when there was nothing to write.
    pub transactions: usize,
    /// Key of the recycle-bin record a delete produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<DeletedKey>,
}

impl Outcome {
    const fn nothing() -> Self {
        Self {
            atomic: true,
            transactions: 0,
            deleted: None,
        }
    }

    fn of(plan: &Composition) -> Self {
        Self {
            atomic: plan.is_atomic(),
            transactions: plan.groups().len(),
            deleted: None,
        }
    }
}

/// Persists attachments across metadata, content, archive, recycle-bin and
/// container stores.
///
/// Stores whose work needs the same resource run in one root transaction;
/// when they need different resources each operation is split and runs
/// degraded, which is logged once per operation shape.
pub struct CompositeStoreAdapter {
    metadata: Arc<dyn MetadataStore>,
    content: Arc<dyn ContentStore>,
    archive: Arc<dyn ArchiveStore>,
    deleted_metadata: Arc<dyn DeletedMetadataStore>,
    deleted_content: Arc<dyn DeletedContentStore>,
    container: Option<Arc<dyn ContainerStore>>,
    providers: ProviderRegistry,
    recycle_bin: bool,
    plans: Mutex<HashMap<Vec<Facet>, Arc<Composition>>>,
    locks: ReferenceLocks,
}

impl std::fmt::Debug for CompositeStoreAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeStoreAdapter")
            .field("providers", &self.providers)
            .field("recycle_bin", &self.recycle_bin)
            .field("container", &self.container.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`CompositeStoreAdapter`]; every store except the container is required.
#[derive(Default)]
pub struct CompositeStoreAdapterBuilder {
    metadata: Option<Arc<dyn MetadataStore>>,
    content: Option<Arc<dyn ContentStore>>,
    archive: Option<Arc<dyn ArchiveStore>>,
    deleted_metadata: Option<Arc<dyn DeletedMetadataStore>>,
    deleted_content: Option<Arc<dyn DeletedContentStore>>,
    container: Option<Arc<dyn ContainerStore>>,
    providers: ProviderRegistry,
    recycle_bin: Option<bool>,
}

impl CompositeStoreAdapterBuilder {
    #[must_use]
    pub fn metadata(mut self, store: Arc<dyn MetadataStore>) -> Self {
        self.metadata = Some(store);
        self
    }

    #[must_use]
    pub fn content(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.content = Some(store);
        self
    }

    #[must_use]
    pub fn archive(mut self, store: Arc<dyn ArchiveStore>) -> Self {
        self.archive = Some(store);
        self
    }

    #[must_use]
    pub fn deleted_metadata(mut self, store: Arc<dyn DeletedMetadataStore>) -> Self {
        self.deleted_metadata = Some(store);
        self
    }

    #[must_use]
    pub fn deleted_content(mut self, store: Arc<dyn DeletedContentStore>) -> Self {
        self.deleted_content = Some(store);
        self
    }

    #[must_use]
    pub fn container(mut self, store: Arc<dyn ContainerStore>) -> Self {
        self.container = Some(store);
        self
    }

    #[must_use]
    pub fn providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    /// Whether deletes go to the recycle bin. Defaults to true.
    #[must_use]
    pub const fn recycle_bin(mut self, enabled: bool) -> Self {
        self.recycle_bin = Some(enabled);
        self
    }

    pub fn build(self) -> Result<CompositeStoreAdapter> {
        fn required<T>(store: Option<T>, name: &str) -> Result<T> {
            store.ok_or_else(|| AtticError::MissingConfig(format!("{name} store")))
        }

        let adapter = CompositeStoreAdapter {
            metadata: required(self.metadata, "metadata")?,
            content: required(self.content, "content")?,
            archive: required(self.archive, "archive")?,
            deleted_metadata: required(self.deleted_metadata, "deleted metadata")?,
            deleted_content: required(self.deleted_content, "deleted content")?,
            container: self.container,
            providers: self.providers,
            recycle_bin: self.recycle_bin.unwrap_or(true),
            plans: Mutex::new(HashMap::new()),
            locks: ReferenceLocks::new(),
        };

        for facet in adapter.configured_facets() {
            let kind = adapter.kind_of(facet);
            if kind.is_bound() {
                adapter.providers.get(kind)?;
            }
        }
        Ok(adapter)
    }
}

impl CompositeStoreAdapter {
    #[must_use]
    pub fn builder() -> CompositeStoreAdapterBuilder {
        CompositeStoreAdapterBuilder::default()
    }

    #[must_use]
    pub const fn recycle_bin_enabled(&self) -> bool {
        self.recycle_bin
    }

    #[must_use]
    pub fn has_container(&self) -> bool {
        self.container.is_some()
    }

    #[must_use]
    pub const fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Resource kind each configured store requires.
    #[must_use]
    pub fn store_kinds(&self) -> Vec<(Facet, ResourceKind)> {
        self.configured_facets()
            .into_iter()
            .map(|facet| (facet, self.kind_of(facet)))
            .collect()
    }

    fn configured_facets(&self) -> Vec<Facet> {
        let mut facets = vec![
            Facet::Metadata,
            Facet::Content,
            Facet::Archive,
            Facet::DeletedMetadata,
            Facet::DeletedContent,
        ];
        if self.container.is_some() {
            facets.push(Facet::Container);
        }
        facets
    }

    fn kind_of(&self, facet: Facet) -> ResourceKind {
        match facet {
            Facet::Metadata => self.metadata.resource_kind(),
            Facet::Content => self.content.resource_kind(),
            Facet::Archive => self.archive.resource_kind(),
            Facet::DeletedMetadata => self.deleted_metadata.resource_kind(),
            Facet::DeletedContent => self.deleted_content.resource_kind(),
            Facet::Container => self
                .container
                .as_ref()
                .map_or(ResourceKind::Unbound, |c| c.resource_kind()),
        }
    }

    /// The plan `operation` runs under with the configured stores.
    pub fn plan(&self, operation: Operation, update_container: bool) -> Arc<Composition> {
        self.composition(&self.facets(operation, update_container))
    }

    fn facets(&self, operation: Operation, update_container: bool) -> Vec<Facet> {
        operation.facets(update_container && self.container.is_some())
    }

    fn composition(&self, facets: &[Facet]) -> Arc<Composition> {
        let mut plans = self.plans.lock();
        if let Some(plan) = plans.get(facets) {
            return Arc::clone(plan);
        }
        let participants: Vec<(Facet, ResourceKind)> =
            facets.iter().map(|&f| (f, self.kind_of(f))).collect();
        let plan = Arc::new(Composition::plan(&participants));
        if !plan.is_atomic() {
            warn!(
                plan = %plan,
                transactions = plan.groups().len(),
                "stores need different resources; running without a shared transaction"
            );
        }
        plans.insert(facets.to_vec(), Arc::clone(&plan));
        plan
    }

    fn execute(
        &self,
        label: &str,
        facets: &[Facet],
        units: Vec<(Facet, UnitOfWork)>,
    ) -> Result<Outcome> {
        let plan = self.composition(facets);
        plan.execute(label, &self.providers, units)?;
        Ok(Outcome::of(&plan))
    }

    fn execute_read(
        &self,
        label: &str,
        facets: &[Facet],
        units: Vec<(Facet, UnitOfWork)>,
    ) -> Result<()> {
        let plan = self.composition(facets);
        plan.execute(label, &self.providers, units)
            .map_err(|err| match err {
                AtticError::PartialCompositeFailure { source, .. } => *source,
                other => other,
            })
    }

    // ===== Live attachments =====

    /// Save one attachment: metadata, content and the archive, plus the
    /// document's attachment list when `update_container` is set.
    pub fn save(&self, attachment: &mut Attachment, update_container: bool) -> Result<Outcome> {
        let document = attachment.reference().document().clone();
        self.save_all(&document, std::slice::from_mut(attachment), update_container)
    }

    /// Save several attachments of one document in one composite operation.
    ///
    /// Attachments without loaded content are skipped. The stored archive is
    /// loaded first for any attachment that has none loaded, so earlier
    /// versions are kept.
    pub fn save_all(
        &self,
        document: &DocumentRef,
        attachments: &mut [Attachment],
        update_container: bool,
    ) -> Result<Outcome> {
        if let Some(stray) = attachments
            .iter()
            .find(|a| a.reference().document() != document)
        {
            return Err(AtticError::InvalidReference(format!(
                "{} does not belong to {document}",
                stray.reference()
            )));
        }
        let _guards = self.locks.lock_all(attachments.iter().map(Attachment::reference));

        let mut units = Vec::new();
        let mut saved: Vec<Option<Vec<ArchivedVersion>>> = Vec::with_capacity(attachments.len());
        for attachment in attachments.iter_mut() {
            if attachment.content().is_none() {
                debug!(attachment = %attachment.reference(), "no content loaded, skipping");
                saved.push(None);
                continue;
            }
            if attachment.archive().is_none() {
                let stored = self.read_archive(attachment.reference())?;
                attachment.set_archive(stored);
            }
            let versions = attachment.versions_to_archive();
            let reference = attachment.reference();

            units.push((Facet::Metadata, self.metadata.save(attachment.metadata())));
            units.push((Facet::Content, self.content.save(attachment)));
            units.push((Facet::Archive, self.archive.save(reference, &versions)));
            if update_container {
                if let Some(container) = &self.container {
                    units.push((Facet::Container, container.attach(reference)));
                }
            }
            saved.push(Some(versions));
        }
        if units.is_empty() {
            return Ok(Outcome::nothing());
        }

        let facets = self.facets(Operation::Save, update_container);
        let outcome = self.execute(&format!("save attachments of {document}"), &facets, units)?;

        for (attachment, versions) in attachments.iter_mut().zip(saved) {
            if let Some(versions) = versions {
                info!(
                    attachment = %attachment.reference(),
                    version = %attachment.version(),
                    "attachment saved"
                );
                attachment.mark_saved(versions);
            }
        }
        Ok(outcome)
    }

    /// Load the current metadata and content of an attachment.
    pub fn load(&self, reference: &AttachmentRef) -> Result<Attachment> {
        let _guard = self.locks.lock(reference);
        let metadata = Output::new();
        let content = Output::new();
        self.execute_read(
            &format!("load {reference}"),
            &self.facets(Operation::Load, false),
            vec![
                (Facet::Metadata, self.metadata.load(reference, metadata.clone())),
                (Facet::Content, self.content.load(reference, content.clone())),
            ],
        )?;

        let Some(metadata) = metadata.take().flatten() else {
            debug!(attachment = %reference, "attachment not found");
            return Err(AtticError::NotFound(reference.to_string()));
        };
        let bytes = content.take().flatten().ok_or_else(|| {
            AtticError::StorageCorrupted(format!("{reference} has metadata but no content"))
        })?;
        Ok(Attachment::from_stored(metadata, bytes))
    }

    /// Names of the attachments a document owns.
    pub fn list_attachments(&self, document: &DocumentRef) -> Result<Vec<String>> {
        let container = self
            .container
            .as_ref()
            .ok_or_else(|| AtticError::MissingConfig("container store".to_string()))?;
        let names = Output::new();
        self.execute_read(
            &format!("list attachments of {document}"),
            &self.facets(Operation::ListAttachments, true),
            vec![(Facet::Container, container.list(document, names.clone()))],
        )?;
        Ok(names.take().unwrap_or_default())
    }

    fn read_archive(&self, reference: &AttachmentRef) -> Result<Vec<ArchivedVersion>> {
        let versions = Output::new();
        self.execute_read(
            &format!("load archive {reference}"),
            &self.facets(Operation::Archive, false),
            vec![(Facet::Archive, self.archive.load(reference, versions.clone()))],
        )?;
        Ok(versions.take().unwrap_or_default())
    }

    fn read_metadata(&self, reference: &AttachmentRef) -> Result<Option<AttachmentMetadata>> {
        let metadata = Output::new();
        self.execute_read(
            &format!("load metadata {reference}"),
            &[Facet::Metadata],
            vec![(Facet::Metadata, self.metadata.load(reference, metadata.clone()))],
        )?;
        Ok(metadata.take().flatten())
    }

    fn read_content(&self, reference: &AttachmentRef) -> Result<Option<Vec<u8>>> {
        let content = Output::new();
        self.execute_read(
            &format!("load content {reference}"),
            &[Facet::Content],
            vec![(Facet::Content, self.content.load(reference, content.clone()))],
        )?;
        Ok(content.take().flatten())
    }

    fn require_metadata(&self, reference: &AttachmentRef) -> Result<AttachmentMetadata> {
        self.read_metadata(reference)?.ok_or_else(|| {
            debug!(attachment = %reference, "attachment not found");
            AtticError::NotFound(reference.to_string())
        })
    }

    // ===== Archive =====

    /// Load the stored history into `attachment`.
    ///
    /// An attachment that was never archived gets a history holding just its
    /// current version.
    pub fn load_archive(&self, attachment: &mut Attachment) -> Result<()> {
        let _guard = self.locks.lock(attachment.reference());
        let mut versions = self.read_archive(attachment.reference())?;
        if versions.is_empty() {
            if let Some(bytes) = attachment.content() {
                versions.push(ArchivedVersion {
                    metadata: attachment.metadata().clone(),
                    content: VersionContent::Loaded(bytes.to_vec()),
                    dirty: attachment.is_content_dirty(),
                });
            }
        }
        attachment.set_archive(versions);
        Ok(())
    }

    /// Persist the attachment's history without touching metadata or content.
    pub fn save_archive(&self, attachment: &Attachment) -> Result<Outcome> {
        let reference = attachment.reference();
        let _guard = self.locks.lock(reference);
        let versions = attachment.versions_to_archive();
        self.execute(
            &format!("save archive {reference}"),
            &self.facets(Operation::Archive, false),
            vec![(Facet::Archive, self.archive.save(reference, &versions))],
        )
    }

    /// Drop every archived version; live metadata and content stay.
    pub fn delete_archive(&self, attachment: &Attachment) -> Result<Outcome> {
        let reference = attachment.reference();
        let _guard = self.locks.lock(reference);
        self.execute(
            &format!("delete archive {reference}"),
            &self.facets(Operation::Archive, false),
            vec![(Facet::Archive, self.archive.delete(reference))],
        )
    }

    // ===== Deletion and the recycle bin =====

    /// Delete an attachment, moving it to the recycle bin when enabled.
    pub fn delete(
        &self,
        reference: &AttachmentRef,
        deleter: Option<&str>,
        update_container: bool,
    ) -> Result<Outcome> {
        if !self.recycle_bin {
            return self.delete_permanently(reference, update_container);
        }
        let _guard = self.locks.lock(reference);
        let metadata = self.require_metadata(reference)?;
        let versions = self.versions_for_deletion(&metadata)?;
        let key = self.next_deleted_key(reference)?;
        let record = DeletedAttachment::new(key.clone(), deleter.map(str::to_string), metadata);

        let mut units = vec![
            (Facet::DeletedMetadata, self.deleted_metadata.save(&record)),
            (Facet::DeletedContent, self.deleted_content.save(&key, &versions)),
            (Facet::Metadata, self.metadata.delete(reference)),
            (Facet::Content, self.content.delete(reference)),
            (Facet::Archive, self.archive.delete(reference)),
        ];
        if update_container {
            if let Some(container) = &self.container {
                units.push((Facet::Container, container.detach(reference)));
            }
        }

        let facets = self.facets(Operation::Delete, update_container);
        let mut outcome = self.execute(&format!("delete {reference}"), &facets, units)?;
        info!(attachment = %reference, key = %key, "attachment moved to recycle bin");
        outcome.deleted = Some(key);
        Ok(outcome)
    }

    /// Remove an attachment and its history without keeping a deleted record.
    pub fn delete_permanently(
        &self,
        reference: &AttachmentRef,
        update_container: bool,
    ) -> Result<Outcome> {
        let _guard = self.locks.lock(reference);
        self.require_metadata(reference)?;

        let mut units = vec![
            (Facet::Metadata, self.metadata.delete(reference)),
            (Facet::Content, self.content.delete(reference)),
            (Facet::Archive, self.archive.delete(reference)),
        ];
        if update_container {
            if let Some(container) = &self.container {
                units.push((Facet::Container, container.detach(reference)));
            }
        }

        let facets = self.facets(Operation::DeletePermanently, update_container);
        let outcome = self.execute(&format!("delete {reference} permanently"), &facets, units)?;
        info!(attachment = %reference, "attachment deleted permanently");
        Ok(outcome)
    }

    /// Stored history, plus the current content when it was never archived.
    fn versions_for_deletion(&self, metadata: &AttachmentMetadata) -> Result<Vec<ArchivedVersion>> {
        let reference = &metadata.reference;
        let mut versions = self.read_archive(reference)?;
        if !versions.iter().any(|v| v.metadata.version == metadata.version) {
            match self.read_content(reference)? {
                Some(bytes) => versions.push(ArchivedVersion {
                    metadata: metadata.clone(),
                    content: VersionContent::Loaded(bytes),
                    dirty: true,
                }),
                None => warn!(
                    attachment = %reference,
                    "current content missing, recycle-bin record keeps archived versions only"
                ),
            }
        }
        for version in &mut versions {
            version.dirty = true;
        }
        versions.sort_by_key(ArchivedVersion::version);
        Ok(versions)
    }

    /// Deletion time for a new record: now, or just after the latest
    /// existing deletion of the same attachment when the clock has not moved.
    fn next_deleted_key(&self, reference: &AttachmentRef) -> Result<DeletedKey> {
        let records = Output::new();
        self.execute_read(
            &format!("list deleted {reference}"),
            &[Facet::DeletedMetadata],
            vec![(
                Facet::DeletedMetadata,
                self.deleted_metadata.list_for_attachment(reference, records.clone()),
            )],
        )?;
        let now = Utc::now().timestamp_millis();
        let millis = records
            .take()
            .unwrap_or_default()
            .iter()
            .map(|r| r.key().millis())
            .max()
            .map_or(now, |latest| now.max(latest + 1));
        DeletedKey::from_millis(reference.clone(), millis)
    }

    /// Deleted records of one attachment, most recent first, with their versions.
    pub fn list_deleted(&self, reference: &AttachmentRef) -> Result<Vec<DeletedAttachment>> {
        let records = Output::new();
        self.execute_read(
            &format!("list deleted {reference}"),
            &self.facets(Operation::ListDeleted, false),
            vec![(
                Facet::DeletedMetadata,
                self.deleted_metadata.list_for_attachment(reference, records.clone()),
            )],
        )?;
        self.with_versions(records.take().unwrap_or_default())
    }

    /// Deleted records of every attachment of a document, most recent first.
    pub fn list_deleted_in(&self, document: &DocumentRef) -> Result<Vec<DeletedAttachment>> {
        let records = Output::new();
        self.execute_read(
            &format!("list deleted in {document}"),
            &self.facets(Operation::ListDeleted, false),
            vec![(
                Facet::DeletedMetadata,
                self.deleted_metadata.list_for_document(document, records.clone()),
            )],
        )?;
        self.with_versions(records.take().unwrap_or_default())
    }

    fn with_versions(&self, mut records: Vec<DeletedAttachment>) -> Result<Vec<DeletedAttachment>> {
        if records.is_empty() {
            return Ok(records);
        }
        let outputs: Vec<Output<Vec<ArchivedVersion>>> =
            records.iter().map(|_| Output::new()).collect();
        let units = records
            .iter()
            .zip(&outputs)
            .map(|(record, out)| {
                (
                    Facet::DeletedContent,
                    self.deleted_content.load(record.key(), out.clone()),
                )
            })
            .collect();
        self.execute_read(
            "load deleted versions",
            &self.facets(Operation::ListDeleted, false),
            units,
        )?;
        for (record, out) in records.iter_mut().zip(outputs) {
            record.set_versions(out.take().unwrap_or_default());
        }
        Ok(records)
    }

    /// One deleted record with its versions.
    pub fn find_deleted(&self, key: &DeletedKey) -> Result<DeletedAttachment> {
        let record = Output::new();
        let versions = Output::new();
        self.execute_read(
            &format!("load deleted record {key}"),
            &self.facets(Operation::ListDeleted, false),
            vec![
                (Facet::DeletedMetadata, self.deleted_metadata.load(key, record.clone())),
                (Facet::DeletedContent, self.deleted_content.load(key, versions.clone())),
            ],
        )?;
        let Some(mut record) = record.take().flatten() else {
            debug!(key = %key, "deleted record not found");
            return Err(AtticError::NotFound(key.to_string()));
        };
        record.set_versions(versions.take().unwrap_or_default());
        Ok(record)
    }

    /// Rebuild the live attachment from a deleted record. Nothing is written;
    /// saving the result rewrites its whole history and leaves the record in place.
    pub fn restore(&self, record: &DeletedAttachment) -> Result<Attachment> {
        if record.versions().is_some() {
            return record.restore();
        }
        self.find_deleted(record.key())?.restore()
    }

    /// Remove a deleted record and its content for good.
    pub fn purge(&self, key: &DeletedKey) -> Result<Outcome> {
        let _guard = self.locks.lock(key.reference());
        let record = Output::new();
        self.execute_read(
            &format!("load deleted record {key}"),
            &[Facet::DeletedMetadata],
            vec![(Facet::DeletedMetadata, self.deleted_metadata.load(key, record.clone()))],
        )?;
        if record.take().flatten().is_none() {
            debug!(key = %key, "deleted record not found");
            return Err(AtticError::NotFound(key.to_string()));
        }

        let outcome = self.execute(
            &format!("purge {key}"),
            &self.facets(Operation::Purge, false),
            vec![
                (Facet::DeletedMetadata, self.deleted_metadata.purge(key)),
                (Facet::DeletedContent, self.deleted_content.purge(key)),
            ],
        )?;
        info!(key = %key, "deleted record purged");
        Ok(outcome)
    }
}

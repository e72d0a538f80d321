//! Per-concern store contracts.
//!
//! Every operation returns a [`UnitOfWork`] rather than doing anything; the
//! caller decides which root transaction it runs under. A store reports the
//! [`ResourceKind`] its work requires through `resource_kind`, and every
//! unit it returns requires that kind or `Unbound`.

use crate::model::{
    ArchivedVersion, Attachment, AttachmentMetadata, AttachmentRef, DeletedAttachment, DeletedKey,
    DocumentRef,
};
use crate::tx::{Output, ResourceKind, UnitOfWork};

/// Descriptive fields of live attachments.
pub trait MetadataStore: Send + Sync {
    fn resource_kind(&self) -> ResourceKind;

    fn save(&self, metadata: &AttachmentMetadata) -> UnitOfWork;

    /// Fills `out` with `None` when the attachment does not exist.
    fn load(&self, reference: &AttachmentRef, out: Output<Option<AttachmentMetadata>>) -> UnitOfWork;

    fn delete(&self, reference: &AttachmentRef) -> UnitOfWork;
}

/// Bytes of the current version of live attachments.
pub trait ContentStore: Send + Sync {
    fn resource_kind(&self) -> ResourceKind;

    /// Write the attachment's content. Clean content already stored is left alone;
    /// an attachment without loaded content yields a no-op.
    fn save(&self, attachment: &Attachment) -> UnitOfWork;

    fn load(&self, reference: &AttachmentRef, out: Output<Option<Vec<u8>>>) -> UnitOfWork;

    fn delete(&self, reference: &AttachmentRef) -> UnitOfWork;
}

/// Every historical version of live attachments.
pub trait ArchiveStore: Send + Sync {
    fn resource_kind(&self) -> ResourceKind;

    /// Persist `versions` as the complete archive. Versions that are clean
    /// and already stored are not rewritten; an empty list is a no-op.
    fn save(&self, reference: &AttachmentRef, versions: &[ArchivedVersion]) -> UnitOfWork;

    /// Fills `out` with the stored versions, oldest first, or nothing when
    /// no archive exists.
    fn load(&self, reference: &AttachmentRef, out: Output<Vec<ArchivedVersion>>) -> UnitOfWork;

    fn delete(&self, reference: &AttachmentRef) -> UnitOfWork;
}

/// Descriptive records of deleted attachments.
pub trait DeletedMetadataStore: Send + Sync {
    fn resource_kind(&self) -> ResourceKind;

    /// Store a new record. Fails if a record with the same key exists.
    fn save(&self, record: &DeletedAttachment) -> UnitOfWork;

    fn load(&self, key: &DeletedKey, out: Output<Option<DeletedAttachment>>) -> UnitOfWork;

    /// All deletions of one attachment, most recent first.
    fn list_for_attachment(
        &self,
        reference: &AttachmentRef,
        out: Output<Vec<DeletedAttachment>>,
    ) -> UnitOfWork;

    /// All deletions of every attachment of a document, most recent first.
    fn list_for_document(
        &self,
        document: &DocumentRef,
        out: Output<Vec<DeletedAttachment>>,
    ) -> UnitOfWork;

    fn purge(&self, key: &DeletedKey) -> UnitOfWork;
}

/// Content and history of deleted attachments.
pub trait DeletedContentStore: Send + Sync {
    fn resource_kind(&self) -> ResourceKind;

    fn save(&self, key: &DeletedKey, versions: &[ArchivedVersion]) -> UnitOfWork;

    fn load(&self, key: &DeletedKey, out: Output<Vec<ArchivedVersion>>) -> UnitOfWork;

    fn purge(&self, key: &DeletedKey) -> UnitOfWork;
}

/// The list of attachment names a document owns.
pub trait ContainerStore: Send + Sync {
    fn resource_kind(&self) -> ResourceKind;

    fn attach(&self, reference: &AttachmentRef) -> UnitOfWork;

    fn detach(&self, reference: &AttachmentRef) -> UnitOfWork;

    /// File names attached to `document`, sorted.
    fn list(&self, document: &DocumentRef, out: Output<Vec<String>>) -> UnitOfWork;
}

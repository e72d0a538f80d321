//! Domain types: references, versions, live attachments and deleted records.

mod attachment;
mod deleted;
mod reference;
mod version;

pub use attachment::{
    content_digest, ArchivedVersion, Attachment, AttachmentMetadata, VersionContent,
};
pub use deleted::{DeletedAttachment, DeletedKey};
pub use reference::{AttachmentRef, DocumentRef};
pub use version::Version;

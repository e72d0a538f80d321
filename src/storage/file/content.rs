use std::sync::Arc;

use tracing::debug;

use super::{read_bytes, FileBacking};
use crate::error::Result;
use crate::fs::{FileDeleter, FileSaver, StoreLayout};
use crate::model::{Attachment, AttachmentRef};
use crate::storage::ContentStore;
use crate::tx::{Output, ResourceKind, UnitOfWork};

/// Current content as the `content` file in the attachment directory.
#[derive(Debug, Clone)]
pub struct FileContentStore {
    backing: FileBacking,
}

impl FileContentStore {
    pub fn new(layout: Arc<StoreLayout>, requires: ResourceKind) -> Result<Self> {
        Ok(Self {
            backing: FileBacking::new(layout, requires)?,
        })
    }
}

impl ContentStore for FileContentStore {
    fn resource_kind(&self) -> ResourceKind {
        self.backing.requires()
    }

    fn save(&self, attachment: &Attachment) -> UnitOfWork {
        let reference = attachment.reference();
        let Some(bytes) = attachment.content() else {
            return UnitOfWork::noop(format!("no content loaded for {reference}"));
        };
        let path = self.backing.layout().attachment(reference).content();
        if !attachment.is_content_dirty() && path.exists() {
            debug!(attachment = %reference, "content unchanged, not rewriting");
            return UnitOfWork::noop(format!("content of {reference} unchanged"));
        }
        FileSaver::new(path, bytes.to_vec()).into_unit(self.backing.requires())
    }

    fn load(&self, reference: &AttachmentRef, out: Output<Option<Vec<u8>>>) -> UnitOfWork {
        let path = self.backing.layout().attachment(reference).content();
        self.backing.reader(format!("load content {reference}"), move || {
            out.set(read_bytes(&path)?);
            Ok(())
        })
    }

    fn delete(&self, reference: &AttachmentRef) -> UnitOfWork {
        let path = self.backing.layout().attachment(reference).content();
        FileDeleter::new(path).into_unit(self.backing.requires())
    }
}

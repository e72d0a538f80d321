use std::sync::Arc;

use super::{read_json, FileBacking};
use crate::error::Result;
use crate::fs::{FileDeleter, FileSaver, JsonStream, StoreLayout};
use crate::model::{AttachmentMetadata, AttachmentRef};
use crate::storage::MetadataStore;
use crate::tx::{Output, ResourceKind, UnitOfWork};

/// Metadata as `meta.json` in the attachment directory.
#[derive(Debug, Clone)]
pub struct FileMetadataStore {
    backing: FileBacking,
}

impl FileMetadataStore {
    pub fn new(layout: Arc<StoreLayout>, requires: ResourceKind) -> Result<Self> {
        Ok(Self {
            backing: FileBacking::new(layout, requires)?,
        })
    }
}

impl MetadataStore for FileMetadataStore {
    fn resource_kind(&self) -> ResourceKind {
        self.backing.requires()
    }

    fn save(&self, metadata: &AttachmentMetadata) -> UnitOfWork {
        let path = self.backing.layout().attachment(&metadata.reference).metadata();
        FileSaver::new(path, JsonStream(metadata.clone())).into_unit(self.backing.requires())
    }

    fn load(&self, reference: &AttachmentRef, out: Output<Option<AttachmentMetadata>>) -> UnitOfWork {
        let path = self.backing.layout().attachment(reference).metadata();
        self.backing.reader(format!("load metadata {reference}"), move || {
            out.set(read_json(&path)?);
            Ok(())
        })
    }

    fn delete(&self, reference: &AttachmentRef) -> UnitOfWork {
        let path = self.backing.layout().attachment(reference).metadata();
        FileDeleter::new(path).into_unit(self.backing.requires())
    }
}

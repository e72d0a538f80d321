use std::sync::Arc;

use super::archive::{read_index, save_versions, versions_on_disk};
use super::{read_json, FileBacking};
use crate::error::Result;
use crate::fs::{FileDeleter, FileSaver, JsonStream, StoreLayout};
use crate::model::{ArchivedVersion, AttachmentRef, DeletedAttachment, DeletedKey, DocumentRef};
use crate::storage::serializer::VersionListSerializer;
use crate::storage::{DeletedContentStore, DeletedMetadataStore};
use crate::tx::{Output, ResourceKind, UnitOfWork};

/// Deleted records as `deleted.json` inside each recycle-bin directory.
#[derive(Debug, Clone)]
pub struct FileDeletedMetadataStore {
    backing: FileBacking,
}

impl FileDeletedMetadataStore {
    pub fn new(layout: Arc<StoreLayout>, requires: ResourceKind) -> Result<Self> {
        Ok(Self {
            backing: FileBacking::new(layout, requires)?,
        })
    }
}

fn load_records(
    layout: &StoreLayout,
    document: &DocumentRef,
    filter: impl Fn(&DeletedKey) -> bool,
) -> Result<Vec<DeletedAttachment>> {
    let mut records = Vec::new();
    for key in layout.deleted_keys(document)? {
        if !filter(&key) {
            continue;
        }
        // Directories holding only content belong to another metadata backend.
        if let Some(record) = read_json::<DeletedAttachment>(&layout.deleted(&key).deleted_record())? {
            records.push(record);
        }
    }
    records.sort_by(|a, b| b.deleted_at().cmp(&a.deleted_at()));
    Ok(records)
}

impl DeletedMetadataStore for FileDeletedMetadataStore {
    fn resource_kind(&self) -> ResourceKind {
        self.backing.requires()
    }

    fn save(&self, record: &DeletedAttachment) -> UnitOfWork {
        let path = self.backing.layout().deleted(record.key()).deleted_record();
        FileSaver::new(path, JsonStream(record.clone()))
            .exclusive()
            .into_unit(self.backing.requires())
    }

    fn load(&self, key: &DeletedKey, out: Output<Option<DeletedAttachment>>) -> UnitOfWork {
        let path = self.backing.layout().deleted(key).deleted_record();
        self.backing.reader(format!("load deleted record {key}"), move || {
            out.set(read_json(&path)?);
            Ok(())
        })
    }

    fn list_for_attachment(
        &self,
        reference: &AttachmentRef,
        out: Output<Vec<DeletedAttachment>>,
    ) -> UnitOfWork {
        let layout = self.backing.layout().clone();
        let reference = reference.clone();
        self.backing
            .reader(format!("list deleted {reference}"), move || {
                out.set(load_records(&layout, reference.document(), |key| {
                    key.reference() == &reference
                })?);
                Ok(())
            })
    }

    fn list_for_document(
        &self,
        document: &DocumentRef,
        out: Output<Vec<DeletedAttachment>>,
    ) -> UnitOfWork {
        let layout = self.backing.layout().clone();
        let document = document.clone();
        self.backing
            .reader(format!("list deleted in {document}"), move || {
                out.set(load_records(&layout, &document, |_| true)?);
                Ok(())
            })
    }

    fn purge(&self, key: &DeletedKey) -> UnitOfWork {
        let path = self.backing.layout().deleted(key).deleted_record();
        FileDeleter::new(path).into_unit(self.backing.requires())
    }
}

/// Content and history of deleted attachments, one directory per deletion.
#[derive(Clone)]
pub struct FileDeletedContentStore {
    backing: FileBacking,
    serializer: Arc<dyn VersionListSerializer>,
}

impl std::fmt::Debug for FileDeletedContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDeletedContentStore")
            .field("backing", &self.backing)
            .finish_non_exhaustive()
    }
}

impl FileDeletedContentStore {
    pub fn new(
        layout: Arc<StoreLayout>,
        requires: ResourceKind,
        serializer: Arc<dyn VersionListSerializer>,
    ) -> Result<Self> {
        Ok(Self {
            backing: FileBacking::new(layout, requires)?,
            serializer,
        })
    }
}

impl DeletedContentStore for FileDeletedContentStore {
    fn resource_kind(&self) -> ResourceKind {
        self.backing.requires()
    }

    fn save(&self, key: &DeletedKey, versions: &[ArchivedVersion]) -> UnitOfWork {
        let files = self.backing.layout().deleted(key);
        // Everything is copied: the recycle-bin directory is new.
        let copies: Vec<_> = versions
            .iter()
            .map(|v| ArchivedVersion {
                dirty: true,
                ..v.clone()
            })
            .collect();
        save_versions(
            &self.backing,
            &self.serializer,
            &files,
            format!("save deleted content {key}"),
            &copies,
        )
    }

    fn load(&self, key: &DeletedKey, out: Output<Vec<ArchivedVersion>>) -> UnitOfWork {
        let files = self.backing.layout().deleted(key);
        let serializer = Arc::clone(&self.serializer);
        self.backing
            .reader(format!("load deleted content {key}"), move || {
                let metadata = read_index(serializer.as_ref(), &files.version_index())?;
                out.set(versions_on_disk(&files, metadata.unwrap_or_default()));
                Ok(())
            })
    }

    fn purge(&self, key: &DeletedKey) -> UnitOfWork {
        let dir = self.backing.layout().deleted(key).dir().to_path_buf();
        FileDeleter::new(dir).into_unit(self.backing.requires())
    }
}

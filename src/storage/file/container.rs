use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::{read_json, FileBacking, Steps};
use crate::error::Result;
use crate::fs::{FileSaver, JsonStream, StoreLayout};
use crate::model::{AttachmentRef, DocumentRef};
use crate::storage::ContainerStore;
use crate::tx::{Output, ResourceContext, ResourceKind, UnitOfWork, Work};

/// Attachment lists as `attachments.json` in each document directory.
#[derive(Debug, Clone)]
pub struct FileContainerStore {
    backing: FileBacking,
}

impl FileContainerStore {
    pub fn new(layout: Arc<StoreLayout>, requires: ResourceKind) -> Result<Self> {
        Ok(Self {
            backing: FileBacking::new(layout, requires)?,
        })
    }

    fn update(&self, reference: &AttachmentRef, attach: bool) -> UnitOfWork {
        let verb = if attach { "attach" } else { "detach" };
        let work = UpdateIndex {
            index: self.backing.layout().container_index(reference.document()),
            filename: reference.filename().to_string(),
            attach,
            steps: Steps::default(),
        };
        UnitOfWork::new(format!("{verb} {reference}"), self.backing.requires(), work)
    }
}

impl ContainerStore for FileContainerStore {
    fn resource_kind(&self) -> ResourceKind {
        self.backing.requires()
    }

    fn attach(&self, reference: &AttachmentRef) -> UnitOfWork {
        self.update(reference, true)
    }

    fn detach(&self, reference: &AttachmentRef) -> UnitOfWork {
        self.update(reference, false)
    }

    fn list(&self, document: &DocumentRef, out: Output<Vec<String>>) -> UnitOfWork {
        let index = self.backing.layout().container_index(document);
        self.backing
            .reader(format!("list attachments of {document}"), move || {
                let names: BTreeSet<String> = read_json(&index)?.unwrap_or_default();
                out.set(names.into_iter().collect());
                Ok(())
            })
    }
}

/// Read-modify-write of the index, done when the unit runs.
struct UpdateIndex {
    index: PathBuf,
    filename: String,
    attach: bool,
    steps: Steps,
}

impl Work for UpdateIndex {
    fn run(&mut self, ctx: &mut dyn ResourceContext) -> Result<()> {
        let mut names: BTreeSet<String> = read_json(&self.index)?.unwrap_or_default();
        let changed = if self.attach {
            names.insert(self.filename.clone())
        } else {
            names.remove(&self.filename)
        };
        if !changed {
            debug!(index = %self.index.display(), file = %self.filename, "container already up to date");
            return Ok(());
        }
        self.steps
            .run(FileSaver::new(self.index.clone(), JsonStream(names)), ctx)
    }

    fn commit(&mut self) {
        self.steps.commit();
    }

    fn rollback(&mut self) -> Result<()> {
        self.steps.rollback()
    }
}

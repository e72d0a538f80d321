use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::{reject, FileBacking, Steps};
use crate::error::Result;
use crate::fs::{AttachmentFiles, FileDeleter, FileSaver, StoreLayout};
use crate::model::{ArchivedVersion, AttachmentMetadata, AttachmentRef, Version, VersionContent};
use crate::storage::serializer::{SerializedVersions, VersionListSerializer};
use crate::storage::ArchiveStore;
use crate::tx::{Output, ResourceContext, ResourceKind, UnitOfWork, Work};

pub(crate) fn read_index(
    serializer: &dyn VersionListSerializer,
    path: &Path,
) -> Result<Option<Vec<AttachmentMetadata>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    serializer.parse(&mut BufReader::new(file)).map(Some)
}

pub(crate) fn versions_on_disk(
    files: &AttachmentFiles,
    metadata: Vec<AttachmentMetadata>,
) -> Vec<ArchivedVersion> {
    let mut versions: Vec<_> = metadata
        .into_iter()
        .map(|metadata| ArchivedVersion {
            content: VersionContent::OnDisk(files.version_content(metadata.version)),
            metadata,
            dirty: false,
        })
        .collect();
    versions.sort_by_key(ArchivedVersion::version);
    versions
}

/// Units writing `versions` plus their index into `files`.
///
/// Version files listed in the previous index but not in `versions` are
/// deleted, so the stored archive is exactly `versions`.
pub(crate) fn save_versions(
    backing: &FileBacking,
    serializer: &Arc<dyn VersionListSerializer>,
    files: &AttachmentFiles,
    label: String,
    versions: &[ArchivedVersion],
) -> UnitOfWork {
    let requires = backing.requires();
    let mut units = Vec::with_capacity(versions.len() + 2);
    units.push(UnitOfWork::new(
        format!("prune stale versions in {}", files.dir().display()),
        requires,
        PruneStale {
            files: files.clone(),
            serializer: Arc::clone(serializer),
            keep: versions.iter().map(ArchivedVersion::version).collect(),
            steps: Steps::default(),
        },
    ));
    for version in versions {
        let path = files.version_content(version.version());
        let stored = path.exists();
        if stored && !version.dirty {
            debug!(path = %path.display(), "archived version unchanged, not rewriting");
            continue;
        }
        if version.content == VersionContent::OnDisk(path.clone()) {
            // The only copy of these bytes is the missing file itself.
            units.push(reject(
                format!("save {}", path.display()),
                format!("content of version {} is missing", version.version()),
            ));
            continue;
        }
        units.push(FileSaver::new(path, version.content.clone()).into_unit(requires));
    }

    let index: Vec<_> = versions.iter().map(|v| v.metadata.clone()).collect();
    units.push(
        FileSaver::new(
            files.version_index(),
            SerializedVersions::new(Arc::clone(serializer), index),
        )
        .into_unit(requires),
    );
    backing.sequence(label, units)
}

/// Archive as one `v<version>` file per version plus a serialized `versions.json`.
#[derive(Clone)]
pub struct FileArchiveStore {
    backing: FileBacking,
    serializer: Arc<dyn VersionListSerializer>,
}

impl std::fmt::Debug for FileArchiveStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileArchiveStore")
            .field("backing", &self.backing)
            .finish_non_exhaustive()
    }
}

impl FileArchiveStore {
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

impl ArchiveStore for FileArchiveStore {
    fn resource_kind(&self) -> ResourceKind {
        self.backing.requires()
    }

    fn save(&self, reference: &AttachmentRef, versions: &[ArchivedVersion]) -> UnitOfWork {
        if versions.is_empty() {
            return UnitOfWork::noop(format!("no versions to archive for {reference}"));
        }
        let files = self.backing.layout().attachment(reference);
        save_versions(
            &self.backing,
            &self.serializer,
            &files,
            format!("save archive {reference}"),
            versions,
        )
    }

    fn load(&self, reference: &AttachmentRef, out: Output<Vec<ArchivedVersion>>) -> UnitOfWork {
        let files = self.backing.layout().attachment(reference);
        let serializer = Arc::clone(&self.serializer);
        self.backing.reader(format!("load archive {reference}"), move || {
            let metadata = read_index(serializer.as_ref(), &files.version_index())?;
            out.set(versions_on_disk(&files, metadata.unwrap_or_default()));
            Ok(())
        })
    }

    fn delete(&self, reference: &AttachmentRef) -> UnitOfWork {
        let work = DeleteArchive {
            files: self.backing.layout().attachment(reference),
            serializer: Arc::clone(&self.serializer),
            steps: Steps::default(),
        };
        UnitOfWork::new(
            format!("delete archive {reference}"),
            self.backing.requires(),
            work,
        )
    }
}

/// Reads the previous index when it runs and deletes versions not kept.
struct PruneStale {
    files: AttachmentFiles,
    serializer: Arc<dyn VersionListSerializer>,
    keep: HashSet<Version>,
    steps: Steps,
}

impl Work for PruneStale {
    fn run(&mut self, ctx: &mut dyn ResourceContext) -> Result<()> {
        let Some(previous) = read_index(self.serializer.as_ref(), &self.files.version_index())? else {
            return Ok(());
        };
        for metadata in previous {
            if self.keep.contains(&metadata.version) {
                continue;
            }
            debug!(version = %metadata.version, dir = %self.files.dir().display(), "dropping stale version");
            self.steps.run(
                FileDeleter::new(self.files.version_content(metadata.version)),
                ctx,
            )?;
        }
        Ok(())
    }

    fn commit(&mut self) {
        self.steps.commit();
    }

    fn rollback(&mut self) -> Result<()> {
        self.steps.rollback()
    }
}

/// Reads the index when it runs and deletes every file it names.
struct DeleteArchive {
    files: AttachmentFiles,
    serializer: Arc<dyn VersionListSerializer>,
    steps: Steps,
}

impl Work for DeleteArchive {
    fn run(&mut self, ctx: &mut dyn ResourceContext) -> Result<()> {
        let index = self.files.version_index();
        let Some(versions) = read_index(self.serializer.as_ref(), &index)? else {
            debug!(path = %index.display(), "no archive to delete");
            return Ok(());
        };
        for metadata in versions {
            self.steps.run(
                FileDeleter::new(self.files.version_content(metadata.version)),
                ctx,
            )?;
        }
        self.steps.run(FileDeleter::new(index), ctx)
    }

    fn commit(&mut self) {
        self.steps.commit();
    }

    fn rollback(&mut self) -> Result<()> {
        self.steps.rollback()
    }
}

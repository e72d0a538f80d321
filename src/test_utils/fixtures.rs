use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use crate::adapter::{CompositeStoreAdapter, CompositeStoreAdapterBuilder};
use crate::error::AtticError;
use crate::fs::{FsProvider, StoreLayout};
use crate::model::{ArchivedVersion, Attachment, AttachmentRef, DeletedKey};
use crate::storage::{
    ContentStore, DeletedContentStore, FileArchiveStore, FileContainerStore, FileContentStore,
    FileDeletedContentStore, FileDeletedMetadataStore, FileMetadataStore, JsonVersionListSerializer,
    SqliteProvider, VersionListSerializer,
};
use crate::tx::{Output, ProviderRegistry, ResourceKind, UnitOfWork};

/// An isolated storage root with helpers to build adapters over it.
pub struct StoreFixture {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    kind: ResourceKind,
}

impl StoreFixture {
    /// File stores that need no lock.
    pub fn files() -> Self {
        Self::with_kind(ResourceKind::Unbound)
    }

    /// File stores that only run while holding the store lock.
    pub fn locked_files() -> Self {
        Self::with_kind(ResourceKind::Filesystem)
    }

    fn with_kind(kind: ResourceKind) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("store");
        std::fs::create_dir_all(&root).expect("Failed to create store root");
        Self {
            temp_dir,
            root,
            kind,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn layout(&self) -> Arc<StoreLayout> {
        Arc::new(StoreLayout::new(&self.root))
    }

    /// Providers for the file stores: the lock provider when they need it.
    pub fn providers(&self) -> ProviderRegistry {
        let mut providers = ProviderRegistry::new();
        if self.kind == ResourceKind::Filesystem {
            providers.register(Arc::new(FsProvider::new(
                &self.root,
                Duration::from_millis(500),
            )));
        }
        providers
    }

    /// The SQLite provider first, then the file providers.
    pub fn sqlite_providers(&self) -> ProviderRegistry {
        let mut providers = ProviderRegistry::new().with(self.sqlite_provider());
        if self.kind == ResourceKind::Filesystem {
            providers.register(Arc::new(FsProvider::new(
                &self.root,
                Duration::from_millis(500),
            )));
        }
        providers
    }

    /// A migrated database next to the store root.
    pub fn sqlite_provider(&self) -> Arc<SqliteProvider> {
        let path = self.temp_dir.path().join("attic.db");
        Arc::new(SqliteProvider::open(path, Duration::from_secs(5)).expect("Failed to open sqlite"))
    }

    /// Every store file-backed, container included.
    pub fn file_stores(&self) -> CompositeStoreAdapterBuilder {
        let layout = self.layout();
        let serializer: Arc<dyn VersionListSerializer> = Arc::new(JsonVersionListSerializer);
        let kind = self.kind;
        CompositeStoreAdapter::builder()
            .metadata(Arc::new(
                FileMetadataStore::new(Arc::clone(&layout), kind).expect("metadata store"),
            ))
            .content(Arc::new(
                FileContentStore::new(Arc::clone(&layout), kind).expect("content store"),
            ))
            .archive(Arc::new(
                FileArchiveStore::new(Arc::clone(&layout), kind, Arc::clone(&serializer))
                    .expect("archive store"),
            ))
            .deleted_metadata(Arc::new(
                FileDeletedMetadataStore::new(Arc::clone(&layout), kind)
                    .expect("deleted metadata store"),
            ))
            .deleted_content(Arc::new(
                FileDeletedContentStore::new(Arc::clone(&layout), kind, serializer)
                    .expect("deleted content store"),
            ))
            .container(Arc::new(
                FileContainerStore::new(layout, kind).expect("container store"),
            ))
            .providers(self.providers())
    }

    pub fn adapter(&self) -> CompositeStoreAdapter {
        self.adapter_with(|builder| builder)
    }

    /// File stores with `customize` applied before building.
    pub fn adapter_with(
        &self,
        customize: impl FnOnce(CompositeStoreAdapterBuilder) -> CompositeStoreAdapterBuilder,
    ) -> CompositeStoreAdapter {
        customize(self.file_stores())
            .build()
            .expect("Failed to build adapter")
    }

    /// Absolute path of a file under the store root.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Save a new attachment with `content` and return it.
    pub fn seed(&self, adapter: &CompositeStoreAdapter, reference: &str, content: &[u8]) -> Attachment {
        let reference: AttachmentRef = reference.parse().expect("valid reference");
        let mut attachment = Attachment::new(reference, content.to_vec());
        adapter
            .save(&mut attachment, true)
            .expect("Failed to seed attachment");
        attachment
    }
}

fn injected_failure(label: &str, fail: &Arc<AtomicBool>) -> UnitOfWork {
    let fail = Arc::clone(fail);
    UnitOfWork::from_fn(label, move || {
        if fail.load(Ordering::SeqCst) {
            return Err(AtticError::Io(std::io::Error::other("injected failure")));
        }
        Ok(())
    })
}

fn with_failure(mut unit: UnitOfWork, label: &str, fail: &Arc<AtomicBool>) -> UnitOfWork {
    unit.attach(injected_failure(label, fail))
        .expect("unbound work attaches anywhere");
    unit
}

/// A content store whose saves or deletes fail on demand after the real
/// work ran.
pub struct FaultyContentStore {
    inner: Arc<dyn ContentStore>,
    fail_saves: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
}

impl FaultyContentStore {
    pub fn new(inner: Arc<dyn ContentStore>) -> Self {
        Self {
            inner,
            fail_saves: Arc::new(AtomicBool::new(false)),
            fail_deletes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle to switch save failures on and off after the store is handed out.
    pub fn switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_saves)
    }

    /// Same for deletes.
    pub fn delete_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_deletes)
    }
}

impl ContentStore for FaultyContentStore {
    fn resource_kind(&self) -> ResourceKind {
        self.inner.resource_kind()
    }

    fn save(&self, attachment: &Attachment) -> UnitOfWork {
        with_failure(
            self.inner.save(attachment),
            "injected content save failure",
            &self.fail_saves,
        )
    }

    fn load(&self, reference: &AttachmentRef, out: Output<Option<Vec<u8>>>) -> UnitOfWork {
        self.inner.load(reference, out)
    }

    fn delete(&self, reference: &AttachmentRef) -> UnitOfWork {
        with_failure(
            self.inner.delete(reference),
            "injected content delete failure",
            &self.fail_deletes,
        )
    }
}

/// A recycle-bin content store whose purges fail on demand.
pub struct FaultyDeletedContentStore {
    inner: Arc<dyn DeletedContentStore>,
    fail_purges: Arc<AtomicBool>,
}

impl FaultyDeletedContentStore {
    pub fn new(inner: Arc<dyn DeletedContentStore>) -> Self {
        Self {
            inner,
            fail_purges: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_purges)
    }
}

impl DeletedContentStore for FaultyDeletedContentStore {
    fn resource_kind(&self) -> ResourceKind {
        self.inner.resource_kind()
    }

    fn save(&self, key: &DeletedKey, versions: &[ArchivedVersion]) -> UnitOfWork {
        self.inner.save(key, versions)
    }

    fn load(&self, key: &DeletedKey, out: Output<Vec<ArchivedVersion>>) -> UnitOfWork {
        self.inner.load(key, out)
    }

    fn purge(&self, key: &DeletedKey) -> UnitOfWork {
        with_failure(
            self.inner.purge(key),
            "injected deleted content purge failure",
            &self.fail_purges,
        )
    }
}

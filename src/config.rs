use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapter::CompositeStoreAdapter;
use crate::error::{AtticError, Result};
use crate::fs::{FsProvider, StoreLayout};
use crate::storage::{
    ArchiveStore, ContainerStore, ContentStore, DeletedContentStore, DeletedMetadataStore,
    FileArchiveStore, FileContainerStore, FileContentStore, FileDeletedContentStore,
    FileDeletedMetadataStore, FileMetadataStore, JsonVersionListSerializer, MetadataStore,
    SqliteContainerStore, SqliteDeletedMetadataStore, SqliteMetadataStore, SqliteProvider,
    VersionListSerializer,
};
use crate::tx::{ProviderRegistry, ResourceKind};

/// Name of the per-root config file.
pub const CONFIG_FILENAME: &str = "attic.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metadata: BackendConfig,
    #[serde(default)]
    pub deleted: BackendConfig,
    #[serde(default)]
    pub sqlite: SqliteConfig,
    #[serde(default)]
    pub filesystem: FilesystemConfig,
    #[serde(default)]
    pub recycle_bin: RecycleBinConfig,
}

impl Config {
    /// Load configuration for `root_override` (or the default root).
    ///
    /// Defaults, then the explicit file (`--config` or `ATTIC_CONFIG`) or
    /// `<root>/attic.toml`, then `ATTIC_*` environment variables.
    pub fn load(explicit_path: Option<&Path>, root_override: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit_path, root_override, |key| std::env::var(key).ok())
    }

    /// [`Config::load`] with an injectable environment.
    pub fn load_with(
        explicit_path: Option<&Path>,
        root_override: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| env("ATTIC_CONFIG").map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                AtticError::Config(format!("config file {} not found", path.display()))
            })?;
            config.merge_patch(patch);
        } else {
            let root = root_override
                .map(PathBuf::from)
                .or_else(|| env("ATTIC_ROOT").map(PathBuf::from))
                .unwrap_or_else(default_root);
            if let Some(patch) = Self::load_patch(&root.join(CONFIG_FILENAME))? {
                config.merge_patch(patch);
            }
        }

        config.apply_env_overrides(&env)?;
        if let Some(root) = root_override {
            config.storage.root = Some(root.to_path_buf());
        }

        Ok(config)
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| AtticError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| AtticError::Config(format!("parse config {}: {err}", path.display())))?;
        debug!(path = %path.display(), "loaded config file");
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.storage {
            self.storage.merge(patch);
        }
        if let Some(patch) = patch.metadata {
            self.metadata.merge(patch);
        }
        if let Some(patch) = patch.deleted {
            self.deleted.merge(patch);
        }
        if let Some(patch) = patch.sqlite {
            self.sqlite.merge(patch);
        }
        if let Some(patch) = patch.filesystem {
            self.filesystem.merge(patch);
        }
        if let Some(patch) = patch.recycle_bin {
            self.recycle_bin.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self, env: &impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = env("ATTIC_ROOT") {
            self.storage.root = Some(PathBuf::from(value));
        }
        if let Some(value) = env("ATTIC_METADATA_BACKEND") {
            self.metadata.backend = value.parse()?;
        }
        if let Some(value) = env("ATTIC_DELETED_BACKEND") {
            self.deleted.backend = value.parse()?;
        }
        if let Some(value) = env("ATTIC_SQLITE_PATH") {
            self.sqlite.path = Some(PathBuf::from(value));
        }
        if let Some(value) = env_u64(env, "ATTIC_SQLITE_BUSY_TIMEOUT_MS")? {
            self.sqlite.busy_timeout_ms = value;
        }
        if let Some(value) = env_bool(env, "ATTIC_FS_REQUIRE_LOCK") {
            self.filesystem.require_lock = value;
        }
        if let Some(value) = env_u64(env, "ATTIC_FS_LOCK_TIMEOUT_MS")? {
            self.filesystem.lock_timeout_ms = value;
        }
        if let Some(value) = env_bool(env, "ATTIC_RECYCLE_BIN") {
            self.recycle_bin.enabled = value;
        }
        Ok(())
    }

    /// The storage root in effect.
    #[must_use]
    pub fn root(&self) -> PathBuf {
        self.storage.root.clone().unwrap_or_else(default_root)
    }

    /// Database file, `<root>/attic.db` unless configured.
    #[must_use]
    pub fn sqlite_path(&self) -> PathBuf {
        self.sqlite
            .path
            .clone()
            .unwrap_or_else(|| self.root().join("attic.db"))
    }

    #[must_use]
    pub fn uses_sqlite(&self) -> bool {
        self.metadata.backend == Backend::Sqlite || self.deleted.backend == Backend::Sqlite
    }

    /// Resource kind file stores require.
    #[must_use]
    pub const fn file_store_kind(&self) -> ResourceKind {
        if self.filesystem.require_lock {
            ResourceKind::Filesystem
        } else {
            ResourceKind::Unbound
        }
    }

    /// Providers for the configured backends.
    ///
    /// SQLite is registered first so groups of unbound work join its
    /// transaction. The filesystem provider is only needed when file stores
    /// require the lock.
    pub fn build_providers(&self) -> Result<ProviderRegistry> {
        let mut providers = ProviderRegistry::new();
        if self.uses_sqlite() {
            providers.register(Arc::new(SqliteProvider::open(
                self.sqlite_path(),
                Duration::from_millis(self.sqlite.busy_timeout_ms),
            )?));
        }
        if self.filesystem.require_lock {
            providers.register(Arc::new(FsProvider::new(
                self.root(),
                Duration::from_millis(self.filesystem.lock_timeout_ms),
            )));
        }
        Ok(providers)
    }

    /// Construct stores and providers from configuration.
    pub fn build_adapter(&self) -> Result<CompositeStoreAdapter> {
        let root = self.root();
        let layout = Arc::new(StoreLayout::new(&root));
        let kind = self.file_store_kind();
        let serializer: Arc<dyn VersionListSerializer> = Arc::new(JsonVersionListSerializer);

        let (metadata, container): (Arc<dyn MetadataStore>, Arc<dyn ContainerStore>) =
            match self.metadata.backend {
                Backend::Sqlite => (Arc::new(SqliteMetadataStore), Arc::new(SqliteContainerStore)),
                Backend::File => (
                    Arc::new(FileMetadataStore::new(Arc::clone(&layout), kind)?),
                    Arc::new(FileContainerStore::new(Arc::clone(&layout), kind)?),
                ),
            };
        let deleted_metadata: Arc<dyn DeletedMetadataStore> = match self.deleted.backend {
            Backend::Sqlite => Arc::new(SqliteDeletedMetadataStore),
            Backend::File => Arc::new(FileDeletedMetadataStore::new(Arc::clone(&layout), kind)?),
        };
        let content: Arc<dyn ContentStore> =
            Arc::new(FileContentStore::new(Arc::clone(&layout), kind)?);
        let archive: Arc<dyn ArchiveStore> = Arc::new(FileArchiveStore::new(
            Arc::clone(&layout),
            kind,
            Arc::clone(&serializer),
        )?);
        let deleted_content: Arc<dyn DeletedContentStore> = Arc::new(
            FileDeletedContentStore::new(Arc::clone(&layout), kind, serializer)?,
        );

        debug!(
            root = %root.display(),
            metadata = %self.metadata.backend,
            deleted = %self.deleted.backend,
            file_kind = %kind,
            "building composite store adapter"
        );

        CompositeStoreAdapter::builder()
            .metadata(metadata)
            .content(content)
            .archive(archive)
            .deleted_metadata(deleted_metadata)
            .deleted_content(deleted_content)
            .container(container)
            .providers(self.build_providers()?)
            .recycle_bin(self.recycle_bin.enabled)
            .build()
    }
}

fn default_root() -> PathBuf {
    dirs::data_dir().map_or_else(|| PathBuf::from(".attic"), |dir| dir.join("attic"))
}

/// Where a store family keeps its records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Sqlite,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::Sqlite => "sqlite",
        })
    }
}

impl FromStr for Backend {
    type Err = AtticError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" | "fs" | "filesystem" => Ok(Self::File),
            "sqlite" | "db" => Ok(Self::Sqlite),
            other => Err(AtticError::Config(format!(
                "unknown backend '{other}' (expected file or sqlite)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub root: Option<PathBuf>,
}

impl StorageConfig {
    fn merge(&mut self, patch: StoragePatch) {
        if let Some(root) = patch.root {
            self.root = Some(root);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    pub backend: Backend,
}

impl BackendConfig {
    fn merge(&mut self, patch: BackendPatch) {
        if let Some(backend) = patch.backend {
            self.backend = backend;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5_000,
        }
    }
}

impl SqliteConfig {
    fn merge(&mut self, patch: SqlitePatch) {
        if let Some(path) = patch.path {
            self.path = Some(path);
        }
        if let Some(value) = patch.busy_timeout_ms {
            self.busy_timeout_ms = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemConfig {
    /// File stores only run while holding the store lock.
    pub require_lock: bool,
    pub lock_timeout_ms: u64,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            require_lock: false,
            lock_timeout_ms: 10_000,
        }
    }
}

impl FilesystemConfig {
    fn merge(&mut self, patch: FilesystemPatch) {
        if let Some(value) = patch.require_lock {
            self.require_lock = value;
        }
        if let Some(value) = patch.lock_timeout_ms {
            self.lock_timeout_ms = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecycleBinConfig {
    pub enabled: bool,
}

impl Default for RecycleBinConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl RecycleBinConfig {
    fn merge(&mut self, patch: RecycleBinPatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    pub storage: Option<StoragePatch>,
    pub metadata: Option<BackendPatch>,
    pub deleted: Option<BackendPatch>,
    pub sqlite: Option<SqlitePatch>,
    pub filesystem: Option<FilesystemPatch>,
    pub recycle_bin: Option<RecycleBinPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StoragePatch {
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct BackendPatch {
    pub backend: Option<Backend>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SqlitePatch {
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FilesystemPatch {
    pub require_lock: Option<bool>,
    pub lock_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RecycleBinPatch {
    pub enabled: Option<bool>,
}

fn env_bool(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    env(key).map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn env_u64(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    match env(key) {
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|err| AtticError::Config(format!("invalid {key} value {value}: {err}"))),
        None => Ok(None),
    }
}

use std::path::Path;
use std::process::Output;
use std::sync::Arc;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

use attic::adapter::{CompositeStoreAdapter, CompositeStoreAdapterBuilder};
use attic::model::{AttachmentRef, DocumentRef};
use attic::storage::{SqliteContainerStore, SqliteDeletedMetadataStore, SqliteMetadataStore};
use attic::test_utils::{logging, StoreFixture};

pub fn reference(s: &str) -> AttachmentRef {
    s.parse().expect("valid attachment reference")
}

pub fn document(s: &str) -> DocumentRef {
    s.parse().expect("valid document reference")
}

/// File stores without the store lock.
pub fn files() -> StoreFixture {
    logging::init();
    StoreFixture::files()
}

/// File stores that run under the store lock.
pub fn locked_files() -> StoreFixture {
    logging::init();
    StoreFixture::locked_files()
}

/// Metadata, deleted records and the container moved into SQLite.
///
/// The SQLite provider is registered first, so with unlocked file stores
/// every operation runs in one database transaction.
pub fn sqlite_backed(
    fixture: &StoreFixture,
    customize: impl FnOnce(CompositeStoreAdapterBuilder) -> CompositeStoreAdapterBuilder,
) -> CompositeStoreAdapter {
    let providers = fixture.sqlite_providers();
    fixture.adapter_with(|builder| {
        customize(
            builder
                .metadata(Arc::new(SqliteMetadataStore))
                .deleted_metadata(Arc::new(SqliteDeletedMetadataStore))
                .container(Arc::new(SqliteContainerStore))
                .providers(providers),
        )
    })
}

/// A scratch directory driven through the `attic` binary.
pub struct CliFixture {
    pub temp_dir: TempDir,
}

impl CliFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write_input(&self, name: &str, content: &str) -> std::path::PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, content).expect("Failed to write input file");
        path
    }

    /// Run `attic --root <tmp> <args>` with a clean `ATTIC_*` environment.
    pub fn run(&self, args: &[&str]) -> Output {
        let mut cmd = Command::cargo_bin("attic").expect("attic binary");
        for key in [
            "ATTIC_CONFIG",
            "ATTIC_ROOT",
            "ATTIC_METADATA_BACKEND",
            "ATTIC_DELETED_BACKEND",
            "ATTIC_SQLITE_PATH",
            "ATTIC_FS_REQUIRE_LOCK",
            "ATTIC_RECYCLE_BIN",
            "ATTIC_DELETER",
            "RUST_LOG",
        ] {
            cmd.env_remove(key);
        }
        cmd.arg("--root").arg(self.root()).args(args);
        cmd.output().expect("Failed to run attic")
    }

    /// Run with `--json` and parse the response envelope.
    pub fn run_json(&self, args: &[&str]) -> (Output, Value) {
        let mut full = vec!["--json"];
        full.extend_from_slice(args);
        let output = self.run(&full);
        let value = serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
            panic!(
                "stdout should be JSON ({err}): {}\nstderr: {}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            )
        });
        (output, value)
    }

    /// Run with `--json`, assert success and return the `data` payload.
    pub fn ok(&self, args: &[&str]) -> Value {
        let (output, value) = self.run_json(args);
        assert!(
            output.status.success(),
            "attic {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        assert_eq!(value["status"], "ok", "unexpected envelope: {value}");
        value["data"].clone()
    }
}

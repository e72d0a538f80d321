//! SQLite-backed stores and the provider they share.
//!
//! Every SQLite store runs its statements on the connection of the
//! [`SqliteSession`] its root transaction acquired, so all of them commit or
//! roll back together with the database transaction.

mod container;
mod deleted;
mod metadata;

use std::any::Any;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, info};

pub use container::SqliteContainerStore;
pub use deleted::SqliteDeletedMetadataStore;
pub use metadata::SqliteMetadataStore;

use crate::error::{AtticError, Result};
use crate::storage::migrations;
use crate::tx::{ResourceContext, ResourceKind, TransactionProvider, TypedContext};

/// An open connection inside `BEGIN IMMEDIATE`.
pub struct SqliteSession {
    conn: Connection,
    open: bool,
}

impl std::fmt::Debug for SqliteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSession")
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

impl SqliteSession {
    fn begin(conn: Connection) -> Result<Self> {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Self { conn, open: true })
    }

    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn finish(&mut self, statement: &str) -> Result<()> {
        if !self.open {
            return Err(AtticError::InvalidState(
                "sqlite transaction already finished".to_string(),
            ));
        }
        self.open = false;
        self.conn.execute_batch(statement)?;
        Ok(())
    }
}

impl ResourceContext for SqliteSession {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Sqlite
    }

    fn commit(&mut self) -> Result<()> {
        self.finish("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.open {
            // a failed COMMIT has already ended the transaction
            return Ok(());
        }
        self.finish("ROLLBACK")
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl TypedContext for SqliteSession {
    const KIND: ResourceKind = ResourceKind::Sqlite;
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if self.open {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                debug!("Failed to roll back abandoned sqlite transaction: {err}");
            }
        }
    }
}

/// Opens one connection per transaction on a migrated database file.
#[derive(Debug, Clone)]
pub struct SqliteProvider {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteProvider {
    /// Create the database if needed and bring its schema up to date.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        let schema_version = migrations::run_migrations(&conn)?;
        info!(path = %path.display(), schema_version, "sqlite store ready");

        Ok(Self {
            path: path.to_path_buf(),
            busy_timeout,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Self::configure_pragmas(&conn)?;
        Ok(conn)
    }

    fn configure_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    }
}

impl TransactionProvider for SqliteProvider {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Sqlite
    }

    fn name(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }

    fn preflight(&self) -> Result<()> {
        if !self.path.exists() {
            return Err(AtticError::MissingConfig(format!(
                "sqlite database {} no longer exists",
                self.path.display()
            )));
        }
        Ok(())
    }

    fn acquire(&self) -> Result<Box<dyn ResourceContext>> {
        let session = SqliteSession::begin(self.connect()?)?;
        Ok(Box::new(session))
    }
}

fn parse_column<T: std::str::FromStr>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
    })
}

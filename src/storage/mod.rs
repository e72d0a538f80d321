//! Storage layer for attic
//!
//! Defines the per-concern store contracts and their two implementations:
//! compensated files under a storage root, and SQLite tables sharing one
//! database transaction.

pub mod file;
pub mod migrations;
pub mod serializer;
pub mod sqlite;
mod stores;

pub use file::{
    FileArchiveStore, FileBacking, FileContainerStore, FileContentStore, FileDeletedContentStore,
    FileDeletedMetadataStore, FileMetadataStore,
};
pub use serializer::{JsonVersionListSerializer, VersionListSerializer};
pub use sqlite::{
    SqliteContainerStore, SqliteDeletedMetadataStore, SqliteMetadataStore, SqliteProvider,
    SqliteSession,
};
pub use stores::{
    ArchiveStore, ContainerStore, ContentStore, DeletedContentStore, DeletedMetadataStore,
    MetadataStore,
};

//! Live attachments and their archived versions.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{AttachmentRef, Version};
use crate::error::{AtticError, Result};

/// Hex-encoded SHA-256 of attachment bytes.
#[must_use]
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Descriptive fields of one attachment version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    pub reference: AttachmentRef,
    pub version: Version,
    pub size: u64,
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl AttachmentMetadata {
    fn for_bytes(reference: AttachmentRef, version: Version, bytes: &[u8]) -> Self {
        Self {
            reference,
            version,
            size: bytes.len() as u64,
            content_hash: content_digest(bytes),
            mime_type: None,
            author: None,
            comment: None,
            updated_at: Utc::now(),
        }
    }
}

/// Bytes of an archived version, either in memory or still in a store file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionContent {
    Loaded(Vec<u8>),
    OnDisk(PathBuf),
}

impl VersionContent {
    pub fn read(&self) -> Result<Vec<u8>> {
        match self {
            Self::Loaded(bytes) => Ok(bytes.clone()),
            Self::OnDisk(path) => fs::read(path).map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    AtticError::NotFound(format!("version content {}", path.display()))
                } else {
                    AtticError::Io(err)
                }
            }),
        }
    }
}

/// One entry of an attachment's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedVersion {
    pub metadata: AttachmentMetadata,
    pub content: VersionContent,
    /// Set when the bytes differ from what the archive store holds.
    pub dirty: bool,
}

impl ArchivedVersion {
    #[must_use]
    pub const fn version(&self) -> Version {
        self.metadata.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttachmentContent {
    bytes: Vec<u8>,
    dirty: bool,
}

/// A live attachment: metadata, optionally loaded content, optionally loaded archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    metadata: AttachmentMetadata,
    content: Option<AttachmentContent>,
    archive: Option<Vec<ArchivedVersion>>,
    version_persisted: bool,
}

impl Attachment {
    /// A brand-new attachment at version 1.1 with dirty content.
    #[must_use]
    pub fn new(reference: AttachmentRef, bytes: Vec<u8>) -> Self {
        Self {
            metadata: AttachmentMetadata::for_bytes(reference, Version::INITIAL, &bytes),
            content: Some(AttachmentContent { bytes, dirty: true }),
            archive: None,
            version_persisted: false,
        }
    }

    /// An attachment without content, for operations that only need identity.
    #[must_use]
    pub const fn from_metadata(metadata: AttachmentMetadata) -> Self {
        Self {
            metadata,
            content: None,
            archive: None,
            version_persisted: true,
        }
    }

    pub(crate) fn from_stored(metadata: AttachmentMetadata, bytes: Vec<u8>) -> Self {
        Self {
            metadata,
            content: Some(AttachmentContent {
                bytes,
                dirty: false,
            }),
            archive: None,
            version_persisted: true,
        }
    }

    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.metadata.author = Some(author.into());
        self
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.metadata.mime_type = Some(mime_type.into());
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.metadata.comment = Some(comment.into());
        self
    }

    /// Replace the content. Bumps the minor version once per saved version.
    pub fn set_content(&mut self, bytes: Vec<u8>, author: Option<&str>) -> Result<()> {
        if self.version_persisted {
            self.metadata.version = self.metadata.version.next_minor()?;
            self.version_persisted = false;
        }
        self.metadata.size = bytes.len() as u64;
        self.metadata.content_hash = content_digest(&bytes);
        self.metadata.updated_at = Utc::now();
        if let Some(author) = author {
            self.metadata.author = Some(author.to_string());
        }
        self.content = Some(AttachmentContent { bytes, dirty: true });
        Ok(())
    }

    #[must_use]
    pub const fn reference(&self) -> &AttachmentRef {
        &self.metadata.reference
    }

    #[must_use]
    pub const fn version(&self) -> Version {
        self.metadata.version
    }

    #[must_use]
    pub const fn metadata(&self) -> &AttachmentMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_ref().map(|c| c.bytes.as_slice())
    }

    #[must_use]
    pub fn is_content_dirty(&self) -> bool {
        self.content.as_ref().is_some_and(|c| c.dirty)
    }

    /// Loaded archive, oldest version first.
    #[must_use]
    pub fn archive(&self) -> Option<&[ArchivedVersion]> {
        self.archive.as_deref()
    }

    pub(crate) fn set_archive(&mut self, mut versions: Vec<ArchivedVersion>) {
        versions.sort_by_key(ArchivedVersion::version);
        self.archive = Some(versions);
    }

    /// The archive as it should be after saving the current state.
    ///
    /// The current version is appended, or replaces an unsaved entry with
    /// the same number. Earlier entries are never dropped.
    pub(crate) fn versions_to_archive(&self) -> Vec<ArchivedVersion> {
        let mut versions = self.archive.clone().unwrap_or_default();
        if let Some(content) = &self.content {
            let current = ArchivedVersion {
                metadata: self.metadata.clone(),
                content: VersionContent::Loaded(content.bytes.clone()),
                dirty: content.dirty,
            };
            match versions
                .iter_mut()
                .find(|v| v.metadata.version == self.metadata.version)
            {
                Some(existing) if content.dirty => *existing = current,
                Some(_) => {}
                None => versions.push(current),
            }
        }
        versions.sort_by_key(ArchivedVersion::version);
        versions
    }

    pub(crate) fn mark_saved(&mut self, mut versions: Vec<ArchivedVersion>) {
        if let Some(content) = &mut self.content {
            content.dirty = false;
        }
        for version in &mut versions {
            version.dirty = false;
        }
        self.archive = Some(versions);
        self.version_persisted = true;
    }

    /// Restored attachments rewrite every byte on their next save.
    pub(crate) fn restored(
        metadata: AttachmentMetadata,
        bytes: Vec<u8>,
        versions: Vec<ArchivedVersion>,
    ) -> Self {
        let mut attachment = Self {
            metadata,
            content: Some(AttachmentContent { bytes, dirty: true }),
            archive: None,
            version_persisted: false,
        };
        attachment.set_archive(versions);
        attachment
    }
}

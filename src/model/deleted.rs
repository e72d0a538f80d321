//! Recycle-bin records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ArchivedVersion, Attachment, AttachmentMetadata, AttachmentRef, VersionContent};
use crate::error::{AtticError, Result};

/// Identifies one deletion of one attachment. Time is kept at millisecond precision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeletedKey {
    reference: AttachmentRef,
    deleted_at: DateTime<Utc>,
}

impl DeletedKey {
    #[must_use]
    pub fn new(reference: AttachmentRef, deleted_at: DateTime<Utc>) -> Self {
        let millis = deleted_at.timestamp_millis();
        Self {
            reference,
            deleted_at: DateTime::from_timestamp_millis(millis).unwrap_or(deleted_at),
        }
    }

    pub fn from_millis(reference: AttachmentRef, millis: i64) -> Result<Self> {
        let deleted_at = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
            AtticError::InvalidDeletedKey(format!("timestamp {millis} out of range"))
        })?;
        Ok(Self {
            reference,
            deleted_at,
        })
    }

    #[must_use]
    pub const fn reference(&self) -> &AttachmentRef {
        &self.reference
    }

    #[must_use]
    pub const fn deleted_at(&self) -> DateTime<Utc> {
        self.deleted_at
    }

    #[must_use]
    pub const fn millis(&self) -> i64 {
        self.deleted_at.timestamp_millis()
    }
}

impl fmt::Display for DeletedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.reference, self.millis())
    }
}

impl FromStr for DeletedKey {
    type Err = AtticError;

    fn from_str(s: &str) -> Result<Self> {
        let (reference, millis) = s.rsplit_once('@').ok_or_else(|| {
            AtticError::InvalidDeletedKey(format!("'{s}' has no @<millis> suffix"))
        })?;
        let millis = millis
            .parse()
            .map_err(|_| AtticError::InvalidDeletedKey(format!("'{millis}' is not a timestamp")))?;
        Self::from_millis(reference.parse()?, millis)
    }
}

/// A deleted attachment held in the recycle bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedAttachment {
    key: DeletedKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deleter: Option<String>,
    metadata: AttachmentMetadata,
    #[serde(skip)]
    versions: Option<Vec<ArchivedVersion>>,
}

impl DeletedAttachment {
    #[must_use]
    pub const fn new(key: DeletedKey, deleter: Option<String>, metadata: AttachmentMetadata) -> Self {
        Self {
            key,
            deleter,
            metadata,
            versions: None,
        }
    }

    #[must_use]
    pub const fn key(&self) -> &DeletedKey {
        &self.key
    }

    #[must_use]
    pub const fn reference(&self) -> &AttachmentRef {
        self.key.reference()
    }

    #[must_use]
    pub const fn deleted_at(&self) -> DateTime<Utc> {
        self.key.deleted_at()
    }

    #[must_use]
    pub fn deleter(&self) -> Option<&str> {
        self.deleter.as_deref()
    }

    #[must_use]
    pub const fn metadata(&self) -> &AttachmentMetadata {
        &self.metadata
    }

    /// Archived versions, once the deleted-content store has been read.
    #[must_use]
    pub fn versions(&self) -> Option<&[ArchivedVersion]> {
        self.versions.as_deref()
    }

    pub(crate) fn set_versions(&mut self, mut versions: Vec<ArchivedVersion>) {
        versions.sort_by_key(ArchivedVersion::version);
        self.versions = Some(versions);
    }

    /// Bytes of the version that was current at deletion time.
    pub fn content(&self) -> Result<Vec<u8>> {
        self.current_version()?.content.read()
    }

    fn current_version(&self) -> Result<&ArchivedVersion> {
        let versions = self.versions.as_deref().ok_or_else(|| {
            AtticError::InvalidState(format!("content of deleted record {} not loaded", self.key))
        })?;
        versions
            .iter()
            .find(|v| v.metadata.version == self.metadata.version)
            .or_else(|| versions.last())
            .ok_or_else(|| {
                AtticError::StorageCorrupted(format!("deleted record {} has no versions", self.key))
            })
    }

    /// Reconstitute the live attachment without touching any store.
    ///
    /// All version bytes are read into memory and marked dirty, so saving the
    /// result rewrites the full history.
    pub fn restore(&self) -> Result<Attachment> {
        let bytes = self.content()?;
        let versions = self
            .versions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|v| {
                Ok(ArchivedVersion {
                    metadata: v.metadata.clone(),
                    content: VersionContent::Loaded(v.content.read()?),
                    dirty: true,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Attachment::restored(self.metadata.clone(), bytes, versions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DeletedKey, AttachmentMetadata) {
        let attachment = Attachment::new("docA/file.txt".parse().unwrap(), b"V1".to_vec());
        let key = DeletedKey::from_millis(attachment.reference().clone(), 1_700_000_000_123).unwrap();
        (key, attachment.metadata().clone())
    }

    #[test]
    fn key_round_trips_through_text() {
        let (key, _) = sample();
        assert_eq!(key.to_string(), "docA/file.txt@1700000000123");
        assert_eq!(key.to_string().parse::<DeletedKey>().unwrap(), key);
        assert!("docA/file.txt".parse::<DeletedKey>().is_err());
        assert!("docA/file.txt@soon".parse::<DeletedKey>().is_err());
    }

    #[test]
    fn key_truncates_to_millis() {
        let (key, _) = sample();
        let precise = key.deleted_at() + chrono::Duration::microseconds(450);
        assert_eq!(DeletedKey::new(key.reference().clone(), precise), key);
    }

    #[test]
    fn restore_requires_loaded_versions() {
        let (key, metadata) = sample();
        let record = DeletedAttachment::new(key, Some("alice".into()), metadata);
        assert!(matches!(record.restore(), Err(AtticError::InvalidState(_))));
    }

    #[test]
    fn restore_marks_history_dirty() {
        let (key, metadata) = sample();
        let mut record = DeletedAttachment::new(key, None, metadata.clone());
        record.set_versions(vec![ArchivedVersion {
            metadata,
            content: VersionContent::Loaded(b"V1".to_vec()),
            dirty: false,
        }]);

        let attachment = record.restore().unwrap();
        assert_eq!(attachment.content(), Some(&b"V1"[..]));
        assert!(attachment.is_content_dirty());
        assert!(attachment.archive().unwrap().iter().all(|v| v.dirty));
    }

    #[test]
    fn record_json_omits_versions() {
        let (key, metadata) = sample();
        let record = DeletedAttachment::new(key, Some("alice".into()), metadata);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("versions").is_none());
        assert_eq!(json["deleter"], "alice");

        let back: DeletedAttachment = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}

//! Where file-backed stores keep things under the storage root.
//!
//! ```text
//! <root>/attic.lock
//! <root>/docs/<doc>/attachments.json
//! <root>/docs/<doc>/attachments/<file>/{content,meta.json,versions.json,v<version>}
//! <root>/docs/<doc>/deleted-attachments/<file>-<millis>/{deleted.json,versions.json,v<version>}
//! ```
//!
//! Document and file names are percent-encoded into single path segments.
//! A leading `.` is encoded too, so every name starting with `.` in the
//! tree is a hidden sibling left by a compensating file operation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::{AttachmentRef, DeletedKey, DocumentRef, Version};

fn encode(segment: &str) -> String {
    let encoded = urlencoding::encode(segment);
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{rest}"),
        None => encoded.into_owned(),
    }
}

fn decode(segment: &str) -> Option<String> {
    urlencoding::decode(segment).ok().map(|s| s.into_owned())
}

/// Path provider for one storage root.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_dir(&self, document: &DocumentRef) -> PathBuf {
        self.root.join("docs").join(encode(document.as_str()))
    }

    #[must_use]
    pub fn container_index(&self, document: &DocumentRef) -> PathBuf {
        self.document_dir(document).join("attachments.json")
    }

    #[must_use]
    pub fn attachment(&self, reference: &AttachmentRef) -> AttachmentFiles {
        AttachmentFiles {
            dir: self
                .document_dir(reference.document())
                .join("attachments")
                .join(encode(reference.filename())),
        }
    }

    fn deleted_dir(&self, document: &DocumentRef) -> PathBuf {
        self.document_dir(document).join("deleted-attachments")
    }

    #[must_use]
    pub fn deleted(&self, key: &DeletedKey) -> AttachmentFiles {
        let reference = key.reference();
        let name = format!("{}-{}", encode(reference.filename()), key.millis());
        AttachmentFiles {
            dir: self.deleted_dir(reference.document()).join(name),
        }
    }

    /// Keys of deleted records stored for `document`, in no particular order.
    pub fn deleted_keys(&self, document: &DocumentRef) -> Result<Vec<DeletedKey>> {
        let entries = match fs::read_dir(self.deleted_dir(document)) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(key) = parse_deleted_dir(document, &name) {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

fn parse_deleted_dir(document: &DocumentRef, name: &str) -> Option<DeletedKey> {
    if name.starts_with('.') {
        return None;
    }
    let (file, millis) = name.rsplit_once('-')?;
    let millis = millis.parse().ok()?;
    let reference = AttachmentRef::new(document.clone(), decode(file)?).ok()?;
    DeletedKey::from_millis(reference, millis).ok()
}

/// Files making up one live attachment or one deleted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFiles {
    dir: PathBuf,
}

impl AttachmentFiles {
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn content(&self) -> PathBuf {
        self.dir.join("content")
    }

    #[must_use]
    pub fn metadata(&self) -> PathBuf {
        self.dir.join("meta.json")
    }

    #[must_use]
    pub fn deleted_record(&self) -> PathBuf {
        self.dir.join("deleted.json")
    }

    #[must_use]
    pub fn version_index(&self) -> PathBuf {
        self.dir.join("versions.json")
    }

    #[must_use]
    pub fn version_content(&self, version: Version) -> PathBuf {
        self.dir.join(format!("v{version}"))
    }
}

//! Document and attachment references.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AtticError, Result};

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AtticError::InvalidReference(format!("{kind} name is empty")));
    }
    if name == "." || name == ".." {
        return Err(AtticError::InvalidReference(format!(
            "{kind} name '{name}' is reserved"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(AtticError::InvalidReference(format!(
            "{kind} name {name:?} contains control characters"
        )));
    }
    Ok(())
}

/// Reference to the document that owns a set of attachments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentRef(String);

impl DocumentRef {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name("document", &name)?;
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocumentRef {
    type Error = AtticError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl FromStr for DocumentRef {
    type Err = AtticError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl From<DocumentRef> for String {
    fn from(value: DocumentRef) -> Self {
        value.0
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named attachment inside a document.
///
/// File names may not contain path separators; document names may, which is
/// why the textual form `<document>/<file>` splits on the last `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttachmentRef {
    document: DocumentRef,
    filename: String,
}

impl AttachmentRef {
    pub fn new(document: DocumentRef, filename: impl Into<String>) -> Result<Self> {
        let filename = filename.into();
        validate_name("file", &filename)?;
        if filename.contains(['/', '\\']) {
            return Err(AtticError::InvalidReference(format!(
                "file name '{filename}' contains a path separator"
            )));
        }
        Ok(Self { document, filename })
    }

    #[must_use]
    pub const fn document(&self) -> &DocumentRef {
        &self.document
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl FromStr for AttachmentRef {
    type Err = AtticError;

    fn from_str(s: &str) -> Result<Self> {
        let (document, filename) = s.rsplit_once('/').ok_or_else(|| {
            AtticError::InvalidReference(format!("'{s}' is not of the form <document>/<file>"))
        })?;
        Self::new(DocumentRef::new(document)?, filename)
    }
}

impl fmt::Display for AttachmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.document, self.filename)
    }
}

//! Version-list serialization for archive indexes.

use std::io::{Read, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AtticError, Result};
use crate::fs::StreamProvider;
use crate::model::AttachmentMetadata;

/// Encodes and decodes the metadata of every archived version of one attachment.
pub trait VersionListSerializer: Send + Sync {
    fn serialize(&self, versions: &[AttachmentMetadata], out: &mut dyn Write) -> Result<()>;

    fn parse(&self, input: &mut dyn Read) -> Result<Vec<AttachmentMetadata>>;
}

const FORMAT_VERSION: &str = "1.0";

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format_version: &'a str,
    versions: &'a [AttachmentMetadata],
}

#[derive(Deserialize)]
struct Envelope {
    format_version: String,
    versions: Vec<AttachmentMetadata>,
}

/// JSON envelope `{"format_version": "1.0", "versions": [...]}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonVersionListSerializer;

impl VersionListSerializer for JsonVersionListSerializer {
    fn serialize(&self, versions: &[AttachmentMetadata], out: &mut dyn Write) -> Result<()> {
        let envelope = EnvelopeRef {
            format_version: FORMAT_VERSION,
            versions,
        };
        serde_json::to_writer_pretty(out, &envelope)?;
        Ok(())
    }

    fn parse(&self, input: &mut dyn Read) -> Result<Vec<AttachmentMetadata>> {
        let envelope: Envelope = serde_json::from_reader(input)?;
        let major = envelope.format_version.split('.').next().unwrap_or_default();
        if major != "1" {
            return Err(AtticError::Serialization(format!(
                "unsupported version list format {}",
                envelope.format_version
            )));
        }
        Ok(envelope.versions)
    }
}

/// A version list written lazily through a serializer.
pub struct SerializedVersions {
    serializer: Arc<dyn VersionListSerializer>,
    versions: Vec<AttachmentMetadata>,
}

impl SerializedVersions {
    pub fn new(serializer: Arc<dyn VersionListSerializer>, versions: Vec<AttachmentMetadata>) -> Self {
        Self {
            serializer,
            versions,
        }
    }
}

impl StreamProvider for SerializedVersions {
    fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        self.serializer.serialize(&self.versions, out)
    }
}

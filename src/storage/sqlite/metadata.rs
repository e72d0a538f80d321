use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_column, SqliteSession};
use crate::model::{AttachmentMetadata, AttachmentRef, DocumentRef};
use crate::storage::MetadataStore;
use crate::tx::{Output, ResourceKind, UnitOfWork};

const SELECT_COLUMNS: &str = "document, filename, version, size, content_hash, mime_type, author, comment, updated_at";

pub(super) fn reference_from_columns(
    idx: usize,
    document: &str,
    filename: &str,
) -> rusqlite::Result<AttachmentRef> {
    DocumentRef::new(document)
        .and_then(|doc| AttachmentRef::new(doc, filename))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
        })
}

fn metadata_from_row(row: &Row<'_>) -> rusqlite::Result<AttachmentMetadata> {
    let document: String = row.get(0)?;
    let filename: String = row.get(1)?;
    let version: String = row.get(2)?;
    let updated_at: String = row.get(8)?;
    Ok(AttachmentMetadata {
        reference: reference_from_columns(0, &document, &filename)?,
        version: parse_column(2, &version)?,
        size: row.get::<_, i64>(3)?.try_into().unwrap_or_default(),
        content_hash: row.get(4)?,
        mime_type: row.get(5)?,
        author: row.get(6)?,
        comment: row.get(7)?,
        updated_at: parse_column::<DateTime<Utc>>(8, &updated_at)?,
    })
}

/// Live metadata in the `attachments` table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteMetadataStore;

impl MetadataStore for SqliteMetadataStore {
    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::Sqlite
    }

    fn save(&self, metadata: &AttachmentMetadata) -> UnitOfWork {
        let m = metadata.clone();
        UnitOfWork::bound_fn::<SqliteSession>(format!("save metadata {}", m.reference), move |session| {
            session.conn().execute(
                "INSERT INTO attachments
                    (document, filename, version, size, content_hash, mime_type, author, comment, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(document, filename) DO UPDATE SET
                    version = excluded.version,
                    size = excluded.size,
                    content_hash = excluded.content_hash,
                    mime_type = excluded.mime_type,
                    author = excluded.author,
                    comment = excluded.comment,
                    updated_at = excluded.updated_at",
                params![
                    m.reference.document().as_str(),
                    m.reference.filename(),
                    m.version.to_string(),
                    i64::try_from(m.size).unwrap_or(i64::MAX),
                    m.content_hash,
                    m.mime_type,
                    m.author,
                    m.comment,
                    m.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    fn load(&self, reference: &AttachmentRef, out: Output<Option<AttachmentMetadata>>) -> UnitOfWork {
        let reference = reference.clone();
        UnitOfWork::bound_fn::<SqliteSession>(format!("load metadata {reference}"), move |session| {
            let metadata = session
                .conn()
                .query_row(
                    &format!(
                        "SELECT {SELECT_COLUMNS} FROM attachments WHERE document = ?1 AND filename = ?2"
                    ),
                    params![reference.document().as_str(), reference.filename()],
                    metadata_from_row,
                )
                .optional()?;
            out.set(metadata);
            Ok(())
        })
    }

    fn delete(&self, reference: &AttachmentRef) -> UnitOfWork {
        let reference = reference.clone();
        UnitOfWork::bound_fn::<SqliteSession>(format!("delete metadata {reference}"), move |session| {
            session.conn().execute(
                "DELETE FROM attachments WHERE document = ?1 AND filename = ?2",
                params![reference.document().as_str(), reference.filename()],
            )?;
            Ok(())
        })
    }
}

use rusqlite::{params, OptionalExtension, Row};

use super::metadata::reference_from_columns;
use super::SqliteSession;
use crate::model::{AttachmentMetadata, AttachmentRef, DeletedAttachment, DeletedKey, DocumentRef};
use crate::storage::DeletedMetadataStore;
use crate::tx::{Output, ResourceKind, UnitOfWork};

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<DeletedAttachment> {
    let document: String = row.get(0)?;
    let filename: String = row.get(1)?;
    let millis: i64 = row.get(2)?;
    let deleter: Option<String> = row.get(3)?;
    let metadata_json: String = row.get(4)?;

    let reference = reference_from_columns(0, &document, &filename)?;
    let key = DeletedKey::from_millis(reference, millis).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Integer, Box::new(err))
    })?;
    let metadata: AttachmentMetadata = serde_json::from_str(&metadata_json).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(err))
    })?;
    Ok(DeletedAttachment::new(key, deleter, metadata))
}

fn query_records(
    session: &SqliteSession,
    filter: &str,
    params: &[&dyn rusqlite::ToSql],
) -> crate::error::Result<Vec<DeletedAttachment>> {
    let sql = format!(
        "SELECT document, filename, deleted_at, deleter, metadata_json
         FROM deleted_attachments WHERE {filter}
         ORDER BY deleted_at DESC, id DESC"
    );
    let mut stmt = session.conn().prepare(&sql)?;
    let rows = stmt.query_map(params, record_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Deleted records in the `deleted_attachments` table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDeletedMetadataStore;

impl DeletedMetadataStore for SqliteDeletedMetadataStore {
    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::Sqlite
    }

    fn save(&self, record: &DeletedAttachment) -> UnitOfWork {
        let record = record.clone();
        UnitOfWork::bound_fn::<SqliteSession>(format!("save deleted record {}", record.key()), move |session| {
            let reference = record.reference();
            session.conn().execute(
                "INSERT INTO deleted_attachments (document, filename, deleted_at, deleter, metadata_json)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    reference.document().as_str(),
                    reference.filename(),
                    record.key().millis(),
                    record.deleter(),
                    serde_json::to_string(record.metadata())?,
                ],
            )?;
            Ok(())
        })
    }

    fn load(&self, key: &DeletedKey, out: Output<Option<DeletedAttachment>>) -> UnitOfWork {
        let key = key.clone();
        UnitOfWork::bound_fn::<SqliteSession>(format!("load deleted record {key}"), move |session| {
            let reference = key.reference();
            let record = session
                .conn()
                .query_row(
                    "SELECT document, filename, deleted_at, deleter, metadata_json
                     FROM deleted_attachments
                     WHERE document = ?1 AND filename = ?2 AND deleted_at = ?3",
                    params![reference.document().as_str(), reference.filename(), key.millis()],
                    record_from_row,
                )
                .optional()?;
            out.set(record);
            Ok(())
        })
    }

    fn list_for_attachment(
        &self,
        reference: &AttachmentRef,
        out: Output<Vec<DeletedAttachment>>,
    ) -> UnitOfWork {
        let reference = reference.clone();
        UnitOfWork::bound_fn::<SqliteSession>(format!("list deleted {reference}"), move |session| {
            out.set(query_records(
                session,
                "document = ?1 AND filename = ?2",
                params![reference.document().as_str(), reference.filename()],
            )?);
            Ok(())
        })
    }

    fn list_for_document(
        &self,
        document: &DocumentRef,
        out: Output<Vec<DeletedAttachment>>,
    ) -> UnitOfWork {
        let document = document.clone();
        UnitOfWork::bound_fn::<SqliteSession>(format!("list deleted in {document}"), move |session| {
            out.set(query_records(session, "document = ?1", params![document.as_str()])?);
            Ok(())
        })
    }

    fn purge(&self, key: &DeletedKey) -> UnitOfWork {
        let key = key.clone();
        UnitOfWork::bound_fn::<SqliteSession>(format!("purge deleted record {key}"), move |session| {
            let reference = key.reference();
            session.conn().execute(
                "DELETE FROM deleted_attachments
                 WHERE document = ?1 AND filename = ?2 AND deleted_at = ?3",
                params![reference.document().as_str(), reference.filename(), key.millis()],
            )?;
            Ok(())
        })
    }
}

use chrono::Utc;
use rusqlite::params;

use super::SqliteSession;
use crate::model::{AttachmentRef, DocumentRef};
use crate::storage::ContainerStore;
use crate::tx::{Output, ResourceKind, UnitOfWork};

/// Attachment lists in the `document_attachments` table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteContainerStore;

impl ContainerStore for SqliteContainerStore {
    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::Sqlite
    }

    fn attach(&self, reference: &AttachmentRef) -> UnitOfWork {
        let reference = reference.clone();
        UnitOfWork::bound_fn::<SqliteSession>(format!("attach {reference}"), move |session| {
            session.conn().execute(
                "INSERT OR IGNORE INTO document_attachments (document, filename, attached_at)
                 VALUES (?1, ?2, ?3)",
                params![
                    reference.document().as_str(),
                    reference.filename(),
                    Utc::now().to_rfc3339()
                ],
            )?;
            Ok(())
        })
    }

    fn detach(&self, reference: &AttachmentRef) -> UnitOfWork {
        let reference = reference.clone();
        UnitOfWork::bound_fn::<SqliteSession>(format!("detach {reference}"), move |session| {
            session.conn().execute(
                "DELETE FROM document_attachments WHERE document = ?1 AND filename = ?2",
                params![reference.document().as_str(), reference.filename()],
            )?;
            Ok(())
        })
    }

    fn list(&self, document: &DocumentRef, out: Output<Vec<String>>) -> UnitOfWork {
        let document = document.clone();
        UnitOfWork::bound_fn::<SqliteSession>(format!("list attachments of {document}"), move |session| {
            let mut stmt = session.conn().prepare(
                "SELECT filename FROM document_attachments WHERE document = ?1 ORDER BY filename",
            )?;
            let names = stmt
                .query_map(params![document.as_str()], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            out.set(names);
            Ok(())
        })
    }
}

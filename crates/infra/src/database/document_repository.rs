//! Filed document versions.

use std::sync::Arc;

use async_trait::async_trait;
use docketsync_core::storage::ports::DocumentRepository;
use docketsync_domain::{DocketError, Document, DocumentStatus, Result};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tracing::instrument;
use uuid::Uuid;

use super::columns::{micros, opt_uuid_at, parsed_at, sql_err, time_at, u32_at, uuid_at};
use super::manager::DbManager;

const DOCUMENT_COLUMNS: &str = "id, matter_id, task_id, title, provider_file_id, web_link,
     folder_path, version, status, size_bytes, mime_type, uploaded_at";

pub struct SqliteDocumentRepository {
    db: Arc<DbManager>,
}

impl SqliteDocumentRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn map_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    let size: i64 = row.get(9)?;
    Ok(Document {
        id: uuid_at(row, 0)?,
        matter_id: uuid_at(row, 1)?,
        task_id: opt_uuid_at(row, 2)?,
        title: row.get(3)?,
        provider_file_id: row.get(4)?,
        web_link: row.get(5)?,
        folder_path: row.get(6)?,
        version: u32_at(row, 7)?,
        status: parsed_at(row, 8)?,
        size_bytes: u64::try_from(size)
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(9, Type::Integer, Box::new(err)))?,
        mime_type: row.get(10)?,
        uploaded_at: time_at(row, 11)?,
    })
}

#[async_trait]
impl DocumentRepository for SqliteDocumentRepository {
    #[instrument(skip(self))]
    async fn latest_version(
        &self,
        matter_id: Uuid,
        folder_path: &str,
        title: &str,
    ) -> Result<Option<Document>> {
        let folder_path = folder_path.to_string();
        let title = title.to_string();
        self.db
            .call(move |conn| {
                conn.query_row(
                    &format!(
                        "SELECT {DOCUMENT_COLUMNS} FROM documents
                         WHERE matter_id = ?1 AND folder_path = ?2 AND title = ?3
                         ORDER BY version DESC LIMIT 1"
                    ),
                    params![matter_id.to_string(), folder_path, title],
                    map_document,
                )
                .optional()
                .map_err(sql_err)
            })
            .await
    }

    #[instrument(skip(self, document), fields(document_id = %document.id, version = document.version))]
    async fn insert_document(&self, document: &Document) -> Result<()> {
        let document = document.clone();
        let size = i64::try_from(document.size_bytes)
            .map_err(|_| DocketError::Validation(format!("document too large: {} bytes", document.size_bytes)))?;
        self.db
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO documents ({DOCUMENT_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                    ),
                    params![
                        document.id.to_string(),
                        document.matter_id.to_string(),
                        document.task_id.map(|id| id.to_string()),
                        document.title,
                        document.provider_file_id,
                        document.web_link,
                        document.folder_path,
                        document.version,
                        document.status.as_str(),
                        size,
                        document.mime_type,
                        micros(document.uploaded_at),
                    ],
                )
                .map_err(sql_err)?;
                Ok(())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn mark_superseded(&self, document_id: Uuid) -> Result<()> {
        let changed = self
            .db
            .call(move |conn| {
                conn.execute(
                    "UPDATE documents SET status = ?2 WHERE id = ?1",
                    params![document_id.to_string(), DocumentStatus::Superseded.as_str()],
                )
                .map_err(sql_err)
            })
            .await?;

        if changed == 0 {
            return Err(DocketError::NotFound(format!("document {document_id}")));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_documents(&self, matter_id: Uuid) -> Result<Vec<Document>> {
        self.db
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {DOCUMENT_COLUMNS} FROM documents
                         WHERE matter_id = ?1
                         ORDER BY uploaded_at, folder_path, title, version"
                    ))
                    .map_err(sql_err)?;
                let rows =
                    stmt.query_map(params![matter_id.to_string()], map_document).map_err(sql_err)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(sql_err)
            })
            .await
    }
}

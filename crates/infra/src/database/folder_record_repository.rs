//! Matter folder records. `matter_id` is the primary key, so a second
//! insert for the same matter fails with `Conflict`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use docketsync_core::storage::ports::FolderRecordRepository;
use docketsync_domain::{DocketError, FolderStructure, MatterFolderRecord, Result};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tracing::instrument;
use uuid::Uuid;

use super::columns::{micros, sql_err, time_at, u32_at, uuid_at};
use super::manager::DbManager;

pub struct SqliteFolderRecordRepository {
    db: Arc<DbManager>,
}

impl SqliteFolderRecordRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn encode_structure(structure: &FolderStructure) -> Result<String> {
    serde_json::to_string(structure)
        .map_err(|err| DocketError::Internal(format!("failed to encode folder structure: {err}")))
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<MatterFolderRecord> {
    let raw_structure: String = row.get(4)?;
    let folder_structure = serde_json::from_str(&raw_structure)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(err)))?;

    Ok(MatterFolderRecord {
        matter_id: uuid_at(row, 0)?,
        practice_id: uuid_at(row, 1)?,
        root_folder_id: row.get(2)?,
        root_folder_link: row.get(3)?,
        folder_structure,
        structure_version: u32_at(row, 5)?,
        created_at: time_at(row, 6)?,
        updated_at: time_at(row, 7)?,
    })
}

#[async_trait]
impl FolderRecordRepository for SqliteFolderRecordRepository {
    #[instrument(skip(self))]
    async fn get_folder_record(&self, matter_id: Uuid) -> Result<Option<MatterFolderRecord>> {
        self.db
            .call(move |conn| {
                conn.query_row(
                    "SELECT matter_id, practice_id, root_folder_id, root_folder_link,
                            folder_structure, structure_version, created_at, updated_at
                     FROM matter_folders WHERE matter_id = ?1",
                    params![matter_id.to_string()],
                    map_record,
                )
                .optional()
                .map_err(sql_err)
            })
            .await
    }

    #[instrument(skip(self, record), fields(matter_id = %record.matter_id))]
    async fn insert_folder_record(&self, record: &MatterFolderRecord) -> Result<()> {
        let structure = encode_structure(&record.folder_structure)?;
        let record = record.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO matter_folders (
                        matter_id, practice_id, root_folder_id, root_folder_link,
                        folder_structure, structure_version, created_at, updated_at
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        record.matter_id.to_string(),
                        record.practice_id.to_string(),
                        record.root_folder_id,
                        record.root_folder_link,
                        structure,
                        record.structure_version,
                        micros(record.created_at),
                        micros(record.updated_at),
                    ],
                )
                .map_err(sql_err)?;
                Ok(())
            })
            .await
    }

    #[instrument(skip(self, structure), fields(entries = structure.len()))]
    async fn update_folder_structure(
        &self,
        matter_id: Uuid,
        structure: &FolderStructure,
        structure_version: u32,
    ) -> Result<()> {
        let encoded = encode_structure(structure)?;
        let now = micros(Utc::now());
        let changed = self
            .db
            .call(move |conn| {
                conn.execute(
                    "UPDATE matter_folders
                     SET folder_structure = ?2, structure_version = ?3, updated_at = ?4
                     WHERE matter_id = ?1",
                    params![matter_id.to_string(), encoded, structure_version, now],
                )
                .map_err(sql_err)
            })
            .await?;

        if changed == 0 {
            return Err(DocketError::NotFound(format!("folder record for matter {matter_id}")));
        }
        Ok(())
    }
}

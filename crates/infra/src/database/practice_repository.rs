//! SQLite-backed implementation of the PracticeDirectory port.
//!
//! Practices and matters are owned by the portal. The write methods here
//! exist for seeding and for the portal-side tooling that shares this
//! database file.

use std::sync::Arc;

use async_trait::async_trait;
use docketsync_core::practice_ports::PracticeDirectory;
use docketsync_domain::{Matter, Practice, RefreshToken, Result};
use rusqlite::{params, OptionalExtension, Row};
use tracing::instrument;
use uuid::Uuid;

use super::columns::{parsed_at, sql_err, uuid_at};
use super::manager::DbManager;

const PRACTICE_COLUMNS: &str = "id, name, refresh_token, calendar_id";
const MATTER_COLUMNS: &str = "id, practice_id, title, client_name, status";

pub struct SqlitePracticeDirectory {
    db: Arc<DbManager>,
}

impl SqlitePracticeDirectory {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert or replace a practice, including its refresh token.
    #[instrument(skip(self, practice), fields(practice_id = %practice.id))]
    pub async fn upsert_practice(&self, practice: &Practice) -> Result<()> {
        let practice = practice.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO practices (id, name, refresh_token, calendar_id)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        refresh_token = excluded.refresh_token,
                        calendar_id = excluded.calendar_id",
                    params![
                        practice.id.to_string(),
                        practice.name,
                        practice.refresh_token.as_ref().map(RefreshToken::expose_secret),
                        practice.calendar_id,
                    ],
                )
                .map_err(sql_err)?;
                Ok(())
            })
            .await
    }

    /// Insert or replace a matter.
    #[instrument(skip(self, matter), fields(matter_id = %matter.id))]
    pub async fn upsert_matter(&self, matter: &Matter) -> Result<()> {
        let matter = matter.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO matters (id, practice_id, title, client_name, status)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO UPDATE SET
                        practice_id = excluded.practice_id,
                        title = excluded.title,
                        client_name = excluded.client_name,
                        status = excluded.status",
                    params![
                        matter.id.to_string(),
                        matter.practice_id.to_string(),
                        matter.title,
                        matter.client_name,
                        matter.status.as_str(),
                    ],
                )
                .map_err(sql_err)?;
                Ok(())
            })
            .await
    }
}

fn map_practice(row: &Row<'_>) -> rusqlite::Result<Practice> {
    let token: Option<String> = row.get(2)?;
    Ok(Practice {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        refresh_token: token.filter(|t| !t.is_empty()).map(RefreshToken::new),
        calendar_id: row.get(3)?,
    })
}

fn map_matter(row: &Row<'_>) -> rusqlite::Result<Matter> {
    Ok(Matter {
        id: uuid_at(row, 0)?,
        practice_id: uuid_at(row, 1)?,
        title: row.get(2)?,
        client_name: row.get(3)?,
        status: parsed_at(row, 4)?,
    })
}

#[async_trait]
impl PracticeDirectory for SqlitePracticeDirectory {
    #[instrument(skip(self))]
    async fn list_practices_with_credentials(&self) -> Result<Vec<Practice>> {
        self.db
            .call(|conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {PRACTICE_COLUMNS} FROM practices
                         WHERE refresh_token IS NOT NULL AND refresh_token <> ''
                         ORDER BY name, id"
                    ))
                    .map_err(sql_err)?;
                let rows = stmt.query_map([], map_practice).map_err(sql_err)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(sql_err)
            })
            .await
    }

    #[instrument(skip(self))]
    async fn get_practice(&self, practice_id: Uuid) -> Result<Option<Practice>> {
        self.db
            .call(move |conn| {
                conn.query_row(
                    &format!("SELECT {PRACTICE_COLUMNS} FROM practices WHERE id = ?1"),
                    params![practice_id.to_string()],
                    map_practice,
                )
                .optional()
                .map_err(sql_err)
            })
            .await
    }

    #[instrument(skip(self))]
    async fn list_eligible_matters(&self, practice_id: Uuid) -> Result<Vec<Matter>> {
        self.db
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {MATTER_COLUMNS} FROM matters
                         WHERE practice_id = ?1
                           AND status = 'active'
                           AND client_name IS NOT NULL
                           AND TRIM(client_name) <> ''
                         ORDER BY title, id"
                    ))
                    .map_err(sql_err)?;
                let rows =
                    stmt.query_map(params![practice_id.to_string()], map_matter).map_err(sql_err)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(sql_err)
            })
            .await
    }

    #[instrument(skip(self))]
    async fn get_matter(&self, matter_id: Uuid) -> Result<Option<Matter>> {
        self.db
            .call(move |conn| {
                conn.query_row(
                    &format!("SELECT {MATTER_COLUMNS} FROM matters WHERE id = ?1"),
                    params![matter_id.to_string()],
                    map_matter,
                )
                .optional()
                .map_err(sql_err)
            })
            .await
    }
}

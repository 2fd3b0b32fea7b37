//! Folder Provisioner
//!
//! Creates each matter's folder hierarchy exactly once. Concurrent calls for
//! one matter inside this process are serialized; across processes the
//! unique matter id on the record decides the winner and the loser adopts
//! the winner's record.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use docketsync_domain::constants::{
    FOLDER_STRUCTURE_VERSION, MAX_FOLDER_NAME_LENGTH, STANDARD_SUBFOLDERS_V1,
};
use docketsync_domain::{DocketError, FolderStructure, Matter, MatterFolderRecord, Result};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::ports::{FolderRecordRepository, StorageApi};

const NO_CLIENT: &str = "No Client";

/// Versioned list of standard subfolders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLayout {
    pub version: u32,
    pub subfolders: Vec<String>,
}

impl Default for FolderLayout {
    fn default() -> Self {
        Self {
            version: FOLDER_STRUCTURE_VERSION,
            subfolders: STANDARD_SUBFOLDERS_V1.iter().map(|name| (*name).to_string()).collect(),
        }
    }
}

impl FolderLayout {
    fn is_satisfied_by(&self, record: &MatterFolderRecord) -> bool {
        record.structure_version >= self.version
            && self.subfolders.iter().all(|name| record.folder_structure.contains(name))
    }
}

pub struct FolderProvisioner {
    records: Arc<dyn FolderRecordRepository>,
    layout: FolderLayout,
    parent_folder_id: Option<String>,
    in_flight: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl FolderProvisioner {
    pub fn new(records: Arc<dyn FolderRecordRepository>, parent_folder_id: Option<String>) -> Self {
        Self {
            records,
            layout: FolderLayout::default(),
            parent_folder_id,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_layout(mut self, layout: FolderLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Return the matter's folder record, provisioning it if needed.
    #[instrument(skip(self, storage, matter), fields(matter_id = %matter.id, practice_id = %matter.practice_id))]
    pub async fn ensure(
        &self,
        storage: &dyn StorageApi,
        matter: &Matter,
    ) -> Result<MatterFolderRecord> {
        let lock = self.matter_lock(matter.id);
        let result = {
            let _guard = lock.lock().await;
            self.ensure_locked(storage, matter).await
        };
        self.release_lock(matter.id, &lock);
        result
    }

    async fn ensure_locked(
        &self,
        storage: &dyn StorageApi,
        matter: &Matter,
    ) -> Result<MatterFolderRecord> {
        if let Some(record) = self.records.get_folder_record(matter.id).await? {
            if self.layout.is_satisfied_by(&record) {
                debug!("folder record already provisioned");
                return Ok(record);
            }
            return self.upgrade(storage, record).await;
        }

        let root_name = folder_name(matter);
        let parent = self.parent_folder_id.as_deref();

        let (root, reused) = match storage.find_folder(&root_name, parent).await? {
            Some(existing) => {
                info!(root_folder_id = %existing.id, "reusing existing matter folder");
                (existing, true)
            }
            None => (storage.create_folder(&root_name, parent).await?, false),
        };

        let mut structure = FolderStructure::new();
        for name in &self.layout.subfolders {
            let folder_id = self.subfolder(storage, name, &root.id, reused).await?;
            structure.insert(name.clone(), folder_id);
        }

        let now = Utc::now();
        let record = MatterFolderRecord {
            matter_id: matter.id,
            practice_id: matter.practice_id,
            root_folder_id: root.id.clone(),
            root_folder_link: root.web_view_link.clone(),
            folder_structure: structure,
            structure_version: self.layout.version,
            created_at: now,
            updated_at: now,
        };

        match self.records.insert_folder_record(&record).await {
            Ok(()) => {
                info!(root_folder_id = %record.root_folder_id, subfolders = record.folder_structure.len(), "matter folders provisioned");
                Ok(record)
            }
            Err(DocketError::Conflict(reason)) => {
                let winner = self.records.get_folder_record(matter.id).await?.ok_or_else(|| {
                    DocketError::Conflict(format!(
                        "folder record for matter {} conflicted but is missing: {reason}",
                        matter.id
                    ))
                })?;
                if winner.root_folder_id != root.id {
                    warn!(
                        orphan_folder_id = %root.id,
                        winner_folder_id = %winner.root_folder_id,
                        "lost folder provisioning race, orphan root folder needs cleanup"
                    );
                }
                Ok(winner)
            }
            Err(err) => Err(err),
        }
    }

    /// Add subfolders introduced by a newer layout version
    async fn upgrade(
        &self,
        storage: &dyn StorageApi,
        mut record: MatterFolderRecord,
    ) -> Result<MatterFolderRecord> {
        let missing: Vec<&String> = self
            .layout
            .subfolders
            .iter()
            .filter(|name| !record.folder_structure.contains(name))
            .collect();

        for name in &missing {
            let folder_id = self.subfolder(storage, name, &record.root_folder_id, true).await?;
            record.folder_structure.insert((*name).clone(), folder_id);
        }

        record.structure_version = record.structure_version.max(self.layout.version);
        record.updated_at = Utc::now();
        self.records
            .update_folder_structure(record.matter_id, &record.folder_structure, record.structure_version)
            .await?;
        info!(added = missing.len(), version = record.structure_version, "matter folder structure upgraded");
        Ok(record)
    }

    async fn subfolder(
        &self,
        storage: &dyn StorageApi,
        name: &str,
        root_id: &str,
        look_first: bool,
    ) -> Result<String> {
        if look_first {
            if let Some(existing) = storage.find_folder(name, Some(root_id)).await? {
                return Ok(existing.id);
            }
        }
        Ok(storage.create_folder(name, Some(root_id)).await?.id)
    }

    fn matter_lock(&self, matter_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.in_flight.lock().entry(matter_id).or_default())
    }

    fn release_lock(&self, matter_id: Uuid, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.in_flight.lock();
        // Map entry plus our handle: nobody else is waiting.
        if Arc::strong_count(lock) == 2 {
            in_flight.remove(&matter_id);
        }
    }
}

/// Deterministic root folder name: `"{client} - {title} ({short id})"`
pub fn folder_name(matter: &Matter) -> String {
    let client = matter
        .client_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(NO_CLIENT);
    let raw = format!("{client} - {} ({})", matter.title.trim(), matter.short_id());
    sanitize_folder_name(&raw)
}

/// Replace path and wildcard characters, collapse whitespace, cap length.
pub fn sanitize_folder_name(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_FOLDER_NAME_LENGTH).collect::<String>().trim_end().to_string()
}

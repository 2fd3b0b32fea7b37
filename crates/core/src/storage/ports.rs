//! Port interfaces for matter folders and filed documents

use async_trait::async_trait;
use docketsync_domain::{Document, FolderStructure, MatterFolderRecord, RemoteFile, Result};
use uuid::Uuid;

/// File-storage provider bound to one practice's access token
#[async_trait]
pub trait StorageApi: Send + Sync {
    /// Create a folder, optionally under `parent_id`
    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<RemoteFile>;

    /// Find a non-trashed folder with exactly this name under `parent_id`
    async fn find_folder(&self, name: &str, parent_id: Option<&str>)
        -> Result<Option<RemoteFile>>;

    /// Upload file content into `parent_id`
    async fn upload_file(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<RemoteFile>;
}

/// Matter folder records, unique per matter
#[async_trait]
pub trait FolderRecordRepository: Send + Sync {
    async fn get_folder_record(&self, matter_id: Uuid) -> Result<Option<MatterFolderRecord>>;

    /// Insert a new record
    ///
    /// Returns `DocketError::Conflict` if the matter already has one.
    async fn insert_folder_record(&self, record: &MatterFolderRecord) -> Result<()>;

    /// Replace the structure map and version of an existing record
    async fn update_folder_structure(
        &self,
        matter_id: Uuid,
        structure: &FolderStructure,
        structure_version: u32,
    ) -> Result<()>;
}

/// Filed document versions
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Highest version for a (matter, folder, title) slot
    async fn latest_version(
        &self,
        matter_id: Uuid,
        folder_path: &str,
        title: &str,
    ) -> Result<Option<Document>>;

    async fn insert_document(&self, document: &Document) -> Result<()>;

    async fn mark_superseded(&self, document_id: Uuid) -> Result<()>;

    async fn list_documents(&self, matter_id: Uuid) -> Result<Vec<Document>>;
}

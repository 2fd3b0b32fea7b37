//! In-memory storage provider, folder records and documents.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use docketsync_core::storage::ports::{DocumentRepository, FolderRecordRepository, StorageApi};
use docketsync_domain::constants::FOLDER_MIME_TYPE;
use docketsync_domain::{
    DocketError, Document, DocumentStatus, FolderStructure, MatterFolderRecord, RemoteFile,
    Result as DomainResult,
};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file: RemoteFile,
    pub parent: Option<String>,
    pub bytes: Vec<u8>,
}

/// Fake file-storage provider.
///
/// Every call yields to the scheduler first so concurrent callers interleave.
#[derive(Debug, Default)]
pub struct MockStorageApi {
    files: Mutex<Vec<StoredFile>>,
    next_id: AtomicUsize,
    pub create_folder_calls: AtomicUsize,
    pub find_folder_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
}

impl MockStorageApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_calls(&self) -> usize {
        self.create_folder_calls.load(Ordering::SeqCst)
            + self.find_folder_calls.load(Ordering::SeqCst)
            + self.upload_calls.load(Ordering::SeqCst)
    }

    /// Pre-create a folder, as if left behind by an earlier run.
    pub fn seed_folder(&self, name: &str, parent: Option<&str>) -> String {
        self.add(name, parent, Some(FOLDER_MIME_TYPE), Vec::new()).id
    }

    pub fn folders_named(&self, name: &str) -> Vec<StoredFile> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.file.name == name && f.file.mime_type.as_deref() == Some(FOLDER_MIME_TYPE))
            .cloned()
            .collect()
    }

    pub fn children_of(&self, parent: &str) -> Vec<StoredFile> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.parent.as_deref() == Some(parent))
            .cloned()
            .collect()
    }

    fn add(&self, name: &str, parent: Option<&str>, mime: Option<&str>, bytes: Vec<u8>) -> RemoteFile {
        let id = format!("file-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let file = RemoteFile {
            id: id.clone(),
            name: name.to_string(),
            mime_type: mime.map(str::to_string),
            web_view_link: Some(format!("https://drive.example/{id}")),
            size: Some(bytes.len().to_string()),
        };
        self.files.lock().unwrap().push(StoredFile {
            file: file.clone(),
            parent: parent.map(str::to_string),
            bytes,
        });
        file
    }
}

#[async_trait]
impl StorageApi for MockStorageApi {
    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> DomainResult<RemoteFile> {
        tokio::task::yield_now().await;
        self.create_folder_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.add(name, parent_id, Some(FOLDER_MIME_TYPE), Vec::new()))
    }

    async fn find_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> DomainResult<Option<RemoteFile>> {
        tokio::task::yield_now().await;
        self.find_folder_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .find(|f| {
                f.file.name == name
                    && f.parent.as_deref() == parent_id
                    && f.file.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
            })
            .map(|f| f.file.clone()))
    }

    async fn upload_file(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> DomainResult<RemoteFile> {
        tokio::task::yield_now().await;
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.add(name, Some(parent_id), Some(mime_type), bytes))
    }
}

/// Folder records with a unique matter id, like the SQL table.
#[derive(Debug, Default)]
pub struct InMemoryFolderRecords {
    records: Mutex<HashMap<Uuid, MatterFolderRecord>>,
    pub inserts: AtomicUsize,
    pub conflicts: AtomicUsize,
}

impl InMemoryFolderRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn record(&self, matter_id: Uuid) -> MatterFolderRecord {
        self.records.lock().unwrap().get(&matter_id).cloned().unwrap()
    }

    pub fn put(&self, record: MatterFolderRecord) {
        self.records.lock().unwrap().insert(record.matter_id, record);
    }
}

#[async_trait]
impl FolderRecordRepository for InMemoryFolderRecords {
    async fn get_folder_record(&self, matter_id: Uuid) -> DomainResult<Option<MatterFolderRecord>> {
        Ok(self.records.lock().unwrap().get(&matter_id).cloned())
    }

    async fn insert_folder_record(&self, record: &MatterFolderRecord) -> DomainResult<()> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.matter_id) {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
            return Err(DocketError::Conflict(format!(
                "UNIQUE constraint failed: matter_folders.matter_id ({})",
                record.matter_id
            )));
        }
        self.inserts.fetch_add(1, Ordering::SeqCst);
        records.insert(record.matter_id, record.clone());
        Ok(())
    }

    async fn update_folder_structure(
        &self,
        matter_id: Uuid,
        structure: &FolderStructure,
        structure_version: u32,
    ) -> DomainResult<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&matter_id)
            .ok_or_else(|| DocketError::NotFound(format!("folder record {matter_id}")))?;
        record.folder_structure = structure.clone();
        record.structure_version = structure_version;
        Ok(())
    }
}

/// Document rows with the same unique version slot as the SQLite table.
#[derive(Debug, Default)]
pub struct InMemoryDocuments {
    documents: Mutex<Vec<Document>>,
    competitors: Mutex<VecDeque<Document>>,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Document> {
        self.documents.lock().unwrap().clone()
    }

    /// Land `document` just before the next insert, as a concurrent
    /// upload of the same slot would.
    pub fn race_next_insert(&self, document: Document) {
        self.competitors.lock().unwrap().push_back(document);
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocuments {
    async fn latest_version(
        &self,
        matter_id: Uuid,
        folder_path: &str,
        title: &str,
    ) -> DomainResult<Option<Document>> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.matter_id == matter_id && d.folder_path == folder_path && d.title == title)
            .max_by_key(|d| d.version)
            .cloned())
    }

    async fn insert_document(&self, document: &Document) -> DomainResult<()> {
        let mut documents = self.documents.lock().unwrap();
        if let Some(competitor) = self.competitors.lock().unwrap().pop_front() {
            documents.push(competitor);
        }
        let taken = documents.iter().any(|d| {
            d.matter_id == document.matter_id
                && d.folder_path == document.folder_path
                && d.title == document.title
                && d.version == document.version
        });
        if taken {
            return Err(DocketError::Conflict(format!(
                "version {} of {} already recorded",
                document.version, document.title
            )));
        }
        documents.push(document.clone());
        Ok(())
    }

    async fn mark_superseded(&self, document_id: Uuid) -> DomainResult<()> {
        let mut documents = self.documents.lock().unwrap();
        let document = documents
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| DocketError::NotFound(format!("document {document_id}")))?;
        document.status = DocumentStatus::Superseded;
        Ok(())
    }

    async fn list_documents(&self, matter_id: Uuid) -> DomainResult<Vec<Document>> {
        Ok(self.documents.lock().unwrap().iter().filter(|d| d.matter_id == matter_id).cloned().collect())
    }
}

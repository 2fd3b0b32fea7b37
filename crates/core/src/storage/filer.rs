//! Document Filer
//!
//! Uploads a document into the right subfolder of its matter and records a
//! new version. Earlier versions stay on the provider; their local status
//! becomes `superseded`.

use std::sync::Arc;

use chrono::Utc;
use docketsync_domain::{
    DocketError, Document, DocumentStatus, Matter, MatterFolderRecord, Result, UploadRequest,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::ports::{DocumentRepository, StorageApi};
use super::provisioner::FolderProvisioner;

const MAX_INSERT_ATTEMPTS: u32 = 2;

/// Where a classification lands inside a matter's folder tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFolder {
    /// Canonical subfolder name, empty for the root
    pub path: String,
    pub folder_id: String,
}

pub struct DocumentFiler {
    provisioner: Arc<FolderProvisioner>,
    documents: Arc<dyn DocumentRepository>,
}

impl DocumentFiler {
    pub fn new(provisioner: Arc<FolderProvisioner>, documents: Arc<dyn DocumentRepository>) -> Self {
        Self { provisioner, documents }
    }

    /// Upload and record one document version.
    #[instrument(skip(self, storage, matter, request), fields(matter_id = %matter.id, title = %request.title, classification = ?request.classification))]
    pub async fn file(
        &self,
        storage: &dyn StorageApi,
        matter: &Matter,
        request: UploadRequest,
    ) -> Result<Document> {
        if request.matter_id != matter.id {
            return Err(DocketError::Validation(format!(
                "upload for matter {} sent to matter {}",
                request.matter_id, matter.id
            )));
        }
        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(DocketError::Validation("document title must not be empty".into()));
        }

        let record = self.provisioner.ensure(storage, matter).await?;
        let folder = resolve_folder(&record, request.classification.as_deref());
        debug!(folder = %folder.path, folder_id = %folder.folder_id, "resolved target folder");

        let previous = self.documents.latest_version(matter.id, &folder.path, &title).await?;
        let version = previous.as_ref().map_or(1, |doc| doc.version + 1);

        let size_bytes = u64::try_from(request.bytes.len()).unwrap_or(u64::MAX);
        let uploaded = storage
            .upload_file(&title, &folder.folder_id, &request.mime_type, request.bytes)
            .await?;

        let document = Document {
            id: Uuid::now_v7(),
            matter_id: matter.id,
            task_id: request.task_id,
            title,
            provider_file_id: uploaded.id,
            web_link: uploaded.web_view_link,
            folder_path: folder.path,
            version,
            status: DocumentStatus::Uploaded,
            size_bytes,
            mime_type: request.mime_type,
            uploaded_at: Utc::now(),
        };
        let (document, previous) = match self.record_version(document, previous).await {
            Ok(recorded) => recorded,
            Err((document, err)) => {
                warn!(
                    provider_file_id = %document.provider_file_id,
                    version = document.version,
                    error = %err,
                    "document uploaded but not recorded; remote file is orphaned"
                );
                return Err(err);
            }
        };
        if let Some(previous) = previous {
            self.documents.mark_superseded(previous.id).await?;
        }

        info!(document_id = %document.id, version = document.version, provider_file_id = %document.provider_file_id, "document filed");
        Ok(document)
    }

    /// Insert the version row, returning it with the version it follows.
    ///
    /// A concurrent upload can claim the same version first; the slot is
    /// re-read and the insert retried once with the next version.
    async fn record_version(
        &self,
        mut document: Document,
        mut previous: Option<Document>,
    ) -> std::result::Result<(Document, Option<Document>), (Document, DocketError)> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.documents.insert_document(&document).await {
                Ok(()) => break,
                Err(DocketError::Conflict(message)) if attempts < MAX_INSERT_ATTEMPTS => {
                    debug!(version = document.version, %message, "version slot taken, re-reading latest");
                    previous = match self
                        .documents
                        .latest_version(document.matter_id, &document.folder_path, &document.title)
                        .await
                    {
                        Ok(latest) => latest,
                        Err(err) => return Err((document, err)),
                    };
                    document.version = previous.as_ref().map_or(1, |doc| doc.version + 1);
                }
                Err(err) => return Err((document, err)),
            }
        }
        Ok((document, previous))
    }
}

/// Pick the subfolder for a classification.
///
/// Tries the exact key, then an alias match that ignores case and treats
/// spaces, underscores and hyphens alike. Falls back to the root folder.
pub fn resolve_folder(record: &MatterFolderRecord, classification: Option<&str>) -> ResolvedFolder {
    let root = ResolvedFolder { path: String::new(), folder_id: record.root_folder_id.clone() };
    let Some(key) = classification.map(str::trim).filter(|key| !key.is_empty()) else {
        return root;
    };

    if let Some(folder_id) = record.folder_structure.get(key) {
        return ResolvedFolder { path: key.to_string(), folder_id: folder_id.to_string() };
    }

    let wanted = alias_key(key);
    record
        .folder_structure
        .iter()
        .find(|entry| alias_key(&entry.name) == wanted)
        .map_or(root, |entry| ResolvedFolder {
            path: entry.name.clone(),
            folder_id: entry.folder_id.clone(),
        })
}

fn alias_key(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

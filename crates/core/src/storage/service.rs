//! Matter storage entry points
//!
//! Resolves the matter and its practice, connects provider clients for that
//! practice's credential, then delegates to the provisioner or the filer.

use std::sync::Arc;

use docketsync_domain::{DocketError, Document, Matter, MatterFolderRecord, Practice, Result, UploadRequest};
use tracing::instrument;
use uuid::Uuid;

use super::filer::DocumentFiler;
use super::provisioner::FolderProvisioner;
use crate::practice_ports::PracticeDirectory;
use crate::provider_ports::{ProviderClientFactory, ProviderClients};

pub struct MatterStorageService {
    directory: Arc<dyn PracticeDirectory>,
    factory: Arc<dyn ProviderClientFactory>,
    provisioner: Arc<FolderProvisioner>,
    filer: DocumentFiler,
}

impl MatterStorageService {
    pub fn new(
        directory: Arc<dyn PracticeDirectory>,
        factory: Arc<dyn ProviderClientFactory>,
        provisioner: Arc<FolderProvisioner>,
        filer: DocumentFiler,
    ) -> Self {
        Self { directory, factory, provisioner, filer }
    }

    /// Provision (or return) the matter's folder hierarchy
    #[instrument(skip(self))]
    pub async fn ensure_folders(&self, matter_id: Uuid) -> Result<MatterFolderRecord> {
        let (matter, clients) = self.connect_for(matter_id).await?;
        self.provisioner.ensure(clients.storage.as_ref(), &matter).await
    }

    /// File a document under its matter
    #[instrument(skip(self, request), fields(matter_id = %request.matter_id))]
    pub async fn upload(&self, request: UploadRequest) -> Result<Document> {
        let (matter, clients) = self.connect_for(request.matter_id).await?;
        self.filer.file(clients.storage.as_ref(), &matter, request).await
    }

    async fn connect_for(&self, matter_id: Uuid) -> Result<(Matter, ProviderClients)> {
        let matter = self
            .directory
            .get_matter(matter_id)
            .await?
            .ok_or_else(|| DocketError::NotFound(format!("matter {matter_id}")))?;
        let practice: Practice = self
            .directory
            .get_practice(matter.practice_id)
            .await?
            .ok_or_else(|| DocketError::NotFound(format!("practice {}", matter.practice_id)))?;
        let token = practice.refresh_token.as_ref().ok_or_else(|| {
            DocketError::Authentication(format!("practice {} has no provider credential", practice.id))
        })?;
        let clients = self.factory.connect(token).await?;
        Ok((matter, clients))
    }
}

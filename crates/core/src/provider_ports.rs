//! Token-scoped provider client construction

use std::sync::Arc;

use async_trait::async_trait;
use docketsync_domain::{RefreshToken, Result};

use crate::calendar::ports::CalendarApi;
use crate::storage::ports::StorageApi;

/// Calendar and storage clients authorized as one practice
#[derive(Clone)]
pub struct ProviderClients {
    pub calendar: Arc<dyn CalendarApi>,
    pub storage: Arc<dyn StorageApi>,
}

/// Builds provider clients for a practice credential
///
/// Implementations exchange the refresh token for a fresh access token on
/// every call and never share clients between practices.
#[async_trait]
pub trait ProviderClientFactory: Send + Sync {
    /// Returns `DocketError::Authentication` if the credential is rejected.
    async fn connect(&self, refresh_token: &RefreshToken) -> Result<ProviderClients>;
}

//! Token-scoped provider client factory.
//!
//! Every `connect` performs its own token exchange and returns brand-new
//! clients. Nothing is cached, so one practice's token can never leak into
//! another practice's calls.

use std::sync::Arc;

use async_trait::async_trait;
use docketsync_core::provider_ports::{ProviderClientFactory, ProviderClients};
use docketsync_domain::{GoogleConfig, RefreshToken, Result};
use tracing::instrument;

use super::calendar::GoogleCalendarClient;
use super::drive::GoogleDriveClient;
use super::oauth::TokenExchanger;
use crate::http::HttpClient;

pub struct GoogleClientFactory {
    http: HttpClient,
    exchanger: TokenExchanger,
    config: GoogleConfig,
}

impl GoogleClientFactory {
    pub fn new(http: HttpClient, config: GoogleConfig) -> Self {
        let exchanger = TokenExchanger::new(http.clone(), &config);
        Self { http, exchanger, config }
    }
}

#[async_trait]
impl ProviderClientFactory for GoogleClientFactory {
    #[instrument(skip_all)]
    async fn connect(&self, refresh_token: &RefreshToken) -> Result<ProviderClients> {
        let token = self.exchanger.exchange(refresh_token).await?;

        let calendar =
            GoogleCalendarClient::new(self.http.clone(), &self.config.calendar_base_url, token.clone());
        let storage = GoogleDriveClient::new(
            self.http.clone(),
            &self.config.drive_base_url,
            &self.config.upload_base_url,
            token,
        );

        Ok(ProviderClients { calendar: Arc::new(calendar), storage: Arc::new(storage) })
    }
}

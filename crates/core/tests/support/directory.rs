//! Practice directory and provider client factory fakes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docketsync_core::practice_ports::PracticeDirectory;
use docketsync_core::provider_ports::{ProviderClientFactory, ProviderClients};
use docketsync_domain::{
    DocketError, Matter, MatterStatus, Practice, RefreshToken, Result as DomainResult,
};
use uuid::Uuid;

use super::calendar::MockCalendarApi;
use super::storage::MockStorageApi;

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    practices: Mutex<Vec<Practice>>,
    matters: Mutex<Vec<Matter>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_practice(&self, name: &str, refresh_token: Option<&str>) -> Practice {
        let mut practice = Practice::new(Uuid::now_v7(), name);
        if let Some(token) = refresh_token {
            practice = practice.with_refresh_token(token);
        }
        self.practices.lock().unwrap().push(practice.clone());
        practice
    }

    pub fn add_matter(&self, practice_id: Uuid, title: &str, client: Option<&str>) -> Matter {
        let matter = Matter {
            id: Uuid::now_v7(),
            practice_id,
            title: title.to_string(),
            client_name: client.map(str::to_string),
            status: MatterStatus::Active,
        };
        self.matters.lock().unwrap().push(matter.clone());
        matter
    }

    pub fn set_status(&self, matter_id: Uuid, status: MatterStatus) {
        let mut matters = self.matters.lock().unwrap();
        if let Some(matter) = matters.iter_mut().find(|m| m.id == matter_id) {
            matter.status = status;
        }
    }
}

#[async_trait]
impl PracticeDirectory for InMemoryDirectory {
    async fn list_practices_with_credentials(&self) -> DomainResult<Vec<Practice>> {
        Ok(self.practices.lock().unwrap().iter().filter(|p| p.has_credential()).cloned().collect())
    }

    async fn get_practice(&self, practice_id: Uuid) -> DomainResult<Option<Practice>> {
        Ok(self.practices.lock().unwrap().iter().find(|p| p.id == practice_id).cloned())
    }

    async fn list_eligible_matters(&self, practice_id: Uuid) -> DomainResult<Vec<Matter>> {
        Ok(self
            .matters
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.practice_id == practice_id && m.is_batch_eligible())
            .cloned()
            .collect())
    }

    async fn get_matter(&self, matter_id: Uuid) -> DomainResult<Option<Matter>> {
        Ok(self.matters.lock().unwrap().iter().find(|m| m.id == matter_id).cloned())
    }
}

/// Hands out pre-registered clients per refresh token; unknown tokens are
/// rejected like a revoked grant.
#[derive(Default)]
pub struct MockClientFactory {
    clients: Mutex<HashMap<String, (Arc<MockCalendarApi>, Arc<MockStorageApi>)>>,
    pub connect_calls: AtomicUsize,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, token: &str) -> (Arc<MockCalendarApi>, Arc<MockStorageApi>) {
        let calendar = Arc::new(MockCalendarApi::new());
        let storage = Arc::new(MockStorageApi::new());
        self.clients
            .lock()
            .unwrap()
            .insert(token.to_string(), (Arc::clone(&calendar), Arc::clone(&storage)));
        (calendar, storage)
    }
}

#[async_trait]
impl ProviderClientFactory for MockClientFactory {
    async fn connect(&self, refresh_token: &RefreshToken) -> DomainResult<ProviderClients> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let clients = self.clients.lock().unwrap();
        let (calendar, storage) = clients
            .get(refresh_token.expose_secret())
            .ok_or_else(|| DocketError::Authentication("invalid_grant: Token has been expired or revoked.".into()))?;
        Ok(ProviderClients {
            calendar: calendar.clone(),
            storage: storage.clone(),
        })
    }
}

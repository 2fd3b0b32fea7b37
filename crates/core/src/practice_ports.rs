//! Read-only access to practices and matters owned by the portal

use async_trait::async_trait;
use docketsync_domain::{Matter, Practice, Result};
use uuid::Uuid;

#[async_trait]
pub trait PracticeDirectory: Send + Sync {
    /// Practices that hold a refresh token
    async fn list_practices_with_credentials(&self) -> Result<Vec<Practice>>;

    async fn get_practice(&self, practice_id: Uuid) -> Result<Option<Practice>>;

    /// Active matters linked to a client
    async fn list_eligible_matters(&self, practice_id: Uuid) -> Result<Vec<Matter>>;

    async fn get_matter(&self, matter_id: Uuid) -> Result<Option<Matter>>;
}

//! Practices, their provider credential, and matters

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_CALENDAR_ID, MATTER_ID_SHORT_LEN};
use crate::impl_status_conversions;

/// OAuth refresh token held by a practice.
///
/// Never printed: `Debug` is redacted and the value is not serialized.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl RefreshToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshToken([redacted])")
    }
}

/// A legal practice (tenant). Owned by the portal; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Practice {
    pub id: Uuid,
    pub name: String,
    #[serde(skip)]
    pub refresh_token: Option<RefreshToken>,
    pub calendar_id: String,
}

impl Practice {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            refresh_token: None,
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(RefreshToken::new(token));
        self
    }

    pub const fn has_credential(&self) -> bool {
        self.refresh_token.is_some()
    }
}

/// Lifecycle state of a matter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatterStatus {
    Active,
    Closed,
    Archived,
}

impl_status_conversions!(MatterStatus {
    Active => "active",
    Closed => "closed",
    Archived => "archived",
});

/// A case or engagement within a practice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matter {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub title: String,
    pub client_name: Option<String>,
    pub status: MatterStatus,
}

impl Matter {
    /// Active and linked to a client
    pub fn is_batch_eligible(&self) -> bool {
        self.status == MatterStatus::Active
            && self.client_name.as_deref().is_some_and(|name| !name.trim().is_empty())
    }

    /// First characters of the matter id, used in folder names
    pub fn short_id(&self) -> String {
        self.id.simple().to_string().chars().take(MATTER_ID_SHORT_LEN).collect()
    }
}

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::user::{UserId, UserRole};

pub type SessionId = Uuid;

/// The signed-in user as seen by a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub role: UserRole,
    /// Token issued by the auth service, forwarded to the store for row-level security.
    pub access_token: Option<String>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Clone, Debug)]
pub struct SessionEntry {
    pub identity: Identity,
    pub token_hash: [u8; 32],
    pub expires_at: DateTime<Utc>,
}

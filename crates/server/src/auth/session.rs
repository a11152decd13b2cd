use base64::prelude::BASE64_URL_SAFE_NO_PAD as BASE64;
use base64::Engine;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use subtle::ConstantTimeEq;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::utils::{
    hash_token_sha256, pack_session_id_and_token, unpack_session_id_and_token,
    SESSION_SECRET_LEN,
};
use crate::error::SessionError;
use crate::models::session::{Identity, SessionEntry, SessionId};

/// Process-local sessions. Tokens handed to clients are
/// `base64(session id || secret)`, only a SHA-256 of the secret is kept here.
pub struct SessionStore {
    entries: DashMap<SessionId, SessionEntry>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn create(&self, identity: Identity) -> String {
        self.purge_expired();
        let session_id = Uuid::new_v4();
        let secret: [u8; SESSION_SECRET_LEN] = rand::random();
        info!("opening session for user {}", identity.user_id);
        self.entries.insert(
            session_id,
            SessionEntry {
                identity,
                token_hash: hash_token_sha256(&secret),
                expires_at: Utc::now() + self.ttl,
            },
        );
        BASE64.encode(pack_session_id_and_token(&session_id, &secret))
    }

    pub fn resolve(&self, token: &str) -> Result<Identity, SessionError> {
        self.verify(token).map(|(_, identity)| identity)
    }

    /// Ends the session the token belongs to; unknown tokens are ignored.
    pub fn revoke(&self, token: &str) {
        if let Ok((session_id, identity)) = self.verify(token) {
            self.entries.remove(&session_id);
            info!("closed session for user {}", identity.user_id);
        }
    }

    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    fn purge_expired(&self) {
        let now = Utc::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    fn verify(&self, token: &str) -> Result<(SessionId, Identity), SessionError> {
        let packed = BASE64.decode(token).map_err(|_| {
            debug!("malformed session token: not base64");
            SessionError::BadToken
        })?;
        let (session_id, secret) = unpack_session_id_and_token(&packed).ok_or_else(|| {
            debug!("malformed session token: unable to unpack");
            SessionError::BadToken
        })?;
        {
            let entry = self
                .entries
                .get(&session_id)
                .ok_or(SessionError::TokenNotFound)?;
            let presented = hash_token_sha256(secret);
            if !bool::from(entry.token_hash[..].ct_eq(&presented[..])) {
                debug!("session token secret mismatch");
                return Err(SessionError::TokenNotFound);
            }
            if entry.expires_at > Utc::now() {
                return Ok((session_id, entry.identity.clone()));
            }
        }
        // the read guard above must be gone before removing
        self.entries.remove(&session_id);
        Err(SessionError::TokenExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;

    fn identity() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            username: "player@casino.example".to_string(),
            role: UserRole::Regular,
            access_token: Some("jwt".to_string()),
        }
    }

    #[test]
    fn created_token_resolves_to_identity() {
        let sessions = SessionStore::new(Duration::minutes(5));
        let identity = identity();
        let token = sessions.create(identity.clone());
        assert_eq!(sessions.resolve(&token).unwrap(), identity);
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let sessions = SessionStore::new(Duration::minutes(5));
        let token = sessions.create(identity());

        let mut packed = BASE64.decode(&token).unwrap();
        let last = packed.len() - 1;
        packed[last] ^= 0xff;
        let forged = BASE64.encode(&packed);
        assert!(matches!(sessions.resolve(&forged), Err(SessionError::TokenNotFound)));

        assert!(matches!(sessions.resolve("%%%"), Err(SessionError::BadToken)));
        assert!(matches!(
            sessions.resolve(&BASE64.encode(b"short")),
            Err(SessionError::BadToken)
        ));
    }

    #[test]
    fn expired_sessions_are_dropped() {
        let sessions = SessionStore::new(Duration::zero());
        let token = sessions.create(identity());
        assert!(matches!(sessions.resolve(&token), Err(SessionError::TokenExpired)));
        assert_eq!(sessions.active_count(), 0);
    }

    #[test]
    fn revoke_ends_only_that_session() {
        let sessions = SessionStore::new(Duration::minutes(5));
        let first = sessions.create(identity());
        let second = sessions.create(identity());

        sessions.revoke(&first);
        assert!(sessions.resolve(&first).is_err());
        assert!(sessions.resolve(&second).is_ok());

        sessions.revoke("not-a-token");
        assert_eq!(sessions.active_count(), 1);
    }
}

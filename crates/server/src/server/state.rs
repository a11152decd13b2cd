use std::sync::Arc;

use crate::auth::limiter::AuthLimiter;
use crate::auth::session::SessionStore;
use crate::config::AppConfig;
use crate::error::RequestError;
use crate::models::session::Identity;
use crate::store::connection::StoreHandles;
use crate::store::DataStore;

pub struct AppState {
    pub config: AppConfig,
    pub stores: StoreHandles,
    pub sessions: SessionStore,
    auth_limiter: AuthLimiter,
}

impl AppState {
    pub fn try_init(config: &AppConfig) -> anyhow::Result<Self> {
        let stores = StoreHandles::connect(&config.store)?;
        Ok(Self::new(config.clone(), stores))
    }

    pub fn new(config: AppConfig, stores: StoreHandles) -> Self {
        Self {
            sessions: SessionStore::new(config.session.ttl()),
            auth_limiter: AuthLimiter::new(config.rate_limit.auth_attempts_per_minute()),
            stores,
            config,
        }
    }

    /// Data store acting as the caller, so row-level security applies to their writes.
    pub fn store_for(&self, identity: &Identity) -> Arc<dyn DataStore> {
        match &identity.access_token {
            Some(token) => self.stores.data.with_access_token(token),
            None => self.stores.data.clone(),
        }
    }

    pub fn check_auth_attempt(&self, email: &str) -> Result<(), RequestError> {
        self.auth_limiter.check(email)
    }
}

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::error::StoreError;
use crate::store::memory::MemoryStore;
use crate::store::rest::RestStore;
use crate::store::{AuthProvider, DataStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Rest,
    Memory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    pub kind: StoreKind,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
}

impl StoreConfig {
    const TIMEOUT_FALLBACK_SECS: u64 = 10;
    const MAX_RETRIES_FALLBACK: u32 = 2;
    const RETRY_BACKOFF_FALLBACK_MS: u64 = 100;

    #[cfg(test)]
    pub fn memory() -> Self {
        Self {
            kind: StoreKind::Memory,
            url: String::new(),
            api_key: String::new(),
            timeout_secs: None,
            max_retries: None,
            retry_backoff_ms: None,
        }
    }

    #[cfg(test)]
    pub fn rest(url: &str, api_key: &str) -> Self {
        Self {
            kind: StoreKind::Rest,
            url: url.to_string(),
            api_key: api_key.to_string(),
            ..Self::memory()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(Self::TIMEOUT_FALLBACK_SECS))
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(Self::MAX_RETRIES_FALLBACK)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(
            self.retry_backoff_ms
                .unwrap_or(Self::RETRY_BACKOFF_FALLBACK_MS),
        )
    }
}

/// Both faces of the backend, shared by every request.
#[derive(Clone)]
pub struct StoreHandles {
    pub data: Arc<dyn DataStore>,
    pub auth: Arc<dyn AuthProvider>,
}

impl StoreHandles {
    pub fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        match config.kind {
            StoreKind::Rest => {
                let store = RestStore::new(config)?;
                info!("using remote store at {}", config.url);
                Ok(Self {
                    data: Arc::new(store.clone()),
                    auth: Arc::new(store),
                })
            }
            StoreKind::Memory => {
                let store = MemoryStore::default();
                info!("using in-memory store, data is lost on restart");
                Ok(Self::from_memory(store))
            }
        }
    }

    pub fn from_memory(store: MemoryStore) -> Self {
        Self {
            data: Arc::new(store.clone()),
            auth: Arc::new(store),
        }
    }
}

use std::env;
use std::fs::read_to_string;
use std::num::NonZeroU32;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::connection::StoreConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    ttl_minutes: Option<i64>,
    #[serde(default)]
    pub secure_cookie: bool,
}

impl SessionConfig {
    const TTL_FALLBACK_MINUTES: i64 = 12 * 60;

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.ttl_minutes.unwrap_or(Self::TTL_FALLBACK_MINUTES))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub emails: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RateLimitConfig {
    auth_attempts_per_minute: Option<u32>,
}

impl RateLimitConfig {
    const AUTH_ATTEMPTS_FALLBACK: NonZeroU32 = match NonZeroU32::new(10) {
        Some(n) => n,
        None => unreachable!(),
    };

    pub fn auth_attempts_per_minute(&self) -> NonZeroU32 {
        self.auth_attempts_per_minute
            .and_then(NonZeroU32::new)
            .unwrap_or(Self::AUTH_ATTEMPTS_FALLBACK)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FeedConfig {
    concurrency: Option<usize>,
}

impl FeedConfig {
    const CONCURRENCY_FALLBACK: usize = 8;

    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(Self::CONCURRENCY_FALLBACK).max(1)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

impl AppConfig {
    pub fn from_yaml_file<P: Into<PathBuf>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.into();
        let content = read_to_string(&path).with_context(|| format!("path: {path:?}"))?;
        Self::from_yaml_str(&content).with_context(|| format!("path: {path:?}"))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, anyhow::Error> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// In-memory store on an ephemeral port, nothing to configure.
    #[cfg(test)]
    pub fn development() -> Self {
        Self {
            server: ServerConfig {
                address: "127.0.0.1:0".to_string(),
            },
            store: StoreConfig::memory(),
            session: SessionConfig::default(),
            admin: AdminConfig::default(),
            rate_limit: RateLimitConfig::default(),
            feed: FeedConfig::default(),
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(url) = lookup("SUPABASE_URL") {
            info!("store url taken from SUPABASE_URL");
            self.store.url = url;
        }
        if let Some(key) = lookup("SUPABASE_KEY") {
            self.store.api_key = key;
        }
        if let Some(address) = lookup("PITWATCH_ADDRESS") {
            self.server.address = address;
        }
        if let Some(emails) = lookup("ADMIN_EMAILS") {
            self.admin.emails = emails
                .split(',')
                .map(str::trim)
                .filter(|email| !email.is_empty())
                .map(str::to_string)
                .collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::store::connection::StoreKind;

    const FULL: &str = r#"
server:
  address: 0.0.0.0:5000
store:
  kind: rest
  url: https://project.supabase.example
  api_key: anon
  timeout_secs: 3
  max_retries: 4
session:
  ttl_minutes: 30
  secure_cookie: true
admin:
  emails: [boss@casino.example]
rate_limit:
  auth_attempts_per_minute: 5
feed:
  concurrency: 2
"#;

    #[test]
    fn parses_every_section() {
        let config = AppConfig::from_yaml_str(FULL).unwrap();
        assert_eq!(config.server.address, "0.0.0.0:5000");
        assert_eq!(config.store.kind, StoreKind::Rest);
        assert_eq!(config.store.timeout(), std::time::Duration::from_secs(3));
        assert_eq!(config.store.max_retries(), 4);
        assert_eq!(config.session.ttl(), chrono::Duration::minutes(30));
        assert!(config.session.secure_cookie);
        assert_eq!(config.admin.emails, ["boss@casino.example"]);
        assert_eq!(config.rate_limit.auth_attempts_per_minute().get(), 5);
        assert_eq!(config.feed.concurrency(), 2);
    }

    #[test]
    fn optional_sections_fall_back() {
        let config = AppConfig::from_yaml_str(
            "server:\n  address: 127.0.0.1:5000\nstore:\n  kind: memory\n",
        )
        .unwrap();
        assert_eq!(config.store.kind, StoreKind::Memory);
        assert_eq!(config.store.max_retries(), 2);
        assert_eq!(
            config.store.retry_backoff(),
            std::time::Duration::from_millis(100)
        );
        assert_eq!(config.session.ttl(), chrono::Duration::minutes(720));
        assert!(config.admin.emails.is_empty());
        assert_eq!(config.rate_limit.auth_attempts_per_minute().get(), 10);
        assert_eq!(config.feed.concurrency(), 8);
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = AppConfig::from_yaml_str(FULL).unwrap();
        let env: HashMap<&str, &str> = [
            ("SUPABASE_URL", "https://other.example"),
            ("SUPABASE_KEY", "service"),
            ("ADMIN_EMAILS", " a@x.example, ,b@x.example"),
        ]
        .into_iter()
        .collect();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.store.url, "https://other.example");
        assert_eq!(config.store.api_key, "service");
        assert_eq!(config.server.address, "0.0.0.0:5000");
        assert_eq!(config.admin.emails, ["a@x.example", "b@x.example"]);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = AppConfig::from_yaml_file("/nonexistent/pitwatch.yaml").unwrap_err();
        assert!(format!("{err:?}").contains("pitwatch.yaml"));
    }
}

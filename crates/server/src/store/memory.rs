//! In-process backend with the same observable behavior as the hosted one:
//! primary and unique keys are enforced on insert, and auth accounts keep
//! argon2 hashes only. Used for local runs and as the test double.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::DateTime;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::auth::utils::{hash_password, verify_password};
use crate::models::user::UserId;
use crate::store::error::StoreError;
use crate::store::schema::Table;
use crate::store::{AuthProvider, AuthSession, AuthUser, DataStore, Filter, Query, Row};

const PRIMARY_KEY: &[&str] = &["id"];

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    tables: DashMap<Table, Vec<Row>>,
    accounts: DashMap<String, Account>,
    offline: AtomicBool,
}

struct Account {
    id: UserId,
    email: String,
    password_hash: String,
}

impl MemoryStore {
    /// Makes every call fail as if the remote service were unreachable.
    #[cfg(test)]
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Snapshot of a table in insertion order.
    #[cfg(test)]
    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.inner
            .tables
            .get(&table)
            .map(|rows| rows.value().clone())
            .unwrap_or_default()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.inner.offline.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    fn matching(&self, table: Table, filters: &[Filter]) -> Vec<Row> {
        self.inner
            .tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row_matches(row, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn row_matches(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match row.get(filter.column) {
        Some(Value::String(s)) => *s == filter.value,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == filter.value,
    })
}

fn same_key(existing: &Row, candidate: &Row, columns: &[&str]) -> bool {
    columns.iter().all(|column| match candidate.get(*column) {
        None | Some(Value::Null) => false,
        Some(value) => existing.get(*column) == Some(value),
    })
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    #[instrument(skip(self))]
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        self.check_online()?;
        let mut rows = self.matching(query.table, &query.filters);
        if let Some(order) = query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(order.column), b.get(order.column));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn count(&self, query: &Query) -> Result<u64, StoreError> {
        self.check_online()?;
        Ok(self.matching(query.table, &query.filters).len() as u64)
    }

    #[instrument(skip(self, row))]
    async fn insert(&self, table: Table, row: Row) -> Result<(), StoreError> {
        self.check_online()?;
        // the entry guard holds the shard lock, check and push are atomic
        let mut rows = self.inner.tables.entry(table).or_default();
        let keys = std::iter::once(PRIMARY_KEY).chain(table.unique_keys().iter().copied());
        for key in keys {
            if rows.iter().any(|existing| same_key(existing, &row, key)) {
                debug!("duplicate key {key:?} in {table}");
                return Err(StoreError::Conflict {
                    table: table.to_string(),
                });
            }
        }
        rows.push(row);
        Ok(())
    }

    #[instrument(skip(self, patch))]
    async fn update(
        &self,
        table: Table,
        patch: Row,
        filters: &[Filter],
    ) -> Result<(), StoreError> {
        self.check_online()?;
        if let Some(mut rows) = self.inner.tables.get_mut(&table) {
            for row in rows.iter_mut().filter(|row| row_matches(row, filters)) {
                for (column, value) in &patch {
                    row.insert(column.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), StoreError> {
        self.check_online()?;
        if let Some(mut rows) = self.inner.tables.get_mut(&table) {
            rows.retain(|row| !row_matches(row, filters));
        }
        Ok(())
    }

    fn with_access_token(&self, _access_token: &str) -> Arc<dyn DataStore> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl AuthProvider for MemoryStore {
    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, StoreError> {
        self.check_online()?;
        let password_hash = hash_password(password).map_err(|e| StoreError::Rejected {
            status: 500,
            message: format!("password hashing failed: {e}"),
        })?;
        match self.inner.accounts.entry(email.to_lowercase()) {
            Entry::Occupied(_) => Err(StoreError::Rejected {
                status: 422,
                message: "User already registered".to_string(),
            }),
            Entry::Vacant(vacant) => {
                let id = Uuid::new_v4();
                vacant.insert(Account {
                    id,
                    email: email.to_string(),
                    password_hash,
                });
                Ok(AuthUser {
                    id,
                    email: Some(email.to_string()),
                })
            }
        }
    }

    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StoreError> {
        self.check_online()?;
        let account = self
            .inner
            .accounts
            .get(&email.to_lowercase())
            .ok_or(StoreError::InvalidCredentials)?;
        if !verify_password(password, &account.password_hash) {
            return Err(StoreError::InvalidCredentials);
        }
        let token: [u8; 32] = rand::random();
        Ok(AuthSession {
            user: AuthUser {
                id: account.id,
                email: Some(account.email.clone()),
            },
            access_token: BASE64_URL_SAFE_NO_PAD.encode(token),
        })
    }
}

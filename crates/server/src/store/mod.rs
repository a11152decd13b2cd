//! Client side of the hosted backend: table-scoped reads and writes plus the
//! auth subsystem. Everything above this module talks to `dyn DataStore` and
//! `dyn AuthProvider` only.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::models::user::UserId;
use crate::store::error::StoreError;
use crate::store::schema::Table;

pub mod commands;
pub mod connection;
pub mod error;
pub mod memory;
pub mod queries;
pub mod rest;
pub mod schema;
pub mod utils;

pub type Row = serde_json::Map<String, Value>;

/// Equality predicate on a single column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    pub column: &'static str,
    pub value: String,
}

impl Filter {
    pub fn eq(column: &'static str, value: impl ToString) -> Self {
        Self {
            column,
            value: value.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub descending: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: &'static str, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn order_desc(mut self, column: &'static str) -> Self {
        self.order = Some(Order {
            column,
            descending: true,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
pub trait DataStore: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Exact number of rows matching the query filters, ordering and limit are ignored.
    async fn count(&self, query: &Query) -> Result<u64, StoreError>;

    /// Fails with [`StoreError::Conflict`] when a primary or unique key is already taken.
    async fn insert(&self, table: Table, row: Row) -> Result<(), StoreError>;

    async fn update(&self, table: Table, patch: Row, filters: &[Filter])
        -> Result<(), StoreError>;

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), StoreError>;

    /// Same store, acting on behalf of a signed-in user.
    fn with_access_token(&self, access_token: &str) -> Arc<dyn DataStore>;
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AuthSession {
    pub user: AuthUser,
    pub access_token: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, StoreError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StoreError>;
}

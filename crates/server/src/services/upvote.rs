use tracing::{debug, info, instrument};

use crate::error::RequestError;
use crate::models::resource::ResourceId;
use crate::models::upvote::Upvote;
use crate::models::user::UserId;
use crate::store::commands::insert_upvote;
use crate::store::queries::{count_upvotes, find_upvotes};
use crate::store::utils::map_conflict_as_none;
use crate::store::DataStore;

/// Records one upvote of `user_id` for `resource_id` and returns the new total.
///
/// A second upvote by the same user fails with [`RequestError::DuplicateUpvote`]
/// and writes nothing. The lookup catches the common case, the store's unique
/// key on `(resource_id, user_id)` catches concurrent duplicates.
#[instrument(skip(store))]
pub async fn record_upvote(
    store: &dyn DataStore,
    resource_id: ResourceId,
    user_id: UserId,
) -> Result<u64, RequestError> {
    if !find_upvotes(store, resource_id, user_id).await?.is_empty() {
        return Err(RequestError::DuplicateUpvote);
    }
    let upvote = Upvote::new(resource_id, user_id);
    if map_conflict_as_none(insert_upvote(store, &upvote).await)?.is_none() {
        debug!("concurrent duplicate upvote rejected by store");
        return Err(RequestError::DuplicateUpvote);
    }
    info!("user {user_id} upvoted resource {resource_id}");
    Ok(count_upvotes(store, resource_id).await?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::services::feed::list_posts;
    use crate::store::error::StoreError;
    use crate::store::memory::MemoryStore;
    use crate::store::schema::Table;
    use crate::store::{Filter, Query, Row};
    use crate::tests::fixtures::seed_resource;

    #[tokio::test]
    async fn first_upvote_counts_one_and_repeat_is_rejected() {
        let store = MemoryStore::default();
        let resource = seed_resource(&store, "res-1").await;
        let user = Uuid::new_v4();

        assert_eq!(record_upvote(&store, resource.id, user).await.unwrap(), 1);

        let again = record_upvote(&store, resource.id, user).await;
        assert!(matches!(again, Err(RequestError::DuplicateUpvote)));
        assert_eq!(store.rows(Table::Upvotes).len(), 1);

        let posts = list_posts(&store, 1).await.unwrap();
        assert_eq!(posts[0].upvotes, 1);
    }

    #[tokio::test]
    async fn distinct_users_both_count() {
        let store = MemoryStore::default();
        let resource = seed_resource(&store, "res-1").await;

        assert_eq!(record_upvote(&store, resource.id, Uuid::new_v4()).await.unwrap(), 1);
        assert_eq!(record_upvote(&store, resource.id, Uuid::new_v4()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn counts_are_per_resource() {
        let store = MemoryStore::default();
        let first = seed_resource(&store, "first").await;
        let second = seed_resource(&store, "second").await;
        let user = Uuid::new_v4();

        assert_eq!(record_upvote(&store, first.id, user).await.unwrap(), 1);
        assert_eq!(record_upvote(&store, second.id, user).await.unwrap(), 1);
        assert_eq!(record_upvote(&store, second.id, Uuid::new_v4()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn concurrent_duplicates_store_exactly_one_row() {
        let store = MemoryStore::default();
        let resource = seed_resource(&store, "contested").await;
        let user = Uuid::new_v4();

        let attempts = (0..8).map(|_| record_upvote(&store, resource.id, user));
        let results = futures::future::join_all(attempts).await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, RequestError::DuplicateUpvote)));
        assert_eq!(store.rows(Table::Upvotes).len(), 1);
    }

    /// Upvote lookups always come back empty, as when a concurrent request
    /// inserts between this request's lookup and its insert.
    struct StaleLookupStore(MemoryStore);

    #[async_trait]
    impl DataStore for StaleLookupStore {
        async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
            if query.table == Table::Upvotes {
                return Ok(Vec::new());
            }
            self.0.select(query).await
        }

        async fn count(&self, query: &Query) -> Result<u64, StoreError> {
            self.0.count(query).await
        }

        async fn insert(&self, table: Table, row: Row) -> Result<(), StoreError> {
            self.0.insert(table, row).await
        }

        async fn update(
            &self,
            table: Table,
            patch: Row,
            filters: &[Filter],
        ) -> Result<(), StoreError> {
            self.0.update(table, patch, filters).await
        }

        async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), StoreError> {
            self.0.delete(table, filters).await
        }

        fn with_access_token(&self, _access_token: &str) -> Arc<dyn DataStore> {
            Arc::new(StaleLookupStore(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn unique_key_rejects_duplicate_missed_by_lookup() {
        let memory = MemoryStore::default();
        let resource = seed_resource(&memory, "contested").await;
        let store = StaleLookupStore(memory.clone());
        let user = Uuid::new_v4();

        assert_eq!(record_upvote(&store, resource.id, user).await.unwrap(), 1);

        let again = record_upvote(&store, resource.id, user).await;
        assert!(matches!(again, Err(RequestError::DuplicateUpvote)));
        assert_eq!(memory.rows(Table::Upvotes).len(), 1);

        assert_eq!(
            record_upvote(&store, resource.id, Uuid::new_v4()).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn store_failure_is_surfaced() {
        let store = MemoryStore::default();
        let resource = seed_resource(&store, "res-1").await;
        store.set_offline(true);

        let err = record_upvote(&store, resource.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::DataStoreUnavailable(_)));
        store.set_offline(false);
        assert!(store.rows(Table::Upvotes).is_empty());
    }
}

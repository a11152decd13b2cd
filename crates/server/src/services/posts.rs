use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::RequestError;
use crate::models::resource::{CreateResourceRequest, Resource, ResourceId};
use crate::models::status::{StatusReport, StatusUpdate};
use crate::models::user::UserId;
use crate::store::commands::{
    delete_resource, insert_resource, insert_status, update_current_status,
};
use crate::store::queries::{find_resource, status_exists};
use crate::store::DataStore;

/// Creates a resource together with its initial status. If the status cannot
/// be written the resource is removed again, so no half-created post remains.
#[instrument(skip(store, request))]
pub async fn create_post(
    store: &dyn DataStore,
    author: UserId,
    request: CreateResourceRequest,
) -> Result<Resource, RequestError> {
    let resource = Resource {
        id: Uuid::new_v4(),
        name: request.name,
        image_url: request.image_url,
        created_by: author,
    };
    insert_resource(store, &resource).await?;

    let status = StatusUpdate::new(resource.id, request.initial_status);
    if let Err(e) = insert_status(store, &status).await {
        warn!("removing resource {} after failed status insert: {e}", resource.id);
        if let Err(cleanup) = delete_resource(store, resource.id).await {
            error!("resource {} left without status: {cleanup}", resource.id);
        }
        return Err(e.into());
    }
    info!("user {author} created post {}", resource.id);
    Ok(resource)
}

/// Replaces the current status of a resource, creating it on first report.
#[instrument(skip(store, report))]
pub async fn update_status(
    store: &dyn DataStore,
    resource_id: ResourceId,
    report: StatusReport,
) -> Result<(), RequestError> {
    if find_resource(store, resource_id).await?.is_none() {
        return Err(RequestError::NotFound);
    }
    if status_exists(store, resource_id).await? {
        update_current_status(store, resource_id, &report.into()).await?;
    } else {
        insert_status(store, &StatusUpdate::new(resource_id, report)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::services::feed::list_posts;
    use crate::store::error::StoreError;
    use crate::store::memory::MemoryStore;
    use crate::store::schema::Table;
    use crate::store::{Filter, Query, Row};
    use crate::tests::fixtures::{report, seed_resource};

    /// Memory store whose status table refuses writes.
    struct BrokenStatusStore(MemoryStore);

    #[async_trait]
    impl DataStore for BrokenStatusStore {
        async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
            self.0.select(query).await
        }

        async fn count(&self, query: &Query) -> Result<u64, StoreError> {
            self.0.count(query).await
        }

        async fn insert(&self, table: Table, row: Row) -> Result<(), StoreError> {
            if table == Table::StatusUpdates {
                return Err(StoreError::Unavailable("connection reset".to_string()));
            }
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
            Arc::new(BrokenStatusStore(self.0.clone()))
        }
    }

    fn request(name: &str) -> CreateResourceRequest {
        CreateResourceRequest {
            name: name.to_string(),
            image_url: String::new(),
            initial_status: report("opening night"),
        }
    }

    #[tokio::test]
    async fn created_post_shows_up_with_its_status() {
        let store = MemoryStore::default();
        let author = Uuid::new_v4();
        let resource = create_post(&store, author, request("Aria")).await.unwrap();
        assert_eq!(resource.created_by, author);

        let posts = list_posts(&store, 1).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Aria");
        assert_eq!(posts[0].description, "opening night");
        assert_eq!(posts[0].queue, "queue of opening night");
    }

    #[tokio::test]
    async fn failed_status_insert_leaves_no_resource() {
        let memory = MemoryStore::default();
        let store = BrokenStatusStore(memory.clone());

        let err = create_post(&store, Uuid::new_v4(), request("Ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::DataStoreUnavailable(_)));
        assert!(memory.rows(Table::Resource).is_empty());
        assert!(memory.rows(Table::StatusUpdates).is_empty());
    }

    #[tokio::test]
    async fn update_status_inserts_once_then_updates_in_place() {
        let store = MemoryStore::default();
        let resource = seed_resource(&store, "Venetian").await;

        update_status(&store, resource.id, report("first")).await.unwrap();
        update_status(&store, resource.id, report("second")).await.unwrap();

        let rows = store.rows(Table::StatusUpdates);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["status_message"], "second");
        assert_eq!(rows[0]["crowd_level"], "crowd of second");

        let posts = list_posts(&store, 1).await.unwrap();
        assert_eq!(posts[0].description, "second");
    }

    #[tokio::test]
    async fn update_status_of_unknown_resource_is_not_found() {
        let store = MemoryStore::default();
        let err = update_status(&store, Uuid::new_v4(), report("nowhere"))
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::NotFound));
        assert!(store.rows(Table::StatusUpdates).is_empty());
    }
}

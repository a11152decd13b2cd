use tracing::instrument;

use crate::models::resource::{Resource, ResourceId};
use crate::models::status::StatusUpdate;
use crate::models::upvote::Upvote;
use crate::models::user::UserId;
use crate::store::error::StoreError;
use crate::store::schema::Table;
use crate::store::utils::{decode_first, decode_rows};
use crate::store::{DataStore, Query};

#[instrument(skip_all)]
pub async fn list_resources(store: &dyn DataStore) -> Result<Vec<Resource>, StoreError> {
    let rows = store.select(&Query::table(Table::Resource)).await?;
    decode_rows(Table::Resource, rows)
}

#[instrument(skip(store))]
pub async fn find_resource(
    store: &dyn DataStore,
    resource_id: ResourceId,
) -> Result<Option<Resource>, StoreError> {
    let query = Query::table(Table::Resource).eq("id", resource_id).limit(1);
    decode_first(Table::Resource, store.select(&query).await?)
}

/// Most recent status of a resource by `created_at`.
#[instrument(skip(store))]
pub async fn latest_status(
    store: &dyn DataStore,
    resource_id: ResourceId,
) -> Result<Option<StatusUpdate>, StoreError> {
    let query = Query::table(Table::StatusUpdates)
        .eq("resource_id", resource_id)
        .order_desc("created_at")
        .limit(1);
    decode_first(Table::StatusUpdates, store.select(&query).await?)
}

#[instrument(skip(store))]
pub async fn status_exists(
    store: &dyn DataStore,
    resource_id: ResourceId,
) -> Result<bool, StoreError> {
    let query = Query::table(Table::StatusUpdates)
        .eq("resource_id", resource_id)
        .limit(1);
    Ok(!store.select(&query).await?.is_empty())
}

#[instrument(skip(store))]
pub async fn count_upvotes(
    store: &dyn DataStore,
    resource_id: ResourceId,
) -> Result<u64, StoreError> {
    store
        .count(&Query::table(Table::Upvotes).eq("resource_id", resource_id))
        .await
}

#[instrument(skip(store))]
pub async fn find_upvotes(
    store: &dyn DataStore,
    resource_id: ResourceId,
    user_id: UserId,
) -> Result<Vec<Upvote>, StoreError> {
    let query = Query::table(Table::Upvotes)
        .eq("resource_id", resource_id)
        .eq("user_id", user_id);
    decode_rows(Table::Upvotes, store.select(&query).await?)
}

use tracing::{info, instrument};

use crate::models::resource::{Resource, ResourceId};
use crate::models::status::{StatusPatch, StatusUpdate};
use crate::models::upvote::Upvote;
use crate::models::user::UserRecord;
use crate::store::error::StoreError;
use crate::store::schema::Table;
use crate::store::utils::encode_row;
use crate::store::{DataStore, Filter};

#[instrument(skip_all)]
pub async fn insert_resource(store: &dyn DataStore, resource: &Resource) -> Result<(), StoreError> {
    store
        .insert(Table::Resource, encode_row(Table::Resource, resource)?)
        .await?;
    info!("created resource with id: {}", resource.id);
    Ok(())
}

#[instrument(skip(store))]
pub async fn delete_resource(store: &dyn DataStore, resource_id: ResourceId) -> Result<(), StoreError> {
    store
        .delete(Table::Resource, &[Filter::eq("id", resource_id)])
        .await
}

#[instrument(skip_all)]
pub async fn insert_status(store: &dyn DataStore, status: &StatusUpdate) -> Result<(), StoreError> {
    store
        .insert(Table::StatusUpdates, encode_row(Table::StatusUpdates, status)?)
        .await?;
    info!("created status {} for resource {}", status.id, status.resource_id);
    Ok(())
}

#[instrument(skip(store, patch))]
pub async fn update_current_status(
    store: &dyn DataStore,
    resource_id: ResourceId,
    patch: &StatusPatch,
) -> Result<(), StoreError> {
    store
        .update(
            Table::StatusUpdates,
            encode_row(Table::StatusUpdates, patch)?,
            &[Filter::eq("resource_id", resource_id)],
        )
        .await
}

#[instrument(skip_all)]
pub async fn insert_upvote(store: &dyn DataStore, upvote: &Upvote) -> Result<(), StoreError> {
    store
        .insert(Table::Upvotes, encode_row(Table::Upvotes, upvote)?)
        .await
}

#[instrument(skip_all)]
pub async fn insert_user(store: &dyn DataStore, user: &UserRecord) -> Result<(), StoreError> {
    store
        .insert(Table::User, encode_row(Table::User, user)?)
        .await?;
    info!("mirrored user with id: {}", user.id);
    Ok(())
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::resource::ResourceId;
use crate::models::user::UserId;

pub type UpvoteId = Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upvote {
    pub id: UpvoteId,
    pub resource_id: ResourceId,
    pub user_id: UserId,
}

impl Upvote {
    pub fn new(resource_id: ResourceId, user_id: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource_id,
            user_id,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpvoteRequest {
    pub resource_id: ResourceId,
}

#[derive(Clone, Debug, Serialize)]
pub struct UpvoteResponse {
    pub success: bool,
    pub upvotes: u64,
}

use serde::Serialize;

use crate::models::resource::{Resource, ResourceId};
use crate::models::status::StatusUpdate;

/// Feed entry: a resource joined with its current status and upvote count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: ResourceId,
    pub title: String,
    pub image_url: String,
    pub description: String,
    pub upvotes: u64,
    /// Comments are not tracked yet, always 0.
    pub comments: u64,
    pub crowd: String,
    pub chips: String,
    pub queue: String,
}

impl Post {
    pub fn assemble(resource: Resource, status: Option<StatusUpdate>, upvotes: u64) -> Self {
        let (description, crowd, chips, queue) = match status {
            Some(status) => (
                status.status_message,
                status.crowd_level,
                status.chips_available,
                status.queue_length,
            ),
            None => Default::default(),
        };
        Self {
            id: resource.id,
            title: resource.name,
            image_url: resource.image_url,
            description,
            upvotes,
            comments: 0,
            crowd,
            chips,
            queue,
        }
    }
}

use futures::{stream, StreamExt, TryStreamExt};
use tracing::instrument;

use crate::models::post::Post;
use crate::models::resource::Resource;
use crate::store::error::StoreError;
use crate::store::queries::{count_upvotes, latest_status, list_resources};
use crate::store::DataStore;

/// Every resource joined with its current status and upvote count, most
/// upvoted first. Fails as a whole if any lookup fails.
#[instrument(skip(store))]
pub async fn list_posts(store: &dyn DataStore, concurrency: usize) -> Result<Vec<Post>, StoreError> {
    let resources = list_resources(store).await?;
    // `buffered` yields in input order, so ties below still see fetch order
    let mut posts: Vec<Post> = stream::iter(resources)
        .map(|resource| assemble_post(store, resource))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;
    rank_posts(&mut posts);
    Ok(posts)
}

async fn assemble_post(store: &dyn DataStore, resource: Resource) -> Result<Post, StoreError> {
    let status = latest_status(store, resource.id).await?;
    let upvotes = count_upvotes(store, resource.id).await?;
    Ok(Post::assemble(resource, status, upvotes))
}

/// Stable sort by upvotes, descending.
pub fn rank_posts(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.upvotes.cmp(&a.upvotes));
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::models::status::StatusUpdate;
    use crate::store::commands::insert_status;
    use crate::store::memory::MemoryStore;
    use crate::tests::fixtures::{report, seed_resource, seed_upvotes};

    #[tokio::test]
    async fn ranks_by_upvotes_and_keeps_fetch_order_on_ties() {
        let store = MemoryStore::default();
        let a = seed_resource(&store, "A").await;
        let b = seed_resource(&store, "B").await;
        let c = seed_resource(&store, "C").await;
        let d = seed_resource(&store, "D").await;
        seed_upvotes(&store, b.id, 3).await;
        seed_upvotes(&store, c.id, 3).await;
        seed_upvotes(&store, d.id, 1).await;

        for concurrency in [1, 2, 8] {
            let posts = list_posts(&store, concurrency).await.unwrap();
            let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
            assert_eq!(titles, ["B", "C", "D", "A"]);
            let upvotes: Vec<u64> = posts.iter().map(|p| p.upvotes).collect();
            assert_eq!(upvotes, [3, 3, 1, 0]);
            assert_eq!(posts[3].id, a.id);
        }
    }

    #[tokio::test]
    async fn resources_without_status_keep_empty_fields() {
        let store = MemoryStore::default();
        let bare = seed_resource(&store, "Bare").await;

        let posts = list_posts(&store, 4).await.unwrap();
        assert_eq!(posts.len(), 1);
        let post = &posts[0];
        assert_eq!(post.id, bare.id);
        assert_eq!(post.image_url, bare.image_url);
        assert_eq!(post.upvotes, 0);
        assert_eq!(post.comments, 0);
        assert!(post.description.is_empty());
        assert!(post.crowd.is_empty() && post.chips.is_empty() && post.queue.is_empty());
    }

    #[tokio::test]
    async fn uses_the_most_recent_status() {
        let store = MemoryStore::default();
        let venue = seed_resource(&store, "Venue").await;

        let mut older = StatusUpdate::new(venue.id, report("old news"));
        older.created_at = Utc::now() - Duration::hours(2);
        let newer = StatusUpdate::new(venue.id, report("fresh"));
        // inserted newest first so store order differs from time order
        insert_status(&store, &newer).await.unwrap();
        insert_status(&store, &older).await.unwrap();

        let posts = list_posts(&store, 1).await.unwrap();
        assert_eq!(posts[0].description, "fresh");
        assert_eq!(posts[0].crowd, "crowd of fresh");
    }

    #[tokio::test]
    async fn unreachable_store_fails_the_whole_feed() {
        let store = MemoryStore::default();
        seed_resource(&store, "A").await;
        store.set_offline(true);
        let err = list_posts(&store, 2).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn rank_is_stable() {
        let post = |title: &str, upvotes| Post {
            id: uuid::Uuid::new_v4(),
            title: title.to_string(),
            image_url: String::new(),
            description: String::new(),
            upvotes,
            comments: 0,
            crowd: String::new(),
            chips: String::new(),
            queue: String::new(),
        };
        let mut posts = vec![post("x", 1), post("y", 2), post("z", 1), post("w", 2)];
        rank_posts(&mut posts);
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["y", "w", "x", "z"]);
    }
}

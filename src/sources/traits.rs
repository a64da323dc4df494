use async_trait::async_trait;

use crate::domain::Post;
use crate::errors::FeederResult;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch one page of a channel's "hot" listing, at most `limit` posts
    async fn hot_posts(&self, channel: &str, limit: u32) -> FeederResult<Vec<Post>>;
}

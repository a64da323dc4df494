use crate::domain::Post;
use crate::errors::{FeederError, FeederResult};
use crate::sources::ListingSource;

pub struct FetchService<S: ListingSource> {
    source: S,
}

impl<S: ListingSource> FetchService<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch the hot listing of every channel, one request at a time,
    /// and concatenate the results in channel order.
    ///
    /// A failing channel is logged and skipped. Only invalid arguments
    /// fail the whole call.
    pub async fn fetch_posts<C: AsRef<str>>(
        &self,
        channels: &[C],
        limit_per_channel: u32,
    ) -> FeederResult<Vec<Post>> {
        if limit_per_channel == 0 {
            return Err(FeederError::InvalidInput(
                "limit per channel must be at least 1".to_string(),
            ));
        }

        tracing::info!(
            channels = channels.len(),
            limit = limit_per_channel,
            "fetching hot posts"
        );

        let mut all_posts = Vec::new();

        for channel in channels {
            let channel = channel.as_ref();
            match self.source.hot_posts(channel, limit_per_channel).await {
                Ok(mut posts) => {
                    // A misbehaving upstream may ignore the limit
                    posts.truncate(limit_per_channel as usize);
                    tracing::debug!(channel, count = posts.len(), "fetched channel");
                    all_posts.append(&mut posts);
                }
                Err(e) => {
                    // Log error but continue with other channels
                    tracing::error!(channel, error = %e, "error fetching channel");
                }
            }
        }

        tracing::info!(total = all_posts.len(), "fetched hot posts");
        Ok(all_posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::traits::MockListingSource;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn posts_for(channel: &str, count: usize) -> Vec<Post> {
        (0..count)
            .map(|i| Post::new(format!("{}-{}", channel, i), format!("Post {}", i), channel.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_single_channel_returns_all_entries() {
        let mut source = MockListingSource::new();
        source
            .expect_hot_posts()
            .with(eq("test"), eq(5))
            .times(1)
            .returning(|channel, limit| Ok(posts_for(channel, limit as usize)));

        let service = FetchService::new(source);
        let posts = service.fetch_posts(&["test"], 5).await.unwrap();

        assert_eq!(posts.len(), 5);
        assert!(posts.iter().all(|p| p.subreddit == "test"));
    }

    #[tokio::test]
    async fn test_failed_channel_is_skipped() {
        let mut source = MockListingSource::new();
        source
            .expect_hot_posts()
            .returning(|channel, limit| {
                if channel == "broken" {
                    Err(FeederError::Fetch("503 Service Unavailable".to_string()))
                } else {
                    Ok(posts_for(channel, limit as usize))
                }
            });

        let service = FetchService::new(source);
        let posts = service
            .fetch_posts(&["rust", "broken", "golang"], 3)
            .await
            .unwrap();

        assert_eq!(posts.len(), 6);
        let channels: Vec<&str> = posts.iter().map(|p| p.subreddit.as_str()).collect();
        assert_eq!(channels, vec!["rust", "rust", "rust", "golang", "golang", "golang"]);
        let ids: Vec<&str> = posts.iter().take(3).map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["rust-0", "rust-1", "rust-2"]);
    }

    #[tokio::test]
    async fn test_all_channels_failing_yields_empty_list() {
        let mut source = MockListingSource::new();
        source
            .expect_hot_posts()
            .times(2)
            .returning(|_, _| Err(FeederError::ListingParse("bad body".to_string())));

        let service = FetchService::new(source);
        let posts = service.fetch_posts(&["a", "b"], 10).await.unwrap();

        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_channels_requested_in_order() {
        let mut seq = Sequence::new();
        let mut source = MockListingSource::new();
        for channel in ["zig", "ada", "rust"] {
            source
                .expect_hot_posts()
                .with(eq(channel), eq(2))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|channel, _| Ok(posts_for(channel, 1)));
        }

        let service = FetchService::new(source);
        let posts = service.fetch_posts(&["zig", "ada", "rust"], 2).await.unwrap();

        let channels: Vec<&str> = posts.iter().map(|p| p.subreddit.as_str()).collect();
        assert_eq!(channels, vec!["zig", "ada", "rust"]);
    }

    #[tokio::test]
    async fn test_result_bounded_by_channels_times_limit() {
        let mut source = MockListingSource::new();
        source
            .expect_hot_posts()
            .returning(|channel, _| Ok(posts_for(channel, 50)));

        let service = FetchService::new(source);
        let posts = service.fetch_posts(&["a", "b", "c"], 4).await.unwrap();

        assert!(posts.len() <= 3 * 4);
    }

    #[tokio::test]
    async fn test_empty_channel_list_makes_no_requests() {
        let mut source = MockListingSource::new();
        source.expect_hot_posts().never();

        let service = FetchService::new(source);
        let empty: [&str; 0] = [];
        let posts = service.fetch_posts(&empty, 25).await.unwrap();

        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let mut source = MockListingSource::new();
        source.expect_hot_posts().never();

        let service = FetchService::new(source);
        let result = service.fetch_posts(&["rust"], 0).await;

        assert!(matches!(result, Err(FeederError::InvalidInput(_))));
    }
}

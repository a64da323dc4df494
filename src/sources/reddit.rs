use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::domain::Post;
use crate::errors::{FeederError, FeederResult};
use crate::sources::traits::ListingSource;

pub const CLIENT_USER_AGENT: &str = "AI-News-Aggregator/1.0";
const PERMALINK_HOST: &str = "https://reddit.com";

#[derive(Debug, Deserialize)]
struct ListingEnvelope {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    data: RawPost,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPost {
    id: String,
    title: String,
    url: String,
    score: i64,
    author: String,
    created_utc: f64,
    num_comments: u64,
    subreddit: String,
    permalink: String,
    selftext: Option<String>,
    link_flair_text: Option<String>,
    link_flair_css_class: Option<String>,
    link_flair_background_color: Option<String>,
    link_flair_text_color: Option<String>,
    author_flair_text: Option<String>,
}

impl From<RawPost> for Post {
    fn from(raw: RawPost) -> Self {
        Post {
            id: raw.id,
            title: raw.title,
            url: raw.url,
            score: raw.score,
            author: raw.author,
            created_utc: raw.created_utc,
            num_comments: raw.num_comments,
            subreddit: raw.subreddit,
            permalink: format!("{}{}", PERMALINK_HOST, raw.permalink),
            selftext: raw.selftext,
            link_flair_text: raw.link_flair_text,
            link_flair_css_class: raw.link_flair_css_class,
            link_flair_background_color: raw.link_flair_background_color,
            link_flair_text_color: raw.link_flair_text_color,
            author_flair_text: raw.author_flair_text,
        }
    }
}

pub struct RedditSource {
    client: Client,
    base_url: Url,
}

impl RedditSource {
    pub fn new(base_url: &str, timeout: Duration) -> FeederResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| FeederError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(FeederError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    /// Build `{base}/r/{channel}/hot.json?limit={n}`
    fn hot_url(&self, channel: &str, limit: u32) -> FeederResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FeederError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["r", channel.trim_start_matches("r/"), "hot.json"]);
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }

    /// Decode a listing body into posts, preserving listing order
    fn parse_listing(body: &[u8]) -> FeederResult<Vec<Post>> {
        let envelope: ListingEnvelope = serde_json::from_slice(body)
            .map_err(|e| FeederError::ListingParse(e.to_string()))?;

        Ok(envelope
            .data
            .children
            .into_iter()
            .map(|thing| Post::from(thing.data))
            .collect())
    }
}

#[async_trait]
impl ListingSource for RedditSource {
    async fn hot_posts(&self, channel: &str, limit: u32) -> FeederResult<Vec<Post>> {
        let url = self.hot_url(channel, limit)?;
        tracing::debug!(%url, "requesting hot listing");

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        Self::parse_listing(&bytes)
    }
}

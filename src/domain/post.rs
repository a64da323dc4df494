use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub url: String,
    pub score: i64,
    pub author: String,
    /// Creation time in epoch seconds, as delivered by the API.
    pub created_utc: f64,
    pub num_comments: u64,
    pub subreddit: String,
    pub permalink: String,
    pub selftext: Option<String>,
    pub link_flair_text: Option<String>,
    pub link_flair_css_class: Option<String>,
    pub link_flair_background_color: Option<String>,
    pub link_flair_text_color: Option<String>,
    pub author_flair_text: Option<String>,
}

impl Post {
    pub fn new(id: String, title: String, subreddit: String) -> Self {
        Self {
            id,
            title,
            url: String::new(),
            score: 0,
            author: String::new(),
            created_utc: 0.0,
            num_comments: 0,
            subreddit,
            permalink: String::new(),
            selftext: None,
            link_flair_text: None,
            link_flair_css_class: None,
            link_flair_background_color: None,
            link_flair_text_color: None,
            author_flair_text: None,
        }
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = score;
        self
    }

    pub fn with_author(mut self, author: String) -> Self {
        self.author = author;
        self
    }

    pub fn with_created_utc(mut self, created_utc: f64) -> Self {
        self.created_utc = created_utc;
        self
    }

    pub fn with_num_comments(mut self, num_comments: u64) -> Self {
        self.num_comments = num_comments;
        self
    }

    pub fn with_permalink(mut self, permalink: String) -> Self {
        self.permalink = permalink;
        self
    }

    /// Relative age in whole days, else whole hours, else "now".
    pub fn time_ago(&self, now: DateTime<Utc>) -> String {
        // Float to int casts saturate; the subtraction must too
        let diff = now.timestamp().saturating_sub(self.created_utc.floor() as i64);
        let hours = diff / 3600;
        let days = hours / 24;

        if days > 0 {
            format!("{}d", days)
        } else if hours > 0 {
            format!("{}h", hours)
        } else {
            "now".to_string()
        }
    }

    /// "YYYY-MM-DD HH:MM" in UTC
    pub fn timestamp_label(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.created_utc.floor() as i64, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    }
}

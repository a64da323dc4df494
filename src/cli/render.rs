use chrono::{DateTime, Utc};

use crate::domain::Post;

/// Plain-text card: title, a metadata line, then the permalink.
pub fn format_card(index: usize, post: &Post, now: DateTime<Utc>) -> String {
    format!(
        "{:>3}. {}\n     [+{}] ({}) {} [{}] @{} r/{}\n     {}",
        index + 1,
        post.title,
        post.score,
        post.num_comments,
        post.time_ago(now),
        post.timestamp_label(),
        post.author,
        post.subreddit,
        post.permalink
    )
}

pub fn format_channels(channels: &[String]) -> String {
    if channels.is_empty() {
        "(none)".to_string()
    } else {
        channels
            .iter()
            .map(|c| format!("r/{}", c))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

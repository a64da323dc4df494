use serde::{Deserialize, Serialize};

pub const MAX_CHANNELS: usize = 4;

/// Which of the two independent channel selections is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelInstance {
    #[default]
    Primary,
    Secondary,
}

impl ChannelInstance {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelInstance::Primary => "primary",
            ChannelInstance::Secondary => "secondary",
        }
    }

    /// Preference store key holding this instance's JSON array
    pub fn storage_key(&self) -> &'static str {
        match self {
            ChannelInstance::Primary => "selected-subreddits",
            ChannelInstance::Secondary => "selected-subreddits-2",
        }
    }

    pub fn default_channels(&self) -> Vec<String> {
        let defaults: &[&str] = match self {
            ChannelInstance::Primary => &["LocalLLaMA", "OpenAI", "ChatGPT", "singularity"],
            ChannelInstance::Secondary => {
                &["programming", "MachineLearning", "artificial", "singularity"]
            }
        };
        defaults.iter().map(|s| s.to_string()).collect()
    }
}

impl std::str::FromStr for ChannelInstance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primary" | "1" => Ok(ChannelInstance::Primary),
            "secondary" | "2" => Ok(ChannelInstance::Secondary),
            _ => Err(format!("Unknown channel instance: {}", s)),
        }
    }
}

impl std::fmt::Display for ChannelInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trim entries, drop empties and repeats, keep the first four.
pub fn sanitize_channels<S: AsRef<str>>(candidate: &[S]) -> Vec<String> {
    let mut channels: Vec<String> = Vec::with_capacity(MAX_CHANNELS);

    for entry in candidate {
        let trimmed = entry.as_ref().trim();
        if trimmed.is_empty() || channels.iter().any(|c| c == trimmed) {
            continue;
        }
        channels.push(trimmed.to_string());
        if channels.len() == MAX_CHANNELS {
            break;
        }
    }

    channels
}

/// Order-independent key for a channel list: sorted and comma-joined.
pub fn cache_key<S: AsRef<str>>(channels: &[S]) -> String {
    let mut sorted: Vec<&str> = channels.iter().map(|c| c.as_ref()).collect();
    sorted.sort_unstable();
    sorted.join(",")
}

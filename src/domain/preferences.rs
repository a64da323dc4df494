use serde::{Deserialize, Serialize};

pub const PREFERENCES_KEY: &str = "filter-preferences";
pub const DEFAULT_REDDIT_LIMIT: u32 = 25;
/// Largest page the listing endpoint serves
pub const MAX_REDDIT_LIMIT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub reddit_limit: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            reddit_limit: DEFAULT_REDDIT_LIMIT,
        }
    }
}

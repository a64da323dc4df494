use crate::domain::preferences::{MAX_REDDIT_LIMIT, PREFERENCES_KEY};
use crate::domain::Preferences;
use crate::errors::{FeederError, FeederResult};
use crate::storage::traits::PreferenceStore;

pub struct PreferenceService<S: PreferenceStore> {
    store: S,
}

impl<S: PreferenceStore> PreferenceService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stored preferences, or the defaults when missing, unreadable or out of range
    pub fn load(&self) -> FeederResult<Preferences> {
        let Some(stored) = self.store.get(PREFERENCES_KEY)? else {
            return Ok(Preferences::default());
        };

        match serde_json::from_str::<Preferences>(&stored) {
            Ok(prefs) if !(1..=MAX_REDDIT_LIMIT).contains(&prefs.reddit_limit) => {
                tracing::warn!(
                    limit = prefs.reddit_limit,
                    "stored limit out of range, using defaults"
                );
                Ok(Preferences::default())
            }
            Ok(prefs) => Ok(prefs),
            Err(e) => {
                tracing::warn!(error = %e, "stored preferences unreadable, using defaults");
                Ok(Preferences::default())
            }
        }
    }

    pub fn save(&self, prefs: &Preferences) -> FeederResult<()> {
        let encoded = serde_json::to_string(prefs)?;
        self.store.set(PREFERENCES_KEY, &encoded)
    }

    pub fn set_reddit_limit(&self, limit: u32) -> FeederResult<Preferences> {
        if limit == 0 || limit > MAX_REDDIT_LIMIT {
            return Err(FeederError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_REDDIT_LIMIT
            )));
        }

        let mut prefs = self.load()?;
        prefs.reddit_limit = limit;
        self.save(&prefs)?;

        Ok(prefs)
    }
}

use tokio::sync::watch;

use crate::domain::{sanitize_channels, ChannelInstance};
use crate::errors::FeederResult;
use crate::storage::traits::PreferenceStore;

/// The active channel list of one dashboard instance, kept in sync with
/// the preference store.
pub struct SelectionService<S: PreferenceStore> {
    store: S,
    instance: ChannelInstance,
    state: watch::Sender<Vec<String>>,
}

impl<S: PreferenceStore> SelectionService<S> {
    /// Reads the stored selection once.
    ///
    /// Nothing stored, or anything that is not a JSON array of strings,
    /// yields the instance defaults. A stored array is used as is, even
    /// when empty.
    pub fn new(store: S, instance: ChannelInstance) -> FeederResult<Self> {
        let initial = Self::load(&store, instance)?;
        let (state, _) = watch::channel(initial);

        Ok(Self {
            store,
            instance,
            state,
        })
    }

    fn load(store: &S, instance: ChannelInstance) -> FeederResult<Vec<String>> {
        let key = instance.storage_key();

        let stored = match store.get(key)? {
            Some(stored) => stored,
            None => {
                tracing::debug!(key, "no stored channels, using defaults");
                return Ok(instance.default_channels());
            }
        };

        match serde_json::from_str::<Vec<String>>(&stored) {
            Ok(channels) => {
                tracing::debug!(key, ?channels, "loaded stored channels");
                Ok(channels)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "stored channels unreadable, using defaults");
                Ok(instance.default_channels())
            }
        }
    }

    pub fn channels(&self) -> Vec<String> {
        self.state.borrow().clone()
    }

    /// Receives every accepted update
    pub fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.state.subscribe()
    }

    /// Sanitize `candidate`, persist it, then make it current.
    ///
    /// An empty result is kept: clearing the list never brings the
    /// defaults back.
    pub fn update_channels<C: AsRef<str>>(&self, candidate: &[C]) -> FeederResult<()> {
        let channels = sanitize_channels(candidate);
        let encoded = serde_json::to_string(&channels)?;

        self.store.set(self.instance.storage_key(), &encoded)?;
        tracing::info!(instance = %self.instance, ?channels, "channels updated");
        self.state.send_replace(channels);

        Ok(())
    }

    /// Forget the stored selection and return to the defaults
    pub fn reset(&self) -> FeederResult<()> {
        self.store.remove(self.instance.storage_key())?;
        self.state.send_replace(self.instance.default_channels());
        Ok(())
    }
}

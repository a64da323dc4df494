use crate::errors::FeederResult;

/// Durable string key-value store, local to this machine.
/// Callers own encoding and defaulting.
#[cfg_attr(test, mockall::automock)]
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> FeederResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> FeederResult<()>;
    fn remove(&self, key: &str) -> FeederResult<()>;
}

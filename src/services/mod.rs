pub mod fetch_service;
pub mod feed_cache;
pub mod poller;
pub mod preference_service;
pub mod selection_service;

pub use fetch_service::FetchService;
pub use feed_cache::{CacheRead, FeedCache, SharedPosts};
pub use poller::{FeedPoller, FeedSnapshot, PollerHandle};
pub use preference_service::PreferenceService;
pub use selection_service::SelectionService;

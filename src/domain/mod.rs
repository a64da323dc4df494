pub mod post;
pub mod channel;
pub mod preferences;

pub use post::Post;
pub use channel::{cache_key, sanitize_channels, ChannelInstance, MAX_CHANNELS};
pub use preferences::Preferences;

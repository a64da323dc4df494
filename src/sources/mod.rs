pub mod traits;
pub mod reddit;

pub use traits::ListingSource;
pub use reddit::{RedditSource, CLIENT_USER_AGENT};

pub mod traits;
pub mod sqlite;

pub use traits::PreferenceStore;
pub use sqlite::{SqlitePreferenceStore, SqliteStorage};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeederError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid environment variable {name}: {value}")]
    InvalidEnvVar { name: String, value: String },

    // Network errors
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fetching posts failed: {0}")]
    Fetch(String),

    // Parsing errors
    #[error("Listing parsing failed: {0}")]
    ListingParse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Storage errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // User input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type FeederResult<T> = Result<T, FeederError>;

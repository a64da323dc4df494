use std::str::FromStr;
use std::time::Duration;

use crate::errors::{FeederError, FeederResult};

pub const DEFAULT_API_BASE: &str = "https://www.reddit.com";
pub const DEFAULT_REFETCH_SECS: u64 = 5 * 60;
pub const DEFAULT_STALE_SECS: u64 = 2 * 60;
pub const DEFAULT_CACHE_CAPACITY: usize = 16;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub api_base: String,
    pub refetch_interval: Duration,
    pub stale_after: Duration,
    pub cache_capacity: usize,
    pub http_timeout: Duration,
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn from_env() -> FeederResult<Self> {
        let exe_dir = Self::exe_dir();

        // Try to load .env from executable's directory first
        if let Some(ref dir) = exe_dir {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        // Default db_path is relative to executable directory
        let db_path = std::env::var("SUBFEED_DB_PATH").unwrap_or_else(|_| {
            exe_dir
                .map(|d| d.join("subfeed.db").to_string_lossy().into_owned())
                .unwrap_or_else(|| "./subfeed.db".to_string())
        });

        let api_base =
            std::env::var("SUBFEED_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        let refetch_secs = parse_var("SUBFEED_REFETCH_SECS", DEFAULT_REFETCH_SECS)?;
        let stale_secs = parse_var("SUBFEED_STALE_SECS", DEFAULT_STALE_SECS)?;
        let cache_capacity = parse_var("SUBFEED_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?;
        let timeout_secs = parse_var("SUBFEED_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;

        if refetch_secs == 0 {
            return Err(FeederError::Config(
                "SUBFEED_REFETCH_SECS must be greater than zero".to_string(),
            ));
        }
        if cache_capacity == 0 {
            return Err(FeederError::Config(
                "SUBFEED_CACHE_CAPACITY must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            db_path,
            api_base,
            refetch_interval: Duration::from_secs(refetch_secs),
            stale_after: Duration::from_secs(stale_secs),
            cache_capacity,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "./subfeed.db".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            refetch_interval: Duration::from_secs(DEFAULT_REFETCH_SECS),
            stale_after: Duration::from_secs(DEFAULT_STALE_SECS),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> FeederResult<T> {
    match std::env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| FeederError::InvalidEnvVar {
            name: name.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

use crate::llm_client::DEFAULT_MODEL;
use crate::store::StoreConfig;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: String,
    pub groq_model: String,
    pub data_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub port: u16,
    pub rust_log: String,
    pub cache_capacity: u64,
    pub fs_timeout: Duration,
    pub prediction_interval: Duration,
    pub cleanup_interval: Duration,
    /// Periodic backups are off when unset.
    pub backup_interval: Option<Duration>,
    /// When set, every `/api/v1` route requires `Authorization: Bearer <token>`.
    pub admin_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            groq_api_key: require_env("GROQ_API_KEY")?,
            groq_model: env_or("GROQ_MODEL", DEFAULT_MODEL),
            data_dir: PathBuf::from(env_or("DATA_DIR", "./data/db")),
            backup_dir: PathBuf::from(env_or("BACKUP_DIR", "./data/backups")),
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
            cache_capacity: parse_env("CACHE_CAPACITY", 10_000)?,
            fs_timeout: Duration::from_millis(parse_env("FS_TIMEOUT_MS", 5_000)?),
            prediction_interval: parse_interval("PREDICTION_INTERVAL_SECS", 60)?,
            cleanup_interval: parse_interval("CLEANUP_INTERVAL_SECS", 3_600)?,
            backup_interval: match optional_env("BACKUP_INTERVAL_SECS") {
                Some(_) => Some(parse_interval("BACKUP_INTERVAL_SECS", 0)?),
                None => None,
            },
            admin_token: optional_env("ADMIN_TOKEN"),
        })
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            data_dir: self.data_dir.clone(),
            backup_dir: self.backup_dir.clone(),
            cache_capacity: self.cache_capacity,
            fs_timeout: self.fs_timeout,
            ..StoreConfig::default()
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unset and empty are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

/// Timer periods in whole seconds. Zero is rejected since a timer cannot
/// tick with a zero period.
fn parse_interval(key: &str, default_secs: u64) -> Result<Duration> {
    let secs: u64 = parse_env(key, default_secs)?;
    ensure!(secs > 0, "{key} must be at least 1 second");
    Ok(Duration::from_secs(secs))
}

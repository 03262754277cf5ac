//! Environment-driven configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_POLL_INTERVAL_MS: u64 = 600_000;
const DEFAULT_DB_PATH: &str = "data/data.db";
const DEFAULT_LOGS_PATH: &str = "logs";
const DEFAULT_LISTING_BASE_URL: &str = "https://www.bazaraki.com";
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;
const DEFAULT_REQUESTS_PER_SECOND: u32 = 5;

#[derive(Clone, Debug)]
pub struct Config {
    /// Period between two polling cycles.
    pub poll_interval: Duration,
    pub db_url: String,
    pub db_path: String,
    pub logs_path: PathBuf,
    pub listing_base_url: String,
    /// Upper bound of in-flight page fetches and subscription checks.
    pub max_concurrent_requests: usize,
    pub requests_per_second: u32,
    pub bot_token: String,
    pub telegram_api_url: String,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn new() -> Result<Self, AppError> {
        let db_path = env_or("DB_PATH", DEFAULT_DB_PATH);
        let db_url = std::env::var("DB_URL").unwrap_or_else(|_| format!("sqlite://{db_path}"));

        Ok(Self {
            poll_interval: Duration::from_millis(parse_env_or(
                "POLL_INTERVAL",
                DEFAULT_POLL_INTERVAL_MS,
            )),
            db_url,
            db_path,
            logs_path: PathBuf::from(env_or("LOGS_PATH", DEFAULT_LOGS_PATH)),
            listing_base_url: env_or("LISTING_BASE_URL", DEFAULT_LISTING_BASE_URL),
            max_concurrent_requests: parse_env_or(
                "MAX_CONCURRENT_REQUESTS",
                DEFAULT_MAX_CONCURRENT_REQUESTS,
            )
            .max(1),
            requests_per_second: parse_env_or("REQUESTS_PER_SECOND", DEFAULT_REQUESTS_PER_SECOND)
                .max(1),
            bot_token: required_env("BOT_TOKEN")?,
            telegram_api_url: env_or("TELEGRAM_API_URL", DEFAULT_TELEGRAM_API_URL),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn required_env(key: &str) -> Result<String, AppError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::MissingConfig {
            key: key.to_string(),
        }),
    }
}

//! Configuration module
//!
//! Runtime configuration for the API process: listening port, the shared upload
//! directory and metadata document, retention policy and rate limiting.
//! Values come from the environment (a `.env` file is loaded first when present).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::MAX_UPLOAD_BYTES;

const SERVER_PORT: u16 = 3000;
const UPLOAD_DIR: &str = "uploads";
const METADATA_PATH: &str = "data/metadata.json";
const RETENTION_DAYS: u32 = 30;
const CLEANUP_INTERVAL_SECS: u64 = 24 * 60 * 60;
const RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;
const RATE_LIMIT_MAX_REQUESTS: u32 = 25;
const TRUSTED_PROXY_COUNT: usize = 0;
const MAX_BODY_SIZE_MB: usize = 32;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    /// Directory holding stored images, served under `/uploads`.
    pub upload_dir: PathBuf,
    /// JSON document mapping stored filename to upload timestamp.
    pub metadata_path: PathBuf,
    pub retention_days: u32,
    pub cleanup_interval_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_requests: u32,
    /// Number of reverse proxies in front of the service whose X-Forwarded-For entries are trusted.
    pub trusted_proxy_count: usize,
    pub max_body_size_bytes: usize,
    pub environment: String,
    pub log_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            upload_dir: PathBuf::from(UPLOAD_DIR),
            metadata_path: PathBuf::from(METADATA_PATH),
            retention_days: RETENTION_DAYS,
            cleanup_interval_secs: CLEANUP_INTERVAL_SECS,
            rate_limit_window_secs: RATE_LIMIT_WINDOW_SECS,
            rate_limit_max_requests: RATE_LIMIT_MAX_REQUESTS,
            trusted_proxy_count: TRUSTED_PROXY_COUNT,
            max_body_size_bytes: MAX_BODY_SIZE_MB * 1024 * 1024,
            environment: "development".to_string(),
            log_format: "compact".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or(defaults.environment);

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            metadata_path: env::var("METADATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.metadata_path),
            retention_days: parse_or("RETENTION_DAYS", RETENTION_DAYS),
            cleanup_interval_secs: parse_or("CLEANUP_INTERVAL_SECS", CLEANUP_INTERVAL_SECS),
            rate_limit_window_secs: parse_or("RATE_LIMIT_WINDOW_SECS", RATE_LIMIT_WINDOW_SECS),
            rate_limit_max_requests: parse_or("RATE_LIMIT_MAX_REQUESTS", RATE_LIMIT_MAX_REQUESTS),
            trusted_proxy_count: parse_or("TRUSTED_PROXY_COUNT", TRUSTED_PROXY_COUNT),
            max_body_size_bytes: parse_or("MAX_BODY_SIZE_MB", MAX_BODY_SIZE_MB) * 1024 * 1024,
            environment,
            log_format: env::var("LOG_FORMAT")
                .map(|s| s.trim().to_lowercase())
                .unwrap_or(defaults.log_format),
        };

        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }

    /// Fail fast on values that would make the service unusable.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server_port == 0 {
            return Err(anyhow::anyhow!("PORT cannot be 0"));
        }
        if self.retention_days == 0 {
            return Err(anyhow::anyhow!("RETENTION_DAYS must be at least 1"));
        }
        if self.cleanup_interval_secs == 0 {
            return Err(anyhow::anyhow!("CLEANUP_INTERVAL_SECS must be at least 1"));
        }
        if self.rate_limit_window_secs == 0 || self.rate_limit_max_requests == 0 {
            return Err(anyhow::anyhow!(
                "RATE_LIMIT_WINDOW_SECS and RATE_LIMIT_MAX_REQUESTS must be at least 1"
            ));
        }

        // base64 inflates by 4/3; the JSON envelope adds a few bytes on top.
        let min_body = MAX_UPLOAD_BYTES.div_ceil(3) * 4 + 1024;
        if self.max_body_size_bytes < min_body {
            return Err(anyhow::anyhow!(
                "MAX_BODY_SIZE_MB too small: {} bytes cannot carry a {} byte upload",
                self.max_body_size_bytes,
                MAX_UPLOAD_BYTES
            ));
        }

        if self.upload_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("UPLOAD_DIR cannot be empty"));
        }
        if self.metadata_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("METADATA_PATH cannot be empty"));
        }

        Ok(())
    }
}

fn parse_or<T: FromStr + ToString + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .unwrap_or(default)
}

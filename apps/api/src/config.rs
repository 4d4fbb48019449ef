use std::time::Duration;

use anyhow::{Context, Result};

use crate::profile::avatar::DEFAULT_MAX_AVATAR_BYTES;
use crate::profile::sessions::DEFAULT_SESSION_IDLE_TTL;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    /// Base URL avatars are served from; defaults to the S3 endpoint.
    pub s3_public_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub port: u16,
    pub rust_log: String,
    pub max_avatar_bytes: usize,
    /// Editing sessions idle for longer than this are dropped.
    pub session_idle_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let s3_endpoint = require_env("S3_ENDPOINT")?;
        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            database_max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<u32>()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_public_url: std::env::var("S3_PUBLIC_URL").unwrap_or_else(|_| s3_endpoint.clone()),
            s3_endpoint,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_avatar_bytes: match std::env::var("MAX_AVATAR_BYTES") {
                Ok(raw) => raw
                    .parse::<usize>()
                    .context("MAX_AVATAR_BYTES must be a byte count")?,
                Err(_) => DEFAULT_MAX_AVATAR_BYTES,
            },
            session_idle_ttl: match std::env::var("SESSION_IDLE_TTL_SECS") {
                Ok(raw) => Duration::from_secs(
                    raw.parse::<u64>()
                        .context("SESSION_IDLE_TTL_SECS must be a number of seconds")?,
                ),
                Err(_) => DEFAULT_SESSION_IDLE_TTL,
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

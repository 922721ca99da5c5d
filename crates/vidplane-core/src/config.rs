//! Configuration module
//!
//! Environment-driven configuration for the API service: server, database,
//! auth, storage roots, upload constraints, and transcoding knobs.

use std::env;

use anyhow::{anyhow, Context};

const DEFAULT_SERVER_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;
const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;
const DEFAULT_MAX_UPLOAD_SIZE_BYTES: usize = 500 * 1024 * 1024;
const DEFAULT_VIDEO_EXTENSIONS: &str = "mp4,avi,mov,mkv,webm";
const DEFAULT_MAX_CONCURRENT_TRANSCODES: usize = 2;
const DEFAULT_TRANSCODE_TIMEOUT_SECS: u64 = 1800;
const DEFAULT_THUMBNAIL_OFFSET_SECS: f64 = 1.0;
const DEFAULT_HLS_SEGMENT_DURATION: u64 = 6;
const DEFAULT_JOB_QUEUE_SIZE: usize = 1000;

/// Application configuration, loaded once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,

    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,

    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub billing_webhook_secret: String,

    /// Root directory for originals, thumbnails, and HLS output.
    pub storage_root: String,

    pub max_upload_size_bytes: usize,
    pub allowed_video_extensions: Vec<String>,

    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub max_concurrent_transcodes: usize,
    pub transcode_timeout_secs: u64,
    pub thumbnail_offset_secs: f64,
    pub hls_segment_duration: u64,
    pub job_queue_size: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        Ok(Config {
            server_port: env_or("SERVER_PORT", DEFAULT_SERVER_PORT),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            cors_origins: env_list("CORS_ORIGINS", "*"),
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", DEFAULT_DB_TIMEOUT_SECS),
            jwt_secret,
            jwt_expiry_hours: env_or("JWT_EXPIRY_HOURS", DEFAULT_JWT_EXPIRY_HOURS),
            billing_webhook_secret: env::var("BILLING_WEBHOOK_SECRET").unwrap_or_default(),
            storage_root: env::var("STORAGE_ROOT").unwrap_or_else(|_| "./data/media".to_string()),
            max_upload_size_bytes: env_or("MAX_UPLOAD_SIZE_BYTES", DEFAULT_MAX_UPLOAD_SIZE_BYTES),
            allowed_video_extensions: env_list("ALLOWED_VIDEO_EXTENSIONS", DEFAULT_VIDEO_EXTENSIONS),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            max_concurrent_transcodes: env_or(
                "MAX_CONCURRENT_TRANSCODES",
                DEFAULT_MAX_CONCURRENT_TRANSCODES,
            ),
            transcode_timeout_secs: env_or("TRANSCODE_TIMEOUT_SECS", DEFAULT_TRANSCODE_TIMEOUT_SECS),
            thumbnail_offset_secs: env_or("THUMBNAIL_OFFSET_SECS", DEFAULT_THUMBNAIL_OFFSET_SECS),
            hls_segment_duration: env_or("HLS_SEGMENT_DURATION", DEFAULT_HLS_SEGMENT_DURATION),
            job_queue_size: env_or("JOB_QUEUE_SIZE", DEFAULT_JOB_QUEUE_SIZE),
        })
    }

    /// Check if the application is running in production mode.
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.jwt_secret.len() < 32 {
            return Err(anyhow!("JWT_SECRET must be at least 32 characters"));
        }
        if self.is_production() && self.billing_webhook_secret.is_empty() {
            return Err(anyhow!("BILLING_WEBHOOK_SECRET must be set in production"));
        }
        if self.max_upload_size_bytes == 0 {
            return Err(anyhow!("MAX_UPLOAD_SIZE_BYTES must be greater than zero"));
        }
        if self.allowed_video_extensions.is_empty() {
            return Err(anyhow!("ALLOWED_VIDEO_EXTENSIONS must not be empty"));
        }
        if self.max_concurrent_transcodes == 0 {
            return Err(anyhow!("MAX_CONCURRENT_TRANSCODES must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            server_port: 3000,
            environment: "test".to_string(),
            cors_origins: vec!["*".to_string()],
            database_url: "postgres://localhost/vidplane_test".to_string(),
            db_max_connections: 5,
            db_timeout_seconds: 5,
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            jwt_expiry_hours: 24,
            billing_webhook_secret: "whsec_test".to_string(),
            storage_root: "./data/media".to_string(),
            max_upload_size_bytes: DEFAULT_MAX_UPLOAD_SIZE_BYTES,
            allowed_video_extensions: env_list("_UNSET_", DEFAULT_VIDEO_EXTENSIONS),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            max_concurrent_transcodes: 2,
            transcode_timeout_secs: 1800,
            thumbnail_offset_secs: 1.0,
            hls_segment_duration: 6,
            job_queue_size: 1000,
        }
    }

    #[test]
    fn test_default_extension_allowlist() {
        let config = test_config();
        assert_eq!(
            config.allowed_video_extensions,
            vec!["mp4", "avi", "mov", "mkv", "webm"]
        );
    }

    #[test]
    fn test_validate_rejects_short_jwt_secret() {
        let mut config = test_config();
        config.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let config = test_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_is_production() {
        let mut config = test_config();
        assert!(!config.is_production());
        config.environment = "Production".to_string();
        assert!(config.is_production());
    }

    #[test]
    fn test_env_list_trims_and_lowercases() {
        let parsed = env_list("_UNSET_VAR_", "MP4, Mov ,webm,");
        assert_eq!(parsed, vec!["mp4", "mov", "webm"]);
    }
}

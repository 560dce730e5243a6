//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

use rclip_storage::{
    StorageLayout, DEFAULT_OUTPUT_DIR, DEFAULT_RETENTION_THRESHOLD, DEFAULT_SWEEP_INTERVAL,
    DEFAULT_UPLOADS_DIR,
};
use rclip_worker::WorkerConfig;

/// Default directory of front-end assets.
pub const DEFAULT_STATIC_DIR: &str = "public";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second, per client IP
    pub rate_limit_rps: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Root of per-session clip directories
    pub output_dir: PathBuf,
    /// Root of standalone uploads
    pub uploads_dir: PathBuf,
    /// Front-end assets served as the fallback route
    pub static_dir: PathBuf,
    /// Expose Prometheus metrics at /metrics
    pub metrics_enabled: bool,
    /// Interval between retention sweeps
    pub sweep_interval: Duration,
    /// Age after which sessions and uploads are removed
    pub retention_threshold: Duration,
    /// Segmentation settings
    pub worker: WorkerConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            max_body_size: 1024 * 1024, // 1MB
            environment: "development".to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            uploads_dir: PathBuf::from(DEFAULT_UPLOADS_DIR),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            metrics_enabled: true,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            retention_threshold: DEFAULT_RETENTION_THRESHOLD,
            worker: WorkerConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_rps),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            uploads_dir: std::env::var("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.uploads_dir),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
            sweep_interval: secs_from_env("SWEEP_INTERVAL_SECS").unwrap_or(defaults.sweep_interval),
            retention_threshold: secs_from_env("RETENTION_SECS")
                .unwrap_or(defaults.retention_threshold),
            worker: WorkerConfig::from_env(),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Filesystem layout for sessions and uploads.
    pub fn storage_layout(&self) -> StorageLayout {
        StorageLayout::new(&self.output_dir, &self.uploads_dir)
    }
}

fn secs_from_env(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|secs: &u64| *secs > 0)
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
        assert_eq!(config.retention_threshold, Duration::from_secs(300));
        assert!(!config.is_production());
    }
}

//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where rendered videos are written.
    pub videos_dir: PathBuf,

    /// Default rendering settings.
    pub render: RenderDefaults,

    /// Background job settings.
    pub jobs: JobDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default rendering parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderDefaults {
    /// Default playback rate for generated videos.
    pub fps: u32,

    /// Whether to burn capture timestamps into frames by default.
    pub burn_timestamp: bool,
}

/// Background job registry parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefaults {
    /// Retention window for finished-but-unfinalized jobs, in seconds.
    /// Entries older than this are swept when a new job is submitted.
    pub retention_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "snaplapse=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            videos_dir: dirs_default_videos(),
            render: RenderDefaults::default(),
            jobs: JobDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            fps: 10,
            burn_timestamp: false,
        }
    }
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            retention_secs: 3600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("snaplapse").join("config.json")
}

/// Default videos output directory.
fn dirs_default_videos() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("snaplapse").join("videos")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.render.fps, 10);
        assert!(!config.render.burn_timestamp);
        assert_eq!(config.jobs.retention_secs, 3600);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.videos_dir, config.videos_dir);
        assert_eq!(parsed.jobs.retention_secs, config.jobs.retention_secs);
    }
}

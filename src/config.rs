//! Configuration management for the log analyzer

use crate::error::{AnalyzerError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for the analyzer
///
/// Loaded from an optional YAML file; CLI flags override individual fields
/// afterwards. Invalid values are rejected by [`AnalyzerConfig::validate`]
/// at startup, never discovered mid-pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Port the metrics endpoint listens on (default: 9103)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Analysis time window in minutes (default: 15)
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,

    /// Background refresh interval in seconds; 0 collects synchronously on
    /// every scrape (default: 0)
    #[serde(default)]
    pub refresh_interval_secs: u64,

    /// Instance label attached to every per-domain series
    /// (default: the host name)
    #[serde(default = "default_instance")]
    pub instance: String,

    /// Explicit platform kind, bypassing probe output and marker detection
    #[serde(default)]
    pub platform: Option<String>,

    /// Override for the platform's log directory
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Override for the platform's site/vhost directory
    #[serde(default)]
    pub site_path: Option<PathBuf>,
}

fn default_port() -> u16 {
    9103
}

fn default_window_minutes() -> u32 {
    15
}

fn default_instance() -> String {
    hostname()
}

/// Best-effort host name for the `instance` label
fn hostname() -> String {
    fs::read_to_string("/proc/sys/kernel/hostname")
        .or_else(|_| fs::read_to_string("/etc/hostname"))
        .map(|name| name.trim().to_string())
        .ok()
        .filter(|name| !name.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            port: default_port(),
            window_minutes: default_window_minutes(),
            refresh_interval_secs: 0,
            instance: default_instance(),
            platform: None,
            log_path: None,
            site_path: None,
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from a YAML file
    ///
    /// # Returns
    /// * `Ok(AnalyzerConfig)` if loading and validation succeed
    /// * `Err(AnalyzerError::ConfigError)` if the file cannot be read or
    ///   the config is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            AnalyzerError::ConfigError(format!("Failed to read config file: {e}"))
        })?;

        let config: AnalyzerConfig = serde_yaml::from_str(&content).map_err(|e| {
            AnalyzerError::ConfigError(format!("Failed to parse config file: {e}"))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - `window_minutes` must be > 0 (the per-minute rates divide by it)
    /// - `port` must be non-zero
    /// - `platform`, when set, must name a recognized kind
    pub fn validate(&self) -> Result<()> {
        if self.window_minutes == 0 {
            return Err(AnalyzerError::ConfigError(
                "window_minutes must be greater than 0".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(AnalyzerError::ConfigError(
                "port must be greater than 0".to_string(),
            ));
        }
        if let Some(platform) = &self.platform {
            platform.parse::<crate::platform::PlatformKind>()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.port, 9103);
        assert_eq!(config.window_minutes, 15);
        assert_eq!(config.refresh_interval_secs, 0);
        assert!(config.platform.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_window() {
        let config = AnalyzerConfig {
            window_minutes: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalyzerError::ConfigError(_))
        ));
    }

    #[test]
    fn test_validate_zero_port() {
        let config = AnalyzerConfig {
            port: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_platform() {
        let config = AnalyzerConfig {
            platform: Some("solaris".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyzer.yaml");
        fs::write(
            &path,
            "port: 9200\nwindow_minutes: 30\nplatform: gridpane\nlog_path: /srv/logs\n",
        )
        .unwrap();

        let config = AnalyzerConfig::from_file(&path).unwrap();
        assert_eq!(config.port, 9200);
        assert_eq!(config.window_minutes, 30);
        assert_eq!(config.platform.as_deref(), Some("gridpane"));
        assert_eq!(config.log_path.as_deref(), Some(Path::new("/srv/logs")));
        // unspecified fields keep their defaults
        assert_eq!(config.refresh_interval_secs, 0);
    }

    #[test]
    fn test_from_file_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyzer.yaml");
        fs::write(&path, "window_minutes: 0\n").unwrap();
        assert!(AnalyzerConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_from_file_missing() {
        assert!(AnalyzerConfig::from_file("/nonexistent/analyzer.yaml").is_err());
    }
}

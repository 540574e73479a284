//! Configuration module for HDrive.

use serde::Deserialize;
use std::path::Path;

use crate::{DriveError, Result};

/// Drive configuration: where files live and how URLs to them are built.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    /// Physical root directory of the drive.
    #[serde(default = "default_drive_root")]
    pub root: String,
    /// Base URL prefix used for download and share URLs.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// URL segment under which drive files are served for download.
    #[serde(default = "default_download_prefix")]
    pub download_prefix: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_drive_root() -> String {
    "data/drive".to_string()
}

fn default_base_url() -> String {
    "/hdrive/".to_string()
}

fn default_download_prefix() -> String {
    "assets/drive".to_string()
}

fn default_max_upload_size() -> u64 {
    50
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            root: default_drive_root(),
            base_url: default_base_url(),
            download_prefix: default_download_prefix(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

impl DriveConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_size_mb as usize).saturating_mul(1024 * 1024)
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/hdrive.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for the Web API.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins. Empty means any origin without credentials.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    8080
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. No file logging when unset.
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> Option<String> {
    Some("logs/hdrive.log".to_string())
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// First path segments owned by the HTTP layer itself.
const RESERVED_PREFIXES: &[&str] = &["api", "shared", "health"];

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Drive configuration.
    #[serde(default)]
    pub drive: DriveConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(DriveError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DriveError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `HDRIVE_DRIVE_ROOT`: physical drive root
    /// - `HDRIVE_BASE_URL`: base URL prefix
    /// - `HDRIVE_DATABASE_PATH`: SQLite database file
    pub fn apply_env_overrides(&mut self) {
        let overrides: [(&str, &mut String); 3] = [
            ("HDRIVE_DRIVE_ROOT", &mut self.drive.root),
            ("HDRIVE_BASE_URL", &mut self.drive.base_url),
            ("HDRIVE_DATABASE_PATH", &mut self.database.path),
        ];

        for (var, target) in overrides {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    *target = value;
                }
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - the drive root is empty
    /// - the download prefix is empty or collides with another route
    /// - the upload limit is zero
    pub fn validate(&self) -> Result<()> {
        if self.drive.root.trim().is_empty() {
            return Err(DriveError::Config("drive.root must not be empty".to_string()));
        }
        let prefix = self.drive.download_prefix.trim_matches('/');
        let first_segment = prefix.split('/').next().unwrap_or_default();
        if prefix.is_empty()
            || RESERVED_PREFIXES.contains(&first_segment)
            || prefix.contains(['*', ':'])
        {
            return Err(DriveError::Config(format!(
                "drive.download_prefix '{}' is not usable",
                self.drive.download_prefix
            )));
        }
        if self.drive.max_upload_size_mb == 0 {
            return Err(DriveError::Config(
                "drive.max_upload_size_mb must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.drive.root, "data/drive");
        assert_eq!(config.drive.base_url, "/hdrive/");
        assert_eq!(config.drive.download_prefix, "assets/drive");
        assert_eq!(config.drive.max_upload_size_mb, 50);

        assert_eq!(config.database.path, "data/hdrive.db");

        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.web.port, 8080);
        assert!(config.web.cors_origins.is_empty());

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file.as_deref(), Some("logs/hdrive.log"));
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[drive]
root = "/srv/drive"
base_url = "https://files.example.com/"
download_prefix = "dl"
max_upload_size_mb = 200

[database]
path = "/var/lib/hdrive/index.db"

[web]
host = "127.0.0.1"
port = 3000
cors_origins = ["http://localhost:5173"]

[logging]
level = "debug"
file = "custom/logs/app.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.drive.root, "/srv/drive");
        assert_eq!(config.drive.base_url, "https://files.example.com/");
        assert_eq!(config.drive.download_prefix, "dl");
        assert_eq!(config.drive.max_upload_size_mb, 200);
        assert_eq!(config.drive.max_upload_bytes(), 200 * 1024 * 1024);

        assert_eq!(config.database.path, "/var/lib/hdrive/index.db");

        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.web.port, 3000);
        assert_eq!(config.web.cors_origins, vec!["http://localhost:5173"]);

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file.as_deref(), Some("custom/logs/app.log"));
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[drive]
root = "/tmp/drive"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.drive.root, "/tmp/drive");
        assert_eq!(config.drive.base_url, "/hdrive/");
        assert_eq!(config.database.path, "data/hdrive.db");
        assert_eq!(config.web.port, 8080);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.drive.root, "data/drive");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        match result {
            Err(DriveError::Config(msg)) => assert!(msg.contains("config parse error")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(DriveError::Io(_))));
    }

    #[test]
    fn test_apply_env_overrides() {
        let original = std::env::var("HDRIVE_BASE_URL").ok();

        std::env::set_var("HDRIVE_BASE_URL", "https://env.example.com/");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.drive.base_url, "https://env.example.com/");

        std::env::set_var("HDRIVE_BASE_URL", "");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.drive.base_url, "/hdrive/");

        if let Some(val) = original {
            std::env::set_var("HDRIVE_BASE_URL", val);
        } else {
            std::env::remove_var("HDRIVE_BASE_URL");
        }
    }

    #[test]
    fn test_validate_rejects_empty_root() {
        let mut config = Config::default();
        config.drive.root = "  ".to_string();

        match config.validate() {
            Err(DriveError::Config(msg)) => assert!(msg.contains("drive.root")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_unusable_download_prefix() {
        for prefix in ["", "/", "api", "/shared/", "api/files", "files/*rest"] {
            let mut config = Config::default();
            config.drive.download_prefix = prefix.to_string();
            assert!(config.validate().is_err(), "{prefix:?}");
        }
    }

    #[test]
    fn test_validate_rejects_zero_upload_limit() {
        let mut config = Config::default();
        config.drive.max_upload_size_mb = 0;
        assert!(config.validate().is_err());
    }
}

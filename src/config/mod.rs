//! Configuration management for casescope

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Where case data is read from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Paginated IRIS REST API
    #[default]
    Api,
    /// Direct reads from the case database
    Db,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the case management API
    #[serde(default = "default_iris_url")]
    pub iris_url: String,

    /// Service API key used for upstream requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Verify the upstream TLS certificate
    #[serde(default)]
    pub verify_ssl: bool,

    /// Case data backend
    #[serde(default)]
    pub data_source: DataSource,

    /// SQLite file holding the case tables (db source only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_db: Option<PathBuf>,

    /// SQLite file holding the telemetry table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telemetry_db: Option<PathBuf>,

    /// Seconds a cached entity stays valid
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Upstream request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Upstream requests allowed per second
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: u32,
}

fn default_iris_url() -> String {
    "https://localhost:4443".to_string()
}

fn default_cache_ttl() -> u64 {
    crate::cache::DEFAULT_TTL.as_secs()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_rate_limit() -> u32 {
    6
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iris_url: default_iris_url(),
            api_key: None,
            verify_ssl: false,
            data_source: DataSource::default(),
            case_db: None,
            telemetry_db: None,
            cache_ttl_secs: default_cache_ttl(),
            request_timeout_secs: default_request_timeout(),
            rate_limit_per_second: default_rate_limit(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".casescope").join("config.yaml"))
    }

    /// Load configuration from an explicit path, or the default location.
    ///
    /// A missing default file yields the built-in defaults; a missing explicit
    /// file is an error.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from(Path::new(p)),
            None => {
                let default = Self::default_path()?;
                if default.exists() {
                    Self::load_from(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.normalize();
        config.validate()?;

        Ok(config)
    }

    /// Trim values that are tolerated in the file but not used verbatim
    pub fn normalize(&mut self) {
        while self.iris_url.ends_with('/') {
            self.iris_url.pop();
        }
        if self.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            self.api_key = None;
        }
    }

    /// Reject values that can never work
    pub fn validate(&self) -> Result<()> {
        if self.iris_url.is_empty() {
            return Err(ConfigError::Invalid("iris_url must not be empty".to_string()).into());
        }
        if self.rate_limit_per_second == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit_per_second must be at least 1".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Entity cache time-to-live
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Upstream request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The configured API key, required for the REST source
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingApiKey.into())
    }

    /// The telemetry database path, required for browsing and correlation
    pub fn require_telemetry_db(&self) -> Result<&Path> {
        self.telemetry_db
            .as_deref()
            .ok_or_else(|| ConfigError::MissingDatabase("telemetry").into())
    }

    /// The case database path, required for the db source
    pub fn require_case_db(&self) -> Result<&Path> {
        self.case_db
            .as_deref()
            .ok_or_else(|| ConfigError::MissingDatabase("case").into())
    }
}

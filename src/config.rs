//! Configuration module for the image normalizer.
//!
//! This module handles loading and validating configuration from TOML files.
//! The normalization engine itself takes no configuration; the server maps
//! the `[normalization]` section into [`Constraints`] and [`RepairPolicy`].
//!
//! # Configuration Sources (in order of priority)
//! 1. `config.local.toml` - Local overrides (gitignored)
//! 2. `config.toml` - Main configuration file
//!
//! # Example
//! ```rust,ignore
//! let config = Config::load("config.toml")?;
//! println!("Server will listen on {}:{}", config.server.host, config.server.port);
//! ```

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::jpeg::RepairPolicy;
use crate::models::Constraints;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub normalization: NormalizationConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum request body size in bytes (base64 inflates images by 4/3)
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

fn default_max_request_size() -> usize {
    72 * 1024 * 1024
}

/// Engine defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Maximum decoded image size in megabytes
    pub max_size_mb: f64,
    /// Minimum short side in pixels
    pub min_short_side: u32,
    /// Maximum long side in pixels
    pub max_long_side: u32,
    /// Insert the standard Huffman tables even when the upload has valid ones
    pub always_reinsert_huffman_tables: bool,
    /// Offset into scan data for a synthetic `FF 00` pair
    pub synthetic_stuffing_offset: usize,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        let constraints = Constraints::default();
        let policy = RepairPolicy::default();
        Self {
            max_size_mb: constraints.max_size_mb,
            min_short_side: constraints.min_short_side,
            max_long_side: constraints.max_long_side,
            always_reinsert_huffman_tables: policy.always_reinsert_huffman_tables,
            synthetic_stuffing_offset: policy.synthetic_stuffing_offset,
        }
    }
}

impl NormalizationConfig {
    pub fn constraints(&self) -> Constraints {
        Constraints {
            max_size_mb: self.max_size_mb,
            min_short_side: self.min_short_side,
            max_long_side: self.max_long_side,
        }
    }

    pub fn repair_policy(&self) -> RepairPolicy {
        RepairPolicy {
            always_reinsert_huffman_tables: self.always_reinsert_huffman_tables,
            synthetic_stuffing_offset: self.synthetic_stuffing_offset,
            ..RepairPolicy::default()
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Maximum requests per window
    pub requests_per_window: u32,
    /// Window duration in seconds
    pub window_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Whether API keys are required
    #[serde(default)]
    pub enabled: bool,

    /// Accepted API keys
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Path prefixes that require a key (empty = everything but public paths)
    #[serde(default)]
    pub protected_paths: Vec<String>,

    /// Path prefixes that never require a key
    #[serde(default)]
    pub public_paths: Vec<String>,
}

impl Config {
    /// Load configuration from a file path
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed or validated
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Tries `config.local.toml` first, then `config.toml`.
    pub fn load_default() -> Result<Self, ConfigError> {
        if Path::new("config.local.toml").exists() {
            return Self::load("config.local.toml");
        }

        if Path::new("config.toml").exists() {
            return Self::load("config.toml");
        }

        Err(ConfigError::ValidationError(
            "No configuration file found. Expected config.toml or config.local.toml".to_string(),
        ))
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        let n = &self.normalization;

        if !(n.max_size_mb.is_finite() && n.max_size_mb > 0.0) {
            return Err(ConfigError::ValidationError(
                "max_size_mb must be a positive number".to_string(),
            ));
        }

        if n.max_long_side == 0 {
            return Err(ConfigError::ValidationError(
                "max_long_side must be greater than 0".to_string(),
            ));
        }

        if n.min_short_side > n.max_long_side {
            return Err(ConfigError::ValidationError(format!(
                "min_short_side ({}) must not exceed max_long_side ({})",
                n.min_short_side, n.max_long_side
            )));
        }

        if self.server.max_request_size < 1024 {
            return Err(ConfigError::ValidationError(
                "max_request_size must be at least 1024 bytes".to_string(),
            ));
        }

        if self.rate_limit.enabled
            && (self.rate_limit.requests_per_window == 0 || self.rate_limit.window_seconds == 0)
        {
            return Err(ConfigError::ValidationError(
                "requests_per_window and window_seconds must be greater than 0".to_string(),
            ));
        }

        if self.auth.enabled && self.auth.api_keys.iter().all(|k| k.is_empty()) {
            return Err(ConfigError::ValidationError(
                "auth is enabled but no api_keys are configured".to_string(),
            ));
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.format must be one of: {:?}",
                valid_formats
            )));
        }

        Ok(())
    }
}

//! Configuration management for fintrack
//!
//! This module handles loading, validation, and management of
//! fintrack configuration from YAML files.

pub mod error;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use error::ConfigError;

// ==================== Configuration Types ====================

/// Backend API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// REST root every endpoint path is joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Session persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// File holding the bearer token between runs
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
        }
    }
}

fn default_token_path() -> PathBuf {
    PathBuf::from(".fintrack/token")
}

/// Pagination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Records requested per list call
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    100
}

/// Analytics window presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateRangePreset {
    /// Last 7 days up to now
    #[serde(rename = "7d")]
    Last7Days,
    /// Last 30 days up to now
    #[serde(rename = "30d")]
    Last30Days,
    /// From the first of the current month
    #[serde(rename = "this-month")]
    ThisMonth,
    /// The whole previous calendar month
    #[serde(rename = "last-month")]
    LastMonth,
    /// From January 1st of the current year
    #[serde(rename = "this-year")]
    ThisYear,
    /// Unbounded
    #[serde(rename = "all")]
    All,
}

impl Default for DateRangePreset {
    fn default() -> Self {
        DateRangePreset::Last30Days
    }
}

impl DateRangePreset {
    /// Every preset in menu order
    pub const ALL: [DateRangePreset; 6] = [
        DateRangePreset::Last7Days,
        DateRangePreset::Last30Days,
        DateRangePreset::ThisMonth,
        DateRangePreset::LastMonth,
        DateRangePreset::ThisYear,
        DateRangePreset::All,
    ];

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            DateRangePreset::Last7Days => "Last 7 Days",
            DateRangePreset::Last30Days => "Last 30 Days",
            DateRangePreset::ThisMonth => "This Month",
            DateRangePreset::LastMonth => "Last Month",
            DateRangePreset::ThisYear => "This Year",
            DateRangePreset::All => "All Time",
        }
    }
}

impl std::str::FromStr for DateRangePreset {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "7d" => Ok(DateRangePreset::Last7Days),
            "30d" => Ok(DateRangePreset::Last30Days),
            "this-month" => Ok(DateRangePreset::ThisMonth),
            "last-month" => Ok(DateRangePreset::LastMonth),
            "this-year" => Ok(DateRangePreset::ThisYear),
            "all" => Ok(DateRangePreset::All),
            _ => Err(format!("Invalid date range: {}", s)),
        }
    }
}

impl std::fmt::Display for DateRangePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateRangePreset::Last7Days => write!(f, "7d"),
            DateRangePreset::Last30Days => write!(f, "30d"),
            DateRangePreset::ThisMonth => write!(f, "this-month"),
            DateRangePreset::LastMonth => write!(f, "last-month"),
            DateRangePreset::ThisYear => write!(f, "this-year"),
            DateRangePreset::All => write!(f, "all"),
        }
    }
}

/// Analytics settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalyticsConfig {
    /// Window used when none is given on the command line
    #[serde(default)]
    pub default_range: DateRangePreset,
}

/// Currency and number formatting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Symbol printed before the amount
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Number of decimal places
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
    /// Thousands separator
    #[serde(default = "default_thousands_sep")]
    pub thousands_separator: String,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            decimal_places: default_decimal_places(),
            thousands_separator: default_thousands_sep(),
        }
    }
}

fn default_symbol() -> String {
    "$".to_string()
}

fn default_decimal_places() -> u32 {
    2
}

fn default_thousands_sep() -> String {
    ",".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Session persistence
    #[serde(default)]
    pub session: SessionConfig,
    /// Pagination settings
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Analytics settings
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    /// Currency settings
    #[serde(default)]
    pub currency: CurrencyConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::IoError {
                path: path.display().to_string(),
                message: e.to_string(),
            },
        })?;

        Self::from_yaml(&content)
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::FileNotFound { path }) => {
                log::warn!("Config file {} not found, using defaults", path);
                Ok(Config::default())
            }
            other => other,
        }
    }

    /// Parse and validate YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|_| ConfigError::InvalidYaml)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                reason: "Base URL must start with http:// or https://".to_string(),
            });
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.timeout_secs".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        // The backend rejects limit > 100
        if self.pagination.page_size == 0 || self.pagination.page_size > 100 {
            return Err(ConfigError::InvalidValue {
                field: "pagination.page_size".to_string(),
                reason: "Page size must be between 1 and 100".to_string(),
            });
        }

        if self.currency.decimal_places > 10 {
            return Err(ConfigError::InvalidValue {
                field: "currency.decimal_places".to_string(),
                reason: "Decimal places must be between 0 and 10".to_string(),
            });
        }

        if self.session.token_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField {
                field: "session.token_path".to_string(),
            });
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }
}

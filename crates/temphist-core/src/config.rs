use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Observation point and upstream settings
    #[serde(default)]
    pub location: LocationConfig,

    /// Archive fetch settings
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Local store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// The fixed geographic point all observations are keyed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone name forwarded to the upstream archive
    pub timezone: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        // Tokyo
        Self {
            latitude: 35.6895,
            longitude: 139.6917,
            timezone: "Asia/Tokyo".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Base URL of the archive API (overridable so tests can point at a mock)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum length of one fetch chunk, in days (upstream limit)
    #[serde(default = "default_chunk_days")]
    pub chunk_days: u32,

    /// Pause between chunk requests, in milliseconds (upstream rate limit)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// How far back the full backfill reaches, in years
    #[serde(default = "default_backfill_years")]
    pub backfill_years: u32,

    /// Where the incremental update starts when the store is empty
    #[serde(default = "default_epoch_start")]
    pub epoch_start: NaiveDate,
}

fn default_base_url() -> String {
    "https://archive-api.open-meteo.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_chunk_days() -> u32 {
    365
}

fn default_delay_ms() -> u64 {
    500
}

fn default_backfill_years() -> u32 {
    10
}

fn default_epoch_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            chunk_days: default_chunk_days(),
            delay_ms: default_delay_ms(),
            backfill_years: default_backfill_years(),
            epoch_start: default_epoch_start(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let db_path = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("temphist")
            .join("temperature.db");
        Self { db_path }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8090 }
    }
}

impl Config {
    /// Load configuration from the default path, creating it with defaults
    /// if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file, creating it with defaults
    /// if it doesn't exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors;
    /// warnings are logged.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !(-90.0..=90.0).contains(&self.location.latitude) {
            result.add_error("location.latitude", "Latitude must be within [-90, 90]");
        }
        if !(-180.0..=180.0).contains(&self.location.longitude) {
            result.add_error("location.longitude", "Longitude must be within [-180, 180]");
        }
        if self.location.timezone.is_empty() {
            result.add_error("location.timezone", "Timezone must not be empty");
        }

        self.validate_url(&self.archive.base_url, "archive.base_url", &mut result);

        if self.archive.timeout_secs == 0 {
            result.add_error("archive.timeout_secs", "Timeout must be greater than 0");
        }

        if self.archive.chunk_days == 0 {
            result.add_error("archive.chunk_days", "Chunk length must be greater than 0");
        } else if self.archive.chunk_days > 365 {
            result.add_error(
                "archive.chunk_days",
                "Chunk length must not exceed 365 days (upstream limit)",
            );
        }

        if self.archive.backfill_years == 0 {
            result.add_error("archive.backfill_years", "Backfill must cover at least 1 year");
        } else if self.archive.backfill_years > 30 {
            result.add_warning(
                "archive.backfill_years",
                "Backfill window is unusually large (>30 years)",
            );
        }

        if self.archive.delay_ms == 0 {
            result.add_warning(
                "archive.delay_ms",
                "No pause between chunk requests - the upstream may rate-limit",
            );
        }

        if self.store.db_path.as_os_str().is_empty() {
            result.add_error("store.db_path", "Database path must not be empty");
        }

        if self.server.port == 0 {
            result.add_error("server.port", "Port cannot be 0");
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("temphist");

        Ok(config_dir.join("config.toml"))
    }
}

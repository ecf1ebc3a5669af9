use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Prefix for environment overrides, e.g. `TODO_WEATHER__API_KEY`.
pub const ENV_PREFIX: &str = "TODO";

/// Separator between nested sections in environment variable names.
pub const ENV_SEPARATOR: &str = "__";

pub const DEFAULT_WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

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

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a single message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Task store settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Weather provider and refresh settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the SQLite file holding task documents
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key (`appid` query parameter)
    #[serde(default)]
    pub api_key: String,

    /// Current weather endpoint
    #[serde(default = "default_weather_api_url")]
    pub api_url: String,

    /// Upper bound on a single provider request, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Interval between refresh runs, in seconds. 0 disables the schedule.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// How many tasks a refresh run fetches at once (1 = sequential)
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

fn default_weather_api_url() -> String {
    DEFAULT_WEATHER_API_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_max_concurrent_fetches() -> usize {
    1
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: default_weather_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

impl WeatherConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("todo-app")
}

fn default_database_path() -> PathBuf {
    default_config_dir().join("tasks.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            storage: StorageConfig::default(),
            weather: WeatherConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default file location and the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError::ParseError` if the file or an override cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        Self::load_with(Some(&path), None)
    }

    /// Load configuration from an optional file and an environment source.
    ///
    /// Layers, lowest priority first: defaults, the TOML file (if present),
    /// `TODO_*` environment variables. Passing `env` replaces the process
    /// environment with the given map.
    ///
    /// # Errors
    /// Returns `ConfigError::ParseError` if any layer cannot be parsed.
    pub fn load_with(
        file: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(env);

        let mut config: Config = builder
            .add_source(environment)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.logging.level = config.logging.level.trim().to_lowercase();
        Ok(config)
    }

    /// Validate and log any warnings.
    ///
    /// Call after logging is initialized so the warnings are visible.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` listing every failed field.
    pub fn ensure_valid(&self) -> Result<ValidationResult, ConfigError> {
        let validation = self.validate();

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        Ok(validation)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.weather.api_key.trim().is_empty() {
            result.add_error("weather.api_key", "Weather API key is not set");
        }

        self.validate_url(&self.weather.api_url, "weather.api_url", &mut result);

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.weather.request_timeout_secs > 120 {
            result.add_warning(
                "weather.request_timeout_secs",
                "Request timeout is unusually long (>120 seconds)",
            );
        }

        if self.weather.refresh_interval_secs == 0 {
            result.add_warning(
                "weather.refresh_interval_secs",
                "Weather refresh disabled (0 seconds)",
            );
        } else if self.weather.refresh_interval_secs > 86_400 {
            result.add_warning(
                "weather.refresh_interval_secs",
                "Weather refresh interval is more than 24 hours",
            );
        }

        if self.weather.max_concurrent_fetches == 0 {
            result.add_error(
                "weather.max_concurrent_fetches",
                "At least one concurrent fetch is required",
            );
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            result.add_error(
                "logging.level",
                format!(
                    "Unknown level '{}', expected one of: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            );
        }

        if self.storage.database_path.as_os_str().is_empty() {
            result.add_error("storage.database_path", "Database path cannot be empty");
        } else if self.storage.database_path.is_dir() {
            result.add_error(
                "storage.database_path",
                format!(
                    "Path is a directory: {}",
                    self.storage.database_path.display()
                ),
            );
        }

        result
    }

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

    /// Save configuration to file
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or the file written.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit path
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or the file written.
    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> PathBuf {
        default_config_dir().join("config.toml")
    }
}

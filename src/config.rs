//! Runtime configuration for the pipeline binary.
//!
//! Covers the database connection, where exports land on disk, and the
//! paging defaults used by batch listings.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the labeling and export pipeline.
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,
    /// Directory export files are written into.
    pub export_dir: PathBuf,
    /// Page size used when a listing does not ask for one.
    pub default_page_size: u32,
    /// Upper bound a requested page size is clamped to.
    pub max_page_size: u32,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/tuneforge".to_string(),
            export_dir: PathBuf::from("./exports"),
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl ForgeConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: PostgreSQL connection URL (required)
    /// - `TUNEFORGE_EXPORT_DIR`: Export output directory (default: ./exports)
    /// - `TUNEFORGE_PAGE_SIZE`: Default listing page size (default: 20)
    /// - `TUNEFORGE_MAX_PAGE_SIZE`: Page size clamp (default: 100)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or have
    /// invalid values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        if let Ok(val) = std::env::var("TUNEFORGE_EXPORT_DIR") {
            config.export_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("TUNEFORGE_PAGE_SIZE") {
            config.default_page_size = parse_env_value(&val, "TUNEFORGE_PAGE_SIZE")?;
        }

        if let Ok(val) = std::env::var("TUNEFORGE_MAX_PAGE_SIZE") {
            config.max_page_size = parse_env_value(&val, "TUNEFORGE_MAX_PAGE_SIZE")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "database_url cannot be empty".to_string(),
            ));
        }

        if self.export_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "export_dir cannot be empty".to_string(),
            ));
        }

        if self.default_page_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "default_page_size must be greater than 0".to_string(),
            ));
        }

        if self.max_page_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_page_size must be greater than 0".to_string(),
            ));
        }

        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::ValidationFailed(
                "default_page_size cannot exceed max_page_size".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder method to set the database URL.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    /// Builder method to set the export directory.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// Builder method to set the default page size.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.default_page_size = size;
        self
    }

    /// Builder method to set the page size clamp.
    pub fn with_max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = size;
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

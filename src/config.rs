//! Application configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables named `QRGENIUS__<SECTION>__<KEY>` (for example
//! `QRGENIUS__SERVER__PORT=9000`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::qr::{Color, OutputFormat, RenderOptions, DEFAULT_BORDER, DEFAULT_MODULE_SIZE};
use crate::url_validator::{ValidatorPolicy, MAX_URL_LENGTH};

pub const ENV_PREFIX: &str = "QRGENIUS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub qr: QrConfig,
    pub validator: ValidatorConfig,
    pub logging: LoggingConfig,
}

/// HTTP server and job queue settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Number of render workers pulling from the job queue
    pub workers: usize,
    /// Capacity of the job queue
    pub queue_size: usize,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: 4,
            queue_size: 100,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Rendering defaults and storage location
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    pub storage_dir: PathBuf,
    pub default_format: String,
    pub module_size: u32,
    pub border: u32,
    pub fill_color: String,
    pub back_color: String,
    pub svg_enabled: bool,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("qr_codes_storage"),
            default_format: "PNG".to_string(),
            module_size: DEFAULT_MODULE_SIZE,
            border: DEFAULT_BORDER,
            fill_color: "black".to_string(),
            back_color: "white".to_string(),
            svg_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub max_url_length: usize,
    pub block_local_hostnames: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_url_length: MAX_URL_LENGTH,
            block_local_hostnames: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Log to a timestamped file in this directory instead of stdout
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

impl AppConfig {
    /// Loads and validates the configuration.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!("Reading configuration file {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "must be non-zero"));
        }
        if self.server.workers == 0 {
            return Err(invalid("server.workers", "at least one worker is required"));
        }
        if self.server.queue_size == 0 {
            return Err(invalid("server.queue_size", "must be non-zero"));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(invalid("server.request_timeout_secs", "must be non-zero"));
        }
        if self.validator.max_url_length == 0 || self.validator.max_url_length > MAX_URL_LENGTH {
            return Err(invalid(
                "validator.max_url_length",
                format!("must be between 1 and {}", MAX_URL_LENGTH),
            ));
        }
        self.render_options()?;
        self.default_format()?;
        Ok(())
    }

    pub fn render_options(&self) -> Result<RenderOptions, ConfigError> {
        if self.qr.module_size == 0 {
            return Err(invalid("qr.module_size", "must be at least 1"));
        }
        let fill: Color = self
            .qr
            .fill_color
            .parse()
            .map_err(|e: crate::qr::ColorParseError| invalid("qr.fill_color", e.to_string()))?;
        let back: Color = self
            .qr
            .back_color
            .parse()
            .map_err(|e: crate::qr::ColorParseError| invalid("qr.back_color", e.to_string()))?;
        Ok(RenderOptions {
            module_size: self.qr.module_size,
            border: self.qr.border,
            fill,
            back,
        })
    }

    pub fn default_format(&self) -> Result<OutputFormat, ConfigError> {
        let format: OutputFormat = self
            .qr
            .default_format
            .parse()
            .map_err(|e: crate::qr::QrError| invalid("qr.default_format", e.to_string()))?;
        if format == OutputFormat::Svg && !self.qr.svg_enabled {
            return Err(invalid("qr.default_format", "SVG output is disabled"));
        }
        Ok(format)
    }

    pub fn validator_policy(&self) -> ValidatorPolicy {
        ValidatorPolicy {
            max_length: self.validator.max_url_length,
            block_local_hostnames: self.validator.block_local_hostnames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.render_options().unwrap(), RenderOptions::default());
        assert_eq!(config.default_format().unwrap(), OutputFormat::Png);
        assert_eq!(config.validator_policy(), ValidatorPolicy::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 9090\nworkers = 2\n\n[qr]\nfill_color = \"#336699\"\ndefault_format = \"svg\"\n\n[validator]\nblock_local_hostnames = true"
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.workers, 2);
        assert_eq!(config.server.queue_size, 100);
        assert_eq!(config.default_format().unwrap(), OutputFormat::Svg);
        assert_eq!(config.render_options().unwrap().fill, Color::new(0x33, 0x66, 0x99));
        assert!(config.validator_policy().block_local_hostnames);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/qr_genius.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.qr.fill_color = "blurple".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "qr.fill_color", .. })
        ));

        let mut config = AppConfig::default();
        config.qr.module_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.workers = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.qr.default_format = "JPG".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_url_length_capped() {
        let mut config = AppConfig::default();
        config.validator.max_url_length = MAX_URL_LENGTH + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "validator.max_url_length", .. })
        ));

        config.validator.max_url_length = 512;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_svg_default_requires_svg_enabled() {
        let mut config = AppConfig::default();
        config.qr.default_format = "SVG".to_string();
        config.qr.svg_enabled = false;
        assert!(config.validate().is_err());
    }
}

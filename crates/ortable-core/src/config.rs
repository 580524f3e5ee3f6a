//! Provider configuration.
//!
//! Sources are layered, later ones overriding earlier ones:
//!
//! 1. built-in defaults ([`ProviderConfig::default`]),
//! 2. an optional TOML file (`ORTABLE_CONFIG` or [`default_config_path`]),
//! 3. environment variables prefixed with `ORTABLE__`, using `__` between
//!    nested keys (`ORTABLE__NETWORK__PORT=10080`).
//!
//! A loaded configuration is always validated; every problem found is
//! reported, not just the first.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use utoipa::ToSchema;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "ORTABLE_CONFIG";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "ORTABLE";

/// Endpoint reference used when none is configured.
pub const DEFAULT_ENDPOINT_REFERENCE: &str = "urn:uuid:sdcx-ORTableProvider-1234-12345";

/// Shortest accepted synchronizer interval.
pub const MIN_SYNC_INTERVAL_MS: u64 = 10;

static ENDPOINT_REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^urn:uuid:[0-9A-Za-z][0-9A-Za-z-]*$").expect("valid endpoint reference regex")
});

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The sources could not be read or merged.
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// A single field is invalid.
    #[error("invalid value for '{field}': {message}")]
    ValidationError {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields are invalid.
    #[error("{} configuration problems found", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Returns `true` if `epr` is a `urn:uuid:` endpoint reference.
#[must_use]
pub fn is_valid_endpoint_reference(epr: &str) -> bool {
    ENDPOINT_REFERENCE_RE.is_match(epr)
}

/// Full provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ProviderConfig {
    /// Endpoint reference identifying this provider.
    #[schema(example = "urn:uuid:sdcx-ORTableProvider-1234-12345")]
    pub endpoint_reference: String,
    /// Listening addresses.
    pub network: NetworkConfig,
    /// Model description served to consumers.
    pub model: ModelDescription,
    /// Device description served to consumers.
    pub device: DeviceDescription,
    /// Periodic synchronizer settings.
    pub synchronizer: SynchronizerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint_reference: DEFAULT_ENDPOINT_REFERENCE.to_string(),
            network: NetworkConfig::default(),
            model: ModelDescription::default(),
            device: DeviceDescription::default(),
            synchronizer: SynchronizerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Listening addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct NetworkConfig {
    /// Local IP to bind. Falls back to all interfaces when unavailable.
    #[schema(example = "127.0.0.1")]
    pub bind_address: String,
    /// HTTP port.
    pub port: u16,
    /// Port advertised for discovery.
    pub discovery_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 10000,
            discovery_port: 5011,
        }
    }
}

/// Model part of the provider description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ModelDescription {
    /// Manufacturer name.
    pub manufacturer: String,
    /// Model name.
    pub model_name: String,
    /// Model number.
    pub model_number: String,
    /// Model URL.
    pub model_url: String,
    /// Manufacturer URL.
    pub manufacturer_url: String,
    /// Presentation URL.
    pub presentation_url: String,
}

impl Default for ModelDescription {
    fn default() -> Self {
        Self {
            manufacturer: "SurgiTAIX".to_string(),
            model_name: "sdcX OR Table Demo Provider".to_string(),
            model_number: "1234".to_string(),
            model_url: "http://surgitaix.com".to_string(),
            manufacturer_url: "http://surgitaix.com".to_string(),
            presentation_url: "http://surgitaix.com".to_string(),
        }
    }
}

/// Device part of the provider description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct DeviceDescription {
    /// Human-readable name.
    pub friendly_name: String,
    /// Serial number.
    pub serial_number: String,
    /// Firmware version.
    pub firmware_version: String,
}

impl Default for DeviceDescription {
    fn default() -> Self {
        Self {
            friendly_name: "sdcX OR Table Demo Provider".to_string(),
            serial_number: "4567".to_string(),
            firmware_version: "1.3.0".to_string(),
        }
    }
}

/// Periodic synchronizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SynchronizerConfig {
    /// Tick interval in milliseconds.
    pub interval_ms: u64,
    /// Distance from a limit at which an alert condition becomes present.
    pub alert_margin: f64,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            alert_margin: crate::alert::DEFAULT_ALERT_MARGIN,
        }
    }
}

impl SynchronizerConfig {
    /// Tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoggingConfig {
    /// JSON file logging plus compact stdout instead of pretty output.
    pub production: bool,
    /// Default level filter when `RUST_LOG` is unset.
    #[schema(example = "info")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            production: false,
            level: "info".to_string(),
        }
    }
}

impl ProviderConfig {
    /// Loads and validates the configuration.
    ///
    /// With `path` set, that file must exist. Without it, the file named by
    /// `ORTABLE_CONFIG` is used, else [`default_config_path`] if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] for a missing explicit file,
    /// [`ConfigError::Load`] if a source cannot be parsed, and a validation
    /// error if the merged values are invalid.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let file = match path {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => std::env::var_os(CONFIG_PATH_ENV)
                .map(PathBuf::from)
                .or_else(default_config_path)
                .filter(|p| p.exists()),
        };

        let mut builder = ::config::Config::builder()
            .add_source(::config::Config::try_from(&Self::default())?);
        if let Some(file) = &file {
            debug!(path = %file.display(), "Loading configuration file");
            builder = builder.add_source(::config::File::from(file.as_path()));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: Self = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Parses and validates a TOML document layered over the defaults.
    ///
    /// # Errors
    ///
    /// Same as [`ProviderConfig::load`], without the file lookup.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let loaded: Self = ::config::Config::builder()
            .add_source(::config::Config::try_from(&Self::default())?)
            .add_source(::config::File::from_str(content, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Checks every field and reports all problems found.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a single problem and
    /// [`ConfigError::MultipleValidationErrors`] for several.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();
        let mut invalid = |field: &str, message: String| {
            errors.push(ConfigError::ValidationError {
                field: field.to_string(),
                message,
            });
        };

        if !is_valid_endpoint_reference(&self.endpoint_reference) {
            invalid(
                "endpoint_reference",
                format!(
                    "'{}' is not a urn:uuid: endpoint reference",
                    self.endpoint_reference
                ),
            );
        }
        if self.network.bind_address.parse::<IpAddr>().is_err() {
            invalid(
                "network.bind_address",
                format!("'{}' is not an IP address", self.network.bind_address),
            );
        }
        if self.network.port == 0 {
            invalid("network.port", "must not be 0".to_string());
        }
        if self.network.discovery_port == self.network.port {
            invalid(
                "network.discovery_port",
                "must differ from network.port".to_string(),
            );
        }
        if self.device.friendly_name.trim().is_empty() {
            invalid("device.friendly_name", "must not be empty".to_string());
        }
        if self.synchronizer.interval_ms < MIN_SYNC_INTERVAL_MS {
            invalid(
                "synchronizer.interval_ms",
                format!(
                    "{} is below the minimum of {MIN_SYNC_INTERVAL_MS}",
                    self.synchronizer.interval_ms
                ),
            );
        }
        if !(self.synchronizer.alert_margin.is_finite() && self.synchronizer.alert_margin >= 0.0) {
            invalid(
                "synchronizer.alert_margin",
                format!(
                    "{} is not a non-negative number",
                    self.synchronizer.alert_margin
                ),
            );
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

/// Platform config file location (`.../ortable/provider.toml`).
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ortable").map(|dirs| dirs.config_dir().join("provider.toml"))
}

/// Platform directory for log files.
#[must_use]
pub fn default_log_dir() -> PathBuf {
    ProjectDirs::from("", "", "ortable").map_or_else(
        || PathBuf::from("logs"),
        |dirs| dirs.data_local_dir().join("logs"),
    )
}

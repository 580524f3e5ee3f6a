//! Consumer configuration read from `ORTABLE_*` environment variables.

use std::net::IpAddr;
use std::time::Duration;

use ortable_core::is_valid_endpoint_reference;
use tracing::warn;
use url::Url;

/// Environment variable names
pub mod env_vars {
    pub const PROVIDER_URL: &str = "ORTABLE_PROVIDER_URL";
    pub const TARGET_EPR: &str = "ORTABLE_TARGET_EPR";
    pub const LOCAL_ADDRESS: &str = "ORTABLE_LOCAL_ADDRESS";
    pub const DISCOVERY_MS: &str = "ORTABLE_DISCOVERY_MS";
    pub const POLL_INTERVAL_MS: &str = "ORTABLE_POLL_INTERVAL_MS";
    pub const LOG_LEVEL: &str = "ORTABLE_LOG_LEVEL";
}

/// Default configuration values
pub mod defaults {
    pub const PROVIDER_URL: &str = "http://127.0.0.1:10000";
    pub const DISCOVERY_MS: u64 = 3000;
    pub const POLL_INTERVAL_MS: u64 = 500;
    pub const REQUEST_TIMEOUT_SECS: u64 = 5;
}

/// Errors raised while reading the consumer configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerConfigError {
    #[error("ORTABLE_PROVIDER_URL is not a valid URL: {0}")]
    InvalidProviderUrl(String),

    #[error("ORTABLE_TARGET_EPR must be a urn:uuid endpoint reference, got '{0}'")]
    InvalidEndpointReference(String),

    #[error("{name} must be a positive number of milliseconds, got '{value}'")]
    InvalidDuration { name: &'static str, value: String },
}

/// Configuration for the consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Base URL of the provider's HTTP surface
    pub provider_url: Url,

    /// Endpoint reference the discovered provider must carry
    pub target_endpoint_reference: Option<String>,

    /// Source address for outgoing requests
    pub local_address: Option<IpAddr>,

    /// How long discovery keeps probing
    pub max_discovery_time: Duration,

    /// Delay between two report polls
    pub poll_interval: Duration,
}

impl ConsumerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConsumerConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConsumerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let raw_url = var(env_vars::PROVIDER_URL).unwrap_or_else(|| defaults::PROVIDER_URL.into());
        let provider_url = Url::parse(raw_url.trim())
            .map_err(|_| ConsumerConfigError::InvalidProviderUrl(raw_url.clone()))?;

        let target_endpoint_reference = match var(env_vars::TARGET_EPR) {
            Some(epr) if is_valid_endpoint_reference(epr.trim()) => Some(epr.trim().to_string()),
            Some(epr) => return Err(ConsumerConfigError::InvalidEndpointReference(epr)),
            None => None,
        };

        let local_address = var(env_vars::LOCAL_ADDRESS).and_then(|raw| {
            raw.trim().parse::<IpAddr>().map_or_else(
                |_| {
                    warn!(address = %raw, "Could not bind to adapter, binding to default");
                    None
                },
                Some,
            )
        });

        let max_discovery_time = parse_millis(env_vars::DISCOVERY_MS, var(env_vars::DISCOVERY_MS))?
            .unwrap_or(Duration::from_millis(defaults::DISCOVERY_MS));
        let poll_interval =
            parse_millis(env_vars::POLL_INTERVAL_MS, var(env_vars::POLL_INTERVAL_MS))?
                .unwrap_or(Duration::from_millis(defaults::POLL_INTERVAL_MS));

        Ok(Self {
            provider_url,
            target_endpoint_reference,
            local_address,
            max_discovery_time,
            poll_interval,
        })
    }
}

fn parse_millis(
    name: &'static str,
    value: Option<String>,
) -> Result<Option<Duration>, ConsumerConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Some(Duration::from_millis(ms))),
        _ => Err(ConsumerConfigError::InvalidDuration { name, value }),
    }
}

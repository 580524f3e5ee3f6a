//! Locating the provider.
//!
//! The provider is probed through its description endpoint until it answers
//! or the discovery window closes. When a target endpoint reference is
//! configured, answers from other providers are skipped.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use ortable_core::DescriptionResponse;

use crate::client::OrTableClient;

/// Delay between two probes.
const PROBE_INTERVAL: Duration = Duration::from_millis(200);

/// Discovery did not find a matching provider.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no provider answered within {0} ms")]
    Timeout(u128),

    #[error("provider {found} answered but {expected} was requested")]
    EndpointMismatch { expected: String, found: String },
}

/// Probes the provider until it answers or `max_time` elapses.
pub async fn discover(
    client: &OrTableClient,
    target: Option<&str>,
    max_time: Duration,
) -> Result<DescriptionResponse, DiscoveryError> {
    let deadline = Instant::now() + max_time;
    let mut mismatch = None;

    loop {
        match client.get_description().await {
            Ok(description) => match target {
                Some(expected) if description.endpoint_reference != expected => {
                    debug!(
                        found = %description.endpoint_reference,
                        expected,
                        "Skipping provider with different endpoint reference"
                    );
                    mismatch = Some(description.endpoint_reference);
                }
                Some(_) => {
                    info!(endpoint_reference = %description.endpoint_reference, "Found target provider");
                    return Ok(description);
                }
                None => {
                    warn!(
                        endpoint_reference = %description.endpoint_reference,
                        "No target endpoint reference configured, using first provider that answered"
                    );
                    return Ok(description);
                }
            },
            Err(e) => debug!(url = %client.base_url(), error = %e, "Provider did not answer probe"),
        }

        if Instant::now() + PROBE_INTERVAL > deadline {
            break;
        }
        sleep(PROBE_INTERVAL).await;
    }

    match (mismatch, target) {
        (Some(found), Some(expected)) => Err(DiscoveryError::EndpointMismatch {
            expected: expected.to_string(),
            found,
        }),
        _ => Err(DiscoveryError::Timeout(max_time.as_millis())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::spawn_provider;

    #[tokio::test]
    async fn test_discovers_matching_provider() {
        let (config, _state) = spawn_provider().await;
        let client = OrTableClient::new(&config).unwrap();

        let description = discover(
            &client,
            Some("urn:uuid:sdcx-ORTableProvider-1234-12345"),
            config.max_discovery_time,
        )
        .await
        .unwrap();
        assert_eq!(description.discovery_port, 5011);
    }

    #[tokio::test]
    async fn test_without_target_uses_first_answer() {
        let (config, _state) = spawn_provider().await;
        let client = OrTableClient::new(&config).unwrap();

        let description = discover(&client, None, config.max_discovery_time)
            .await
            .unwrap();
        assert_eq!(description.model.manufacturer, "SurgiTAIX");
    }

    #[tokio::test]
    async fn test_other_provider_is_rejected() {
        let (config, _state) = spawn_provider().await;
        let client = OrTableClient::new(&config).unwrap();

        let result = discover(
            &client,
            Some("urn:uuid:some-other-table"),
            Duration::from_millis(300),
        )
        .await;
        assert!(matches!(result, Err(DiscoveryError::EndpointMismatch { .. })));
    }

    #[tokio::test]
    async fn test_times_out_when_nobody_answers() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = crate::config::ConsumerConfig::from_lookup(|_| None).unwrap();
        config.provider_url = url::Url::parse(&format!("http://{addr}")).unwrap();
        let client = OrTableClient::new(&config).unwrap();

        let result = discover(&client, None, Duration::from_millis(300)).await;
        assert!(matches!(result, Err(DiscoveryError::Timeout(300))));
    }
}

//! HTTP client for the provider API.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use ortable_core::{
    DescriptionResponse, HealthResponse, MdibResponse, OperationResponse, ReportsResponse,
    SetStringRequest,
};

use crate::config::{defaults, ConsumerConfig};

/// Error body returned by the provider for rejected requests.
#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// A request the provider answered with an error status.
#[derive(Debug, thiserror::Error)]
#[error("provider rejected request ({status}, {code}): {message}")]
pub struct ProviderRejection {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

/// HTTP client for talking to the OR table provider
#[derive(Debug, Clone)]
pub struct OrTableClient {
    client: reqwest::Client,
    base_url: Url,
}

impl OrTableClient {
    /// Builds a client for the configured provider URL and source address.
    pub fn new(config: &ConsumerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS))
            .local_address(config.local_address)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.provider_url.clone(),
        })
    }

    /// Base URL requests are resolved against.
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get_description(&self) -> Result<DescriptionResponse> {
        let url = self.base_url.join("/api/description")?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch provider description")?;
        parse(resp).await.context("Failed to parse description response")
    }

    pub async fn get_health(&self) -> Result<HealthResponse> {
        let url = self.base_url.join("/health")?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch health")?;
        parse(resp).await.context("Failed to parse health response")
    }

    pub async fn get_mdib(&self) -> Result<MdibResponse> {
        let url = self.base_url.join("/api/mdib")?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch mdib")?;
        parse(resp).await.context("Failed to parse mdib response")
    }

    pub async fn get_reports(&self, after: u64) -> Result<ReportsResponse> {
        let mut url = self.base_url.join("/api/reports")?;
        url.set_query(Some(&format!("after={after}")));
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch reports")?;
        parse(resp).await.context("Failed to parse reports response")
    }

    pub async fn activate(&self, handle: &str) -> Result<OperationResponse> {
        let url = self
            .base_url
            .join(&format!("/api/operations/{handle}/activate"))?;
        let resp = self
            .client
            .post(url)
            .send()
            .await
            .with_context(|| format!("Failed to activate {handle}"))?;
        parse(resp)
            .await
            .with_context(|| format!("Activate {handle} failed"))
    }

    pub async fn set_string(&self, handle: &str, value: &str) -> Result<OperationResponse> {
        let url = self
            .base_url
            .join(&format!("/api/operations/{handle}/set-string"))?;
        let resp = self
            .client
            .post(url)
            .json(&SetStringRequest {
                value: value.to_string(),
            })
            .send()
            .await
            .with_context(|| format!("Failed to set {handle}"))?;
        parse(resp)
            .await
            .with_context(|| format!("Set string on {handle} failed"))
    }
}

/// Decodes a success body, or turns an error status into a [`ProviderRejection`].
async fn parse<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let text = resp.text().await.unwrap_or_default();
    let rejection = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => ProviderRejection {
            status,
            code: body.error,
            message: body.message,
        },
        Err(_) => ProviderRejection {
            status,
            code: "unknown".to_string(),
            message: text,
        },
    };
    Err(rejection.into())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::time::Duration;

    use ortable_core::ProviderConfig;
    use ortable_provider::api::create_router;
    use ortable_provider::state::AppState;
    use tokio::net::TcpListener;
    use url::Url;

    use crate::config::ConsumerConfig;

    /// Serves a fresh provider on an ephemeral port.
    pub(crate) async fn spawn_provider() -> (ConsumerConfig, AppState) {
        let state = AppState::new(ProviderConfig::default());
        state.hub().start();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = ConsumerConfig {
            provider_url: Url::parse(&format!("http://{addr}")).unwrap(),
            target_endpoint_reference: None,
            local_address: None,
            max_discovery_time: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(20),
        };
        (config, state)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::spawn_provider;
    use super::*;

    use ortable_core::InvocationState;

    #[tokio::test]
    async fn test_description_and_health() {
        let (config, _state) = spawn_provider().await;
        let client = OrTableClient::new(&config).unwrap();

        let description = client.get_description().await.unwrap();
        assert_eq!(
            description.endpoint_reference,
            "urn:uuid:sdcx-ORTableProvider-1234-12345"
        );
        assert!(client.get_health().await.unwrap().publishing);
    }

    #[tokio::test]
    async fn test_activate_and_set_string() {
        let (config, state) = spawn_provider().await;
        let client = OrTableClient::new(&config).unwrap();

        let tx = client.activate("tilt.increase").await.unwrap();
        assert_eq!(tx.invocation_state, InvocationState::Fin);

        client
            .set_string("position.select", "BeachChair")
            .await
            .unwrap();
        client.activate("position.apply").await.unwrap();
        assert!((state.device().read().pose().backplate - 45.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rejection_carries_error_code() {
        let (config, _state) = spawn_provider().await;
        let client = OrTableClient::new(&config).unwrap();

        let err = client.activate("height.wiggle").await.unwrap_err();
        let rejection = err.downcast_ref::<ProviderRejection>().unwrap();
        assert_eq!(rejection.status, StatusCode::NOT_FOUND);
        assert_eq!(rejection.code, "unsupported_operation");
    }

    #[tokio::test]
    async fn test_reports_after_sequence() {
        let (config, _state) = spawn_provider().await;
        let client = OrTableClient::new(&config).unwrap();

        client.activate("height.decrease").await.unwrap();
        let reports = client.get_reports(0).await.unwrap();
        assert_eq!(reports.reports.len(), 4);
        assert_eq!(reports.latest_sequence, 4);
        assert!(client.get_reports(4).await.unwrap().reports.is_empty());
    }
}

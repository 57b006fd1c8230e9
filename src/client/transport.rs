//! The HTTP seam between entity clients and the network.
//!
//! Entity clients build [`ApiRequest`]s and hand them to a [`Transport`].
//! [`HttpTransport`] is the production implementation; tests substitute a
//! scripted transport (see [`crate::testing::RecordingTransport`]).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, RESOURCE_NOT_FOUND_PREFIX};

/// A request against the dbt Cloud API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL, including any query string.
    pub url: String,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// A request without a body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
        }
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Executes API requests with authentication attached.
///
/// Implementations return the raw response body on success. A missing entity
/// must surface as an error whose message starts with
/// [`RESOURCE_NOT_FOUND_PREFIX`] (see [`ProviderError::from_remote`]).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request.
    async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>, ProviderError>;
}

/// [`Transport`] over `reqwest`, authenticating with a bearer token.
pub struct HttpTransport {
    client: reqwest::Client,
    token: String,
}

impl HttpTransport {
    /// Build a transport from the provider configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("dbtcloud-provider/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>, ProviderError> {
        debug!(method = %request.method, url = %request.url, "Sending dbt Cloud API request");

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status == StatusCode::NOT_FOUND {
            debug!(url = %request.url, "dbt Cloud API reported entity not found");
            return Err(ProviderError::from_remote(format!(
                "{RESOURCE_NOT_FOUND_PREFIX}: {}",
                String::from_utf8_lossy(&body)
            )));
        }
        if !status.is_success() {
            warn!(method = %request.method, url = %request.url, status = %status, "dbt Cloud API request failed");
            return Err(ProviderError::from_remote(format!(
                "{status}: {}",
                String::from_utf8_lossy(&body)
            )));
        }

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_request_builder() {
        let request = ApiRequest::new(Method::POST, "https://example.test/v3/")
            .with_body(json!({"state": 1}));
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, "https://example.test/v3/");
        assert_eq!(request.body, Some(json!({"state": 1})));
    }

    #[test]
    fn test_http_transport_builds_from_config() {
        let config = ProviderConfig::new(1, "token");
        assert!(HttpTransport::new(&config).is_ok());
    }
}

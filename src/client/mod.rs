//! Remote entity clients for the dbt Cloud v3 API.
//!
//! Every response is wrapped in an envelope `{"data": ..., "status": {...}}`;
//! [`Client`] unwraps it and hands back the entity. Project-scoped endpoints
//! follow `/v3/accounts/{account}/projects/{project}/<collection>/{id}/`.
//!
//! The client does no caching and no retries.

pub mod credential;
pub mod repository;
pub mod transport;

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::ProviderError;

pub use credential::{SynapseCredential, SynapseUnencryptedCredentialDetails};
pub use repository::{DeployKey, Repository};
pub use transport::{ApiRequest, HttpTransport, Transport};

/// Response envelope used by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// The entity (or list of entities).
    pub data: T,
    /// Request status details.
    #[serde(default)]
    pub status: ResponseStatus,
}

/// Deserialize a `null` member as the default value of its type.
///
/// The backend sends `null` for string fields that do not apply to an entity
/// (e.g. `user` on a service-principal credential).
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The `status` member of a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResponseStatus {
    /// HTTP-like status code.
    pub code: i64,
    /// Whether the request succeeded.
    pub is_success: bool,
    /// Message meant for end users.
    pub user_message: Option<String>,
    /// Message meant for developers.
    pub developer_message: Option<String>,
}

/// Lifecycle state of a remote entity, encoded as a small integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum EntityState {
    /// `1`: the entity is live.
    #[default]
    Active,
    /// `2`: the entity is soft-deleted.
    Deleted,
}

impl EntityState {
    /// Map an `is_active` flag onto a state.
    pub fn from_active(is_active: bool) -> Self {
        if is_active {
            Self::Active
        } else {
            Self::Deleted
        }
    }

    /// Whether the entity is live.
    pub fn is_active(&self) -> bool {
        *self == Self::Active
    }
}

impl From<EntityState> for i64 {
    fn from(state: EntityState) -> Self {
        match state {
            EntityState::Active => 1,
            EntityState::Deleted => 2,
        }
    }
}

impl TryFrom<i64> for EntityState {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Active),
            2 => Ok(Self::Deleted),
            other => Err(format!("unknown entity state {other}")),
        }
    }
}

/// Account-scoped client for the dbt Cloud API.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    host_url: String,
    account_id: i64,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("host_url", &self.host_url)
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client over an existing transport.
    pub fn new(transport: Arc<dyn Transport>, host_url: impl Into<String>, account_id: i64) -> Self {
        Self {
            transport,
            host_url: host_url.into().trim_end_matches('/').to_string(),
            account_id,
        }
    }

    /// Create a client talking HTTP according to `config`.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(
            Arc::new(transport),
            config.host_url.clone(),
            config.account_id,
        ))
    }

    /// The account every request is scoped to.
    pub fn account_id(&self) -> i64 {
        self.account_id
    }

    /// The API base URL.
    pub fn host_url(&self) -> &str {
        &self.host_url
    }

    /// URL of a project-scoped endpoint; `path` is appended after the project ID.
    pub(crate) fn project_url(&self, project_id: i64, path: &str) -> String {
        format!(
            "{}/v3/accounts/{}/projects/{}/{}",
            self.host_url, self.account_id, project_id, path
        )
    }

    /// Perform a request and unwrap the `data` member of the response.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: String,
        body: Option<Value>,
    ) -> Result<T, ProviderError> {
        let bytes = self.execute(method, url, body).await?;
        let response: ApiResponse<T> = serde_json::from_slice(&bytes)?;
        Ok(response.data)
    }

    /// Perform a request and return the raw response body.
    pub(crate) async fn execute(
        &self,
        method: Method,
        url: String,
        body: Option<Value>,
    ) -> Result<Vec<u8>, ProviderError> {
        let mut request = ApiRequest::new(method, url);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        self.transport.execute(request).await
    }
}

//! Synapse credential endpoints.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Client, EntityState};
use crate::error::ProviderError;
use crate::field_bag::synapse::NUM_THREADS_CREDENTIAL;
use crate::field_bag::CredentialDetails;

/// Adapter version tag of Synapse credentials.
pub const ADAPTER_VERSION_SYNAPSE: &str = "synapse_v0";

/// `type` of every adapter-based credential.
pub const CREDENTIAL_TYPE_ADAPTER: &str = "adapter";

/// The plain-text view of a Synapse credential the backend returns on reads.
///
/// Encrypted fields (`password`, `client_secret`) are never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SynapseUnencryptedCredentialDetails {
    /// `ActiveDirectoryPassword` or `ServicePrincipal`.
    #[serde(deserialize_with = "super::null_as_default")]
    pub authentication: String,
    /// Azure AD user.
    #[serde(deserialize_with = "super::null_as_default")]
    pub user: String,
    /// Service principal client ID.
    #[serde(deserialize_with = "super::null_as_default")]
    pub client_id: String,
    /// Target schema.
    #[serde(deserialize_with = "super::null_as_default")]
    pub schema: String,
    /// Schema owner.
    #[serde(deserialize_with = "super::null_as_default")]
    pub schema_authorization: String,
    /// Azure AD tenant.
    #[serde(deserialize_with = "super::null_as_default")]
    pub tenant_id: String,
}

/// A Synapse credential as stored by dbt Cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynapseCredential {
    /// Server-assigned ID; `None` (sent as `null`) before creation.
    pub id: Option<i64>,
    /// Owning account.
    pub account_id: i64,
    /// Owning project.
    pub project_id: i64,
    /// Always [`CREDENTIAL_TYPE_ADAPTER`].
    #[serde(rename = "type", default, deserialize_with = "super::null_as_default")]
    pub credential_type: String,
    /// Active or soft-deleted.
    pub state: EntityState,
    /// dbt threads.
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub threads: u32,
    /// Always [`ADAPTER_VERSION_SYNAPSE`].
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub adapter_version: String,
    /// The field bag, including encrypted values on writes.
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub credential_details: CredentialDetails,
    /// Plain-text values as returned on reads.
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub unencrypted_credential_details: SynapseUnencryptedCredentialDetails,
}

impl SynapseCredential {
    /// A new, active credential ready to be created.
    pub fn new(account_id: i64, project_id: i64, credential_details: CredentialDetails) -> Self {
        Self {
            id: None,
            account_id,
            project_id,
            credential_type: CREDENTIAL_TYPE_ADAPTER.to_string(),
            state: EntityState::Active,
            threads: NUM_THREADS_CREDENTIAL,
            adapter_version: ADAPTER_VERSION_SYNAPSE.to_string(),
            credential_details,
            unencrypted_credential_details: SynapseUnencryptedCredentialDetails::default(),
        }
    }
}

impl Client {
    /// Fetch a credential together with its adapter details.
    pub async fn get_synapse_credential(
        &self,
        project_id: i64,
        credential_id: i64,
    ) -> Result<SynapseCredential, ProviderError> {
        debug!(project_id, credential_id, "Fetching Synapse credential");
        let url = self.project_url(
            project_id,
            &format!("credentials/{credential_id}/?include_related=[adapter]"),
        );
        self.send(Method::GET, url, None).await
    }

    /// Create a credential; returns it with its server-assigned ID.
    pub async fn create_synapse_credential(
        &self,
        credential: &SynapseCredential,
    ) -> Result<SynapseCredential, ProviderError> {
        debug!(project_id = credential.project_id, "Creating Synapse credential");
        let url = self.project_url(credential.project_id, "credentials/");
        let body = serde_json::to_value(credential)?;
        self.send(Method::POST, url, Some(body)).await
    }

    /// Replace a credential with `credential`.
    pub async fn update_synapse_credential(
        &self,
        project_id: i64,
        credential_id: i64,
        credential: &SynapseCredential,
    ) -> Result<SynapseCredential, ProviderError> {
        debug!(project_id, credential_id, state = ?credential.state, "Updating Synapse credential");
        let url = self.project_url(project_id, &format!("credentials/{credential_id}/"));
        let body = serde_json::to_value(credential)?;
        self.send(Method::POST, url, Some(body)).await
    }
}

//! Field bag for Azure Synapse credentials.

use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

use super::CredentialDetails;
use crate::error::ProviderError;

/// Threads assigned to new credentials.
pub const NUM_THREADS_CREDENTIAL: u32 = 6;

/// dbt target name written into every Synapse credential.
pub const DEFAULT_TARGET_NAME: &str = "default";

// Captured from the backend's own credential form; only values were blanked.
const SYNAPSE_TEMPLATE_JSON: &str = include_str!("synapse_credential.json");

static SYNAPSE_TEMPLATE: OnceLock<Result<CredentialDetails, String>> = OnceLock::new();

/// The Synapse field bag template, parsed on first use.
pub fn synapse_template() -> Result<&'static CredentialDetails, ProviderError> {
    SYNAPSE_TEMPLATE
        .get_or_init(|| {
            CredentialDetails::from_template(SYNAPSE_TEMPLATE_JSON).map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| ProviderError::Sdk(format!("invalid Synapse credential template: {e}")))
}

/// How a Synapse credential authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SynapseAuthentication {
    /// Azure AD user and password.
    #[serde(rename = "ActiveDirectoryPassword")]
    ActiveDirectoryPassword,
    /// Azure AD service principal (tenant, client id, client secret).
    #[serde(rename = "ServicePrincipal")]
    ServicePrincipal,
}

impl SynapseAuthentication {
    /// Wire value of the `authentication` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActiveDirectoryPassword => "ActiveDirectoryPassword",
            Self::ServicePrincipal => "ServicePrincipal",
        }
    }
}

/// Pick the authentication mode from the inputs: no user means service principal.
pub fn infer_authentication(user: &str) -> SynapseAuthentication {
    if user.is_empty() {
        SynapseAuthentication::ServicePrincipal
    } else {
        SynapseAuthentication::ActiveDirectoryPassword
    }
}

/// The flat values a user configures on a Synapse credential.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynapseCredentialInputs {
    /// Azure AD user (password mode).
    pub user: String,
    /// Azure AD password (password mode). Never returned by the backend.
    pub password: String,
    /// Azure AD tenant (service principal mode).
    pub tenant_id: String,
    /// Service principal client ID.
    pub client_id: String,
    /// Service principal secret. Never returned by the backend.
    pub client_secret: String,
    /// Schema dbt builds into.
    pub schema: String,
    /// Principal owning the schemas dbt creates.
    pub schema_authorization: String,
}

impl SynapseCredentialInputs {
    /// Check that exactly one authentication mode is fully configured.
    ///
    /// Returns the selected mode. Fails with [`ProviderError::Validation`]
    /// when both modes, neither mode, or only part of a mode is set.
    pub fn validate_authentication(&self) -> Result<SynapseAuthentication, ProviderError> {
        let password_fields = [&self.user, &self.password];
        let principal_fields = [&self.tenant_id, &self.client_id, &self.client_secret];

        let password_complete = password_fields.iter().all(|f| !f.is_empty());
        let password_touched = password_fields.iter().any(|f| !f.is_empty());
        let principal_complete = principal_fields.iter().all(|f| !f.is_empty());
        let principal_touched = principal_fields.iter().any(|f| !f.is_empty());

        match (password_touched, principal_touched) {
            (true, true) => Err(ProviderError::Validation(
                "user/password and service principal (tenant_id/client_id/client_secret) \
                 auth are mutually exclusive"
                    .to_string(),
            )),
            (true, false) if password_complete => Ok(SynapseAuthentication::ActiveDirectoryPassword),
            (false, true) if principal_complete => Ok(SynapseAuthentication::ServicePrincipal),
            _ => Err(ProviderError::Validation(
                "either user/password or service principal auth must be defined".to_string(),
            )),
        }
    }
}

#[derive(Serialize)]
struct SynapseFieldValues<'a> {
    authentication: SynapseAuthentication,
    user: &'a str,
    password: &'a str,
    tenant_id: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    schema: &'a str,
    schema_authorization: &'a str,
    target_name: &'a str,
    threads: u32,
}

/// Assemble the `credential_details` field bag for a Synapse credential.
///
/// Pure: identical inputs give identical bags. All-empty inputs produce the
/// placeholder bag the backend requires when soft-deleting.
pub fn build_synapse_credential_details(
    inputs: &SynapseCredentialInputs,
) -> Result<CredentialDetails, ProviderError> {
    let template = synapse_template()?;

    let values = SynapseFieldValues {
        authentication: infer_authentication(&inputs.user),
        user: &inputs.user,
        password: &inputs.password,
        tenant_id: &inputs.tenant_id,
        client_id: &inputs.client_id,
        client_secret: &inputs.client_secret,
        schema: &inputs.schema,
        schema_authorization: &inputs.schema_authorization,
        target_name: DEFAULT_TARGET_NAME,
        threads: NUM_THREADS_CREDENTIAL,
    };

    match serde_json::to_value(values)? {
        Value::Object(values) => Ok(template.overlay(&values)),
        _ => Err(ProviderError::Sdk(
            "Synapse field values did not serialize to an object".to_string(),
        )),
    }
}

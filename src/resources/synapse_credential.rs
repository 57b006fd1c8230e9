//! `dbtcloud_synapse_credential`: an Azure Synapse connection credential.
//!
//! The backend never returns `password` or `client_secret`; reads keep the
//! values already in the snapshot. Deletion is a soft delete: the entity is
//! re-submitted with `state = 2` and a placeholder field bag, which the
//! backend insists on even though it ignores the values.

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::Resource;
use crate::client::{Client, EntityState, SynapseCredential};
use crate::error::ProviderError;
use crate::field_bag::{build_synapse_credential_details, SynapseCredentialInputs};
use crate::id::{format_id, split_id_to_ints};
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;

/// Terraform type name.
pub const RESOURCE_TYPE: &str = "dbtcloud_synapse_credential";

const PASSWORD_AUTH_ATTRIBUTES: [&str; 2] = ["user", "password"];
const PRINCIPAL_AUTH_ATTRIBUTES: [&str; 3] = ["tenant_id", "client_id", "client_secret"];

// Attributes that end up in the field bag; a change to any of them triggers a remote update.
const TRACKED_ATTRIBUTES: [&str; 7] = [
    "user",
    "password",
    "tenant_id",
    "client_id",
    "client_secret",
    "schema",
    "schema_authorization",
];

const WRITE_ONLY_ATTRIBUTES: [&str; 2] = ["password", "client_secret"];

/// Reconciler for Synapse credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct SynapseCredentialResource;

impl SynapseCredentialResource {
    fn inputs(data: &ResourceData) -> SynapseCredentialInputs {
        SynapseCredentialInputs {
            user: data.get_string("user"),
            password: data.get_string("password"),
            tenant_id: data.get_string("tenant_id"),
            client_id: data.get_string("client_id"),
            client_secret: data.get_string("client_secret"),
            schema: data.get_string("schema"),
            schema_authorization: data.get_string("schema_authorization"),
        }
    }
}

#[async_trait]
impl Resource for SynapseCredentialResource {
    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Azure Synapse credential of a dbt Cloud project")
            .with_attribute(
                "project_id",
                Attribute::required_int64()
                    .with_force_new()
                    .with_description("Project ID to create the Synapse credential in"),
            )
            .with_attribute(
                "credential_id",
                Attribute::computed_int64().with_description("The system Synapse credential ID"),
            )
            .with_attribute(
                "user",
                Attribute::optional_string()
                    .with_default("")
                    .with_conflicts(&PRINCIPAL_AUTH_ATTRIBUTES)
                    .with_description(
                        "The username of the Synapse account to connect to. \
                         Only used when connecting with AD user/pass",
                    ),
            )
            .with_attribute(
                "password",
                Attribute::optional_string()
                    .sensitive()
                    .with_default("")
                    .with_conflicts(&PRINCIPAL_AUTH_ATTRIBUTES)
                    .with_description(
                        "The password for the account to connect to. \
                         Only used when connecting with AD user/pass",
                    ),
            )
            .with_attribute(
                "tenant_id",
                Attribute::optional_string()
                    .with_default("")
                    .with_conflicts(&PASSWORD_AUTH_ATTRIBUTES)
                    .with_description(
                        "The tenant ID of the Azure Active Directory instance. \
                         Only used when connecting with a service principal",
                    ),
            )
            .with_attribute(
                "client_id",
                Attribute::optional_string()
                    .with_default("")
                    .with_conflicts(&PASSWORD_AUTH_ATTRIBUTES)
                    .with_description(
                        "The client ID of the Azure Active Directory service principal",
                    ),
            )
            .with_attribute(
                "client_secret",
                Attribute::optional_string()
                    .sensitive()
                    .with_default("")
                    .with_conflicts(&PASSWORD_AUTH_ATTRIBUTES)
                    .with_description(
                        "The client secret of the Azure Active Directory service principal",
                    ),
            )
            .with_attribute(
                "schema",
                Attribute::required_string()
                    .with_description("The schema where to create the dbt models"),
            )
            .with_attribute(
                "schema_authorization",
                Attribute::optional_string().with_default("").with_description(
                    "Optionally set this to the principal who should own the schemas created by dbt",
                ),
            )
    }

    fn validate(&self, data: &ResourceData) -> Result<(), ProviderError> {
        Self::inputs(data).validate_authentication().map(|_| ())
    }

    #[instrument(skip_all, fields(resource_type = RESOURCE_TYPE))]
    async fn create(&self, client: &Client, data: &mut ResourceData) -> Result<(), ProviderError> {
        let inputs = Self::inputs(data);
        let authentication = inputs.validate_authentication()?;
        let project_id = data
            .get_i64("project_id")
            .ok_or_else(|| ProviderError::Validation("project_id must be set".to_string()))?;

        let details = build_synapse_credential_details(&inputs)?;
        let credential = SynapseCredential::new(client.account_id(), project_id, details);
        let created = client.create_synapse_credential(&credential).await?;

        let credential_id = created.id.ok_or_else(|| {
            ProviderError::Remote("created Synapse credential carries no id".to_string())
        })?;
        data.set_id(format_id(created.project_id, credential_id));
        data.set("credential_id", credential_id);
        info!(
            id = data.id(),
            authentication = authentication.as_str(),
            "Created Synapse credential"
        );

        // The credential exists remotely now; its identity must reach the host.
        if let Err(err) = self.read(client, data).await {
            warn!(error = %err, "Read after create failed, keeping the planned values");
        }
        Ok(())
    }

    #[instrument(skip_all, fields(resource_type = RESOURCE_TYPE, id = %data.id()))]
    async fn read(&self, client: &Client, data: &mut ResourceData) -> Result<(), ProviderError> {
        let (project_id, credential_id) = split_id_to_ints(data.id(), RESOURCE_TYPE)?;

        let credential = match client.get_synapse_credential(project_id, credential_id).await {
            Ok(credential) => credential,
            Err(err) if err.is_not_found() => {
                warn!("Synapse credential no longer exists, removing it from state");
                data.clear_id();
                return Ok(());
            },
            Err(err) => return Err(err),
        };

        let details = credential.unencrypted_credential_details;
        data.set("project_id", credential.project_id);
        data.set("credential_id", credential_id);
        data.set("user", details.user);
        data.set("tenant_id", details.tenant_id);
        data.set("client_id", details.client_id);
        data.set("schema", details.schema);
        data.set("schema_authorization", details.schema_authorization);

        for key in WRITE_ONLY_ATTRIBUTES {
            let kept = data.get_string(key);
            data.set(key, kept);
        }

        debug!("Read Synapse credential");
        Ok(())
    }

    #[instrument(skip_all, fields(resource_type = RESOURCE_TYPE, id = %data.id()))]
    async fn update(&self, client: &Client, data: &mut ResourceData) -> Result<(), ProviderError> {
        let (project_id, credential_id) = split_id_to_ints(data.id(), RESOURCE_TYPE)?;

        if data.has_any_change(&TRACKED_ATTRIBUTES) {
            let inputs = Self::inputs(data);
            inputs.validate_authentication()?;

            let mut credential = client.get_synapse_credential(project_id, credential_id).await?;
            credential.credential_details = build_synapse_credential_details(&inputs)?;
            client
                .update_synapse_credential(project_id, credential_id, &credential)
                .await?;
            info!("Updated Synapse credential");
        } else {
            debug!("No field bag attribute changed, skipping remote update");
        }

        self.read(client, data).await
    }

    #[instrument(skip_all, fields(resource_type = RESOURCE_TYPE, id = %data.id()))]
    async fn delete(&self, client: &Client, data: &mut ResourceData) -> Result<(), ProviderError> {
        let (project_id, credential_id) = split_id_to_ints(data.id(), RESOURCE_TYPE)?;

        let mut credential = client.get_synapse_credential(project_id, credential_id).await?;
        credential.state = EntityState::Deleted;
        credential.credential_details =
            build_synapse_credential_details(&SynapseCredentialInputs::default())?;
        client
            .update_synapse_credential(project_id, credential_id, &credential)
            .await?;

        data.clear_id();
        info!("Soft-deleted Synapse credential");
        Ok(())
    }
}

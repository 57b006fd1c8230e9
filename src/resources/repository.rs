//! `dbtcloud_repository`: a git repository attached to a project.
//!
//! The backend fills in `repository_credentials_id` and the deploy key on
//! its own. Updates therefore start from the stored entity and only replace
//! the attributes this resource owns.

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::Resource;
use crate::client::repository::DEFAULT_GIT_CLONE_STRATEGY;
use crate::client::{Client, EntityState, Repository};
use crate::error::ProviderError;
use crate::id::{format_id, split_id_to_ints};
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;

/// Terraform type name.
pub const RESOURCE_TYPE: &str = "dbtcloud_repository";

const TRACKED_ATTRIBUTES: [&str; 5] = [
    "is_active",
    "remote_url",
    "azure_active_directory_project_id",
    "azure_active_directory_repository_id",
    "azure_bypass_webhook_registration_failure",
];

/// Reconciler for repositories.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepositoryResource;

impl RepositoryResource {
    fn non_zero(data: &ResourceData, key: &str) -> Option<i64> {
        data.get_i64(key).filter(|v| *v != 0)
    }

    fn non_empty(data: &ResourceData, key: &str) -> Option<String> {
        Some(data.get_string(key)).filter(|v| !v.is_empty())
    }

    // Azure DevOps attributes are only sent when a project is configured.
    fn apply_owned_attributes(data: &ResourceData, repository: &mut Repository) {
        repository.remote_url = data.get_string("remote_url");
        repository.state = EntityState::from_active(data.get_bool("is_active").unwrap_or(true));

        match Self::non_empty(data, "azure_active_directory_project_id") {
            Some(project) => {
                repository.azure_active_directory_project_id = Some(project);
                repository.azure_active_directory_repository_id =
                    Some(data.get_string("azure_active_directory_repository_id"));
                repository.azure_bypass_webhook_registration_failure = Some(
                    data.get_bool("azure_bypass_webhook_registration_failure")
                        .unwrap_or(false),
                );
            },
            None => {
                repository.azure_active_directory_project_id = None;
                repository.azure_active_directory_repository_id = None;
                repository.azure_bypass_webhook_registration_failure = None;
            },
        }
    }
}

#[async_trait]
impl Resource for RepositoryResource {
    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Git repository of a dbt Cloud project")
            .with_attribute(
                "project_id",
                Attribute::required_int64()
                    .with_force_new()
                    .with_description("Project ID to create the repository in"),
            )
            .with_attribute(
                "repository_id",
                Attribute::computed_int64().with_description("Repository identifier"),
            )
            .with_attribute(
                "remote_url",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Git URL for the repository or <Group>/<Project> for GitLab"),
            )
            .with_attribute(
                "is_active",
                Attribute::optional_bool()
                    .with_default(true)
                    .with_description("Whether the repository is active"),
            )
            .with_attribute(
                "git_clone_strategy",
                Attribute::optional_string()
                    .with_default(DEFAULT_GIT_CLONE_STRATEGY)
                    .with_force_new()
                    .with_description(
                        "Git clone strategy: deploy_key, github_app, deploy_token \
                         or azure_active_directory_app",
                    ),
            )
            .with_attribute(
                "repository_credentials_id",
                Attribute::computed_int64()
                    .with_description("Credentials ID of the repository (managed by dbt Cloud)"),
            )
            .with_attribute(
                "gitlab_project_id",
                Attribute::optional_int64()
                    .with_force_new()
                    .with_conflicts(&["github_installation_id"])
                    .with_description("Identifier of the GitLab project (deploy_token strategy)"),
            )
            .with_attribute(
                "github_installation_id",
                Attribute::optional_int64()
                    .with_force_new()
                    .with_conflicts(&["gitlab_project_id"])
                    .with_description("Identifier of the GitHub app installation (github_app strategy)"),
            )
            .with_attribute(
                "azure_active_directory_project_id",
                Attribute::optional_string().with_description("Azure DevOps project ID"),
            )
            .with_attribute(
                "azure_active_directory_repository_id",
                Attribute::optional_string().with_description("Azure DevOps repository ID"),
            )
            .with_attribute(
                "azure_bypass_webhook_registration_failure",
                Attribute::optional_bool()
                    .with_default(false)
                    .with_description("Proceed even if the Azure DevOps webhook cannot be registered"),
            )
            .with_attribute(
                "deploy_key",
                Attribute::computed_string()
                    .with_description("Public key generated by dbt Cloud (deploy_key strategy)"),
            )
    }

    fn validate(&self, data: &ResourceData) -> Result<(), ProviderError> {
        if Self::non_zero(data, "gitlab_project_id").is_some()
            && Self::non_zero(data, "github_installation_id").is_some()
        {
            return Err(ProviderError::Validation(
                "gitlab_project_id and github_installation_id are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }

    #[instrument(skip_all, fields(resource_type = RESOURCE_TYPE))]
    async fn create(&self, client: &Client, data: &mut ResourceData) -> Result<(), ProviderError> {
        self.validate(data)?;
        let project_id = data
            .get_i64("project_id")
            .ok_or_else(|| ProviderError::Validation("project_id must be set".to_string()))?;

        let mut repository = Repository {
            account_id: client.account_id(),
            project_id,
            git_clone_strategy: Self::non_empty(data, "git_clone_strategy")
                .unwrap_or_else(|| DEFAULT_GIT_CLONE_STRATEGY.to_string()),
            gitlab_project_id: Self::non_zero(data, "gitlab_project_id"),
            github_installation_id: Self::non_zero(data, "github_installation_id"),
            ..Default::default()
        };
        Self::apply_owned_attributes(data, &mut repository);

        let created = client.create_repository(&repository).await?;
        let repository_id = created
            .id
            .ok_or_else(|| ProviderError::Remote("created repository carries no id".to_string()))?;
        data.set_id(format_id(created.project_id, repository_id));
        data.set("repository_id", repository_id);
        info!(id = data.id(), "Created repository");

        if let Err(err) = self.read(client, data).await {
            warn!(error = %err, "Read after create failed, keeping the planned values");
        }
        Ok(())
    }

    #[instrument(skip_all, fields(resource_type = RESOURCE_TYPE, id = %data.id()))]
    async fn read(&self, client: &Client, data: &mut ResourceData) -> Result<(), ProviderError> {
        let (project_id, repository_id) = split_id_to_ints(data.id(), RESOURCE_TYPE)?;

        let repository = match client.get_repository(project_id, repository_id).await {
            Ok(repository) => repository,
            Err(err) if err.is_not_found() => {
                warn!("Repository no longer exists, removing it from state");
                data.clear_id();
                return Ok(());
            },
            Err(err) => return Err(err),
        };

        data.set("project_id", repository.project_id);
        data.set("repository_id", repository_id);
        data.set("remote_url", repository.remote_url);
        data.set("is_active", repository.state.is_active());
        data.set("git_clone_strategy", repository.git_clone_strategy);
        data.set("repository_credentials_id", repository.repository_credentials_id);
        data.set("gitlab_project_id", repository.gitlab_project_id);
        data.set("github_installation_id", repository.github_installation_id);
        data.set(
            "azure_active_directory_project_id",
            repository.azure_active_directory_project_id,
        );
        data.set(
            "azure_active_directory_repository_id",
            repository.azure_active_directory_repository_id,
        );
        data.set(
            "azure_bypass_webhook_registration_failure",
            repository
                .azure_bypass_webhook_registration_failure
                .unwrap_or(false),
        );
        data.set(
            "deploy_key",
            repository.deploy_key.map(|key| key.public_key).unwrap_or_default(),
        );

        debug!("Read repository");
        Ok(())
    }

    #[instrument(skip_all, fields(resource_type = RESOURCE_TYPE, id = %data.id()))]
    async fn update(&self, client: &Client, data: &mut ResourceData) -> Result<(), ProviderError> {
        let (project_id, repository_id) = split_id_to_ints(data.id(), RESOURCE_TYPE)?;

        if data.has_any_change(&TRACKED_ATTRIBUTES) {
            let mut repository = client.get_repository(project_id, repository_id).await?;
            Self::apply_owned_attributes(data, &mut repository);
            client
                .update_repository(project_id, repository_id, &repository)
                .await?;
            info!("Updated repository");
        }

        self.read(client, data).await
    }

    #[instrument(skip_all, fields(resource_type = RESOURCE_TYPE, id = %data.id()))]
    async fn delete(&self, client: &Client, data: &mut ResourceData) -> Result<(), ProviderError> {
        let (project_id, repository_id) = split_id_to_ints(data.id(), RESOURCE_TYPE)?;

        client.delete_repository(project_id, repository_id).await?;

        data.clear_id();
        info!("Deleted repository");
        Ok(())
    }
}

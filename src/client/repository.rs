//! Repository endpoints.
//!
//! Unlike credentials, repositories are removed with a real `DELETE`.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Client, EntityState};
use crate::error::ProviderError;

/// Clone strategy used when none is configured.
pub const DEFAULT_GIT_CLONE_STRATEGY: &str = "deploy_key";

/// SSH deploy key generated by dbt Cloud for a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployKey {
    /// Key ID.
    pub id: i64,
    /// Owning account.
    pub account_id: i64,
    /// Raw entity state.
    pub state: i64,
    /// Public half of the key.
    #[serde(deserialize_with = "super::null_as_default")]
    pub public_key: String,
}

/// A git repository attached to a project.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Repository {
    /// Server-assigned ID; omitted before creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Owning account.
    pub account_id: i64,
    /// Owning project.
    pub project_id: i64,
    /// Git URL.
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub remote_url: String,
    /// Active or soft-deleted.
    pub state: EntityState,
    /// Azure DevOps project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_active_directory_project_id: Option<String>,
    /// Azure DevOps repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_active_directory_repository_id: Option<String>,
    /// Keep going when Azure DevOps webhook registration fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_bypass_webhook_registration_failure: Option<bool>,
    /// `deploy_key`, `github_app`, `deploy_token` or `azure_active_directory_app`.
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub git_clone_strategy: String,
    /// Server-managed credentials for the clone strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_credentials_id: Option<i64>,
    /// GitLab project, sent as `null` when unset.
    #[serde(default)]
    pub gitlab_project_id: Option<i64>,
    /// GitHub app installation, sent as `null` when unset.
    #[serde(default)]
    pub github_installation_id: Option<i64>,
    /// Generated deploy key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_key: Option<DeployKey>,
}

impl Client {
    /// Fetch a repository.
    pub async fn get_repository(
        &self,
        project_id: i64,
        repository_id: i64,
    ) -> Result<Repository, ProviderError> {
        debug!(project_id, repository_id, "Fetching repository");
        let url = self.project_url(project_id, &format!("repositories/{repository_id}/"));
        self.send(Method::GET, url, None).await
    }

    /// Create a repository; returns it with its server-assigned fields.
    pub async fn create_repository(
        &self,
        repository: &Repository,
    ) -> Result<Repository, ProviderError> {
        debug!(project_id = repository.project_id, "Creating repository");
        let url = self.project_url(repository.project_id, "repositories/");
        let body = serde_json::to_value(repository)?;
        self.send(Method::POST, url, Some(body)).await
    }

    /// Replace a repository with `repository`.
    pub async fn update_repository(
        &self,
        project_id: i64,
        repository_id: i64,
        repository: &Repository,
    ) -> Result<Repository, ProviderError> {
        debug!(project_id, repository_id, "Updating repository");
        let url = self.project_url(project_id, &format!("repositories/{repository_id}/"));
        let body = serde_json::to_value(repository)?;
        self.send(Method::POST, url, Some(body)).await
    }

    /// Delete a repository.
    pub async fn delete_repository(
        &self,
        project_id: i64,
        repository_id: i64,
    ) -> Result<(), ProviderError> {
        debug!(project_id, repository_id, "Deleting repository");
        let url = self.project_url(project_id, &format!("repositories/{repository_id}/"));
        self.execute(Method::DELETE, url, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTransport;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_new_repository_wire_shape() {
        let repository = Repository {
            account_id: 1,
            project_id: 3,
            remote_url: "git@github.com:acme/analytics.git".to_string(),
            git_clone_strategy: DEFAULT_GIT_CLONE_STRATEGY.to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&repository).unwrap();
        let object = value.as_object().unwrap();

        assert!(!object.contains_key("id"));
        assert!(!object.contains_key("deploy_key"));
        assert!(!object.contains_key("azure_active_directory_project_id"));
        assert_eq!(value["gitlab_project_id"], json!(null));
        assert_eq!(value["github_installation_id"], json!(null));
        assert_eq!(value["state"], 1);
    }

    #[test]
    fn test_null_strings_read_as_empty() {
        let repository: Repository = serde_json::from_value(json!({
            "id": 9,
            "account_id": 1,
            "project_id": 3,
            "remote_url": null,
            "state": 1,
            "git_clone_strategy": null,
            "deploy_key": {"id": 5, "account_id": 1, "state": 1, "public_key": null}
        }))
        .unwrap();

        assert_eq!(repository.remote_url, "");
        assert_eq!(repository.git_clone_strategy, "");
        assert_eq!(repository.deploy_key.unwrap().public_key, "");
    }

    #[tokio::test]
    async fn test_delete_uses_http_delete() {
        let transport = Arc::new(RecordingTransport::new());
        transport.respond_raw(Vec::new());
        let client = Client::new(transport.clone(), "https://host/api", 1);

        client.delete_repository(3, 9).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::DELETE);
        assert_eq!(
            requests[0].url,
            "https://host/api/v3/accounts/1/projects/3/repositories/9/"
        );
        assert!(requests[0].body.is_none());
    }

    #[tokio::test]
    async fn test_get_parses_deploy_key() {
        let transport = Arc::new(RecordingTransport::new());
        transport.respond_with(json!({
            "data": {
                "id": 9,
                "account_id": 1,
                "project_id": 3,
                "remote_url": "git@github.com:acme/analytics.git",
                "state": 1,
                "git_clone_strategy": "deploy_key",
                "repository_credentials_id": null,
                "gitlab_project_id": null,
                "github_installation_id": null,
                "deploy_key": {"id": 5, "account_id": 1, "state": 1, "public_key": "ssh-rsa AAA"}
            },
            "status": {"code": 200}
        }));
        let client = Client::new(transport, "https://host/api", 1);

        let repository = client.get_repository(3, 9).await.unwrap();
        assert_eq!(repository.id, Some(9));
        assert_eq!(repository.deploy_key.unwrap().public_key, "ssh-rsa AAA");
        assert!(repository.repository_credentials_id.is_none());
    }
}

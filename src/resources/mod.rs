//! Reconcilers: one per resource type.
//!
//! A reconciler moves a [`ResourceData`] snapshot between *absent* (no
//! identity) and *present* (identity known, remote entity exists). Every
//! mutation is followed by a read, so the snapshot always reflects what the
//! backend normalized. A read that finds nothing clears the identity instead
//! of failing.

pub mod repository;
pub mod synapse_credential;

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::Client;
use crate::error::ProviderError;
use crate::id::split_id_to_ints;
use crate::schema::Schema;
use crate::state::ResourceData;

pub use repository::RepositoryResource;
pub use synapse_credential::SynapseCredentialResource;

/// Lifecycle contract of a resource type.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Terraform type name, e.g. `dbtcloud_synapse_credential`.
    fn type_name(&self) -> &'static str;

    /// Declarative schema of the resource.
    fn schema(&self) -> Schema;

    /// Cross-field checks that the schema cannot express.
    ///
    /// Runs before any remote call.
    fn validate(&self, data: &ResourceData) -> Result<(), ProviderError> {
        let _ = data;
        Ok(())
    }

    /// Create the remote entity, record its identity, then read it back.
    async fn create(&self, client: &Client, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Refresh the snapshot from the backend; clears the identity when the entity is gone.
    async fn read(&self, client: &Client, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Push changed attributes to the backend, then read it back.
    async fn update(&self, client: &Client, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Remove the remote entity and clear the identity.
    async fn delete(&self, client: &Client, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Adopt an existing entity from its composite identifier.
    ///
    /// A missing entity is an error here, unlike during [`Resource::read`].
    async fn import(&self, client: &Client, id: &str) -> Result<ResourceData, ProviderError> {
        split_id_to_ints(id, self.type_name())?;

        let mut data = ResourceData::with_id(id);
        self.read(client, &mut data).await?;

        if data.is_absent() {
            return Err(ProviderError::NotFound(format!(
                "cannot import {} {id}: it does not exist",
                self.type_name()
            )));
        }
        Ok(data)
    }
}

/// Every resource type the provider manages.
pub fn all_resources() -> Vec<Arc<dyn Resource>> {
    vec![
        Arc::new(SynapseCredentialResource),
        Arc::new(RepositoryResource),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names_are_unique() {
        let mut names: Vec<_> = all_resources().iter().map(|r| r.type_name()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(names.contains(&"dbtcloud_synapse_credential"));
        assert!(names.contains(&"dbtcloud_repository"));
    }

    #[test]
    fn test_project_id_forces_replacement() {
        for resource in all_resources() {
            let schema = resource.schema();
            let project = schema.attribute("project_id").unwrap();
            assert!(project.flags.required, "{}", resource.type_name());
            assert!(project.force_new, "{}", resource.type_name());
        }
    }
}

//! The dbt Cloud provider: dispatches lifecycle calls to reconcilers.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

use crate::client::Client;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::resources::{all_resources, Resource};
use crate::schema::{Diagnostic, ProviderSchema, Schema};
use crate::service::ProviderService;
use crate::state::ResourceData;
use crate::types::{AttributeChange, ImportedResource, PlanResult};
use crate::validation::validate;

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Provider for dbt Cloud resources.
pub struct DbtCloudProvider {
    resources: BTreeMap<&'static str, Arc<dyn Resource>>,
    client: RwLock<Option<Arc<Client>>>,
}

impl Default for DbtCloudProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DbtCloudProvider {
    /// An unconfigured provider managing every known resource type.
    pub fn new() -> Self {
        let resources = all_resources()
            .into_iter()
            .map(|resource| (resource.type_name(), resource))
            .collect();
        Self {
            resources,
            client: RwLock::new(None),
        }
    }

    /// A provider already configured with `client`.
    pub fn with_client(client: Client) -> Self {
        let provider = Self::new();
        Self {
            client: RwLock::new(Some(Arc::new(client))),
            ..provider
        }
    }

    fn resource(&self, resource_type: &str) -> Result<&Arc<dyn Resource>, ProviderError> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    async fn client(&self) -> Result<Arc<Client>, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("provider has not been configured".to_string())
        })
    }
}

fn object_of(value: Value) -> Result<Map<String, Value>, ProviderError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ProviderError::Sdk(format!(
            "expected resource state to be an object, got {other}"
        ))),
    }
}

fn with_defaults(schema: &Schema, state: Value) -> Result<Value, ProviderError> {
    let mut values = object_of(state)?;
    schema.apply_defaults(&mut values);
    Ok(Value::Object(values))
}

fn present(values: &Map<String, Value>, name: &str) -> Option<Value> {
    values.get(name).filter(|v| !v.is_null()).cloned()
}

#[async_trait::async_trait]
impl ProviderService for DbtCloudProvider {
    fn schema(&self) -> ProviderSchema {
        self.resources.values().fold(
            ProviderSchema::new().with_provider_config(ProviderConfig::schema()),
            |schema, resource| schema.with_resource(resource.type_name(), resource.schema()),
        )
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(ProviderConfig::diagnostics_with_env(&config, env_var))
    }

    #[instrument(skip_all, name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = ProviderConfig::diagnostics_with_env(&config, env_var);
        if diagnostics.iter().any(Diagnostic::is_error) {
            error!(errors = diagnostics.len(), "Provider configuration is invalid");
            return Ok(diagnostics);
        }

        let config = ProviderConfig::from_value_with_env(&config, env_var)?;
        let client = Client::from_config(&config)?;
        info!(account_id = config.account_id, host_url = %config.host_url, "Provider configured");

        *self.client.write().await = Some(Arc::new(client));
        Ok(diagnostics)
    }

    #[instrument(skip(self, config), name = "provider.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let schema = resource.schema();

        let mut diagnostics = validate(&schema, &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }

        let data = ResourceData::from_planned(with_defaults(&schema, config)?)?;
        if let Err(err) = resource.validate(&data) {
            diagnostics.push(err.into());
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, prior_state, proposed_state), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = self.resource(resource_type)?.schema();

        let mut planned = object_of(proposed_state)?;
        schema.apply_defaults(&mut planned);

        let prior = prior_state.map(object_of).transpose()?;
        let mut changes = Vec::new();
        let mut requires_replace = false;

        if let Some(prior) = &prior {
            if let Some(id) = present(prior, "id") {
                planned.insert("id".to_string(), id);
            }
            for (name, attr) in &schema.attributes {
                if attr.flags.computed && present(&planned, name).is_none() {
                    if let Some(value) = present(prior, name) {
                        planned.insert(name.clone(), value);
                    }
                }
            }
        }

        for (name, attr) in &schema.attributes {
            if attr.flags.is_computed_only() {
                continue;
            }
            let before = prior.as_ref().and_then(|p| present(p, name));
            let after = present(&planned, name);
            if before == after {
                continue;
            }
            if prior.is_some() && attr.force_new {
                requires_replace = true;
            }
            changes.push(AttributeChange::new(name.clone(), before, after));
        }

        debug!(
            changes = changes.len(),
            requires_replace = requires_replace,
            "Plan completed"
        );
        Ok(PlanResult::with_changes(
            Value::Object(planned),
            changes,
            requires_replace,
        ))
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        info!("Create called");

        let mut data = ResourceData::from_planned(with_defaults(&resource.schema(), planned_state)?)?;
        resource.validate(&data)?;
        if let Err(e) = resource.create(&client, &mut data).await {
            error!(error = %e, "Create failed");
            return Err(e);
        }

        data.to_state().ok_or_else(|| {
            ProviderError::NotFound(format!("{resource_type} vanished right after creation"))
        })
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        debug!("Read called");

        let mut data = ResourceData::from_state(current_state)?;
        resource.read(&client, &mut data).await?;
        Ok(data.to_state())
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        info!("Update called");

        let planned_state = with_defaults(&resource.schema(), planned_state)?;
        let mut data = ResourceData::for_update(prior_state, planned_state)?;
        resource.validate(&data)?;
        if let Err(e) = resource.update(&client, &mut data).await {
            error!(error = %e, "Update failed");
            return Err(e);
        }

        data.to_state().ok_or_else(|| {
            ProviderError::NotFound(format!("{resource_type} {} vanished during update", data.id()))
        })
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        info!("Delete called");

        let mut data = ResourceData::from_state(current_state)?;
        if let Err(e) = resource.delete(&client, &mut data).await {
            error!(error = %e, "Delete failed");
            return Err(e);
        }
        Ok(())
    }

    #[instrument(skip(self), name = "provider.import_resource")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        info!("Import called");

        let data = resource.import(&client, id).await?;
        let state = data.to_state().ok_or_else(|| {
            ProviderError::NotFound(format!("cannot import {resource_type} {id}: it does not exist"))
        })?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }
}

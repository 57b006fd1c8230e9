//! The local snapshot a reconciler works on.
//!
//! [`ResourceData`] wraps one resource instance's attribute values together
//! with its identity and, during updates, the prior state so per-attribute
//! change detection is possible. An empty identity means the resource is
//! absent.

use serde_json::{Map, Value};

use crate::error::ProviderError;

const ID_KEY: &str = "id";

/// Attribute values, identity and prior state of one resource instance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceData {
    id: String,
    attributes: Map<String, Value>,
    prior: Option<Map<String, Value>>,
}

impl ResourceData {
    /// Build a snapshot from a planned state that has no remote identity yet.
    pub fn from_planned(planned: Value) -> Result<Self, ProviderError> {
        let attributes = into_object(planned)?;
        Ok(Self {
            id: String::new(),
            attributes,
            prior: None,
        })
    }

    /// Build a snapshot from a stored state; its `id` attribute is the identity.
    pub fn from_state(state: Value) -> Result<Self, ProviderError> {
        let attributes = into_object(state)?;
        let id = attributes
            .get(ID_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(Self {
            id,
            attributes,
            prior: None,
        })
    }

    /// Build a snapshot for an update: identity from `prior`, values from `planned`.
    pub fn for_update(prior: Value, planned: Value) -> Result<Self, ProviderError> {
        let prior = Self::from_state(prior)?;
        let attributes = into_object(planned)?;
        Ok(Self {
            id: prior.id,
            attributes,
            prior: Some(prior.attributes),
        })
    }

    /// Build an empty snapshot that only knows its identity, as during import.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// The composite identity, empty when absent.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Record the remote identity.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Forget the remote identity; the resource becomes absent.
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    /// Whether no remote identity is known.
    pub fn is_absent(&self) -> bool {
        self.id.is_empty()
    }

    /// Raw value of an attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }

    /// String attribute, empty when unset.
    pub fn get_string(&self, key: &str) -> String {
        self.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Integer attribute. Whole floats are accepted.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        let value = self.get(key)?;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        })
    }

    /// Boolean attribute.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Set an attribute value.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    /// Whether `key` differs between the prior and the planned state.
    ///
    /// Without a prior state (create, read, import) nothing counts as changed.
    pub fn has_change(&self, key: &str) -> bool {
        let Some(prior) = &self.prior else {
            return false;
        };
        let before = prior.get(key).filter(|v| !v.is_null());
        before != self.get(key)
    }

    /// Whether any of `keys` changed.
    pub fn has_any_change(&self, keys: &[&str]) -> bool {
        keys.iter().any(|key| self.has_change(key))
    }

    /// The state to hand back to the host, or `None` when the resource is absent.
    pub fn to_state(&self) -> Option<Value> {
        if self.is_absent() {
            return None;
        }
        let mut state = self.attributes.clone();
        state.insert(ID_KEY.to_string(), Value::String(self.id.clone()));
        Some(Value::Object(state))
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>, ProviderError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ProviderError::Sdk(format!(
            "expected resource state to be an object, got {other}"
        ))),
    }
}

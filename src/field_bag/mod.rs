//! Adapter credential field bags.
//!
//! Adapter-based credentials carry their connection settings as a field bag:
//! a map from field name to `{metadata, value}`. The metadata (label,
//! description, encryption flag, validation, `depends_on` hints) comes from a
//! static per-adapter template that mirrors what the backend expects; only
//! the values change per credential.
//!
//! Fields are kept in a `BTreeMap` so that the same inputs always serialize to
//! the same bytes.

pub mod synapse;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::client::null_as_default;
use crate::error::ProviderError;

pub use synapse::{
    build_synapse_credential_details, infer_authentication, SynapseAuthentication,
    SynapseCredentialInputs,
};

/// A selectable option of a `select` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    /// Display label.
    pub label: String,
    /// Wire value.
    pub value: String,
}

/// Validation rules of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FieldValidation {
    /// Whether the backend requires a value.
    pub required: bool,
}

/// Static description of a field.
///
/// Every member is optional on the wire; the backend does not always return
/// the full metadata on reads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMetadata {
    /// Display label.
    #[serde(deserialize_with = "null_as_default")]
    pub label: String,
    /// Help text.
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    /// Widget type (`text`, `select`, `number`).
    #[serde(deserialize_with = "null_as_default")]
    pub field_type: String,
    /// Whether the backend stores the value encrypted and omits it on reads.
    pub encrypt: bool,
    /// Whether environments may override the value.
    pub overrideable: bool,
    /// Choices of a `select` field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    /// Other field values this field is relevant for.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, Vec<String>>,
    /// Validation rules.
    pub validation: FieldValidation,
}

/// One entry of a field bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialField {
    /// Static metadata from the template.
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: FieldMetadata,
    /// The per-credential value.
    #[serde(default)]
    pub value: Value,
}

/// A complete field bag as sent in `credential_details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CredentialDetails {
    /// Fields keyed by name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: BTreeMap<String, CredentialField>,
    /// Display ordering; the backend accepts an empty list.
    #[serde(default)]
    pub field_order: Vec<String>,
}

impl CredentialDetails {
    /// Parse a template document.
    pub fn from_template(json: &str) -> Result<Self, ProviderError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Copy of this template with every field's value replaced from `values`.
    ///
    /// Metadata is left untouched. A template field missing from `values`
    /// gets `null`.
    pub fn overlay(&self, values: &Map<String, Value>) -> Self {
        let fields = self
            .fields
            .iter()
            .map(|(name, field)| {
                let value = values.get(name).cloned().unwrap_or(Value::Null);
                (
                    name.clone(),
                    CredentialField {
                        metadata: field.metadata.clone(),
                        value,
                    },
                )
            })
            .collect();

        Self {
            fields,
            field_order: Vec::new(),
        }
    }

    /// Value of a field, if the field exists.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).map(|f| &f.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEMPLATE: &str = r#"{
      "fields": {
        "user": {
          "metadata": {
            "label": "User",
            "description": "",
            "field_type": "text",
            "encrypt": false,
            "overrideable": false,
            "validation": {"required": true}
          },
          "value": ""
        },
        "password": {
          "metadata": {
            "label": "Password",
            "description": "",
            "field_type": "text",
            "encrypt": true,
            "overrideable": false,
            "depends_on": {"authentication": ["sql"]},
            "validation": {"required": true}
          },
          "value": ""
        }
      }
    }"#;

    #[test]
    fn test_overlay_replaces_values_only() {
        let template = CredentialDetails::from_template(TEMPLATE).unwrap();
        let values = json!({"user": "alice", "password": "secret"});
        let bag = template.overlay(values.as_object().unwrap());

        assert_eq!(bag.value("user"), Some(&json!("alice")));
        assert_eq!(bag.value("password"), Some(&json!("secret")));
        assert_eq!(bag.fields["password"].metadata, template.fields["password"].metadata);
        assert!(bag.field_order.is_empty());
    }

    #[test]
    fn test_overlay_missing_value_is_null() {
        let template = CredentialDetails::from_template(TEMPLATE).unwrap();
        let bag = template.overlay(&Map::new());
        assert_eq!(bag.value("user"), Some(&Value::Null));
    }

    #[test]
    fn test_optional_metadata_not_serialized_when_empty() {
        let template = CredentialDetails::from_template(TEMPLATE).unwrap();
        let serialized = serde_json::to_value(&template).unwrap();
        let user_meta = &serialized["fields"]["user"]["metadata"];
        assert!(user_meta.get("options").is_none());
        assert!(user_meta.get("depends_on").is_none());
        assert_eq!(
            serialized["fields"]["password"]["metadata"]["depends_on"],
            json!({"authentication": ["sql"]})
        );
    }

    #[test]
    fn test_malformed_template_is_serialization_error() {
        let err = CredentialDetails::from_template("{\"fields\": 3}").unwrap_err();
        assert!(matches!(err, ProviderError::Serialization(_)));
    }
}

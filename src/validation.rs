//! Schema validation helpers.
//!
//! Validates a resource configuration (`serde_json::Value`) against a
//! [`Schema`] before anything reaches the backend: required attributes,
//! attribute types, and conflicting attribute groups.
//!
//! # Example
//!
//! ```
//! use dbtcloud_provider::schema::{Attribute, Schema};
//! use dbtcloud_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("project_id", Attribute::required_int64())
//!     .with_attribute("user", Attribute::optional_string().with_conflicts(&["tenant_id"]))
//!     .with_attribute("tenant_id", Attribute::optional_string().with_conflicts(&["user"]));
//!
//! assert!(validate(&schema, &json!({"project_id": 1, "user": "alice"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"project_id": 1, "user": "a", "tenant_id": "t"}));
//! assert_eq!(diagnostics.len(), 1);
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, DiagnosticSeverity, Schema};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Two attributes declared as conflicting may not both be set
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        },
    };

    for (name, attr) in &schema.attributes {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }
    validate_conflicts(schema, obj, &mut diagnostics);

    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            let matches = match attr.attr_type {
                AttributeType::String => v.is_string(),
                AttributeType::Int64 => is_int64(v),
                AttributeType::Bool => v.is_boolean(),
            };
            if !matches {
                diagnostics.push(type_error(path, attr.attr_type, v));
            }
        },
    }
}

fn validate_conflicts(schema: &Schema, obj: &Map<String, Value>, diagnostics: &mut Vec<Diagnostic>) {
    // Conflicts are usually declared on both sides; report each pair once.
    let mut reported = BTreeSet::new();

    for (name, attr) in &schema.attributes {
        if !is_set(obj.get(name)) {
            continue;
        }
        for other in &attr.conflicts_with {
            if !is_set(obj.get(other)) {
                continue;
            }
            let pair = if name < other {
                (name.as_str(), other.as_str())
            } else {
                (other.as_str(), name.as_str())
            };
            if reported.insert(pair) {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Conflicting attributes '{}' and '{}'",
                        pair.0, pair.1
                    ))
                    .with_detail(format!("\"{name}\": conflicts with {other}"))
                    .with_attribute(name),
                );
            }
        }
    }
}

// An empty string counts as unset: optional strings default to "".
fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.as_i64().is_some() {
                true
            } else if let Some(f) = n.as_f64() {
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: AttributeType, got: &Value) -> Diagnostic {
    let expected = match expected {
        AttributeType::String => "string",
        AttributeType::Int64 => "int64",
        AttributeType::Bool => "bool",
    };
    Diagnostic {
        severity: DiagnosticSeverity::Error,
        summary: format!("Invalid type for attribute '{}'", path),
        detail: Some(format!("Expected {}, got {}", expected, value_type_name(got))),
        attribute: Some(path.to_string()),
    }
}

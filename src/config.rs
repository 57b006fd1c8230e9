//! Provider configuration.
//!
//! Values come from the provider configuration block first and fall back to
//! environment variables:
//!
//! | attribute         | environment variable    |
//! |-------------------|-------------------------|
//! | `account_id`      | `DBT_CLOUD_ACCOUNT_ID`  |
//! | `token`           | `DBT_CLOUD_TOKEN`       |
//! | `host_url`        | `DBT_CLOUD_HOST_URL`    |
//!
//! `host_url` defaults to [`DEFAULT_HOST_URL`].

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Environment variable holding the account ID.
pub const ENV_ACCOUNT_ID: &str = "DBT_CLOUD_ACCOUNT_ID";
/// Environment variable holding the API token.
pub const ENV_TOKEN: &str = "DBT_CLOUD_TOKEN";
/// Environment variable holding the API base URL.
pub const ENV_HOST_URL: &str = "DBT_CLOUD_HOST_URL";

/// API base URL used when none is configured.
pub const DEFAULT_HOST_URL: &str = "https://cloud.getdbt.com/api";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    account_id: Option<i64>,
    token: Option<String>,
    host_url: Option<String>,
    timeout_seconds: Option<u64>,
}

/// Resolved provider configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// dbt Cloud account every request is scoped to.
    pub account_id: i64,
    /// API token sent as a bearer token.
    pub token: String,
    /// API base URL, e.g. `https://cloud.getdbt.com/api`.
    pub host_url: String,
    /// Per-request timeout.
    pub timeout_seconds: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("account_id", &self.account_id)
            .field("token", &"<redacted>")
            .field("host_url", &self.host_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl ProviderConfig {
    /// Configuration for `account_id` with the default host and timeout.
    pub fn new(account_id: i64, token: impl Into<String>) -> Self {
        Self {
            account_id,
            token: token.into(),
            host_url: DEFAULT_HOST_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Override the API base URL.
    pub fn with_host_url(mut self, host_url: impl Into<String>) -> Self {
        self.host_url = host_url.into();
        self
    }

    /// Resolve the configuration block against an explicit environment lookup.
    pub fn from_value_with_env<F>(config: &Value, env: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (resolved, diagnostics) = resolve(config, &env);
        match resolved {
            Some(config) => Ok(config),
            None => {
                let details: Vec<String> = diagnostics
                    .into_iter()
                    .map(|d| d.detail.unwrap_or(d.summary))
                    .collect();
                Err(ProviderError::Configuration(details.join("; ")))
            },
        }
    }

    /// Check a configuration block without building a configuration.
    pub fn diagnostics_with_env<F>(config: &Value, env: F) -> Vec<Diagnostic>
    where
        F: Fn(&str) -> Option<String>,
    {
        resolve(config, &env).1
    }

    /// Schema of the provider configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("dbt Cloud provider configuration")
            .with_attribute(
                "account_id",
                Attribute::optional_int64()
                    .with_description(format!("Account ID. Falls back to {ENV_ACCOUNT_ID}.")),
            )
            .with_attribute(
                "token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!("API token. Falls back to {ENV_TOKEN}.")),
            )
            .with_attribute(
                "host_url",
                Attribute::optional_string().with_description(format!(
                    "API base URL. Falls back to {ENV_HOST_URL}, then {DEFAULT_HOST_URL}."
                )),
            )
            .with_attribute(
                "timeout_seconds",
                Attribute::optional_int64().with_description("Per-request timeout in seconds."),
            )
    }
}

fn resolve<F>(config: &Value, env: &F) -> (Option<ProviderConfig>, Vec<Diagnostic>)
where
    F: Fn(&str) -> Option<String>,
{
    let raw = match config {
        Value::Null => RawConfig::default(),
        other => match RawConfig::deserialize(other) {
            Ok(raw) => raw,
            Err(e) => {
                return (
                    None,
                    vec![Diagnostic::error("Invalid provider configuration").with_detail(e.to_string())],
                )
            },
        },
    };

    let mut diagnostics = Vec::new();

    let account_id = match raw.account_id {
        Some(id) => Some(id),
        None => match env(ENV_ACCOUNT_ID).filter(|v| !v.is_empty()) {
            Some(value) => match value.trim().parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    diagnostics.push(
                        Diagnostic::error("Invalid account ID")
                            .with_detail(format!("{ENV_ACCOUNT_ID} must be an integer, got '{value}'"))
                            .with_attribute("account_id"),
                    );
                    None
                },
            },
            None => {
                diagnostics.push(
                    Diagnostic::error("Missing account ID")
                        .with_detail(format!("set account_id or {ENV_ACCOUNT_ID}"))
                        .with_attribute("account_id"),
                );
                None
            },
        },
    };

    let token = raw
        .token
        .filter(|t| !t.is_empty())
        .or_else(|| env(ENV_TOKEN).filter(|t| !t.is_empty()));
    if token.is_none() {
        diagnostics.push(
            Diagnostic::error("Missing API token")
                .with_detail(format!("set token or {ENV_TOKEN}"))
                .with_attribute("token"),
        );
    }

    let host_url = raw
        .host_url
        .filter(|h| !h.is_empty())
        .or_else(|| env(ENV_HOST_URL).filter(|h| !h.is_empty()))
        .unwrap_or_else(|| DEFAULT_HOST_URL.to_string());

    let timeout_seconds = raw.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS);
    if timeout_seconds == 0 {
        diagnostics.push(
            Diagnostic::error("Invalid timeout")
                .with_detail("timeout_seconds must be greater than zero")
                .with_attribute("timeout_seconds"),
        );
    }

    match (account_id, token) {
        (Some(account_id), Some(token)) if diagnostics.is_empty() => (
            Some(ProviderConfig {
                account_id,
                token,
                host_url,
                timeout_seconds,
            }),
            diagnostics,
        ),
        _ => (None, diagnostics),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_explicit_values_win_over_env() {
        let env = env_from(&[(ENV_ACCOUNT_ID, "1"), (ENV_TOKEN, "env-token")]);
        let config = ProviderConfig::from_value_with_env(
            &json!({"account_id": 42, "token": "cfg-token", "host_url": "https://emea.dbt.com/api"}),
            env,
        )
        .unwrap();

        assert_eq!(config.account_id, 42);
        assert_eq!(config.token, "cfg-token");
        assert_eq!(config.host_url, "https://emea.dbt.com/api");
        assert_eq!(config.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
    }

    #[test]
    fn test_env_fallback_and_default_host() {
        let env = env_from(&[(ENV_ACCOUNT_ID, " 7 "), (ENV_TOKEN, "env-token")]);
        let config = ProviderConfig::from_value_with_env(&Value::Null, env).unwrap();

        assert_eq!(config.account_id, 7);
        assert_eq!(config.token, "env-token");
        assert_eq!(config.host_url, DEFAULT_HOST_URL);
    }

    #[test]
    fn test_missing_values_reported_per_attribute() {
        let diagnostics = ProviderConfig::diagnostics_with_env(&json!({}), env_from(&[]));
        let attributes: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        assert_eq!(attributes, vec!["account_id", "token"]);
        assert!(diagnostics.iter().all(Diagnostic::is_error));

        let err = ProviderConfig::from_value_with_env(&json!({}), env_from(&[])).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.message().contains(ENV_TOKEN));
    }

    #[test]
    fn test_non_numeric_env_account_id() {
        let env = env_from(&[(ENV_ACCOUNT_ID, "abc"), (ENV_TOKEN, "t")]);
        let diagnostics = ProviderConfig::diagnostics_with_env(&Value::Null, env);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid account ID");
    }

    #[test]
    fn test_wrong_types_rejected() {
        let diagnostics =
            ProviderConfig::diagnostics_with_env(&json!({"account_id": "seven"}), env_from(&[]));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid provider configuration");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let diagnostics = ProviderConfig::diagnostics_with_env(
            &json!({"account_id": 1, "token": "t", "timeout_seconds": 0}),
            env_from(&[]),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("timeout_seconds"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ProviderConfig::new(1, "super-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_schema_marks_token_sensitive() {
        let schema = ProviderConfig::schema();
        let sensitive: Vec<_> = schema.sensitive_attributes().collect();
        assert_eq!(sensitive, vec!["token"]);
    }
}

//! dbt Cloud provider
//!
//! Reconciles declarative dbt Cloud resources against the dbt Cloud v3 REST
//! API. A host (typically a Terraform-style engine) drives the lifecycle
//! through [`ProviderService`]; [`DbtCloudProvider`] dispatches each call to
//! the reconciler of the resource type involved.
//!
//! # Overview
//!
//! - **Schema types**: attribute declarations with defaults, force-new and
//!   conflicting groups ([`schema`], [`validation`])
//! - **Resource data**: the local snapshot with change detection ([`state`])
//! - **Composite IDs**: `<project_id>:<entity_id>` ([`id`])
//! - **Field bags**: templated adapter credential details ([`field_bag`])
//! - **Client**: the v3 API over a pluggable [`Transport`] ([`client`])
//! - **Reconcilers**: `dbtcloud_synapse_credential`, `dbtcloud_repository` ([`resources`])
//! - **Logging**: `tracing` on stderr ([`logging`])
//!
//! # Quick Start
//!
//! ```ignore
//! use dbtcloud_provider::{init_logging, DbtCloudProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = DbtCloudProvider::new();
//!     provider.configure(json!({"account_id": 1, "token": "dbtc_..."})).await?;
//!
//!     let state = provider
//!         .create("dbtcloud_synapse_credential", json!({
//!             "project_id": 3,
//!             "user": "alice",
//!             "password": "secret",
//!             "schema": "analytics"
//!         }))
//!         .await?;
//!     println!("created {}", state["id"]);
//!     Ok(())
//! }
//! ```
//!
//! # Soft deletes and write-only fields
//!
//! Credentials are never removed: deleting one re-submits it with
//! `state = 2`. Secrets (`password`, `client_secret`) are accepted on writes
//! but never returned by reads, so reads keep the values already held in
//! state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod field_bag;
pub mod id;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod service;
pub mod state;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::{Client, HttpTransport, Transport};
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use id::{format_id, split_id_to_ints, ID_DELIMITER};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::DbtCloudProvider;
pub use resources::Resource;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use state::ResourceData;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;

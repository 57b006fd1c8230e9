//! Error types for the dbt Cloud provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Prefix the transport puts on messages for entities the backend does not know.
///
/// Reconcilers rely on this prefix (through [`ProviderError::from_remote`]) to
/// tell "deleted out-of-band" apart from every other failure.
pub const RESOURCE_NOT_FOUND_PREFIX: &str = "resource-not-found";

/// Errors that can occur while reconciling resources.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote entity does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A cross-field constraint was violated before any remote call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A composite identifier could not be split into its integer parts.
    #[error("Invalid ID: {0}")]
    InvalidId(String),

    /// The provider configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request could not be performed.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status. Holds the remote text verbatim.
    #[error("Remote API error: {0}")]
    Remote(String),

    /// An internal provider error occurred.
    #[error("Provider error: {0}")]
    Sdk(String),
}

impl ProviderError {
    /// Classify an error message coming back from the backend.
    ///
    /// Messages starting with [`RESOURCE_NOT_FOUND_PREFIX`] become
    /// [`ProviderError::NotFound`]; anything else is a [`ProviderError::Remote`].
    ///
    /// # Examples
    ///
    /// ```
    /// use dbtcloud_provider::ProviderError;
    ///
    /// let err = ProviderError::from_remote("resource-not-found: credential 12");
    /// assert!(err.is_not_found());
    ///
    /// let err = ProviderError::from_remote("500 Internal Server Error: boom");
    /// assert!(!err.is_not_found());
    /// ```
    pub fn from_remote(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.starts_with(RESOURCE_NOT_FOUND_PREFIX) {
            Self::NotFound(message)
        } else {
            Self::Remote(message)
        }
    }

    /// Whether this error means the remote entity is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::InvalidId(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Transport(_err) => "transport error (see Debug output)",
            Self::Remote(msg) => msg,
            Self::Sdk(msg) => msg,
        }
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Validation(msg) => {
                Diagnostic::error("Invalid resource configuration").with_detail(msg)
            },
            ProviderError::Configuration(msg) => {
                Diagnostic::error("Invalid provider configuration").with_detail(msg)
            },
            other => Diagnostic::error(other.to_string()),
        }
    }
}

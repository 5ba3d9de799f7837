//! Error types for the load balancer reconciler
//!
//! This module defines all error types used throughout the crate.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciler
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value failed a local check (enum mismatch, empty name, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A required field of a configuration record was absent or empty
    #[error("Missing required field `{field}` on {kind}")]
    MissingField {
        /// Sub-resource kind (e.g. "probe")
        kind: &'static str,
        /// Field name as declared in configuration
        field: &'static str,
    },

    /// Malformed resource identifier in accumulated state
    #[error("Invalid resource ID: {0}")]
    ResourceId(String),

    /// Transport or provider failure, with enough context to diagnose
    #[error("Error during {operation} of load balancer {name} (resource group {scope}): {message}")]
    Provider {
        /// Operation that failed (get, create_or_update, delete)
        operation: String,
        /// Owning scope (resource group)
        scope: String,
        /// Resource name
        name: String,
        /// Error message
        message: String,
    },

    /// The provider answered but the payload does not have the expected shape
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// CreateOrUpdate reported success but no identifier could be read back
    #[error("Cannot read load balancer {name} (resource group {scope}) ID")]
    MissingRemoteId {
        /// Owning scope (resource group)
        scope: String,
        /// Resource name
        name: String,
    },

    /// Provisioning reached a terminal status other than success
    #[error("Load balancer {name} provisioning failed with status {status}")]
    ProvisioningFailed {
        /// Resource name
        name: String,
        /// Last observed provisioning status
        status: String,
    },

    /// Provisioning did not reach a terminal status in time
    #[error("Timed out after {timeout:?} waiting for load balancer {name} to become available")]
    ProvisioningTimeout {
        /// Resource name
        name: String,
        /// Configured bound
        timeout: Duration,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a missing-field error
    pub fn missing_field(kind: &'static str, field: &'static str) -> Self {
        Self::MissingField { kind, field }
    }

    /// Create a resource identifier error
    pub fn resource_id(msg: impl Into<String>) -> Self {
        Self::ResourceId(msg.into())
    }

    /// Create a provider error carrying operation context
    pub fn provider(
        operation: impl Into<String>,
        scope: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            operation: operation.into(),
            scope: scope.into(),
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a malformed-response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Whether this error was raised locally, before any remote call
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::MissingField { .. })
    }

    /// Whether this error represents a provisioning timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ProvisioningTimeout { .. })
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

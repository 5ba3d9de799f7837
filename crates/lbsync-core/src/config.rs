//! Configuration types for the reconciler
//!
//! This module defines the configuration structures used throughout the crate.
//! Load balancer declarations themselves are [`crate::resource::LoadBalancer`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use crate::resource::LoadBalancer;

/// Main reconciler configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LbsyncConfig {
    /// Remote provider configuration
    pub provider: ProviderConfig,

    /// State store configuration
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Declared load balancers
    #[serde(default)]
    pub load_balancers: Vec<LoadBalancer>,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl LbsyncConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    ///
    /// Every declared load balancer goes through its local checks here, so an
    /// invalid declaration is rejected before any remote call.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.load_balancers.is_empty() {
            return Err(crate::Error::config("No load balancers configured"));
        }

        self.provider.validate()?;
        self.state_store.validate()?;
        self.engine.validate()?;

        let mut keys = HashSet::new();
        for lb in &self.load_balancers {
            lb.validate()?;
            if !keys.insert(lb.state_key()) {
                return Err(crate::Error::config(format!(
                    "Load balancer {} declared more than once",
                    lb.state_key()
                )));
            }
        }

        Ok(())
    }
}

/// Remote provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Azure Resource Manager
    Azure {
        /// Subscription owning the resource groups
        subscription_id: String,
        /// OAuth bearer token
        access_token: String,
        /// Management endpoint override
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
        /// API version override
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_version: Option<String>,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Azure {
                subscription_id,
                access_token,
                ..
            } => {
                if subscription_id.is_empty() {
                    return Err(crate::Error::config("Azure subscription ID cannot be empty"));
                }
                if access_token.is_empty() {
                    return Err(crate::Error::config("Azure access token cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Azure { .. } => "azure",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Azure {
            subscription_id: String::new(),
            access_token: String::new(),
            endpoint: None,
            api_version: None,
        }
    }
}

// The access token must never reach logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Azure {
                subscription_id,
                endpoint,
                api_version,
                ..
            } => f
                .debug_struct("Azure")
                .field("subscription_id", subscription_id)
                .field("access_token", &"<redacted>")
                .field("endpoint", endpoint)
                .field("api_version", api_version)
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", &"<opaque>")
                .finish(),
        }
    }
}

/// State store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// File-based state store
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory state store (not persistent)
    #[default]
    Memory,

    /// Custom state store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StateStoreConfig {
    /// Validate the state store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StateStoreConfig::File { path } if path.is_empty() => {
                Err(crate::Error::config("State file path cannot be empty"))
            }
            StateStoreConfig::Custom { factory, .. } if factory.is_empty() => Err(
                crate::Error::config("Custom state store factory cannot be empty"),
            ),
            _ => Ok(()),
        }
    }

    /// Get the state store type name
    pub fn type_name(&self) -> &str {
        match self {
            StateStoreConfig::File { .. } => "file",
            StateStoreConfig::Memory => "memory",
            StateStoreConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay between provisioning polls (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Upper bound on a provisioning wait (in seconds)
    #[serde(default = "default_provisioning_timeout_secs")]
    pub provisioning_timeout_secs: u64,

    /// Capacity of the reconcile event channel
    ///
    /// When full, new events are dropped (with a warning log). Lifecycle
    /// operations never wait on observers.
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }
        if self.provisioning_timeout_secs == 0 {
            return Err(crate::Error::config("Provisioning timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Provisioning timeout as a duration
    pub fn provisioning_timeout(&self) -> Duration {
        Duration::from_secs(self.provisioning_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            provisioning_timeout_secs: default_provisioning_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_provisioning_timeout_secs() -> u64 {
    600
}

fn default_event_channel_capacity() -> usize {
    1000
}

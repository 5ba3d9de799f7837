//! Plugin-based client registry
//!
//! Remote clients and state stores are registered by type name at runtime, so
//! the host builds them from configuration instead of hard-coding providers.
//!
//! ## Registration
//!
//! Provider crates register themselves during initialization:
//!
//! ```rust,ignore
//! // In lbsync-provider-azure
//! pub fn register(registry: &ClientRegistry) {
//!     registry.register_client("azure", Box::new(AzureClientFactory));
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::{ProviderConfig, StateStoreConfig};
use crate::error::{Error, Result};
use crate::state::{FileStateStoreFactory, MemoryStateStoreFactory};
use crate::traits::{LoadBalancerClient, LoadBalancerClientFactory, StateStore, StateStoreFactory};

/// Registry of client and state store factories
///
/// Uses interior mutability so a shared reference is enough to register.
#[derive(Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<String, Arc<dyn LoadBalancerClientFactory>>>,
    state_stores: RwLock<HashMap<String, Arc<dyn StateStoreFactory>>>,
}

impl ClientRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `memory` and `file` state stores registered
    pub fn with_builtin_state_stores() -> Self {
        let registry = Self::new();
        registry.register_state_store("memory", Box::new(MemoryStateStoreFactory));
        registry.register_state_store("file", Box::new(FileStateStoreFactory));
        registry
    }

    /// Register a remote client factory under a provider type name
    pub fn register_client(
        &self,
        name: impl Into<String>,
        factory: Box<dyn LoadBalancerClientFactory>,
    ) {
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), Arc::from(factory));
    }

    /// Register a state store factory under a store type name
    pub fn register_state_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn StateStoreFactory>,
    ) {
        self.state_stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), Arc::from(factory));
    }

    /// Create a remote client from configuration
    ///
    /// The client is returned behind an `Arc` because every concurrently
    /// reconciled aggregate shares it.
    pub fn create_client(&self, config: &ProviderConfig) -> Result<Arc<dyn LoadBalancerClient>> {
        let provider_type = config.type_name();
        let factory = self
            .clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(provider_type)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config).map(Arc::from)
    }

    /// Create a state store from configuration
    pub async fn create_state_store(&self, config: &StateStoreConfig) -> Result<Box<dyn StateStore>> {
        let store_type = config.type_name();
        // Clone the factory out so the lock is not held across the await.
        let factory = self
            .state_stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(store_type)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown state store type: {}", store_type)))?;

        let config_json = match config {
            StateStoreConfig::Custom { config, .. } => config.clone(),
            other => serde_json::to_value(other)?,
        };

        factory.create(&config_json).await
    }

    /// List registered provider types
    pub fn list_clients(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// List registered state store types
    pub fn list_state_stores(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state_stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_client(&self, name: &str) -> bool {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Check if a state store type is registered
    pub fn has_state_store(&self, name: &str) -> bool {
        self.state_stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

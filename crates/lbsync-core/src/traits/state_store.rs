// # State Store Trait
//
// Persistence of the "last known" configuration object between invocations.
//
// The reconciler itself keeps nothing across calls. The host stores what a
// lifecycle operation hands back and passes it in again next time, which is
// how a later Read can find the remote identifier to refresh.
//
// Records are keyed by `{resource_group}/{name}`
// (see [`LoadBalancer::state_key`](crate::resource::LoadBalancer::state_key)).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resource::LoadBalancer;

/// Last-known state of one aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Configuration object as returned by the last successful operation
    pub resource: LoadBalancer,
    /// When that operation finished
    pub last_reconciled: DateTime<Utc>,
}

impl StateRecord {
    /// Record `resource` as reconciled now
    pub fn new(resource: LoadBalancer) -> Self {
        Self {
            resource,
            last_reconciled: Utc::now(),
        }
    }
}

/// Trait for state store implementations
///
/// All methods must be safe to call concurrently from multiple tasks; the host
/// reconciles each aggregate on its own task and they share one store.
///
/// Implementations may buffer writes. `flush()` must persist everything that
/// was accepted before it was called.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the record stored under `key`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(StateRecord))`: The stored record
    /// - `Ok(None)`: No record found
    /// - `Err(Error)`: Storage error
    async fn get(&self, key: &str) -> Result<Option<StateRecord>, crate::Error>;

    /// Create or replace the record stored under `key`
    async fn put(&self, key: &str, record: &StateRecord) -> Result<(), crate::Error>;

    /// Delete a record (succeeds if it didn't exist)
    async fn delete(&self, key: &str) -> Result<(), crate::Error>;

    /// List all keys in the store
    async fn list(&self) -> Result<Vec<String>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}

/// Helper trait for constructing state stores from configuration
///
/// Construction is async because file-backed stores load their state up front.
#[async_trait]
pub trait StateStoreFactory: Send + Sync {
    /// Create a StateStore instance from its configuration section
    async fn create(&self, config: &serde_json::Value)
    -> Result<Box<dyn StateStore>, crate::Error>;
}

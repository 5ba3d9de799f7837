// # lbsync-core
//
// Core library for declaratively managed load balancers.
//
// ## Architecture Overview
//
// - **hash / resource**: configuration records and the identity-hashed sets
//   that hold them
// - **model**: the remote provider's wire model
// - **mapper**: expand (configuration -> wire) and flatten (wire -> configuration)
// - **validate**: local field checks run before any remote call
// - **resource_id**: codec for remote resource identifiers
// - **LoadBalancerClient**: trait for the remote Get/CreateOrUpdate/Delete API
// - **ProvisioningPoller**: waits for long-running remote operations
// - **Reconciler**: lifecycle entry points (create, update, read, delete)
// - **ClientRegistry**: plugin-based construction of clients and state stores
// - **StateStore**: host-side persistence of last-known configuration
//
// ## Design Principles
//
// 1. **Library-First**: the host binary is a thin shell over this crate
// 2. **Stateless core**: every read re-fetches; nothing is cached between calls
// 3. **Plugin-Based**: providers are registered by name, not matched in if-else

pub mod config;
pub mod engine;
pub mod error;
pub mod hash;
pub mod mapper;
pub mod model;
pub mod poller;
pub mod registry;
pub mod resource;
pub mod resource_id;
pub mod state;
pub mod traits;
pub mod validate;

// Re-export core types for convenience
pub use config::{EngineConfig, LbsyncConfig, ProviderConfig, StateStoreConfig};
pub use engine::{AttachedRecord, ReconcileEvent, ReconcileState, Reconciler, SubResourceKind};
pub use error::{Error, Result};
pub use hash::Identity;
pub use poller::{ProvisioningPoller, ProvisioningStatus};
pub use registry::ClientRegistry;
pub use resource::{IdentitySet, LoadBalancer};
pub use resource_id::ResourceId;
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{LoadBalancerClient, LoadBalancerClientFactory, StateRecord, StateStore};

//! Core traits for the reconciler
//!
//! - [`LoadBalancerClient`]: Remote resource client (Get/CreateOrUpdate/Delete)
//! - [`StateStore`]: Host-side persistence of last-known configuration

pub mod client;
pub mod state_store;

pub use client::{LoadBalancerClient, LoadBalancerClientFactory};
pub use state_store::{StateRecord, StateStore, StateStoreFactory};

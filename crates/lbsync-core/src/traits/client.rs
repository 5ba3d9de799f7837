// # Remote Resource Client Trait
//
// Defines the interface the reconciler uses to talk to the remote provider.
//
// ## Implementations
//
// - Azure Resource Manager: `lbsync-provider-azure` crate
//
// ## Usage
//
// ```rust,ignore
// use lbsync_core::LoadBalancerClient;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let client = /* LoadBalancerClient implementation */;
//
//     match client.get("rg-prod", "lb-web").await? {
//         Some(lb) => println!("state: {:?}", lb.provisioning_state()),
//         None => println!("gone"),
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::model::LoadBalancer;

/// Trait for remote resource client implementations
///
/// The aggregate is addressed by `(scope, name)`, where scope is the owning
/// resource group. There are no independent sub-resource endpoints: every
/// change to a frontend, pool, rule, probe or NAT rule is a PUT of the whole
/// aggregate.
///
/// # Thread Safety
///
/// One client is shared by every concurrently reconciled aggregate, so
/// implementations must be safe for concurrent use.
///
/// # Responsibilities
///
/// - Perform the HTTP call and map the status to a result
/// - Carry operation, scope and name in every error
///
/// Retry, backoff and provisioning waits belong to the caller. A client that
/// sleeps or retries internally breaks the poller's timeout bound.
#[async_trait]
pub trait LoadBalancerClient: Send + Sync {
    /// Fetch the aggregate
    ///
    /// # Returns
    ///
    /// - `Ok(Some(model))`: The remote resource
    /// - `Ok(None)`: The provider reported not found
    /// - `Err(Error)`: Any other failure
    async fn get(&self, scope: &str, name: &str) -> Result<Option<LoadBalancer>, crate::Error>;

    /// Create or fully replace the aggregate
    ///
    /// Returns the model the provider echoed back, which may still be
    /// provisioning.
    async fn create_or_update(
        &self,
        scope: &str,
        name: &str,
        model: &LoadBalancer,
    ) -> Result<LoadBalancer, crate::Error>;

    /// Delete the aggregate
    ///
    /// Blocks until the provider has accepted the request, not until the
    /// resource is gone. Deleting something already absent succeeds.
    async fn delete(&self, scope: &str, name: &str) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing clients from configuration
pub trait LoadBalancerClientFactory: Send + Sync {
    /// Create a client from the provider section of the configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn LoadBalancerClient>, crate::Error>;
}

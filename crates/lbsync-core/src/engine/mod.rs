//! Reconciliation orchestrator
//!
//! The [`Reconciler`] owns the lifecycle entry points the host calls: create,
//! update, read and delete for the aggregate, plus the narrower
//! sub-resource-scoped variants in [`sub_resource`].
//!
//! ## State machine
//!
//! ```text
//!            create/update
//!  Absent ───────────────▶ Creating ──▶ Polling ──▶ Succeeded
//!    ▲                         │           │
//!    │ read: not found         └───────────┴──────▶ Failed
//!    │
//!  Succeeded ──delete──▶ Deleted
//!        └─────────────▶ Failed
//! ```
//!
//! Each call runs to completion on the calling task. Nothing is cached between
//! calls; the configuration object passed in is mutated in place to reflect
//! what the remote reported.
//!
//! ## Events
//!
//! Transitions and poll observations are emitted as [`ReconcileEvent`]s on a
//! bounded channel. A full channel drops the event with a warning; lifecycle
//! operations never wait on observers.

pub mod sub_resource;

pub use sub_resource::{AttachedRecord, SubResourceKind};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::mapper;
use crate::model;
use crate::poller::ProvisioningPoller;
use crate::resource::LoadBalancer;
use crate::resource_id::ResourceId;
use crate::traits::LoadBalancerClient;

/// Lifecycle state of one aggregate within a single operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconcileState {
    /// Not present remotely
    Absent,
    /// CreateOrUpdate issued
    Creating,
    /// Waiting for provisioning to settle
    Polling,
    /// Present and provisioned
    Succeeded,
    /// The operation failed
    Failed,
    /// Delete accepted by the remote
    Deleted,
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Absent => "absent",
            Self::Creating => "creating",
            Self::Polling => "polling",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// Events emitted by the Reconciler
///
/// `resource` is the `{resource_group}/{name}` key of the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Lifecycle transition
    StateChanged {
        resource: String,
        from: ReconcileState,
        to: ReconcileState,
    },

    /// One provisioning read
    PollObserved {
        resource: String,
        status: String,
        attempt: u32,
    },

    /// A sub-resource was merged into (or dropped from) the aggregate
    SubResourceMerged {
        resource: String,
        kind: &'static str,
        name: String,
    },

    /// A read found the aggregate (or a sub-resource) gone
    Absent { resource: String },
}

/// Lifecycle entry points for load balancers
///
/// Holds the remote client and the poller; carries no per-aggregate state, so
/// one reconciler can serve concurrent operations on different aggregates.
/// Serializing operations on the same aggregate is the host's job.
#[derive(Clone)]
pub struct Reconciler {
    client: Arc<dyn LoadBalancerClient>,
    poller: ProvisioningPoller,
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Reconciler {
    /// Create a reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver)
    pub fn new(
        client: Arc<dyn LoadBalancerClient>,
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        config.validate()?;

        Self::with_timing(
            client,
            config.poll_interval(),
            config.provisioning_timeout(),
            config.event_channel_capacity,
        )
    }

    /// Create a reconciler with explicit poll timing
    ///
    /// Sub-second intervals are only reachable through this constructor. A
    /// zero interval or timeout is rejected here, before any remote call.
    pub fn with_timing(
        client: Arc<dyn LoadBalancerClient>,
        poll_interval: Duration,
        provisioning_timeout: Duration,
        event_channel_capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        let poller = ProvisioningPoller::new(client.clone(), poll_interval, provisioning_timeout)?;
        let (tx, rx) = mpsc::channel(event_channel_capacity.max(1));

        Ok((
            Self {
                client,
                poller,
                event_tx: tx,
            },
            rx,
        ))
    }

    /// Create the aggregate
    pub async fn create(&self, lb: &mut LoadBalancer) -> Result<()> {
        self.create_or_update(lb).await
    }

    /// Update the aggregate (a full replace of its declared shape)
    pub async fn update(&self, lb: &mut LoadBalancer) -> Result<()> {
        self.create_or_update(lb).await
    }

    /// Submit the declared shape and wait for provisioning
    ///
    /// Kinds with no declared records are left out of the request, not
    /// cleared. On success `lb` holds the remote identifier and the flattened
    /// remote state.
    pub async fn create_or_update(&self, lb: &mut LoadBalancer) -> Result<()> {
        lb.validate()?;
        let outbound = mapper::expand_load_balancer(lb)?;

        let key = lb.state_key();
        let scope = lb.resource_group_name.clone();
        let name = lb.name.clone();
        let from = if lb.exists() {
            ReconcileState::Succeeded
        } else {
            ReconcileState::Absent
        };

        self.transition(&key, from, ReconcileState::Creating);
        info!(
            provider = self.client.provider_name(),
            "Creating or updating load balancer {}",
            key
        );

        let result = self.submit(&key, &scope, &name, &outbound).await;
        let id = match result {
            Ok(id) => id,
            Err(e) => {
                self.transition(&key, ReconcileState::Creating, ReconcileState::Failed);
                return Err(e);
            }
        };
        lb.id = Some(id);

        self.transition(&key, ReconcileState::Creating, ReconcileState::Polling);
        if let Err(e) = self.wait(&key, &scope, &name).await {
            self.transition(&key, ReconcileState::Polling, ReconcileState::Failed);
            return Err(e);
        }
        self.transition(&key, ReconcileState::Polling, ReconcileState::Succeeded);

        self.read(lb).await
    }

    /// Refresh the aggregate from the remote
    ///
    /// A remote "not found" is not an error: the identifier is cleared so the
    /// host knows to re-create.
    pub async fn read(&self, lb: &mut LoadBalancer) -> Result<()> {
        let Some(raw_id) = lb.id.clone().filter(|id| !id.is_empty()) else {
            debug!("Load balancer {} has no remote ID, nothing to read", lb.state_key());
            return Ok(());
        };

        let id = ResourceId::from_str(&raw_id)?;
        let scope = id.resource_group.clone();
        let name = id.load_balancer_name()?.to_string();

        let Some(remote) = self.fetch(&scope, &name).await? else {
            info!("Load balancer {}/{} no longer exists", scope, name);
            lb.id = None;
            self.emit_event(ReconcileEvent::Absent {
                resource: format!("{}/{}", scope, name),
            });
            return Ok(());
        };

        lb.name = name;
        lb.resource_group_name = scope;
        if let Some(remote_id) = remote.id.clone().filter(|id| !id.is_empty()) {
            lb.id = Some(remote_id);
        }
        mapper::flatten_into(&remote, lb)?;

        debug!("Read load balancer {}", lb.state_key());
        Ok(())
    }

    /// Delete the aggregate
    ///
    /// Returns once the remote has accepted the delete; there is no
    /// provisioning wait.
    pub async fn delete(&self, lb: &mut LoadBalancer) -> Result<()> {
        let (scope, name) = match lb.id.as_deref().filter(|id| !id.is_empty()) {
            Some(raw_id) => {
                let id = ResourceId::from_str(raw_id)?;
                (id.resource_group.clone(), id.load_balancer_name()?.to_string())
            }
            None => (lb.resource_group_name.clone(), lb.name.clone()),
        };
        let key = format!("{}/{}", scope, name);

        info!("Deleting load balancer {}", key);
        if let Err(e) = self.client.delete(&scope, &name).await {
            self.transition(&key, ReconcileState::Succeeded, ReconcileState::Failed);
            return Err(e);
        }

        lb.id = None;
        self.transition(&key, ReconcileState::Succeeded, ReconcileState::Deleted);
        Ok(())
    }

    /// CreateOrUpdate followed by the immediate Get that captures the identifier
    async fn submit(
        &self,
        key: &str,
        scope: &str,
        name: &str,
        outbound: &model::LoadBalancer,
    ) -> Result<String> {
        self.client.create_or_update(scope, name, outbound).await?;

        self.fetch(scope, name)
            .await?
            .and_then(|remote| remote.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                warn!("Load balancer {} reported success but has no ID", key);
                Error::MissingRemoteId {
                    scope: scope.to_string(),
                    name: name.to_string(),
                }
            })
    }

    async fn fetch(&self, scope: &str, name: &str) -> Result<Option<model::LoadBalancer>> {
        self.client.get(scope, name).await
    }

    async fn wait(&self, key: &str, scope: &str, name: &str) -> Result<model::LoadBalancer> {
        self.poller
            .wait_observed(scope, name, |attempt, status| {
                self.emit_event(ReconcileEvent::PollObserved {
                    resource: key.to_string(),
                    status: status.to_string(),
                    attempt,
                });
            })
            .await
    }

    fn transition(&self, key: &str, from: ReconcileState, to: ReconcileState) {
        debug!("Load balancer {}: {} -> {}", key, from, to);
        self.emit_event(ReconcileEvent::StateChanged {
            resource: key.to_string(),
            from,
            to,
        });
    }

    /// Emit a reconcile event
    fn emit_event(&self, event: ReconcileEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(ReconcileState::Polling.to_string(), "polling");
        assert_eq!(ReconcileState::Absent.to_string(), "absent");
    }

    #[test]
    fn test_event_clone_eq() {
        let event = ReconcileEvent::StateChanged {
            resource: "rg/lb".to_string(),
            from: ReconcileState::Creating,
            to: ReconcileState::Polling,
        };
        assert_eq!(event.clone(), event);
    }
}

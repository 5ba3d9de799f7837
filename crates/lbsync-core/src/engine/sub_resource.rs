//! Sub-resource-scoped lifecycle entry points
//!
//! The remote API has no endpoints for individual frontends, pools, rules,
//! probes or NAT rules. Managing one of them on its own means fetching the
//! parent load balancer, merging the record into the matching list and
//! re-submitting the whole aggregate.
//!
//! A record replaces any slot with the same identity hash and any record of
//! the same kind with the same name. The parent's `etag` is carried on the
//! resubmitted model.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ReconcileEvent, ReconcileState, Reconciler};
use crate::error::{Error, Result};
use crate::hash::Identity;
use crate::mapper::{self, backend_pool, frontend, nat_rule, probe, rule};
use crate::model::{self, LoadBalancerProperties};
use crate::resource::{
    BackendAddressPool, FrontendIpConfiguration, IdentitySet, InboundNatRule, LoadBalancer,
    LoadBalancingRule, Probe,
};
use crate::resource_id::ResourceId;

/// A sub-resource kind that can be managed on its own
pub trait SubResourceKind: Identity + Clone + Send + Sync + Sized + 'static {
    /// Child type segment in resource identifiers
    const SEGMENT: &'static str;

    /// Wire type of one item
    type Remote: Send + Sync;

    /// The kind's set on the aggregate
    fn set(lb: &LoadBalancer) -> &IdentitySet<Self>;

    /// The kind's set on the aggregate, mutably
    fn set_mut(lb: &mut LoadBalancer) -> &mut IdentitySet<Self>;

    /// The kind's list in the remote model, if reported
    fn remote_list(props: &LoadBalancerProperties) -> Option<&Vec<Self::Remote>>;

    /// Store the kind's list in an outbound model
    fn store_remote(props: &mut LoadBalancerProperties, items: Vec<Self::Remote>);

    /// Expand one record
    fn expand(&self) -> Result<Self::Remote>;

    /// Flatten the remote list
    fn flatten_all(remote: &[Self::Remote]) -> Result<IdentitySet<Self>>;

    /// Local checks beyond required fields
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

impl SubResourceKind for FrontendIpConfiguration {
    const SEGMENT: &'static str = "frontendIPConfigurations";
    type Remote = model::FrontendIpConfiguration;

    fn set(lb: &LoadBalancer) -> &IdentitySet<Self> {
        &lb.frontend_ip_configuration
    }

    fn set_mut(lb: &mut LoadBalancer) -> &mut IdentitySet<Self> {
        &mut lb.frontend_ip_configuration
    }

    fn remote_list(props: &LoadBalancerProperties) -> Option<&Vec<Self::Remote>> {
        props.frontend_ip_configurations.as_ref()
    }

    fn store_remote(props: &mut LoadBalancerProperties, items: Vec<Self::Remote>) {
        props.frontend_ip_configurations = Some(items);
    }

    fn expand(&self) -> Result<Self::Remote> {
        frontend::expand(self)
    }

    fn flatten_all(remote: &[Self::Remote]) -> Result<IdentitySet<Self>> {
        frontend::flatten_all(remote)
    }

    fn validate(&self) -> Result<()> {
        crate::resource::validate_frontend(self)
    }
}

impl SubResourceKind for BackendAddressPool {
    const SEGMENT: &'static str = "backendAddressPools";
    type Remote = model::BackendAddressPool;

    fn set(lb: &LoadBalancer) -> &IdentitySet<Self> {
        &lb.backend_address_pool
    }

    fn set_mut(lb: &mut LoadBalancer) -> &mut IdentitySet<Self> {
        &mut lb.backend_address_pool
    }

    fn remote_list(props: &LoadBalancerProperties) -> Option<&Vec<Self::Remote>> {
        props.backend_address_pools.as_ref()
    }

    fn store_remote(props: &mut LoadBalancerProperties, items: Vec<Self::Remote>) {
        props.backend_address_pools = Some(items);
    }

    fn expand(&self) -> Result<Self::Remote> {
        backend_pool::expand(self)
    }

    fn flatten_all(remote: &[Self::Remote]) -> Result<IdentitySet<Self>> {
        backend_pool::flatten_all(remote)
    }
}

impl SubResourceKind for LoadBalancingRule {
    const SEGMENT: &'static str = "loadBalancingRules";
    type Remote = model::LoadBalancingRule;

    fn set(lb: &LoadBalancer) -> &IdentitySet<Self> {
        &lb.load_balancing_rule
    }

    fn set_mut(lb: &mut LoadBalancer) -> &mut IdentitySet<Self> {
        &mut lb.load_balancing_rule
    }

    fn remote_list(props: &LoadBalancerProperties) -> Option<&Vec<Self::Remote>> {
        props.load_balancing_rules.as_ref()
    }

    fn store_remote(props: &mut LoadBalancerProperties, items: Vec<Self::Remote>) {
        props.load_balancing_rules = Some(items);
    }

    fn expand(&self) -> Result<Self::Remote> {
        rule::expand(self)
    }

    fn flatten_all(remote: &[Self::Remote]) -> Result<IdentitySet<Self>> {
        rule::flatten_all(remote)
    }
}

impl SubResourceKind for Probe {
    const SEGMENT: &'static str = "probes";
    type Remote = model::Probe;

    fn set(lb: &LoadBalancer) -> &IdentitySet<Self> {
        &lb.probe
    }

    fn set_mut(lb: &mut LoadBalancer) -> &mut IdentitySet<Self> {
        &mut lb.probe
    }

    fn remote_list(props: &LoadBalancerProperties) -> Option<&Vec<Self::Remote>> {
        props.probes.as_ref()
    }

    fn store_remote(props: &mut LoadBalancerProperties, items: Vec<Self::Remote>) {
        props.probes = Some(items);
    }

    fn expand(&self) -> Result<Self::Remote> {
        probe::expand(self)
    }

    fn flatten_all(remote: &[Self::Remote]) -> Result<IdentitySet<Self>> {
        probe::flatten_all(remote)
    }
}

impl SubResourceKind for InboundNatRule {
    const SEGMENT: &'static str = "inboundNatRules";
    type Remote = model::InboundNatRule;

    fn set(lb: &LoadBalancer) -> &IdentitySet<Self> {
        &lb.inbound_nat_rule
    }

    fn set_mut(lb: &mut LoadBalancer) -> &mut IdentitySet<Self> {
        &mut lb.inbound_nat_rule
    }

    fn remote_list(props: &LoadBalancerProperties) -> Option<&Vec<Self::Remote>> {
        props.inbound_nat_rules.as_ref()
    }

    fn store_remote(props: &mut LoadBalancerProperties, items: Vec<Self::Remote>) {
        props.inbound_nat_rules = Some(items);
    }

    fn expand(&self) -> Result<Self::Remote> {
        nat_rule::expand(self)
    }

    fn flatten_all(remote: &[Self::Remote]) -> Result<IdentitySet<Self>> {
        nat_rule::flatten_all(remote)
    }
}

/// A sub-resource managed on its own, attached to a parent load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedRecord<R> {
    /// Remote identifier, `{load_balancer_id}/{segment}/{name}` once created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Identifier of the parent load balancer
    pub load_balancer_id: String,

    /// The record itself
    pub record: R,
}

impl<R> AttachedRecord<R> {
    /// Declare a record under the given parent
    pub fn new(load_balancer_id: impl Into<String>, record: R) -> Self {
        Self {
            id: None,
            load_balancer_id: load_balancer_id.into(),
            record,
        }
    }

    /// Whether the record has been created remotely
    pub fn exists(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Parent location parsed from a load balancer identifier
struct Parent {
    id: ResourceId,
    scope: String,
    name: String,
}

impl Parent {
    fn parse(raw: &str) -> Result<Self> {
        let id = ResourceId::from_str(raw)?.parent_load_balancer_id()?;
        let scope = id.resource_group.clone();
        let name = id.load_balancer_name()?.to_string();
        Ok(Self { id, scope, name })
    }

    fn key(&self) -> String {
        format!("{}/{}", self.scope, self.name)
    }
}

impl Reconciler {
    /// Create or update one sub-resource by merging it into its parent
    ///
    /// A missing parent clears the record's identifier, like an aggregate
    /// read that finds nothing.
    pub async fn create_sub_resource<K: SubResourceKind>(
        &self,
        attached: &mut AttachedRecord<K>,
    ) -> Result<()> {
        attached.record.validate()?;
        attached.record.expand()?;

        let parent = Parent::parse(&attached.load_balancer_id)?;
        let key = parent.key();

        let Some(remote) = self.fetch(&parent.scope, &parent.name).await? else {
            info!(
                "Parent load balancer {} of {} {} not found",
                key,
                K::KIND,
                attached.record.name()
            );
            attached.id = None;
            self.emit_event(ReconcileEvent::Absent { resource: key });
            return Ok(());
        };

        let mut lb = current_shape(&parent, &remote)?;
        let displaced = K::set_mut(&mut lb).replace(attached.record.clone());
        debug!(
            "Merged {} {} into {} ({} displaced)",
            K::KIND,
            attached.record.name(),
            key,
            displaced.len()
        );
        self.emit_event(ReconcileEvent::SubResourceMerged {
            resource: key.clone(),
            kind: K::KIND,
            name: attached.record.name().to_string(),
        });

        self.resubmit::<K>(&parent, &lb, remote.etag.clone()).await?;

        attached.id = Some(
            parent
                .id
                .child(K::SEGMENT, attached.record.name())
                .to_string(),
        );
        attached.load_balancer_id = parent.id.to_string();

        self.read_sub_resource(attached).await
    }

    /// Refresh one sub-resource from its parent
    ///
    /// A missing parent or a parent without the record clears the identifier.
    pub async fn read_sub_resource<K: SubResourceKind>(
        &self,
        attached: &mut AttachedRecord<K>,
    ) -> Result<()> {
        let Some(raw_id) = attached.id.clone().filter(|id| !id.is_empty()) else {
            return Ok(());
        };

        let id = ResourceId::from_str(&raw_id)?;
        let child = id
            .child_name(K::SEGMENT)
            .ok_or_else(|| {
                Error::resource_id(format!("{} is not a {} identifier", raw_id, K::KIND))
            })?
            .to_string();
        let parent = Parent::parse(&raw_id)?;
        let key = parent.key();

        let found = match self.fetch(&parent.scope, &parent.name).await? {
            Some(remote) => match remote.properties.as_ref().and_then(K::remote_list) {
                Some(list) => K::flatten_all(list)?.find_by_name(&child).cloned(),
                None => None,
            },
            None => None,
        };

        match found {
            Some(record) => {
                attached.record = record;
                attached.load_balancer_id = parent.id.to_string();
            }
            None => {
                info!("{} {} no longer exists on {}", K::KIND, child, key);
                attached.id = None;
                self.emit_event(ReconcileEvent::Absent {
                    resource: format!("{}/{}", key, child),
                });
            }
        }

        Ok(())
    }

    /// Delete one sub-resource by dropping it from its parent
    pub async fn delete_sub_resource<K: SubResourceKind>(
        &self,
        attached: &mut AttachedRecord<K>,
    ) -> Result<()> {
        let parent = Parent::parse(&attached.load_balancer_id)?;
        let key = parent.key();
        let name = attached.record.name().to_string();

        let Some(remote) = self.fetch(&parent.scope, &parent.name).await? else {
            attached.id = None;
            return Ok(());
        };

        let mut lb = current_shape(&parent, &remote)?;
        if K::set_mut(&mut lb).remove_named(&name).is_empty() {
            debug!("{} {} already absent from {}", K::KIND, name, key);
            attached.id = None;
            return Ok(());
        }

        info!("Removing {} {} from {}", K::KIND, name, key);
        self.emit_event(ReconcileEvent::SubResourceMerged {
            resource: key,
            kind: K::KIND,
            name,
        });

        self.resubmit::<K>(&parent, &lb, remote.etag.clone()).await?;
        attached.id = None;
        Ok(())
    }

    /// PUT the merged aggregate and wait for provisioning
    ///
    /// The touched kind is always sent, even when empty, so a removal of its
    /// last record reaches the remote.
    async fn resubmit<K: SubResourceKind>(
        &self,
        parent: &Parent,
        lb: &LoadBalancer,
        etag: Option<String>,
    ) -> Result<()> {
        let key = parent.key();

        let mut outbound = mapper::expand_load_balancer(lb)?;
        let items = K::set(lb)
            .iter()
            .map(K::expand)
            .collect::<Result<Vec<_>>>()?;
        K::store_remote(outbound.properties.get_or_insert_with(Default::default), items);
        outbound.etag = etag;

        self.transition(&key, ReconcileState::Succeeded, ReconcileState::Creating);
        if let Err(e) = self
            .client
            .create_or_update(&parent.scope, &parent.name, &outbound)
            .await
        {
            self.transition(&key, ReconcileState::Creating, ReconcileState::Failed);
            return Err(e);
        }

        self.transition(&key, ReconcileState::Creating, ReconcileState::Polling);
        if let Err(e) = self.wait(&key, &parent.scope, &parent.name).await {
            self.transition(&key, ReconcileState::Polling, ReconcileState::Failed);
            return Err(e);
        }
        self.transition(&key, ReconcileState::Polling, ReconcileState::Succeeded);
        Ok(())
    }
}

/// The parent's current remote state in configuration shape
fn current_shape(parent: &Parent, remote: &model::LoadBalancer) -> Result<LoadBalancer> {
    let mut lb = LoadBalancer::new(parent.name.clone(), "", parent.scope.clone());
    lb.id = Some(parent.id.to_string());
    mapper::flatten_into(remote, &mut lb)?;
    Ok(lb)
}

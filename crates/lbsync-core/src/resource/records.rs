// # Sub-resource Records
//
// Configuration-shaped records for the five sub-resource kinds owned by a
// load balancer. Field names follow the declared configuration attributes.
//
// Cross references (`*_id` fields) are weak: opaque identifier strings that are
// resolved by the remote provider and never dereferenced locally.
//
// Fields documented as read-only are populated by flatten from the remote
// model and are never sent outbound by expand.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::hash::{Discriminator, Identity};

/// Frontend IP configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrontendIpConfiguration {
    /// Name, unique among frontend configurations
    pub name: String,

    /// Allocation mode, `Static` or `Dynamic` (case-insensitive)
    pub private_ip_address_allocation: String,

    /// Explicit private address (with `Static` allocation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip_address: Option<String>,

    /// Subnet the private address lives in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,

    /// Public IP address resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip_address_id: Option<String>,

    /// Read-only: load-balancing rules using this frontend
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub load_balancer_rules: BTreeSet<String>,

    /// Read-only: inbound NAT rules using this frontend
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub inbound_nat_rules: BTreeSet<String>,
}

impl FrontendIpConfiguration {
    /// Create a frontend configuration with the given allocation mode
    pub fn new(name: impl Into<String>, allocation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            private_ip_address_allocation: allocation.into(),
            ..Default::default()
        }
    }

    /// Set the explicit private address
    pub fn with_private_ip_address(mut self, address: impl Into<String>) -> Self {
        self.private_ip_address = Some(address.into());
        self
    }

    /// Set the subnet reference
    pub fn with_subnet_id(mut self, subnet_id: impl Into<String>) -> Self {
        self.subnet_id = Some(subnet_id.into());
        self
    }

    /// Set the public IP address reference
    pub fn with_public_ip_address_id(mut self, id: impl Into<String>) -> Self {
        self.public_ip_address_id = Some(id.into());
        self
    }
}

impl Identity for FrontendIpConfiguration {
    const KIND: &'static str = "frontend_ip_configuration";
    const DISCRIMINATORS: &'static [&'static str] = &["name", "private_ip_address_allocation"];

    fn name(&self) -> &str {
        &self.name
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::new()
            .field(&self.name)
            .field(&self.private_ip_address_allocation)
    }
}

/// Backend address pool
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackendAddressPool {
    /// Name, unique among pools
    pub name: String,

    /// Read-only: member IP configurations
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub backend_ip_configurations: BTreeSet<String>,

    /// Read-only: load-balancing rules targeting this pool
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub load_balancing_rules: BTreeSet<String>,
}

impl BackendAddressPool {
    /// Create a backend pool
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Identity for BackendAddressPool {
    const KIND: &'static str = "backend_address_pool";
    const DISCRIMINATORS: &'static [&'static str] = &["name"];

    fn name(&self) -> &str {
        &self.name
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::new().field(&self.name)
    }
}

/// Load-balancing rule
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadBalancingRule {
    /// Name, unique among rules
    pub name: String,

    /// Transport protocol (`Tcp`, `Udp`)
    pub protocol: String,

    /// Port exposed on the frontend
    pub frontend_port: i32,

    /// Port on the backend members
    pub backend_port: i32,

    /// Frontend configuration this rule listens on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend_ip_configuration_id: Option<String>,

    /// Pool traffic is distributed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_address_pool_id: Option<String>,

    /// Health probe gating the members
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_id: Option<String>,

    /// Direct server return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_floating_ip: Option<bool>,

    /// TCP idle timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_in_minutes: Option<i32>,

    /// Session affinity mode (`Default`, `SourceIP`, `SourceIPProtocol`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_distribution: Option<String>,
}

impl LoadBalancingRule {
    /// Create a rule with the mandatory fields
    pub fn new(
        name: impl Into<String>,
        protocol: impl Into<String>,
        frontend_port: i32,
        backend_port: i32,
    ) -> Self {
        Self {
            name: name.into(),
            protocol: protocol.into(),
            frontend_port,
            backend_port,
            ..Default::default()
        }
    }
}

impl Identity for LoadBalancingRule {
    const KIND: &'static str = "load_balancing_rule";
    const DISCRIMINATORS: &'static [&'static str] =
        &["name", "protocol", "frontend_port", "backend_port"];

    fn name(&self) -> &str {
        &self.name
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::new()
            .field(&self.name)
            .field(&self.protocol)
            .field(self.frontend_port)
            .field(self.backend_port)
    }
}

/// Health probe
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Probe {
    /// Name, unique among probes
    pub name: String,

    /// Probe protocol (`Http`, `Tcp`); computed by the remote side when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    /// Port probed on each member
    pub port: i32,

    /// Request path for HTTP probes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_path: Option<String>,

    /// Seconds between probes
    pub interval_in_seconds: i32,

    /// Consecutive failures before a member is taken out
    pub number_of_probes: i32,

    /// Read-only: rules using this probe
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub load_balance_rules: BTreeSet<String>,
}

impl Probe {
    /// Create a probe with the mandatory fields
    pub fn new(
        name: impl Into<String>,
        port: i32,
        interval_in_seconds: i32,
        number_of_probes: i32,
    ) -> Self {
        Self {
            name: name.into(),
            port,
            interval_in_seconds,
            number_of_probes,
            ..Default::default()
        }
    }

    /// Make this an HTTP probe on the given path
    pub fn with_http_path(mut self, path: impl Into<String>) -> Self {
        self.protocol = Some("Http".to_string());
        self.request_path = Some(path.into());
        self
    }
}

impl Identity for Probe {
    const KIND: &'static str = "probe";
    const DISCRIMINATORS: &'static [&'static str] = &[
        "name",
        "port",
        "interval_in_seconds",
        "number_of_probes",
        "request_path",
    ];

    fn name(&self) -> &str {
        &self.name
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::new()
            .field(&self.name)
            .field(self.port)
            .field(self.interval_in_seconds)
            .field(self.number_of_probes)
            .field(self.request_path.as_deref().unwrap_or_default())
    }
}

/// Inbound NAT rule
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InboundNatRule {
    /// Name, unique among NAT rules
    pub name: String,

    /// Transport protocol (`Tcp`, `Udp`)
    pub protocol: String,

    /// Port exposed on the frontend
    pub frontend_port: i32,

    /// Port on the target member
    pub backend_port: i32,

    /// Frontend configuration this rule listens on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend_ip_configuration_id: Option<String>,

    /// Read-only: member IP configuration the rule is bound to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_ip_configuration_id: Option<String>,
}

impl InboundNatRule {
    /// Create a NAT rule with the mandatory fields
    pub fn new(
        name: impl Into<String>,
        protocol: impl Into<String>,
        frontend_port: i32,
        backend_port: i32,
    ) -> Self {
        Self {
            name: name.into(),
            protocol: protocol.into(),
            frontend_port,
            backend_port,
            ..Default::default()
        }
    }
}

impl Identity for InboundNatRule {
    const KIND: &'static str = "inbound_nat_rule";
    const DISCRIMINATORS: &'static [&'static str] =
        &["name", "protocol", "frontend_port", "backend_port"];

    fn name(&self) -> &str {
        &self.name
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::new()
            .field(&self.name)
            .field(&self.protocol)
            .field(self.frontend_port)
            .field(self.backend_port)
    }
}

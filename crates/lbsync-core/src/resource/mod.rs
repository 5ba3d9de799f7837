//! Configuration-shaped resources
//!
//! The [`LoadBalancer`] aggregate and the records it owns. Records are built
//! fresh from declared configuration on every create/update and rebuilt from
//! the remote model on read; nothing here is cached between calls.

pub mod records;
pub mod set;

pub use records::{
    BackendAddressPool, FrontendIpConfiguration, InboundNatRule, LoadBalancingRule, Probe,
};
pub use set::IdentitySet;

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};
use crate::hash::Identity;
use crate::validate;

/// Normalize a location for comparison and storage (`"West US"` -> `"westus"`)
pub fn normalize_location(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn deserialize_location<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    String::deserialize(deserializer).map(|location| normalize_location(&location))
}

/// The load balancer aggregate
///
/// `name`, `location` and `resource_group_name` are immutable after creation.
/// `id` is set once a create has succeeded and cleared when a read finds the
/// remote resource gone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadBalancer {
    /// Remote identifier, assigned by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Resource name
    pub name: String,

    /// Region, normalized on the way in
    #[serde(deserialize_with = "deserialize_location")]
    pub location: String,

    /// Owning resource group
    pub resource_group_name: String,

    /// Free-form tags
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    /// Frontend IP configurations
    #[serde(default, skip_serializing_if = "IdentitySet::is_empty")]
    pub frontend_ip_configuration: IdentitySet<FrontendIpConfiguration>,

    /// Backend address pools
    #[serde(default, skip_serializing_if = "IdentitySet::is_empty")]
    pub backend_address_pool: IdentitySet<BackendAddressPool>,

    /// Load-balancing rules
    #[serde(default, skip_serializing_if = "IdentitySet::is_empty")]
    pub load_balancing_rule: IdentitySet<LoadBalancingRule>,

    /// Health probes
    #[serde(default, skip_serializing_if = "IdentitySet::is_empty")]
    pub probe: IdentitySet<Probe>,

    /// Inbound NAT rules
    #[serde(default, skip_serializing_if = "IdentitySet::is_empty")]
    pub inbound_nat_rule: IdentitySet<InboundNatRule>,
}

impl LoadBalancer {
    /// Create an empty aggregate
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        resource_group_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            location: normalize_location(&location.into()),
            resource_group_name: resource_group_name.into(),
            ..Default::default()
        }
    }

    /// Add a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add a frontend IP configuration
    pub fn with_frontend(mut self, frontend: FrontendIpConfiguration) -> Self {
        self.frontend_ip_configuration.insert(frontend);
        self
    }

    /// Add a backend address pool
    pub fn with_backend_pool(mut self, pool: BackendAddressPool) -> Self {
        self.backend_address_pool.insert(pool);
        self
    }

    /// Add a load-balancing rule
    pub fn with_rule(mut self, rule: LoadBalancingRule) -> Self {
        self.load_balancing_rule.insert(rule);
        self
    }

    /// Add a probe
    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe.insert(probe);
        self
    }

    /// Add an inbound NAT rule
    pub fn with_nat_rule(mut self, rule: InboundNatRule) -> Self {
        self.inbound_nat_rule.insert(rule);
        self
    }

    /// Key used by state stores: `{resource_group}/{name}`
    pub fn state_key(&self) -> String {
        format!("{}/{}", self.resource_group_name, self.name)
    }

    /// Whether the aggregate has been created remotely
    pub fn exists(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Validate the declared configuration
    ///
    /// Runs every local check and stops at the first failure. No remote call is
    /// made and nothing is mutated.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::validation("load balancer name cannot be empty"));
        }
        if self.location.is_empty() {
            return Err(Error::validation(format!(
                "location of load balancer {} cannot be empty",
                self.name
            )));
        }
        if self.resource_group_name.is_empty() {
            return Err(Error::validation(format!(
                "resource_group_name of load balancer {} cannot be empty",
                self.name
            )));
        }

        for frontend in &self.frontend_ip_configuration {
            validate_frontend(frontend)?;
        }

        unique_names(&self.frontend_ip_configuration)?;
        unique_names(&self.backend_address_pool)?;
        unique_names(&self.load_balancing_rule)?;
        unique_names(&self.probe)?;
        unique_names(&self.inbound_nat_rule)?;

        Ok(())
    }
}

/// Validate a single frontend configuration
pub(crate) fn validate_frontend(frontend: &FrontendIpConfiguration) -> Result<()> {
    let key = format!(
        "{}.{}.private_ip_address_allocation",
        FrontendIpConfiguration::KIND,
        frontend.name
    );
    validate::first_error(validate::private_ip_address_allocation(
        &frontend.private_ip_address_allocation,
        &key,
    ))
}

/// Two records of one kind sharing a name but not a hash would be two slots the
/// remote side considers one resource.
fn unique_names<T: Identity>(set: &IdentitySet<T>) -> Result<()> {
    let mut seen = HashSet::new();
    for record in set {
        if !seen.insert(record.name()) {
            return Err(Error::validation(format!(
                "duplicate {} name {:?}",
                T::KIND,
                record.name()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LoadBalancer {
        LoadBalancer::new("lb-web", "West US", "rg-prod")
            .with_frontend(FrontendIpConfiguration::new("public", "Dynamic"))
            .with_backend_pool(BackendAddressPool::new("web"))
    }

    #[test]
    fn location_is_normalized() {
        assert_eq!(normalize_location("West US"), "westus");
        assert_eq!(normalize_location("northeurope"), "northeurope");
        assert_eq!(sample().location, "westus");
    }

    #[test]
    fn valid_aggregate_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn bad_allocation_fails_validation() {
        let lb = sample().with_frontend(FrontendIpConfiguration::new("private", "Random"));
        let err = lb.validate().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("private"));
    }

    #[test]
    fn duplicate_names_fail_validation() {
        let lb = sample()
            .with_rule(LoadBalancingRule::new("http", "Tcp", 80, 80))
            .with_rule(LoadBalancingRule::new("http", "Tcp", 8080, 80));
        let err = lb.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate load_balancing_rule"));
    }

    #[test]
    fn empty_name_fails_validation() {
        let lb = LoadBalancer::new("", "westus", "rg");
        assert!(lb.validate().is_err());
    }

    #[test]
    fn state_key_joins_scope_and_name() {
        assert_eq!(sample().state_key(), "rg-prod/lb-web");
    }

    #[test]
    fn deserializes_declared_configuration() {
        let lb: LoadBalancer = serde_json::from_value(serde_json::json!({
            "name": "lb",
            "location": "West Europe",
            "resource_group_name": "rg",
            "frontend_ip_configuration": [
                { "name": "fe", "private_ip_address_allocation": "Static", "private_ip_address": "10.0.0.4" }
            ],
            "probe": [
                { "name": "p", "port": 80, "interval_in_seconds": 5, "number_of_probes": 2 }
            ]
        }))
        .unwrap();

        assert_eq!(lb.location, "westeurope");
        assert_eq!(lb.frontend_ip_configuration.len(), 1);
        assert_eq!(lb.probe.len(), 1);
        assert!(lb.load_balancing_rule.is_empty());
        assert!(!lb.exists());
    }
}

//! Remote wire model
//!
//! Azure Resource Manager JSON for `Microsoft.Network/loadBalancers`. Every
//! field is optional and omitted when unset, mirroring how the API treats
//! absent properties as "leave as is" on PUT and "unknown" on GET.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference to another resource by identifier
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SubResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()) }
    }
}

/// Collect the identifiers out of a list of references, skipping empty ones
pub fn reference_ids(refs: Option<&Vec<SubResource>>) -> impl Iterator<Item = String> + '_ {
    refs.into_iter()
        .flatten()
        .filter_map(|r| r.id.clone())
        .filter(|id| !id.is_empty())
}

/// The aggregate load balancer resource
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadBalancer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<LoadBalancerProperties>,
}

impl LoadBalancer {
    /// Provisioning state, if the remote reported one
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerProperties {
    #[serde(
        rename = "frontendIPConfigurations",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub frontend_ip_configurations: Option<Vec<FrontendIpConfiguration>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_address_pools: Option<Vec<BackendAddressPool>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancing_rules: Option<Vec<LoadBalancingRule>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probes: Option<Vec<Probe>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbound_nat_rules: Option<Vec<InboundNatRule>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_guid: Option<String>,

    /// Computed by the remote; never sent
    #[serde(default, skip_serializing)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrontendIpConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<FrontendIpConfigurationProperties>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendIpConfigurationProperties {
    #[serde(
        rename = "privateIPAddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub private_ip_address: Option<String>,

    #[serde(
        rename = "privateIPAllocationMethod",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub private_ip_allocation_method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<SubResource>,

    #[serde(
        rename = "publicIPAddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub public_ip_address: Option<SubResource>,

    #[serde(default, skip_serializing)]
    pub load_balancing_rules: Option<Vec<SubResource>>,

    #[serde(default, skip_serializing)]
    pub inbound_nat_rules: Option<Vec<SubResource>>,

    #[serde(default, skip_serializing)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackendAddressPool {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BackendAddressPoolProperties>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendAddressPoolProperties {
    #[serde(rename = "backendIPConfigurations", default, skip_serializing)]
    pub backend_ip_configurations: Option<Vec<SubResource>>,

    #[serde(default, skip_serializing)]
    pub load_balancing_rules: Option<Vec<SubResource>>,

    #[serde(default, skip_serializing)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadBalancingRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<LoadBalancingRuleProperties>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancingRuleProperties {
    #[serde(
        rename = "frontendIPConfiguration",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub frontend_ip_configuration: Option<SubResource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_address_pool: Option<SubResource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<SubResource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_distribution: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend_port: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_port: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_in_minutes: Option<i32>,

    #[serde(
        rename = "enableFloatingIP",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_floating_ip: Option<bool>,

    #[serde(default, skip_serializing)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Probe {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ProbeProperties>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeProperties {
    #[serde(default, skip_serializing)]
    pub load_balancing_rules: Option<Vec<SubResource>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_in_seconds: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_probes: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_path: Option<String>,

    #[serde(default, skip_serializing)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InboundNatRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<InboundNatRuleProperties>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundNatRuleProperties {
    #[serde(
        rename = "frontendIPConfiguration",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub frontend_ip_configuration: Option<SubResource>,

    #[serde(rename = "backendIPConfiguration", default, skip_serializing)]
    pub backend_ip_configuration: Option<SubResource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend_port: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_port: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_in_minutes: Option<i32>,

    #[serde(
        rename = "enableFloatingIP",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_floating_ip: Option<bool>,

    #[serde(default, skip_serializing)]
    pub provisioning_state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_arm_response() {
        let body = json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/loadBalancers/lb",
            "name": "lb",
            "location": "westus",
            "etag": "W/\"1\"",
            "properties": {
                "provisioningState": "Updating",
                "frontendIPConfigurations": [{
                    "name": "fe",
                    "properties": {
                        "privateIPAllocationMethod": "Dynamic",
                        "publicIPAddress": { "id": "/pip" },
                        "loadBalancingRules": [{ "id": "/rules/http" }]
                    }
                }],
                "backendAddressPools": [{
                    "name": "pool",
                    "properties": { "backendIPConfigurations": [{ "id": "/nic/ipconfig1" }] }
                }]
            }
        });

        let lb: LoadBalancer = serde_json::from_value(body).unwrap();
        assert_eq!(lb.provisioning_state(), Some("Updating"));

        let props = lb.properties.unwrap();
        let fe = &props.frontend_ip_configurations.unwrap()[0];
        let fe_props = fe.properties.as_ref().unwrap();
        assert_eq!(fe_props.private_ip_allocation_method.as_deref(), Some("Dynamic"));
        assert_eq!(fe_props.public_ip_address, Some(SubResource::new("/pip")));
        assert!(props.probes.is_none());
    }

    #[test]
    fn computed_fields_are_not_sent() {
        let lb = LoadBalancer {
            location: Some("westus".into()),
            properties: Some(LoadBalancerProperties {
                provisioning_state: Some("Succeeded".into()),
                backend_address_pools: Some(vec![BackendAddressPool {
                    name: Some("pool".into()),
                    properties: Some(BackendAddressPoolProperties {
                        backend_ip_configurations: Some(vec![SubResource::new("/nic")]),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let json = serde_json::to_value(&lb).unwrap();
        assert_eq!(
            json,
            json!({
                "location": "westus",
                "properties": {
                    "backendAddressPools": [{ "name": "pool", "properties": {} }]
                }
            })
        );
    }

    #[test]
    fn reference_ids_skip_empty() {
        let refs = vec![SubResource::new("/a"), SubResource { id: None }, SubResource::new("")];
        let ids: Vec<String> = reference_ids(Some(&refs)).collect();
        assert_eq!(ids, vec!["/a".to_string()]);
        assert_eq!(reference_ids(None).count(), 0);
    }
}

//! Load-balancing rule expand/flatten

use super::{
    expand_set, flatten_list, optional, reference, reference_id, remote_name, remote_number,
    required, required_name,
};
use crate::error::Result;
use crate::hash::Identity;
use crate::model;
use crate::resource::{IdentitySet, LoadBalancingRule};

/// Expand one rule
pub fn expand(rule: &LoadBalancingRule) -> Result<model::LoadBalancingRule> {
    let name = required_name(rule)?;
    let protocol = required(&rule.protocol, LoadBalancingRule::KIND, "protocol")?;

    Ok(model::LoadBalancingRule {
        name: Some(name),
        properties: Some(model::LoadBalancingRuleProperties {
            protocol: Some(protocol),
            frontend_port: Some(rule.frontend_port),
            backend_port: Some(rule.backend_port),
            frontend_ip_configuration: reference(rule.frontend_ip_configuration_id.as_ref()),
            backend_address_pool: reference(rule.backend_address_pool_id.as_ref()),
            probe: reference(rule.probe_id.as_ref()),
            enable_floating_ip: rule.enable_floating_ip,
            idle_timeout_in_minutes: rule.idle_timeout_in_minutes,
            load_distribution: optional(rule.load_distribution.as_ref()),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Expand every rule of the aggregate
pub fn expand_all(set: &IdentitySet<LoadBalancingRule>) -> Result<Vec<model::LoadBalancingRule>> {
    expand_set(set, expand)
}

/// Flatten one remote rule
pub fn flatten(remote: &model::LoadBalancingRule) -> Result<LoadBalancingRule> {
    let name = remote_name(remote.name.as_ref(), LoadBalancingRule::KIND)?;
    let props = remote.properties.clone().unwrap_or_default();

    Ok(LoadBalancingRule {
        frontend_port: remote_number(props.frontend_port, LoadBalancingRule::KIND, &name, "frontendPort")?,
        backend_port: remote_number(props.backend_port, LoadBalancingRule::KIND, &name, "backendPort")?,
        protocol: props.protocol.unwrap_or_default(),
        frontend_ip_configuration_id: reference_id(props.frontend_ip_configuration.as_ref()),
        backend_address_pool_id: reference_id(props.backend_address_pool.as_ref()),
        probe_id: reference_id(props.probe.as_ref()),
        enable_floating_ip: props.enable_floating_ip,
        idle_timeout_in_minutes: props.idle_timeout_in_minutes,
        load_distribution: optional(props.load_distribution.as_ref()),
        name,
    })
}

/// Flatten the remote rule list
pub fn flatten_all(remote: &[model::LoadBalancingRule]) -> Result<IdentitySet<LoadBalancingRule>> {
    flatten_list(remote, flatten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    fn full_rule() -> LoadBalancingRule {
        LoadBalancingRule {
            frontend_ip_configuration_id: Some("/frontendIPConfigurations/public".into()),
            backend_address_pool_id: Some("/backendAddressPools/web".into()),
            probe_id: Some("/probes/health".into()),
            enable_floating_ip: Some(false),
            idle_timeout_in_minutes: Some(4),
            load_distribution: Some("SourceIP".into()),
            ..LoadBalancingRule::new("http", "Tcp", 80, 8080)
        }
    }

    #[test]
    fn round_trip_all_fields() {
        let rule = full_rule();
        assert_eq!(flatten(&expand(&rule).unwrap()).unwrap(), rule);
    }

    #[test]
    fn round_trip_minimal() {
        let rule = LoadBalancingRule::new("dns", "Udp", 53, 53);
        assert_eq!(flatten(&expand(&rule).unwrap()).unwrap(), rule);
    }

    #[test]
    fn empty_probe_reference_is_not_sent() {
        let mut rule = LoadBalancingRule::new("http", "Tcp", 80, 80);
        rule.probe_id = Some(String::new());

        let remote = expand(&rule).unwrap();
        assert!(remote.properties.unwrap().probe.is_none());
    }

    #[test]
    fn missing_name_is_rejected() {
        let rule = LoadBalancingRule::new("", "Tcp", 80, 80);
        assert!(matches!(
            expand(&rule).unwrap_err(),
            Error::MissingField { kind: "load_balancing_rule", field: "name" }
        ));
    }

    #[test]
    fn remote_rule_without_ports_is_malformed() {
        let remote = model::LoadBalancingRule {
            name: Some("http".into()),
            ..Default::default()
        };
        let err = flatten(&remote).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
        assert!(err.to_string().contains("frontendPort"));
    }
}

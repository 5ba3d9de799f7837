//! Inbound NAT rule expand/flatten

use super::{
    expand_set, flatten_list, reference, reference_id, remote_name, remote_number, required,
    required_name,
};
use crate::error::Result;
use crate::hash::Identity;
use crate::model;
use crate::resource::{IdentitySet, InboundNatRule};

/// Expand one NAT rule
pub fn expand(rule: &InboundNatRule) -> Result<model::InboundNatRule> {
    let name = required_name(rule)?;
    let protocol = required(&rule.protocol, InboundNatRule::KIND, "protocol")?;

    Ok(model::InboundNatRule {
        name: Some(name),
        properties: Some(model::InboundNatRuleProperties {
            protocol: Some(protocol),
            frontend_port: Some(rule.frontend_port),
            backend_port: Some(rule.backend_port),
            frontend_ip_configuration: reference(rule.frontend_ip_configuration_id.as_ref()),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Expand every NAT rule of the aggregate
pub fn expand_all(set: &IdentitySet<InboundNatRule>) -> Result<Vec<model::InboundNatRule>> {
    expand_set(set, expand)
}

/// Flatten one remote NAT rule
pub fn flatten(remote: &model::InboundNatRule) -> Result<InboundNatRule> {
    let name = remote_name(remote.name.as_ref(), InboundNatRule::KIND)?;
    let props = remote.properties.clone().unwrap_or_default();

    Ok(InboundNatRule {
        frontend_port: remote_number(props.frontend_port, InboundNatRule::KIND, &name, "frontendPort")?,
        backend_port: remote_number(props.backend_port, InboundNatRule::KIND, &name, "backendPort")?,
        protocol: props.protocol.unwrap_or_default(),
        frontend_ip_configuration_id: reference_id(props.frontend_ip_configuration.as_ref()),
        backend_ip_configuration_id: reference_id(props.backend_ip_configuration.as_ref()),
        name,
    })
}

/// Flatten the remote NAT rule list
pub fn flatten_all(remote: &[model::InboundNatRule]) -> Result<IdentitySet<InboundNatRule>> {
    flatten_list(remote, flatten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubResource;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trip() {
        let mut rule = InboundNatRule::new("rdp", "Tcp", 3389, 3389);
        rule.frontend_ip_configuration_id = Some("/frontendIPConfigurations/public".into());
        assert_eq!(flatten(&expand(&rule).unwrap()).unwrap(), rule);
    }

    #[test]
    fn backend_binding_is_read_only() {
        let mut rule = InboundNatRule::new("ssh", "Tcp", 2222, 22);
        rule.backend_ip_configuration_id = Some("/nic/ipconfig1".into());

        let json = serde_json::to_value(expand(&rule).unwrap()).unwrap();
        assert!(json["properties"].get("backendIPConfiguration").is_none());

        let mut remote = expand(&rule).unwrap();
        if let Some(props) = remote.properties.as_mut() {
            props.backend_ip_configuration = Some(SubResource::new("/nic/ipconfig1"));
        }
        assert_eq!(flatten(&remote).unwrap(), rule);
    }
}

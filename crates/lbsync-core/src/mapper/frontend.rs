//! Frontend IP configuration expand/flatten

use super::{
    expand_set, flatten_list, optional, reference, reference_id, remote_name, required,
    required_name,
};
use crate::error::Result;
use crate::hash::Identity;
use crate::model::{self, reference_ids};
use crate::resource::{FrontendIpConfiguration, IdentitySet};

/// Expand one frontend configuration
pub fn expand(fe: &FrontendIpConfiguration) -> Result<model::FrontendIpConfiguration> {
    let name = required_name(fe)?;
    let allocation = required(
        &fe.private_ip_address_allocation,
        FrontendIpConfiguration::KIND,
        "private_ip_address_allocation",
    )?;

    Ok(model::FrontendIpConfiguration {
        name: Some(name),
        properties: Some(model::FrontendIpConfigurationProperties {
            private_ip_allocation_method: Some(allocation),
            private_ip_address: optional(fe.private_ip_address.as_ref()),
            subnet: reference(fe.subnet_id.as_ref()),
            public_ip_address: reference(fe.public_ip_address_id.as_ref()),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Expand every frontend configuration of the aggregate
pub fn expand_all(
    set: &IdentitySet<FrontendIpConfiguration>,
) -> Result<Vec<model::FrontendIpConfiguration>> {
    expand_set(set, expand)
}

/// Flatten one remote frontend configuration
pub fn flatten(remote: &model::FrontendIpConfiguration) -> Result<FrontendIpConfiguration> {
    let mut fe = FrontendIpConfiguration {
        name: remote_name(remote.name.as_ref(), FrontendIpConfiguration::KIND)?,
        ..Default::default()
    };

    if let Some(props) = &remote.properties {
        fe.private_ip_address_allocation = props
            .private_ip_allocation_method
            .clone()
            .unwrap_or_default();
        fe.private_ip_address = optional(props.private_ip_address.as_ref());
        fe.subnet_id = reference_id(props.subnet.as_ref());
        fe.public_ip_address_id = reference_id(props.public_ip_address.as_ref());
        fe.load_balancer_rules = reference_ids(props.load_balancing_rules.as_ref()).collect();
        fe.inbound_nat_rules = reference_ids(props.inbound_nat_rules.as_ref()).collect();
    }

    Ok(fe)
}

/// Flatten the remote frontend list
pub fn flatten_all(
    remote: &[model::FrontendIpConfiguration],
) -> Result<IdentitySet<FrontendIpConfiguration>> {
    flatten_list(remote, flatten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::SubResource;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trip_private_static() {
        let fe = FrontendIpConfiguration::new("internal", "Static")
            .with_private_ip_address("10.0.0.4")
            .with_subnet_id("/subnets/backend");

        assert_eq!(flatten(&expand(&fe).unwrap()).unwrap(), fe);
    }

    #[test]
    fn round_trip_public_dynamic() {
        let fe = FrontendIpConfiguration::new("public", "dynamic").with_public_ip_address_id("/pip");
        assert_eq!(flatten(&expand(&fe).unwrap()).unwrap(), fe);
    }

    #[test]
    fn empty_optionals_are_omitted() {
        let mut fe = FrontendIpConfiguration::new("public", "Dynamic");
        fe.private_ip_address = Some(String::new());
        fe.subnet_id = Some(String::new());

        let json = serde_json::to_value(expand(&fe).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "public",
                "properties": { "privateIPAllocationMethod": "Dynamic" }
            })
        );
    }

    #[test]
    fn missing_allocation_is_rejected() {
        let fe = FrontendIpConfiguration::new("public", "");
        assert!(matches!(
            expand(&fe).unwrap_err(),
            Error::MissingField { field: "private_ip_address_allocation", .. }
        ));
    }

    #[test]
    fn flatten_reads_back_references() {
        let remote = model::FrontendIpConfiguration {
            name: Some("public".into()),
            properties: Some(model::FrontendIpConfigurationProperties {
                private_ip_allocation_method: Some("Dynamic".into()),
                load_balancing_rules: Some(vec![SubResource::new("/rules/http")]),
                inbound_nat_rules: Some(vec![SubResource::new("/nat/ssh")]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let fe = flatten(&remote).unwrap();
        assert!(fe.private_ip_address.is_none());
        assert!(fe.load_balancer_rules.contains("/rules/http"));
        assert!(fe.inbound_nat_rules.contains("/nat/ssh"));
    }
}

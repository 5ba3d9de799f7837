//! Health probe expand/flatten

use super::{expand_set, flatten_list, optional, remote_name, remote_number, required_name};
use crate::error::Result;
use crate::hash::Identity;
use crate::model::{self, reference_ids};
use crate::resource::{IdentitySet, Probe};

/// Expand one probe
pub fn expand(probe: &Probe) -> Result<model::Probe> {
    Ok(model::Probe {
        name: Some(required_name(probe)?),
        properties: Some(model::ProbeProperties {
            protocol: optional(probe.protocol.as_ref()),
            port: Some(probe.port),
            interval_in_seconds: Some(probe.interval_in_seconds),
            number_of_probes: Some(probe.number_of_probes),
            request_path: optional(probe.request_path.as_ref()),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Expand every probe of the aggregate
pub fn expand_all(set: &IdentitySet<Probe>) -> Result<Vec<model::Probe>> {
    expand_set(set, expand)
}

/// Flatten one remote probe
pub fn flatten(remote: &model::Probe) -> Result<Probe> {
    let name = remote_name(remote.name.as_ref(), Probe::KIND)?;
    let props = remote.properties.clone().unwrap_or_default();

    Ok(Probe {
        port: remote_number(props.port, Probe::KIND, &name, "port")?,
        interval_in_seconds: remote_number(props.interval_in_seconds, Probe::KIND, &name, "intervalInSeconds")?,
        number_of_probes: remote_number(props.number_of_probes, Probe::KIND, &name, "numberOfProbes")?,
        protocol: optional(props.protocol.as_ref()),
        request_path: optional(props.request_path.as_ref()),
        load_balance_rules: reference_ids(props.load_balancing_rules.as_ref()).collect(),
        name,
    })
}

/// Flatten the remote probe list
pub fn flatten_all(remote: &[model::Probe]) -> Result<IdentitySet<Probe>> {
    flatten_list(remote, flatten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubResource;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trip_http() {
        let probe = Probe::new("health", 80, 5, 2).with_http_path("/healthz");
        assert_eq!(flatten(&expand(&probe).unwrap()).unwrap(), probe);
    }

    #[test]
    fn round_trip_tcp_without_path() {
        let mut probe = Probe::new("ssh", 22, 15, 4);
        probe.protocol = Some("Tcp".into());
        assert_eq!(flatten(&expand(&probe).unwrap()).unwrap(), probe);
    }

    #[test]
    fn flatten_reads_rule_back_references() {
        let mut remote = expand(&Probe::new("health", 80, 5, 2)).unwrap();
        if let Some(props) = remote.properties.as_mut() {
            props.protocol = Some("Tcp".into());
            props.load_balancing_rules = Some(vec![SubResource::new("/loadBalancingRules/http")]);
        }

        let probe = flatten(&remote).unwrap();
        assert_eq!(probe.protocol.as_deref(), Some("Tcp"));
        assert!(probe.load_balance_rules.contains("/loadBalancingRules/http"));
    }
}

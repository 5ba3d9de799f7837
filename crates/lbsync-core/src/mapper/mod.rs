//! Model mapper
//!
//! Bidirectional translation between configuration records ([`crate::resource`])
//! and the remote wire model ([`crate::model`]). One expand/flatten pair per
//! sub-resource kind lives in its own module; this module assembles the
//! aggregate.
//!
//! Expand omits optional fields that are unset or empty and never sends
//! read-only fields. Flatten reproduces every field expand can produce plus the
//! read-only back-references, and leaves a kind untouched when the remote list
//! is absent.

pub mod backend_pool;
pub mod frontend;
pub mod nat_rule;
pub mod probe;
pub mod rule;

use tracing::debug;

use crate::error::{Error, Result};
use crate::hash::Identity;
use crate::model::{self, SubResource};
use crate::resource::{normalize_location, IdentitySet, LoadBalancer};

/// Build the outbound model for the whole aggregate
///
/// Kinds with no records are left out of the request rather than sent as
/// empty lists.
pub fn expand_load_balancer(lb: &LoadBalancer) -> Result<model::LoadBalancer> {
    let properties = model::LoadBalancerProperties {
        frontend_ip_configurations: non_empty(frontend::expand_all(&lb.frontend_ip_configuration)?),
        backend_address_pools: non_empty(backend_pool::expand_all(&lb.backend_address_pool)?),
        load_balancing_rules: non_empty(rule::expand_all(&lb.load_balancing_rule)?),
        probes: non_empty(probe::expand_all(&lb.probe)?),
        inbound_nat_rules: non_empty(nat_rule::expand_all(&lb.inbound_nat_rule)?),
        ..Default::default()
    };

    debug!(
        load_balancer = %lb.name,
        frontends = lb.frontend_ip_configuration.len(),
        pools = lb.backend_address_pool.len(),
        rules = lb.load_balancing_rule.len(),
        probes = lb.probe.len(),
        nat_rules = lb.inbound_nat_rule.len(),
        "expanded load balancer"
    );

    Ok(model::LoadBalancer {
        name: Some(lb.name.clone()),
        location: Some(lb.location.clone()),
        tags: (!lb.tags.is_empty()).then(|| lb.tags.clone()),
        properties: Some(properties),
        ..Default::default()
    })
}

/// Copy remote-observed values into the configuration object
///
/// Kinds whose remote list is absent are left as they are.
pub fn flatten_into(remote: &model::LoadBalancer, lb: &mut LoadBalancer) -> Result<()> {
    if let Some(location) = remote.location.as_deref() {
        lb.location = normalize_location(location);
    }
    if let Some(tags) = &remote.tags {
        lb.tags = tags.clone();
    }

    let Some(props) = &remote.properties else {
        return Ok(());
    };

    if let Some(list) = &props.frontend_ip_configurations {
        lb.frontend_ip_configuration = frontend::flatten_all(list)?;
    }
    if let Some(list) = &props.backend_address_pools {
        lb.backend_address_pool = backend_pool::flatten_all(list)?;
    }
    if let Some(list) = &props.load_balancing_rules {
        lb.load_balancing_rule = rule::flatten_all(list)?;
    }
    if let Some(list) = &props.probes {
        lb.probe = probe::flatten_all(list)?;
    }
    if let Some(list) = &props.inbound_nat_rules {
        lb.inbound_nat_rule = nat_rule::flatten_all(list)?;
    }

    debug!(load_balancer = %lb.name, "flattened remote load balancer");
    Ok(())
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

/// Expand every record of a set, stopping at the first error
pub(crate) fn expand_set<T, M>(
    set: &IdentitySet<T>,
    expand: impl Fn(&T) -> Result<M>,
) -> Result<Vec<M>> {
    set.iter().map(expand).collect()
}

/// Flatten every remote item of a list into a set
pub(crate) fn flatten_list<T: Identity, M>(
    items: &[M],
    flatten: impl Fn(&M) -> Result<T>,
) -> Result<IdentitySet<T>> {
    items.iter().map(flatten).collect()
}

/// A declared name, which must be non-empty
pub(crate) fn required_name<T: Identity>(record: &T) -> Result<String> {
    if record.name().is_empty() {
        return Err(Error::missing_field(T::KIND, "name"));
    }
    Ok(record.name().to_string())
}

/// A declared string that must be non-empty
pub(crate) fn required(value: &str, kind: &'static str, field: &'static str) -> Result<String> {
    if value.is_empty() {
        return Err(Error::missing_field(kind, field));
    }
    Ok(value.to_string())
}

/// An optional string, with empty treated as absent
pub(crate) fn optional(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

/// An optional reference, with empty treated as absent
pub(crate) fn reference(id: Option<&String>) -> Option<SubResource> {
    optional(id).map(SubResource::new)
}

/// The identifier inside an optional remote reference
pub(crate) fn reference_id(reference: Option<&SubResource>) -> Option<String> {
    reference
        .and_then(|r| r.id.as_ref())
        .filter(|id| !id.is_empty())
        .cloned()
}

/// Name of a remote item, which every flatten requires
pub(crate) fn remote_name(name: Option<&String>, kind: &str) -> Result<String> {
    optional(name).ok_or_else(|| Error::malformed(format!("{} without a name", kind)))
}

/// A numeric field the remote always reports
pub(crate) fn remote_number(value: Option<i32>, kind: &str, name: &str, field: &str) -> Result<i32> {
    value.ok_or_else(|| Error::malformed(format!("{} {} has no {}", kind, name, field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{
        BackendAddressPool, FrontendIpConfiguration, InboundNatRule, LoadBalancingRule, Probe,
    };
    use pretty_assertions::assert_eq;

    fn declared() -> LoadBalancer {
        LoadBalancer::new("lb-web", "westus", "rg-prod")
            .with_tag("env", "prod")
            .with_frontend(
                FrontendIpConfiguration::new("public", "Dynamic").with_public_ip_address_id("/pip/web"),
            )
            .with_backend_pool(BackendAddressPool::new("web"))
            .with_probe(Probe::new("health", 80, 5, 2).with_http_path("/healthz"))
            .with_nat_rule(InboundNatRule::new("ssh", "Tcp", 2222, 22))
    }

    #[test]
    fn empty_kinds_are_left_out() {
        let remote = expand_load_balancer(&declared()).unwrap();
        let props = remote.properties.unwrap();

        assert!(props.load_balancing_rules.is_none());
        assert_eq!(props.frontend_ip_configurations.unwrap().len(), 1);
        assert_eq!(remote.tags.unwrap().get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn aggregate_round_trip() {
        let lb = declared();
        let remote = expand_load_balancer(&lb).unwrap();

        let mut back = LoadBalancer::new("lb-web", "", "rg-prod");
        flatten_into(&remote, &mut back).unwrap();

        assert_eq!(back, lb);
    }

    #[test]
    fn absent_remote_list_leaves_kind_untouched() {
        let mut lb = declared().with_rule(LoadBalancingRule::new("http", "Tcp", 80, 80));
        let remote = model::LoadBalancer {
            location: Some("West US".into()),
            properties: Some(model::LoadBalancerProperties {
                probes: Some(Vec::new()),
                ..Default::default()
            }),
            ..Default::default()
        };

        flatten_into(&remote, &mut lb).unwrap();

        assert_eq!(lb.location, "westus");
        assert_eq!(lb.load_balancing_rule.len(), 1);
        assert!(lb.probe.is_empty());
    }

    #[test]
    fn expand_fails_fast_on_missing_field() {
        let lb = declared().with_rule(LoadBalancingRule::new("http", "", 80, 80));
        let err = expand_load_balancer(&lb).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingField { kind: "load_balancing_rule", field: "protocol" }
        ));
    }
}

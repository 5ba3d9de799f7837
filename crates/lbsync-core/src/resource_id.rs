//! Resource-identifier codec
//!
//! Parses and renders ARM identifiers:
//!
//! ```text
//! /subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}[/{childType}/{childName}]...
//! ```
//!
//! A malformed identifier means the accumulated state is corrupt, so every
//! parse failure is an [`Error::ResourceId`](crate::Error::ResourceId).

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Namespace of load balancer resources
pub const NETWORK_NAMESPACE: &str = "Microsoft.Network";

/// Type segment of the aggregate
pub const LOAD_BALANCERS: &str = "loadBalancers";

/// A parsed resource identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    /// Provider namespace, absent for a bare resource group identifier
    pub provider: Option<String>,
    /// `(type, name)` pairs below the provider, outermost first
    pub path: Vec<(String, String)>,
}

impl ResourceId {
    /// Identifier of a load balancer
    pub fn load_balancer(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            provider: Some(NETWORK_NAMESPACE.to_string()),
            path: vec![(LOAD_BALANCERS.to_string(), name.into())],
        }
    }

    /// Name of the segment with the given type, if present
    pub fn segment(&self, kind: &str) -> Option<&str> {
        self.path
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(kind))
            .map(|(_, v)| v.as_str())
    }

    /// Name of the owning load balancer
    pub fn load_balancer_name(&self) -> Result<&str> {
        self.segment(LOAD_BALANCERS).ok_or_else(|| {
            Error::resource_id(format!("{} is not a load balancer identifier", self))
        })
    }

    /// Identifier of a child resource below this one
    pub fn child(&self, kind: &str, name: impl Into<String>) -> Self {
        let mut id = self.clone();
        id.path.push((kind.to_string(), name.into()));
        id
    }

    /// Name of the child of the given type
    pub fn child_name(&self, kind: &str) -> Option<&str> {
        self.path
            .iter()
            .skip(1)
            .find(|(k, _)| k.eq_ignore_ascii_case(kind))
            .map(|(_, v)| v.as_str())
    }

    /// Identifier of the load balancer owning this resource
    pub fn parent_load_balancer_id(&self) -> Result<Self> {
        let pos = self
            .path
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(LOAD_BALANCERS))
            .ok_or_else(|| {
                Error::resource_id(format!("{} is not below a load balancer", self))
            })?;

        let mut id = self.clone();
        id.path.truncate(pos + 1);
        Ok(id)
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| Error::resource_id(format!("{:?} does not start with '/'", s)))?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        let segments: Vec<&str> = rest.split('/').collect();
        if segments.len() % 2 != 0 {
            return Err(Error::resource_id(format!(
                "{:?} has an odd number of segments",
                s
            )));
        }
        if segments.iter().any(|seg| seg.is_empty()) {
            return Err(Error::resource_id(format!("{:?} has an empty segment", s)));
        }

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut path = Vec::new();

        for pair in segments.chunks_exact(2) {
            let (key, value) = (pair[0], pair[1]);
            if provider.is_none() && key.eq_ignore_ascii_case("subscriptions") {
                subscription_id = Some(value.to_string());
            } else if provider.is_none() && key.eq_ignore_ascii_case("resourceGroups") {
                resource_group = Some(value.to_string());
            } else if provider.is_none() && key.eq_ignore_ascii_case("providers") {
                provider = Some(value.to_string());
            } else {
                path.push((key.to_string(), value.to_string()));
            }
        }

        let subscription_id = subscription_id.ok_or_else(|| {
            Error::resource_id(format!("{:?} has no subscriptions segment", s))
        })?;
        let resource_group = resource_group.ok_or_else(|| {
            Error::resource_id(format!("{:?} has no resourceGroups segment", s))
        })?;

        Ok(Self {
            subscription_id,
            resource_group,
            provider,
            path,
        })
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group
        )?;
        if let Some(provider) = &self.provider {
            write!(f, "/providers/{}", provider)?;
        }
        for (kind, name) in &self.path {
            write!(f, "/{}/{}", kind, name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const LB: &str =
        "/subscriptions/sub-1/resourceGroups/rg-prod/providers/Microsoft.Network/loadBalancers/lb-web";

    #[test]
    fn parses_load_balancer_id() {
        let id: ResourceId = LB.parse().unwrap();
        assert_eq!(id.subscription_id, "sub-1");
        assert_eq!(id.resource_group, "rg-prod");
        assert_eq!(id.provider.as_deref(), Some(NETWORK_NAMESPACE));
        assert_eq!(id.load_balancer_name().unwrap(), "lb-web");
        assert_eq!(id, ResourceId::load_balancer("sub-1", "rg-prod", "lb-web"));
    }

    #[test]
    fn display_is_inverse_of_parse() {
        let raw = format!("{}/probes/health", LB);
        let id: ResourceId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn child_and_parent() {
        let lb: ResourceId = LB.parse().unwrap();
        let rule = lb.child("loadBalancingRules", "http");

        assert_eq!(rule.child_name("loadBalancingRules"), Some("http"));
        assert_eq!(rule.child_name("probes"), None);
        assert_eq!(lb.child_name(LOAD_BALANCERS), None);
        assert_eq!(rule.parent_load_balancer_id().unwrap(), lb);
        assert_eq!(rule.load_balancer_name().unwrap(), "lb-web");
    }

    #[test]
    fn resource_group_id_has_no_load_balancer() {
        let id: ResourceId = "/subscriptions/s/resourceGroups/rg".parse().unwrap();
        assert!(id.provider.is_none());
        assert!(id.load_balancer_name().is_err());
        assert!(id.parent_load_balancer_id().is_err());
    }

    #[test_case("subscriptions/s/resourceGroups/rg" ; "no leading slash")]
    #[test_case("/subscriptions/s/resourceGroups" ; "odd segments")]
    #[test_case("/resourceGroups/rg/providers/p" ; "no subscription")]
    #[test_case("/subscriptions/s/providers/p" ; "no resource group")]
    #[test_case("/subscriptions//resourceGroups/rg" ; "empty value")]
    fn rejects_malformed(raw: &str) {
        let err = raw.parse::<ResourceId>().unwrap_err();
        assert!(matches!(err, Error::ResourceId(_)), "{:?}", err);
    }
}

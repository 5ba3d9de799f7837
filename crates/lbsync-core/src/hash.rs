//! Identity hashing for set-valued sub-resources
//!
//! Unordered collections (frontend configurations, pools, rules, probes, NAT
//! rules) are keyed by a fingerprint of a fixed, kind-specific subset of their
//! fields instead of by position. Each discriminator is rendered as `value-`,
//! the segments are concatenated in declaration order and the resulting string
//! is hashed with CRC-32/IEEE.
//!
//! Two records that agree on every discriminator land in the same slot even if
//! their other attributes differ. The host diff layer relies on that: changing
//! `idle_timeout_in_minutes` on a rule is an in-place update, changing its
//! `frontend_port` is a remove + add.
//!
//! | kind | discriminators |
//! |---|---|
//! | frontend IP configuration | name, private_ip_address_allocation |
//! | backend address pool | name |
//! | load-balancing rule | name, protocol, frontend_port, backend_port |
//! | probe | name, port, interval_in_seconds, number_of_probes, request_path |
//! | inbound NAT rule | name, protocol, frontend_port, backend_port |

use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{Display, Write};

/// Hash a string with CRC-32/IEEE
pub fn hash_string(input: &str) -> u32 {
    crc32fast::hash(input.as_bytes())
}

/// Builder for the delimiter-separated discriminator string of a record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discriminator {
    buf: String,
}

impl Discriminator {
    /// Start an empty discriminator
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one discriminator field
    pub fn field(mut self, value: impl Display) -> Self {
        // Writing into a String cannot fail.
        let _ = write!(self.buf, "{}-", value);
        self
    }

    /// The concatenated discriminator string
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// The identity hash of this discriminator
    pub fn finish(&self) -> u32 {
        hash_string(&self.buf)
    }
}

/// A configuration record that can be placed in an [`IdentitySet`](crate::resource::IdentitySet)
pub trait Identity {
    /// Human-readable kind, used in error messages and events
    const KIND: &'static str;

    /// Ordered discriminator field names (the untyped view of [`Identity::discriminator`])
    const DISCRIMINATORS: &'static [&'static str];

    /// Record name, unique per kind within one aggregate
    fn name(&self) -> &str;

    /// Discriminator built from the typed fields
    fn discriminator(&self) -> Discriminator;

    /// Identity hash of the record
    fn identity_hash(&self) -> u32 {
        self.discriminator().finish()
    }
}

/// Hash an untyped `field -> value` record over an ordered list of discriminators
///
/// Strings are used verbatim, numbers and booleans in their JSON rendering.
/// A missing or null discriminator renders as an empty segment; callers are
/// expected to pass complete records.
pub fn hash_fields(record: &HashMap<String, Value>, discriminators: &[&str]) -> u32 {
    discriminators
        .iter()
        .fold(Discriminator::new(), |acc, key| match record.get(*key) {
            Some(Value::String(s)) => acc.field(s),
            Some(Value::Null) | None => acc.field(""),
            Some(other) => acc.field(other),
        })
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> HashMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn discriminator_joins_with_trailing_dash() {
        let d = Discriminator::new().field("rule1").field("Tcp").field(80).field(8080);
        assert_eq!(d.as_str(), "rule1-Tcp-80-8080-");
    }

    #[test]
    fn hash_is_crc32_of_discriminator() {
        let d = Discriminator::new().field("pool");
        assert_eq!(d.finish(), crc32fast::hash(b"pool-"));
    }

    #[test]
    fn untyped_hash_ignores_non_discriminators() {
        let keys = ["name", "protocol", "frontend_port", "backend_port"];
        let a = record(json!({
            "name": "http", "protocol": "Tcp", "frontend_port": 80, "backend_port": 8080,
            "idle_timeout_in_minutes": 4
        }));
        let b = record(json!({
            "backend_port": 8080, "frontend_port": 80, "protocol": "Tcp", "name": "http",
            "load_distribution": "SourceIP"
        }));
        assert_eq!(hash_fields(&a, &keys), hash_fields(&b, &keys));
    }

    #[test]
    fn untyped_hash_changes_with_discriminator() {
        let keys = ["name", "port"];
        let a = record(json!({ "name": "probe", "port": 80 }));
        let b = record(json!({ "name": "probe", "port": 81 }));
        assert_ne!(hash_fields(&a, &keys), hash_fields(&b, &keys));
    }
}

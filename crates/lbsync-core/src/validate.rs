//! Field validators
//!
//! Checks run at configuration-parse time, before any remote call. A validator
//! never mutates the record it inspects; accepted values keep the casing they
//! were typed with and pass through to the remote model unchanged.

use crate::error::Error;

/// Accepted private IP allocation modes
pub const PRIVATE_IP_ADDRESS_ALLOCATIONS: &[&str] = &["Static", "Dynamic"];

/// Check that `value` is one of `allowed`, ignoring ASCII case
///
/// Returns one error per violation, so an empty vector means the value is valid.
pub fn one_of(value: &str, key: &str, allowed: &[&str]) -> Vec<Error> {
    if allowed.iter().any(|candidate| candidate.eq_ignore_ascii_case(value)) {
        return Vec::new();
    }

    vec![Error::validation(format!(
        "{} must be one of {}, got {:?}",
        key,
        allowed.join(", "),
        value
    ))]
}

/// Validate a frontend configuration's `private_ip_address_allocation`
pub fn private_ip_address_allocation(value: &str, key: &str) -> Vec<Error> {
    one_of(value, key, PRIVATE_IP_ADDRESS_ALLOCATIONS)
}

/// Collapse validator output into a fail-fast result
pub fn first_error(errors: Vec<Error>) -> Result<(), Error> {
    match errors.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

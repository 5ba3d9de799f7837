//! Backend address pool expand/flatten
//!
//! A pool has nothing to send beyond its name. Both of its reference lists are
//! computed by the remote and land in separate fields on flatten.

use super::{expand_set, flatten_list, remote_name, required_name};
use crate::error::Result;
use crate::hash::Identity;
use crate::model::{self, reference_ids};
use crate::resource::{BackendAddressPool, IdentitySet};

/// Expand one backend pool
pub fn expand(pool: &BackendAddressPool) -> Result<model::BackendAddressPool> {
    Ok(model::BackendAddressPool {
        name: Some(required_name(pool)?),
        ..Default::default()
    })
}

/// Expand every backend pool of the aggregate
pub fn expand_all(set: &IdentitySet<BackendAddressPool>) -> Result<Vec<model::BackendAddressPool>> {
    expand_set(set, expand)
}

/// Flatten one remote backend pool
pub fn flatten(remote: &model::BackendAddressPool) -> Result<BackendAddressPool> {
    let mut pool = BackendAddressPool::new(remote_name(remote.name.as_ref(), BackendAddressPool::KIND)?);

    if let Some(props) = &remote.properties {
        pool.backend_ip_configurations =
            reference_ids(props.backend_ip_configurations.as_ref()).collect();
        pool.load_balancing_rules = reference_ids(props.load_balancing_rules.as_ref()).collect();
    }

    Ok(pool)
}

/// Flatten the remote pool list
pub fn flatten_all(remote: &[model::BackendAddressPool]) -> Result<IdentitySet<BackendAddressPool>> {
    flatten_list(remote, flatten)
}

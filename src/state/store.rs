//! Lookup, mutation and canonical ordering on an in-memory state.

use tracing::debug;

use super::types::{IndexKey, InstanceState, ResourceState, State};

impl State {
    /// Finds the resource and instance an address refers to.
    ///
    /// An integer-keyed instance matches its indexed address, and instance
    /// `0` also matches the bare resource address. A string-keyed instance
    /// only matches its indexed address. An unkeyed instance matches the bare
    /// resource address.
    #[must_use]
    pub fn find_by_address(&self, address: &str) -> Option<(&ResourceState, &InstanceState)> {
        for resource in &self.resources {
            let bare = resource.addr();
            for instance in &resource.instances {
                let matched = match &instance.index_key {
                    IndexKey::Int(n) => {
                        (*n == 0 && address == bare)
                            || address == resource.instance_addr(&instance.index_key)
                    }
                    IndexKey::Str(_) => address == resource.instance_addr(&instance.index_key),
                    IndexKey::None => address == bare,
                };
                if matched {
                    return Some((resource, instance));
                }
            }
        }
        None
    }

    /// Returns true if any instance in the state matches the address.
    #[must_use]
    pub fn contains_address(&self, address: &str) -> bool {
        self.find_by_address(address).is_some()
    }

    /// Returns the position of the first resource with the given bare address.
    #[must_use]
    pub fn position_of(&self, address: &str) -> Option<usize> {
        self.resources.iter().position(|r| r.addr() == address)
    }

    /// Appends a resource. Existing resources at the same address are kept.
    pub fn add_resource(&mut self, resource: ResourceState) {
        debug!("Adding resource {}", resource.addr());
        self.resources.push(resource);
    }

    /// Removes every resource whose bare address equals `address`.
    ///
    /// Returns the number of resources removed.
    pub fn remove_resource(&mut self, address: &str) -> usize {
        let before = self.resources.len();
        self.resources.retain(|r| r.addr() != address);
        before - self.resources.len()
    }

    /// Puts resources and instances into canonical order.
    ///
    /// Resources are ordered by module, mode, type and name; instances by
    /// index key and then deposed key. Both sorts are stable, so normalizing
    /// twice gives the same order as normalizing once.
    pub fn normalize(&mut self) {
        self.resources.sort_by(|a, b| {
            (a.module.as_str(), a.mode.as_str(), a.resource_type.as_str(), a.name.as_str()).cmp(&(
                b.module.as_str(),
                b.mode.as_str(),
                b.resource_type.as_str(),
                b.name.as_str(),
            ))
        });

        for resource in &mut self.resources {
            resource.instances.sort_by(|a, b| {
                a.index_key
                    .cmp(&b.index_key)
                    .then_with(|| a.deposed.cmp(&b.deposed))
            });
        }
    }

    /// Returns the total number of instances across all resources.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.resources.iter().map(|r| r.instances.len()).sum()
    }
}

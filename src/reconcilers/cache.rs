// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Process-local ownership cache.
//!
//! Holds two independent mappings for the lifetime of the engine:
//!
//! - CIDR → resolved registry subnet, filled lazily on first use. Failed
//!   resolutions are not cached and are retried on the next event.
//! - address → owner, written after every successful synchronizer outcome and
//!   read by the deletion path.
//!
//! Nothing is evicted or re-validated here; the synchronizer re-reads the
//! registry on every event. The cache is owned by the single reconciliation
//! worker and mutated through `&mut self`, so it carries no lock.

use crate::ipam_errors::RegistryError;
use crate::metrics;
use crate::registry::{IpamRegistry, SubnetHandle};
use crate::service::OwnerId;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Default)]
pub struct OwnershipCache {
    subnet_handles: HashMap<String, SubnetHandle>,
    owned_addresses: BTreeMap<String, OwnerId>,
}

impl OwnershipCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the registry subnet for `cidr`, resolving it on first use.
    ///
    /// # Errors
    ///
    /// Returns the registry error when the CIDR matches zero or several
    /// subnets, or the lookup itself fails. Nothing is cached in that case.
    pub async fn resolve_subnet(
        &mut self,
        registry: &dyn IpamRegistry,
        cidr: &str,
    ) -> Result<SubnetHandle, RegistryError> {
        if let Some(handle) = self.subnet_handles.get(cidr) {
            return Ok(handle.clone());
        }

        let handle = match registry.lookup_subnet_by_range(cidr).await {
            Ok(handle) => handle,
            Err(e) => {
                metrics::record_registry_operation("lookup_subnet", "error");
                return Err(e);
            }
        };
        metrics::record_registry_operation("lookup_subnet", "success");
        debug!(cidr = %cidr, subnet_id = %handle.id, "Resolved phpIPAM subnet");
        self.subnet_handles.insert(cidr.to_string(), handle.clone());
        Ok(handle)
    }

    /// Record that `owner` holds `address`.
    pub fn record_owner(&mut self, address: &str, owner: &OwnerId) {
        self.owned_addresses
            .insert(address.to_string(), owner.clone());
    }

    /// Drop the ownership entry for `address`.
    pub fn forget_address(&mut self, address: &str) -> Option<OwnerId> {
        self.owned_addresses.remove(address)
    }

    #[must_use]
    pub fn owner_of(&self, address: &str) -> Option<&OwnerId> {
        self.owned_addresses.get(address)
    }

    /// Every cached address owned by `owner`, in address order.
    #[must_use]
    pub fn addresses_owned_by(&self, owner: &OwnerId) -> Vec<String> {
        self.owned_addresses
            .iter()
            .filter(|(_, holder)| *holder == owner)
            .map(|(address, _)| address.clone())
            .collect()
    }

    #[must_use]
    pub fn cached_subnet(&self, cidr: &str) -> Option<&SubnetHandle> {
        self.subnet_handles.get(cidr)
    }

    /// Number of addresses currently tracked.
    #[must_use]
    pub fn owned_count(&self) -> usize {
        self.owned_addresses.len()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;

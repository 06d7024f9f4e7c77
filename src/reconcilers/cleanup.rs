// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Release of reservations held by a removed Service.
//!
//! Only addresses recorded in the [`OwnershipCache`] are considered. Each one
//! is re-queried in the registry before anything is deleted; an address that
//! is already gone is simply forgotten. Failed deletions keep their cache
//! entry so a later removal event for the same owner can try again.

use super::cache::OwnershipCache;
use crate::ipam_errors::SyncError;
use crate::metrics;
use crate::registry::IpamRegistry;
use crate::service::OwnerId;
use tracing::{error, info, warn};

/// Outcome of releasing every address held by one owner.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    /// Addresses whose reservation was deleted
    pub deleted: Vec<String>,
    /// Addresses that had no reservation left in the registry
    pub already_absent: Vec<String>,
    /// Addresses that could not be released
    pub failed: Vec<(String, SyncError)>,
}

impl ReleaseReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete every registry reservation the cache attributes to `owner`.
///
/// Every cached address is visited, even after a failure on an earlier one.
pub async fn release_owned_addresses(
    registry: &dyn IpamRegistry,
    cache: &mut OwnershipCache,
    owner: &OwnerId,
) -> ReleaseReport {
    let mut report = ReleaseReport::default();

    for address in cache.addresses_owned_by(owner) {
        match release_address(registry, &address).await {
            Ok(true) => {
                cache.forget_address(&address);
                report.deleted.push(address);
            }
            Ok(false) => {
                cache.forget_address(&address);
                report.already_absent.push(address);
            }
            Err(e) => {
                error!(
                    address = %address,
                    owner = %owner,
                    error = %e,
                    "Failed to release IP address in phpIPAM"
                );
                metrics::record_error("reservation", e.category());
                report.failed.push((address, e));
            }
        }
    }

    report
}

/// Delete the single reservation for `address`.
///
/// Returns `Ok(false)` when the registry holds no reservation for it.
async fn release_address(registry: &dyn IpamRegistry, address: &str) -> Result<bool, SyncError> {
    let existing = registry.find_reservations(address).await.map_err(|source| {
        metrics::record_registry_operation("lookup", "error");
        SyncError::Registry {
            action: "lookup",
            address: address.to_string(),
            source,
        }
    })?;
    metrics::record_registry_operation("lookup", "success");

    match existing.as_slice() {
        [] => {
            warn!(address = %address, "IP address already absent from phpIPAM");
            Ok(false)
        }
        [reservation] => {
            registry
                .delete_reservation(&reservation.record_id)
                .await
                .map_err(|source| {
                    metrics::record_registry_operation("delete", "error");
                    SyncError::Registry {
                        action: "delete",
                        address: address.to_string(),
                        source,
                    }
                })?;
            metrics::record_registry_operation("delete", "success");
            info!(
                address = %address,
                record_id = %reservation.record_id,
                "Removed IP address from phpIPAM"
            );
            Ok(true)
        }
        many => Err(SyncError::DuplicateReservations {
            address: address.to_string(),
            count: many.len(),
        }),
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod cleanup_tests;

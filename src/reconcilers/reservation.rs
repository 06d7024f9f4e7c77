// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reservation synchronization for a single address.
//!
//! Brings the registry to exactly one reservation for `address` owned by
//! `owner`:
//!
//! 1. Search the registry for `address`.
//! 2. Nothing found: create it.
//! 3. One record already owned by `owner`: leave it, but remember it in the
//!    cache (this is how the cache recovers after a restart).
//! 4. One record owned by someone else: patch the hostname.
//! 5. Several records: consistency error, nothing is touched.
//!
//! Failures are returned to the engine for logging and are never retried here.

use super::cache::OwnershipCache;
use crate::ipam_errors::{RegistryError, SyncError};
use crate::metrics;
use crate::registry::{IpamRegistry, Reservation, SubnetHandle};
use crate::service::OwnerId;
use tracing::{debug, info};

/// What the synchronizer did for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A new reservation was created
    Created(Reservation),
    /// An existing reservation changed owner
    Updated {
        record_id: String,
        previous_owner: Option<String>,
    },
    /// The registry already held the wanted reservation
    Unchanged { record_id: String },
}

fn registry_failure(action: &'static str, address: &str, source: RegistryError) -> SyncError {
    metrics::record_registry_operation(action, "error");
    SyncError::Registry {
        action,
        address: address.to_string(),
        source,
    }
}

/// Ensure the registry holds exactly one reservation of `address` for `owner`.
///
/// The cache is updated only after the registry confirms the state.
///
/// # Errors
///
/// Returns [`SyncError::DuplicateReservations`] when the registry holds several
/// records for `address`, and [`SyncError::Registry`] when a registry call fails.
pub async fn sync_reservation(
    registry: &dyn IpamRegistry,
    cache: &mut OwnershipCache,
    address: &str,
    subnet: &SubnetHandle,
    owner: &OwnerId,
) -> Result<SyncOutcome, SyncError> {
    let existing = registry
        .find_reservations(address)
        .await
        .map_err(|e| registry_failure("lookup", address, e))?;
    metrics::record_registry_operation("lookup", "success");

    match existing.as_slice() {
        [] => {
            info!(
                address = %address,
                subnet_id = %subnet.id,
                owner = %owner,
                "IP address not found in phpIPAM, adding"
            );
            let created = registry
                .create_reservation(subnet, address, owner.as_str())
                .await
                .map_err(|e| registry_failure("create", address, e))?;
            metrics::record_registry_operation("create", "success");
            cache.record_owner(address, owner);
            Ok(SyncOutcome::Created(created))
        }
        [current] if current.is_owned_by(owner.as_str()) => {
            debug!(
                address = %address,
                owner = %owner,
                "IP address already has the right allocation in phpIPAM"
            );
            cache.record_owner(address, owner);
            Ok(SyncOutcome::Unchanged {
                record_id: current.record_id.clone(),
            })
        }
        [current] => {
            info!(
                address = %address,
                record_id = %current.record_id,
                previous_owner = ?current.hostname,
                owner = %owner,
                "IP address owned by another hostname in phpIPAM, updating"
            );
            registry
                .update_reservation_owner(&current.record_id, owner.as_str())
                .await
                .map_err(|e| registry_failure("update", address, e))?;
            metrics::record_registry_operation("update", "success");
            cache.record_owner(address, owner);
            Ok(SyncOutcome::Updated {
                record_id: current.record_id.clone(),
                previous_owner: current.hostname.clone(),
            })
        }
        many => Err(SyncError::DuplicateReservations {
            address: address.to_string(),
            count: many.len(),
        }),
    }
}

#[cfg(test)]
#[path = "reservation_tests.rs"]
mod reservation_tests;

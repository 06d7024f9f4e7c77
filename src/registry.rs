// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Registry abstraction used by the reconciliation engine.
//!
//! The engine never talks HTTP directly. It drives an [`IpamRegistry`], which the
//! [`PhpIpamClient`](crate::phpipam::PhpIpamClient) implements against the phpIPAM
//! REST API and which tests replace with an in-memory fake.

use crate::ipam_errors::RegistryError;
use async_trait::async_trait;

/// Resolved registry subnet for a configured CIDR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetHandle {
    /// Registry subnet identifier
    pub id: String,
    /// The CIDR this handle was resolved from
    pub cidr: String,
}

/// Registry-side address reservation.
///
/// Only existence and `hostname` drive reconciliation decisions; the other
/// fields are carried through so deletes and patches can address the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// The reserved IP address
    pub address: String,
    /// Registry subnet identifier the address belongs to
    pub subnet_id: String,
    /// Registry record identifier
    pub record_id: String,
    /// Owner recorded in the registry hostname field
    pub hostname: Option<String>,
}

impl Reservation {
    /// Returns `true` when the hostname field already names `owner`.
    #[must_use]
    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.hostname.as_deref() == Some(owner)
    }
}

/// Operations the reconciliation engine needs from an IPAM registry.
///
/// All calls are awaited one at a time by the single reconciliation worker.
#[async_trait]
pub trait IpamRegistry: Send + Sync {
    /// Resolve a CIDR to exactly one registry subnet.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when no subnet matches and
    /// [`RegistryError::AmbiguousSubnet`] when several do.
    async fn lookup_subnet_by_range(&self, cidr: &str) -> Result<SubnetHandle, RegistryError>;

    /// Find every reservation recorded for `address` (possibly none).
    ///
    /// # Errors
    ///
    /// Returns an error on transport, authentication or application failures.
    async fn find_reservations(&self, address: &str) -> Result<Vec<Reservation>, RegistryError>;

    /// Create a reservation for `address` in `subnet`, owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry rejects the reservation.
    async fn create_reservation(
        &self,
        subnet: &SubnetHandle,
        address: &str,
        owner: &str,
    ) -> Result<Reservation, RegistryError>;

    /// Rewrite the owner (hostname field) of an existing reservation.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry rejects the patch.
    async fn update_reservation_owner(
        &self,
        record_id: &str,
        owner: &str,
    ) -> Result<(), RegistryError>;

    /// Delete a reservation by registry record identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry rejects the delete.
    async fn delete_reservation(&self, record_id: &str) -> Result<(), RegistryError>;
}

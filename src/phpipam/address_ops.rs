// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Address HTTP API operations for phpIPAM.
//!
//! Each function performs exactly one request. Nothing here retries; the caller
//! decides what a failure means for the address being reconciled.

use super::types::{AddressRecord, CreateAddressRequest, PatchAddressRequest};
use super::{ensure_success, PhpIpamClient};
use crate::constants::{PATH_ADDRESSES, PHPIPAM_CODE_NOT_FOUND, RESERVATION_NOTE};
use crate::ipam_errors::RegistryError;
use crate::registry::{Reservation, SubnetHandle};
use reqwest::Method;
use tracing::{debug, info};

/// Search for every reservation of `address`.
///
/// phpIPAM answers an empty search with application code 404, which is
/// returned here as an empty list rather than an error.
///
/// # Errors
///
/// Returns an error on transport, auth or any other non-2xx application code.
pub async fn search_address(
    client: &PhpIpamClient,
    address: &str,
) -> Result<Vec<Reservation>, RegistryError> {
    let operation = format!("search address {address}");
    let response = client
        .request::<()>(
            Method::GET,
            &format!("{PATH_ADDRESSES}search/{address}/"),
            None,
            &operation,
        )
        .await?;

    if response.code == PHPIPAM_CODE_NOT_FOUND {
        debug!(address = %address, "Address not present in phpIPAM");
        return Ok(Vec::new());
    }
    let response = ensure_success(response, &operation)?;
    let records: Vec<AddressRecord> = response.data_list(&operation)?;
    Ok(records.into_iter().map(Reservation::from).collect())
}

/// Create a reservation for `address` in `subnet` with `owner` as hostname.
///
/// # Errors
///
/// Returns [`RegistryError::Application`] when phpIPAM rejects the address.
pub async fn create_address(
    client: &PhpIpamClient,
    subnet: &SubnetHandle,
    address: &str,
    owner: &str,
) -> Result<Reservation, RegistryError> {
    let operation = format!("create address {address}");
    let body = CreateAddressRequest {
        ip: address,
        hostname: owner,
        subnet_id: &subnet.id,
        note: RESERVATION_NOTE,
    };
    let response = client
        .request(Method::POST, PATH_ADDRESSES, Some(&body), &operation)
        .await?;
    let response = ensure_success(response, &operation)?;

    info!(
        address = %address,
        subnet_id = %subnet.id,
        record_id = ?response.id,
        owner = %owner,
        "Created phpIPAM address reservation"
    );

    Ok(Reservation {
        address: address.to_string(),
        subnet_id: subnet.id.clone(),
        record_id: response.id.unwrap_or_default(),
        hostname: Some(owner.to_string()),
    })
}

/// Patch the hostname (owner) of reservation `record_id`.
///
/// # Errors
///
/// Returns [`RegistryError::Application`] when phpIPAM rejects the patch.
pub async fn set_hostname(
    client: &PhpIpamClient,
    record_id: &str,
    owner: &str,
) -> Result<(), RegistryError> {
    let operation = format!("update address record {record_id}");
    let body = PatchAddressRequest {
        hostname: owner,
        note: RESERVATION_NOTE,
    };
    let response = client
        .request(
            Method::PATCH,
            &format!("{PATH_ADDRESSES}{record_id}/"),
            Some(&body),
            &operation,
        )
        .await?;
    ensure_success(response, &operation)?;

    info!(record_id = %record_id, owner = %owner, "Updated phpIPAM address owner");
    Ok(())
}

/// Delete reservation `record_id`.
///
/// # Errors
///
/// Returns [`RegistryError::Application`] when phpIPAM rejects the delete.
pub async fn delete_address(client: &PhpIpamClient, record_id: &str) -> Result<(), RegistryError> {
    let operation = format!("delete address record {record_id}");
    let response = client
        .request::<()>(
            Method::DELETE,
            &format!("{PATH_ADDRESSES}{record_id}/"),
            None,
            &operation,
        )
        .await?;
    ensure_success(response, &operation)?;

    info!(record_id = %record_id, "Deleted phpIPAM address reservation");
    Ok(())
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! phpIPAM registry and reconciliation error types.
//!
//! This module provides specialized error types for:
//! - phpIPAM REST API operations (subnet lookup, address search, create, patch, delete)
//! - Token authentication failures
//! - Per-address reconciliation outcomes reported by the synchronizer
//!
//! Every error exposes a stable [`category`](RegistryError::category) label so logs
//! and metrics can group failures by the taxonomy the controller reports on:
//! configuration, transport, auth, application and consistency.

use thiserror::Error;

/// Errors returned by the IPAM registry client.
///
/// Transport failures (no HTTP response), authentication failures, and
/// application errors (a decodable response carrying a non-2xx `code`) are kept
/// apart so callers can decide how loudly to report them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The registry has no object matching the request
    #[error("{resource} not found in phpIPAM")]
    NotFound {
        /// Description of what was looked up (e.g. `subnet 10.0.0.0/24`)
        resource: String,
    },

    /// A CIDR resolved to more than one registry subnet
    #[error("multiple subnets ({count}) found in phpIPAM matching CIDR {cidr}")]
    AmbiguousSubnet {
        /// The configured CIDR
        cidr: String,
        /// Number of subnets returned by the registry
        count: usize,
    },

    /// The HTTP request could not be sent or the response body could not be read
    #[error("HTTP request for {operation} failed: {reason}")]
    Transport {
        /// Registry operation being performed
        operation: String,
        /// Underlying transport error
        reason: String,
    },

    /// Credentials were rejected or the session token was refused
    #[error("phpIPAM authentication failed: {reason}")]
    Auth {
        /// Explanation returned by the registry or the client
        reason: String,
    },

    /// The registry answered with a non-2xx application code
    #[error("phpIPAM rejected {operation} (code {code}): {message}")]
    Application {
        /// Registry operation being performed
        operation: String,
        /// Application status code embedded in the response body
        code: i64,
        /// Message supplied by the registry
        message: String,
    },

    /// The response body was not the JSON document we expected
    #[error("unable to decode phpIPAM response for {operation}: {reason}")]
    Decode {
        /// Registry operation being performed
        operation: String,
        /// Deserialization error
        reason: String,
    },
}

impl RegistryError {
    /// Stable label used for metrics and structured logs.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            RegistryError::NotFound { .. } => "not_found",
            RegistryError::AmbiguousSubnet { .. } => "configuration",
            RegistryError::Transport { .. } | RegistryError::Decode { .. } => "transport",
            RegistryError::Auth { .. } => "auth",
            RegistryError::Application { .. } => "application",
        }
    }

    /// Returns `true` when the registry reported that the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }
}

/// Errors produced while reconciling a single address.
///
/// These are logged by the engine with full context and never retried; the next
/// event for the same service is the retry signal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The registry holds several reservations for one address
    #[error("phpIPAM holds {count} reservations for address {address}; operator attention required")]
    DuplicateReservations {
        /// The address with duplicate records
        address: String,
        /// Number of records found
        count: usize,
    },

    /// The registry call for an address failed
    #[error("{action} of address {address} failed: {source}")]
    Registry {
        /// What was attempted (`lookup`, `create`, `update`, `delete`)
        action: &'static str,
        /// The address being reconciled
        address: String,
        /// Underlying registry error
        #[source]
        source: RegistryError,
    },
}

impl SyncError {
    /// Stable label used for metrics and structured logs.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::DuplicateReservations { .. } => "consistency",
            SyncError::Registry { source, .. } => source.category(),
        }
    }
}

#[cfg(test)]
#[path = "ipam_errors_tests.rs"]
mod ipam_errors_tests;

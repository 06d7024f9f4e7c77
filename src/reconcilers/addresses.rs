// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Candidate address extraction.

use crate::service::ServiceSnapshot;
use ipnetwork::IpNetwork;
use std::collections::HashSet;
use std::net::IpAddr;

/// Addresses of `snapshot` that parse as IPs and fall inside `range`.
///
/// Order follows the snapshot's candidate list; duplicates are dropped. An
/// empty result is not an error, the rule simply has nothing to reserve.
#[must_use]
pub fn addresses_in_range(snapshot: &ServiceSnapshot, range: &IpNetwork) -> Vec<IpAddr> {
    let mut seen = HashSet::new();
    snapshot
        .address_candidates
        .iter()
        .filter_map(|candidate| candidate.parse::<IpAddr>().ok())
        .filter(|ip| range.contains(*ip))
        .filter(|ip| seen.insert(*ip))
        .collect()
}

#[cfg(test)]
#[path = "addresses_tests.rs"]
mod addresses_tests;

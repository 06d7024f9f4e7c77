// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Addressing rule selection.
//!
//! Every rule whose predicates all hold is returned, in declaration order; a
//! service may therefore have addresses reserved under several rules.

use crate::config::AddressingRule;
use crate::service::ServiceSnapshot;

/// Returns `true` when every predicate of `rule` holds for `snapshot`.
///
/// - namespace: absent, or exactly the snapshot namespace
/// - kind: absent, or exactly the snapshot service type
/// - name: absent, or the pattern matches the unqualified service name
#[must_use]
pub fn rule_matches(rule: &AddressingRule, snapshot: &ServiceSnapshot) -> bool {
    if rule
        .namespace
        .as_deref()
        .is_some_and(|namespace| namespace != snapshot.namespace)
    {
        return false;
    }
    if rule
        .service_kind
        .as_deref()
        .is_some_and(|kind| kind != snapshot.kind)
    {
        return false;
    }
    rule.name_pattern
        .as_ref()
        .is_none_or(|pattern| pattern.is_match(&snapshot.name))
}

/// Select the rules that apply to `snapshot`, preserving declaration order.
#[must_use]
pub fn matching_rules<'a>(
    snapshot: &ServiceSnapshot,
    rules: &'a [AddressingRule],
) -> Vec<&'a AddressingRule> {
    rules
        .iter()
        .filter(|rule| rule_matches(rule, snapshot))
        .collect()
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod policy_tests;

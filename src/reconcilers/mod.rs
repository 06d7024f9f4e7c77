// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of Service addresses against the phpIPAM registry.
//!
//! The [`Reconciler`] is driven by the watcher one [`ServiceEvent`] at a time:
//!
//! 1. **Match** - [`policy::matching_rules`] selects the rules that apply to the Service
//! 2. **Extract** - [`addresses::addresses_in_range`] keeps the candidate addresses in each rule's range
//! 3. **Resolve** - the rule's CIDR is resolved to a registry subnet through the [`OwnershipCache`]
//! 4. **Synchronize** - [`reservation::sync_reservation`] creates, updates or confirms each reservation
//!
//! Removal skips matching and goes straight from the cache to
//! [`cleanup::release_owned_addresses`].
//!
//! Failures are logged and counted, never retried. The next event for the same
//! Service, usually the periodic re-sync, is the retry.
//!
//! # Example
//!
//! ```rust,no_run
//! use kube_phpipam::reconcilers::{Reconciler, ServiceEvent};
//! use kube_phpipam::registry::IpamRegistry;
//! use kube_phpipam::service::ServiceSnapshot;
//! use std::sync::Arc;
//!
//! async fn reconcile(registry: Arc<dyn IpamRegistry>, snapshot: ServiceSnapshot) {
//!     let mut reconciler = Reconciler::new(registry, Vec::new());
//!     reconciler.handle_event(ServiceEvent::Upserted(snapshot)).await;
//! }
//! ```

pub mod addresses;
pub mod cache;
pub mod cleanup;
pub mod policy;
pub mod reservation;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::OwnershipCache;
pub use cleanup::ReleaseReport;
pub use reservation::SyncOutcome;

use crate::config::AddressingRule;
use crate::metrics;
use crate::registry::IpamRegistry;
use crate::service::{OwnerId, ServiceSnapshot};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Event delivered by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    /// A Service was added, modified, or re-delivered by a re-sync
    Upserted(ServiceSnapshot),
    /// A Service was deleted; carries the owner it reserved addresses under
    Removed(OwnerId),
}

impl ServiceEvent {
    /// Label used for the events metric.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upserted(_) => "upserted",
            Self::Removed(_) => "removed",
        }
    }
}

/// Per-event counts for an upsert.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpsertSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// Matching rules abandoned because their subnet could not be resolved
    pub skipped_rules: usize,
}

/// Single-worker reconciliation engine.
///
/// Owns the [`OwnershipCache`] for the lifetime of the process. All handlers
/// take `&mut self`, so events are processed strictly one after another.
pub struct Reconciler {
    registry: Arc<dyn IpamRegistry>,
    rules: Vec<AddressingRule>,
    cache: OwnershipCache,
}

impl Reconciler {
    #[must_use]
    pub fn new(registry: Arc<dyn IpamRegistry>, rules: Vec<AddressingRule>) -> Self {
        Self {
            registry,
            rules,
            cache: OwnershipCache::new(),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &OwnershipCache {
        &self.cache
    }

    /// Dispatch one watcher event to its handler.
    pub async fn handle_event(&mut self, event: ServiceEvent) {
        let kind = event.kind();
        let start = Instant::now();
        metrics::record_event(kind);
        match event {
            ServiceEvent::Upserted(snapshot) => {
                self.handle_upsert(&snapshot).await;
            }
            ServiceEvent::Removed(owner) => {
                self.handle_removed(&owner).await;
            }
        }
        metrics::record_event_duration(kind, start.elapsed());
        metrics::set_owned_addresses(self.cache.owned_count());
    }

    /// Reserve every in-range address of `snapshot` under every matching rule.
    pub async fn handle_upsert(&mut self, snapshot: &ServiceSnapshot) -> UpsertSummary {
        let mut summary = UpsertSummary::default();
        let owner = snapshot.owner_id();

        for rule in policy::matching_rules(snapshot, &self.rules) {
            let candidates = addresses::addresses_in_range(snapshot, &rule.network);
            if candidates.is_empty() {
                debug!(
                    namespace = %snapshot.namespace,
                    name = %snapshot.name,
                    cidr = %rule.cidr,
                    "No service address in rule range"
                );
                continue;
            }

            let subnet = match self
                .cache
                .resolve_subnet(self.registry.as_ref(), &rule.cidr)
                .await
            {
                Ok(subnet) => subnet,
                Err(e) => {
                    error!(
                        namespace = %snapshot.namespace,
                        name = %snapshot.name,
                        cidr = %rule.cidr,
                        category = e.category(),
                        error = %e,
                        "Failed to resolve phpIPAM subnet, skipping rule"
                    );
                    metrics::record_error("subnet", e.category());
                    summary.skipped_rules += 1;
                    continue;
                }
            };

            for address in candidates {
                let address = address.to_string();
                match reservation::sync_reservation(
                    self.registry.as_ref(),
                    &mut self.cache,
                    &address,
                    &subnet,
                    &owner,
                )
                .await
                {
                    Ok(SyncOutcome::Created(_)) => summary.created += 1,
                    Ok(SyncOutcome::Updated { .. }) => summary.updated += 1,
                    Ok(SyncOutcome::Unchanged { .. }) => summary.unchanged += 1,
                    Err(e) => {
                        error!(
                            address = %address,
                            cidr = %rule.cidr,
                            owner = %owner,
                            category = e.category(),
                            error = %e,
                            "Failed to synchronize IP address with phpIPAM"
                        );
                        metrics::record_error("reservation", e.category());
                        summary.failed += 1;
                    }
                }
            }
        }

        if summary.created + summary.updated > 0 {
            info!(
                owner = %owner,
                created = summary.created,
                updated = summary.updated,
                failed = summary.failed,
                "Reconciled service addresses"
            );
        }
        summary
    }

    /// Release every reservation the cache attributes to `owner`.
    pub async fn handle_removed(&mut self, owner: &OwnerId) -> ReleaseReport {
        let report =
            cleanup::release_owned_addresses(self.registry.as_ref(), &mut self.cache, owner).await;
        if !report.deleted.is_empty() || !report.failed.is_empty() {
            info!(
                owner = %owner,
                deleted = report.deleted.len(),
                already_absent = report.already_absent.len(),
                failed = report.failed.len(),
                "Released service addresses"
            );
        }
        report
    }
}

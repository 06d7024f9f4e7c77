// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service snapshots and owner identifiers.
//!
//! A [`ServiceSnapshot`] is the engine's view of one Kubernetes `Service`,
//! built fresh from every watch event and never persisted. The
//! [`OwnerId`] derived from it is the string written into the registry's
//! hostname field.

use crate::constants::DEFAULT_SERVICE_TYPE;
use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;
use std::fmt;

/// Identifier of the service that owns an address.
///
/// Normally `namespace/name`; `namespace/<override>` when the shared-IP
/// annotation is present. Stable across repeated events for the same service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(String);

impl OwnerId {
    /// Build an owner identifier from its namespace and (possibly overridden) name.
    #[must_use]
    pub fn new(namespace: &str, name: &str) -> Self {
        Self(format!("{namespace}/{name}"))
    }

    /// Wrap an identifier received as a bare string (e.g. a deletion hint).
    #[must_use]
    pub fn from_hint(hint: impl Into<String>) -> Self {
        Self(hint.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Engine view of one service at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceSnapshot {
    pub namespace: String,
    pub name: String,
    /// Service type (`ClusterIP`, `LoadBalancer`, ...)
    pub kind: String,
    /// Value of the shared-IP annotation, if present
    pub shared_ip_override: Option<String>,
    /// Candidate addresses in priority order; may contain non-IP strings
    pub address_candidates: Vec<String>,
}

impl ServiceSnapshot {
    /// Owner identifier for this service, honouring the shared-IP override.
    #[must_use]
    pub fn owner_id(&self) -> OwnerId {
        match self.shared_ip_override.as_deref() {
            Some(shared) => OwnerId::new(&self.namespace, shared),
            None => OwnerId::new(&self.namespace, &self.name),
        }
    }

    /// Build a snapshot from a Kubernetes `Service`.
    ///
    /// Candidates are collected in this order: `spec.loadBalancerIP`,
    /// `status.loadBalancer.ingress[].ip`, `spec.clusterIP`, `spec.clusterIPs[]`,
    /// `spec.externalIPs[]`. Duplicates and non-addresses (e.g. `None` for
    /// headless services) are left for the address extractor to discard.
    #[must_use]
    pub fn from_service(service: &Service, shared_ip_annotation: &str) -> Self {
        let mut candidates = Vec::new();

        if let Some(spec) = &service.spec {
            candidates.extend(spec.load_balancer_ip.iter().cloned());
        }
        if let Some(ingress) = service
            .status
            .as_ref()
            .and_then(|status| status.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
        {
            candidates.extend(ingress.iter().filter_map(|entry| entry.ip.clone()));
        }
        if let Some(spec) = &service.spec {
            candidates.extend(spec.cluster_ip.iter().cloned());
            candidates.extend(spec.cluster_ips.iter().flatten().cloned());
            candidates.extend(spec.external_ips.iter().flatten().cloned());
        }
        candidates.retain(|candidate| !candidate.is_empty());

        let kind = service
            .spec
            .as_ref()
            .and_then(|spec| spec.type_.clone())
            .unwrap_or_else(|| DEFAULT_SERVICE_TYPE.to_string());

        Self {
            namespace: service.namespace().unwrap_or_default(),
            name: service.name_any(),
            kind,
            shared_ip_override: service.annotations().get(shared_ip_annotation).cloned(),
            address_candidates: candidates,
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;

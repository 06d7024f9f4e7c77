// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service watch loop.
//!
//! Feeds the [`Reconciler`] from a `kube` watcher on `Service` objects. The
//! stream runs through a reflector so the periodic re-sync can re-deliver every
//! known Service as an upsert. Everything happens on the calling task, one
//! event at a time.
//!
//! Removal is guarded in two ways:
//!
//! - an owner shared through the shared-IP annotation is only released once no
//!   live Service maps to it any more
//! - Services that vanished while the watch was re-listing produce no `Delete`
//!   event, so [`KnownServices`] diffs each re-list against what was known

use crate::metrics;
use crate::reconcilers::{Reconciler, ServiceEvent};
use crate::service::{OwnerId, ServiceSnapshot};
use anyhow::{anyhow, Result};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Service;
use kube::{
    runtime::{reflector, watcher, WatchStreamExt},
    Api, Client, ResourceExt,
};
use std::collections::{HashMap, HashSet};
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Watch loop settings taken from the command line and configuration file.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    /// Namespace to watch; `None` watches the whole cluster
    pub namespace: Option<String>,
    /// Annotation holding the shared-IP override name
    pub shared_ip_annotation: String,
    /// Interval between full re-syncs of the Service cache
    pub resync_interval: Duration,
}

/// Map a raw watcher event to an engine event.
///
/// Initial-listing markers carry no Service and map to `None`.
#[must_use]
pub fn translate_event(
    event: watcher::Event<Service>,
    shared_ip_annotation: &str,
) -> Option<ServiceEvent> {
    match event {
        watcher::Event::Apply(service) | watcher::Event::InitApply(service) => Some(
            ServiceEvent::Upserted(ServiceSnapshot::from_service(&service, shared_ip_annotation)),
        ),
        watcher::Event::Delete(service) => Some(ServiceEvent::Removed(
            ServiceSnapshot::from_service(&service, shared_ip_annotation).owner_id(),
        )),
        watcher::Event::Init | watcher::Event::InitDone => None,
    }
}

/// Owners of the Services seen so far, keyed by `namespace/name`.
#[derive(Debug, Default)]
pub struct KnownServices {
    owners: HashMap<String, OwnerId>,
    relisted: Option<HashSet<String>>,
}

impl KnownServices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `event` and return the owners of Services missing from a
    /// completed re-list.
    pub fn observe(
        &mut self,
        event: &watcher::Event<Service>,
        shared_ip_annotation: &str,
    ) -> Vec<OwnerId> {
        match event {
            watcher::Event::Init => {
                self.relisted = Some(HashSet::new());
                Vec::new()
            }
            watcher::Event::InitApply(service) => {
                let key = self.remember(service, shared_ip_annotation);
                if let Some(relisted) = self.relisted.as_mut() {
                    relisted.insert(key);
                }
                Vec::new()
            }
            watcher::Event::Apply(service) => {
                self.remember(service, shared_ip_annotation);
                Vec::new()
            }
            watcher::Event::Delete(service) => {
                self.owners.remove(&service_key(service));
                Vec::new()
            }
            watcher::Event::InitDone => {
                let Some(relisted) = self.relisted.take() else {
                    return Vec::new();
                };
                let vanished: Vec<String> = self
                    .owners
                    .keys()
                    .filter(|key| !relisted.contains(*key))
                    .cloned()
                    .collect();
                let mut owners: Vec<OwnerId> = vanished
                    .iter()
                    .filter_map(|key| self.owners.remove(key))
                    .collect();
                owners.sort();
                owners.dedup();
                owners
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    fn remember(&mut self, service: &Service, shared_ip_annotation: &str) -> String {
        let key = service_key(service);
        let owner = ServiceSnapshot::from_service(service, shared_ip_annotation).owner_id();
        self.owners.insert(key.clone(), owner);
        key
    }
}

fn service_key(service: &Service) -> String {
    format!(
        "{}/{}",
        service.namespace().unwrap_or_default(),
        service.name_any()
    )
}

/// Returns `true` when a Service in `live` still maps to `owner`.
#[must_use]
pub fn owner_in_use(owner: &OwnerId, live: &[Arc<Service>], shared_ip_annotation: &str) -> bool {
    live.iter().any(|service| {
        ServiceSnapshot::from_service(service, shared_ip_annotation).owner_id() == *owner
    })
}

/// Release `owner` unless another live Service shares it.
///
/// Returns `true` when the removal was dispatched.
pub async fn release_unless_shared(
    reconciler: &mut Reconciler,
    owner: OwnerId,
    live: &[Arc<Service>],
    shared_ip_annotation: &str,
) -> bool {
    if owner_in_use(&owner, live, shared_ip_annotation) {
        info!(owner = %owner, "Owner still used by another Service, keeping reservations");
        return false;
    }
    reconciler.handle_event(ServiceEvent::Removed(owner)).await;
    true
}

/// Watch Services and drive `reconciler` until `shutdown` fires.
///
/// # Errors
///
/// Returns an error if the watch stream terminates on its own.
pub async fn run_service_watcher(
    client: Client,
    settings: WatchSettings,
    reconciler: &mut Reconciler,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let api: Api<Service> = match settings.namespace.as_deref() {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::all(client),
    };

    let (store, writer) = reflector::store();
    let mut known = KnownServices::new();
    let stream = reflector(writer, watcher(api, watcher::Config::default())).default_backoff();
    let mut stream = pin!(stream);

    let mut resync = tokio::time::interval(settings.resync_interval);
    resync.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately; the initial listing covers it.
    resync.tick().await;

    info!(
        namespace = settings.namespace.as_deref().unwrap_or("<all>"),
        resync_secs = settings.resync_interval.as_secs(),
        "Starting Service watcher"
    );

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("Shutdown requested, stopping Service watcher");
                return Ok(());
            }
            _ = resync.tick() => {
                let services = store.state();
                debug!(services = services.len(), "Re-syncing Services");
                for service in services {
                    let snapshot =
                        ServiceSnapshot::from_service(&service, &settings.shared_ip_annotation);
                    reconciler.handle_event(ServiceEvent::Upserted(snapshot)).await;
                }
            }
            next = stream.next() => match next {
                Some(Ok(event)) => {
                    if let watcher::Event::Delete(service) = &event {
                        info!(
                            namespace = %service.namespace().unwrap_or_default(),
                            name = %service.name_any(),
                            "Service deleted"
                        );
                    }
                    let annotation = settings.shared_ip_annotation.as_str();
                    let vanished = known.observe(&event, annotation);
                    match translate_event(event, annotation) {
                        // The reflector has already dropped the deleted Service from the store.
                        Some(ServiceEvent::Removed(owner)) => {
                            release_unless_shared(reconciler, owner, &store.state(), annotation)
                                .await;
                        }
                        Some(event) => reconciler.handle_event(event).await,
                        None => {}
                    }
                    for owner in vanished {
                        info!(owner = %owner, "Service disappeared while the watch was re-listing");
                        release_unless_shared(reconciler, owner, &store.state(), annotation).await;
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Service watch error, backing off");
                    metrics::record_error("watch", "transport");
                }
                None => return Err(anyhow!("Service watch stream ended unexpectedly")),
            },
        }
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod watch_tests;

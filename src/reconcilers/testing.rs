// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory registry used by the reconciler unit tests.

use crate::ipam_errors::RegistryError;
use crate::registry::{IpamRegistry, Reservation, SubnetHandle};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// A registry call as observed by [`FakeRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    LookupSubnet(String),
    Find(String),
    Create {
        address: String,
        subnet_id: String,
        owner: String,
    },
    Update {
        record_id: String,
        owner: String,
    },
    Delete(String),
}

#[derive(Default)]
struct FakeState {
    subnets: HashMap<String, Vec<String>>,
    reservations: Vec<Reservation>,
    next_id: u64,
    calls: Vec<Call>,
    fail_lookup: Option<RegistryError>,
    fail_find: Option<RegistryError>,
    fail_create: Option<RegistryError>,
    fail_update: Option<RegistryError>,
    fail_delete: Option<RegistryError>,
}

/// Registry backed by a vector of reservations, recording every call.
#[derive(Default)]
pub struct FakeRegistry {
    state: Mutex<FakeState>,
}

pub fn application_error(operation: &str) -> RegistryError {
    RegistryError::Application {
        operation: operation.to_string(),
        code: 500,
        message: "simulated failure".to_string(),
    }
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_id: 100,
                ..Default::default()
            }),
        }
    }

    /// Register a subnet id for `cidr`; calling twice makes the CIDR ambiguous.
    pub fn with_subnet(self, cidr: &str, id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .subnets
            .entry(cidr.to_string())
            .or_default()
            .push(id.to_string());
        self
    }

    pub fn with_reservation(self, address: &str, record_id: &str, hostname: Option<&str>) -> Self {
        self.state.lock().unwrap().reservations.push(Reservation {
            address: address.to_string(),
            subnet_id: "1".to_string(),
            record_id: record_id.to_string(),
            hostname: hostname.map(str::to_string),
        });
        self
    }

    pub fn fail_lookup(&self, err: Option<RegistryError>) {
        self.state.lock().unwrap().fail_lookup = err;
    }

    pub fn fail_find(&self, err: Option<RegistryError>) {
        self.state.lock().unwrap().fail_find = err;
    }

    pub fn fail_create(&self, err: Option<RegistryError>) {
        self.state.lock().unwrap().fail_create = err;
    }

    pub fn fail_update(&self, err: Option<RegistryError>) {
        self.state.lock().unwrap().fail_update = err;
    }

    pub fn fail_delete(&self, err: Option<RegistryError>) {
        self.state.lock().unwrap().fail_delete = err;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn creates(&self) -> usize {
        self.count(|c| matches!(c, Call::Create { .. }))
    }

    pub fn updates(&self) -> usize {
        self.count(|c| matches!(c, Call::Update { .. }))
    }

    pub fn deletes(&self) -> usize {
        self.count(|c| matches!(c, Call::Delete(_)))
    }

    pub fn lookups(&self) -> usize {
        self.count(|c| matches!(c, Call::LookupSubnet(_)))
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| predicate(c))
            .count()
    }

    pub fn reservations(&self) -> Vec<Reservation> {
        self.state.lock().unwrap().reservations.clone()
    }
}

#[async_trait]
impl IpamRegistry for FakeRegistry {
    async fn lookup_subnet_by_range(&self, cidr: &str) -> Result<SubnetHandle, RegistryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::LookupSubnet(cidr.to_string()));
        if let Some(err) = state.fail_lookup.clone() {
            return Err(err);
        }
        match state.subnets.get(cidr).map(Vec::as_slice) {
            None | Some([]) => Err(RegistryError::NotFound {
                resource: format!("subnet {cidr}"),
            }),
            Some([id]) => Ok(SubnetHandle {
                id: id.clone(),
                cidr: cidr.to_string(),
            }),
            Some(many) => Err(RegistryError::AmbiguousSubnet {
                cidr: cidr.to_string(),
                count: many.len(),
            }),
        }
    }

    async fn find_reservations(&self, address: &str) -> Result<Vec<Reservation>, RegistryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Find(address.to_string()));
        if let Some(err) = state.fail_find.clone() {
            return Err(err);
        }
        Ok(state
            .reservations
            .iter()
            .filter(|r| r.address == address)
            .cloned()
            .collect())
    }

    async fn create_reservation(
        &self,
        subnet: &SubnetHandle,
        address: &str,
        owner: &str,
    ) -> Result<Reservation, RegistryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create {
            address: address.to_string(),
            subnet_id: subnet.id.clone(),
            owner: owner.to_string(),
        });
        if let Some(err) = state.fail_create.clone() {
            return Err(err);
        }
        state.next_id += 1;
        let reservation = Reservation {
            address: address.to_string(),
            subnet_id: subnet.id.clone(),
            record_id: state.next_id.to_string(),
            hostname: Some(owner.to_string()),
        };
        state.reservations.push(reservation.clone());
        Ok(reservation)
    }

    async fn update_reservation_owner(
        &self,
        record_id: &str,
        owner: &str,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update {
            record_id: record_id.to_string(),
            owner: owner.to_string(),
        });
        if let Some(err) = state.fail_update.clone() {
            return Err(err);
        }
        let record = state
            .reservations
            .iter_mut()
            .find(|r| r.record_id == record_id)
            .ok_or_else(|| RegistryError::NotFound {
                resource: format!("address record {record_id}"),
            })?;
        record.hostname = Some(owner.to_string());
        Ok(())
    }

    async fn delete_reservation(&self, record_id: &str) -> Result<(), RegistryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(record_id.to_string()));
        if let Some(err) = state.fail_delete.clone() {
            return Err(err);
        }
        state.reservations.retain(|r| r.record_id != record_id);
        Ok(())
    }
}

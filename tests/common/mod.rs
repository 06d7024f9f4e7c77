// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common test utilities for integration tests

use kube_phpipam::config::{AddressingRule, SubnetRule};
use kube_phpipam::phpipam::{Credentials, PhpIpamClient};
use kube_phpipam::service::ServiceSnapshot;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// phpIPAM application id used by every mock
pub const APP_ID: &str = "kube";

/// Token handed out by the mock login endpoint
pub const TOKEN: &str = "integration-token";

/// Mount the login endpoint and return a connected client.
pub async fn connected_client(server: &MockServer) -> PhpIpamClient {
    Mock::given(method("POST"))
        .and(path(format!("/api/{APP_ID}/user/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "success": true,
            "data": { "token": TOKEN, "expires": "2099-12-31 23:59:59" }
        })))
        .mount(server)
        .await;

    PhpIpamClient::connect(
        &server.uri(),
        APP_ID,
        Credentials {
            username: "svc-kube".to_string(),
            password: "secret".to_string(),
        },
    )
    .await
    .expect("mock login should succeed")
}

/// Mount a subnet lookup answering with a single subnet.
pub async fn mount_subnet(server: &MockServer, cidr: &str, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/{APP_ID}/subnets/cidr/{cidr}/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": [{ "id": id, "subnet": cidr.split('/').next(), "mask": "24" }]
        })))
        .mount(server)
        .await;
}

/// Response phpIPAM gives for an address search without results.
pub fn search_not_found() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": 404,
        "success": false,
        "message": "Address not found"
    }))
}

/// Response for an address search returning one record.
pub fn search_found(id: &str, ip: &str, hostname: &str, subnet_id: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": 200,
        "success": true,
        "data": [{ "id": id, "ip": ip, "hostname": hostname, "subnetId": subnet_id }]
    }))
}

/// Rule covering `cidr` without filters.
pub fn open_rule(cidr: &str) -> AddressingRule {
    SubnetRule {
        cidr: cidr.to_string(),
        ..Default::default()
    }
    .compile()
    .expect("test rule should compile")
}

/// Load balancer Service snapshot.
pub fn load_balancer(namespace: &str, name: &str, addresses: &[&str]) -> ServiceSnapshot {
    ServiceSnapshot {
        namespace: namespace.to_string(),
        name: name.to_string(),
        kind: "LoadBalancer".to_string(),
        shared_ip_override: None,
        address_candidates: addresses.iter().map(|a| (*a).to_string()).collect(),
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! phpIPAM registry client.
//!
//! This module implements [`IpamRegistry`] against the phpIPAM REST API. It handles:
//!
//! - Token login and background token renewal ([`auth`])
//! - Subnet resolution by CIDR
//! - Address search, create, patch and delete ([`address_ops`])
//!
//! # Architecture
//!
//! Every request is sent to `<host>/api/<appId>/<path>` with the current session
//! token in the `token` header. phpIPAM reports failures in two layers: the HTTP
//! status and an application `code` embedded in the JSON body. The client decodes
//! the body first and classifies by `code`, so an application error inside an
//! HTTP 200 is still reported as [`RegistryError::Application`].
//!
//! # Example
//!
//! ```rust,no_run
//! use kube_phpipam::phpipam::{Credentials, PhpIpamClient};
//! use kube_phpipam::registry::IpamRegistry;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = PhpIpamClient::new(
//!     "https://ipam.example.com",
//!     "kube",
//!     Credentials { username: "svc".into(), password: "secret".into() },
//! )?;
//! client.authenticate().await?;
//! let subnet = client.lookup_subnet_by_range("203.0.113.0/24").await?;
//! # Ok(())
//! # }
//! ```

pub mod address_ops;
pub mod auth;
pub mod types;

pub use auth::{run_token_renewal, Credentials, Session, SessionState};

use crate::constants::{PHPIPAM_CODE_NOT_FOUND, TOKEN_HEADER};
use crate::ipam_errors::RegistryError;
use crate::registry::{IpamRegistry, Reservation, SubnetHandle};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use types::ApiResponse;
use url::Url;

/// Client for one phpIPAM application.
///
/// Clones share the HTTP connection pool and the session, so the renewal task
/// and the reconciliation worker can each hold their own handle.
#[derive(Debug, Clone)]
pub struct PhpIpamClient {
    http: HttpClient,
    base_url: Url,
    credentials: Arc<Credentials>,
    session: SessionState,
}

impl PhpIpamClient {
    /// Create a client for `host` and application `app_id`. No request is sent.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Transport`] if `host` is not a valid base URL.
    pub fn new(host: &str, app_id: &str, credentials: Credentials) -> Result<Self, RegistryError> {
        let base = format!("{}/api/{}/", host.trim_end_matches('/'), app_id);
        let base_url = Url::parse(&base).map_err(|e| RegistryError::Transport {
            operation: "configure client".to_string(),
            reason: format!("invalid phpIPAM URL {base:?}: {e}"),
        })?;

        Ok(Self {
            http: HttpClient::new(),
            base_url,
            credentials: Arc::new(credentials),
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Create a client and perform the initial login.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the initial login fails.
    pub async fn connect(
        host: &str,
        app_id: &str,
        credentials: Credentials,
    ) -> Result<Self, RegistryError> {
        let client = Self::new(host, app_id, credentials)?;
        client.authenticate().await?;
        Ok(client)
    }

    /// Base URL all API paths are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an API path against the application base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, RegistryError> {
        self.base_url.join(path).map_err(|e| RegistryError::Transport {
            operation: path.to_string(),
            reason: format!("invalid request path: {e}"),
        })
    }

    /// Send one request and decode the phpIPAM envelope.
    ///
    /// Does not inspect the application `code` beyond authentication failures;
    /// callers decide whether e.g. 404 means "empty" or "error".
    pub(crate) async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        operation: &str,
    ) -> Result<ApiResponse, RegistryError> {
        let url = self.endpoint(path)?;
        debug!(method = %method, url = %url, operation = %operation, "phpIPAM API request");

        let mut builder = self.http.request(method.clone(), url.clone());
        if let Some(token) = self.current_token().await {
            builder = builder.header(TOKEN_HEADER, token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| RegistryError::Transport {
            operation: operation.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| RegistryError::Transport {
            operation: operation.to_string(),
            reason: format!("failed to read response body: {e}"),
        })?;

        debug!(
            method = %method,
            url = %url,
            status = %status,
            "phpIPAM API response"
        );

        let parsed: ApiResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
                {
                    return Err(RegistryError::Auth {
                        reason: format!("HTTP {status} for {operation}"),
                    });
                }
                if !status.is_success() {
                    return Err(RegistryError::Transport {
                        operation: operation.to_string(),
                        reason: format!("HTTP {status}: {text}"),
                    });
                }
                return Err(RegistryError::Decode {
                    operation: operation.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        if parsed.code == 401 || parsed.code == 403 {
            return Err(RegistryError::Auth {
                reason: format!("{operation}: {}", parsed.message_or_default()),
            });
        }
        Ok(parsed)
    }
}

/// Turn a non-2xx application code into [`RegistryError::Application`].
pub(crate) fn ensure_success(
    response: ApiResponse,
    operation: &str,
) -> Result<ApiResponse, RegistryError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(RegistryError::Application {
            operation: operation.to_string(),
            code: response.code,
            message: response.message_or_default(),
        })
    }
}

#[async_trait]
impl IpamRegistry for PhpIpamClient {
    async fn lookup_subnet_by_range(&self, cidr: &str) -> Result<SubnetHandle, RegistryError> {
        let operation = format!("lookup subnet {cidr}");
        let response = self
            .request::<()>(Method::GET, &format!("subnets/cidr/{cidr}/"), None, &operation)
            .await?;
        if response.code == PHPIPAM_CODE_NOT_FOUND {
            return Err(RegistryError::NotFound {
                resource: format!("subnet {cidr}"),
            });
        }
        let response = ensure_success(response, &operation)?;
        let subnets: Vec<types::SubnetRecord> = response.data_list(&operation)?;

        match subnets.as_slice() {
            [] => Err(RegistryError::NotFound {
                resource: format!("subnet {cidr}"),
            }),
            [subnet] => Ok(SubnetHandle {
                id: subnet.id.clone(),
                cidr: cidr.to_string(),
            }),
            many => Err(RegistryError::AmbiguousSubnet {
                cidr: cidr.to_string(),
                count: many.len(),
            }),
        }
    }

    async fn find_reservations(&self, address: &str) -> Result<Vec<Reservation>, RegistryError> {
        address_ops::search_address(self, address).await
    }

    async fn create_reservation(
        &self,
        subnet: &SubnetHandle,
        address: &str,
        owner: &str,
    ) -> Result<Reservation, RegistryError> {
        address_ops::create_address(self, subnet, address, owner).await
    }

    async fn update_reservation_owner(
        &self,
        record_id: &str,
        owner: &str,
    ) -> Result<(), RegistryError> {
        address_ops::set_hostname(self, record_id, owner).await
    }

    async fn delete_reservation(&self, record_id: &str) -> Result<(), RegistryError> {
        address_ops::delete_address(self, record_id).await
    }
}

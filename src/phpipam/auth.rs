// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! phpIPAM token authentication and background renewal.
//!
//! phpIPAM issues a session token from `POST user/` (HTTP basic auth). The token
//! and its expiry are stored in a [`SessionState`] shared between the request
//! path, which reads it on every call, and the renewal task, which is the only
//! writer. Renewal happens half-way to expiry; a failed renewal ends the task
//! with an error, which the binary treats as fatal.

use super::types::{ApiResponse, AuthData};
use super::PhpIpamClient;
use crate::constants::{MIN_TOKEN_RENEWAL_SECS, PATH_USER, PHPIPAM_CODE_OK, PHPIPAM_TIME_FORMAT};
use crate::ipam_errors::RegistryError;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info};

/// Username and password used for token login.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Active session token and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub expires: DateTime<Utc>,
}

/// Session shared by all clones of a [`PhpIpamClient`].
pub type SessionState = Arc<RwLock<Option<Session>>>;

/// Parse a phpIPAM expiry timestamp (`2006-01-02 15:04:05`, interpreted as UTC).
///
/// # Errors
///
/// Returns [`RegistryError::Auth`] if the timestamp does not match the phpIPAM format.
pub fn parse_expiry(expires: &str) -> Result<DateTime<Utc>, RegistryError> {
    NaiveDateTime::parse_from_str(expires, PHPIPAM_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| RegistryError::Auth {
            reason: format!("unable to parse token expiry time {expires:?}: {e}"),
        })
}

/// Delay before the next renewal: half the remaining lifetime, never below
/// [`MIN_TOKEN_RENEWAL_SECS`].
#[must_use]
pub fn renewal_delay(expires: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let half = (expires - now).num_milliseconds() / 2;
    let floor = Duration::from_secs(MIN_TOKEN_RENEWAL_SECS);
    u64::try_from(half)
        .map(Duration::from_millis)
        .map_or(floor, |delay| delay.max(floor))
}

impl PhpIpamClient {
    /// Log in and store the returned token and expiry.
    ///
    /// An empty token in an otherwise successful response keeps the current
    /// token and only extends the expiry, which is how phpIPAM answers a
    /// refresh of a still-valid session.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Auth`] if the login is rejected or the expiry
    /// cannot be parsed, and [`RegistryError::Transport`] if phpIPAM is unreachable.
    pub async fn authenticate(&self) -> Result<(), RegistryError> {
        let url = self.endpoint(PATH_USER)?;
        debug!(url = %url, username = %self.credentials.username, "Authenticating to phpIPAM");

        let response = self
            .http
            .post(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(|e| RegistryError::Transport {
                operation: "authenticate".to_string(),
                reason: e.to_string(),
            })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| RegistryError::Transport {
            operation: "authenticate".to_string(),
            reason: e.to_string(),
        })?;

        let parsed: ApiResponse = serde_json::from_str(&body).map_err(|_| RegistryError::Auth {
            reason: format!("unexpected login response (HTTP {status}): {body}"),
        })?;
        if parsed.code != PHPIPAM_CODE_OK {
            return Err(RegistryError::Auth {
                reason: format!(
                    "login rejected (code {}): {}",
                    parsed.code,
                    parsed.message_or_default()
                ),
            });
        }

        let data: AuthData = parsed
            .data_object("authenticate")
            .map_err(|e| RegistryError::Auth {
                reason: e.to_string(),
            })?;
        let expires = parse_expiry(&data.expires)?;

        let mut session = self.session.write().await;
        let token = match (data.token.is_empty(), session.as_ref()) {
            (true, Some(current)) => current.token.clone(),
            _ => data.token,
        };
        *session = Some(Session { token, expires });

        info!(
            expires_in = ?(expires - Utc::now()).to_std().unwrap_or_default(),
            "phpIPAM authentication completed"
        );
        Ok(())
    }

    /// Current session token, if logged in.
    pub(crate) async fn current_token(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.token.clone())
    }

    /// Expiry of the current session, if logged in.
    pub async fn session_expiry(&self) -> Option<DateTime<Utc>> {
        self.session.read().await.as_ref().map(|s| s.expires)
    }
}

/// Renew the session token half-way to expiry until shutdown is signalled.
///
/// Returns `Ok(())` on shutdown. A renewal failure is returned immediately;
/// there is no degraded mode once credentials can no longer be refreshed.
///
/// # Errors
///
/// Returns the error of the first failed renewal.
pub async fn run_token_renewal(
    client: PhpIpamClient,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), RegistryError> {
    loop {
        let expires = client.session_expiry().await.unwrap_or_else(Utc::now);
        let delay = renewal_delay(expires, Utc::now());
        debug!(delay = ?delay, "Next phpIPAM token renewal scheduled");

        tokio::select! {
            _ = shutdown.changed() => {
                info!("Token renewal task stopped");
                return Ok(());
            }
            () = tokio::time::sleep(delay) => {
                info!("phpIPAM token half-life reached, renewing");
                if let Err(e) = client.authenticate().await {
                    crate::metrics::record_token_renewal("error");
                    return Err(e);
                }
                crate::metrics::record_token_renewal("success");
            }
        }
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod auth_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controller configuration loaded from YAML.
//!
//! The configuration file carries the phpIPAM connection settings and the
//! ordered list of addressing rules:
//!
//! ```yaml
//! phpipam:
//!   host: https://ipam.example.com
//!   appId: kube
//!   username: svc-kube
//!   password: secret
//! sharedIpAnnotation: metallb.universe.tf/allow-shared-ip
//! subnets:
//!   - cidr: 203.0.113.0/24
//!     namespace: prod
//!     type: LoadBalancer
//!     regex: "web-.*"
//! ```
//!
//! Rules are compiled once. A rule with an unparsable CIDR or regular
//! expression is reported as a configuration error and dropped for the
//! lifetime of the process; the remaining rules keep their declaration order.

use crate::constants::DEFAULT_SHARED_IP_ANNOTATION;
use ipnetwork::IpNetwork;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// Errors raised while loading or compiling configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("unable to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`Config`]
    #[error("unable to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required setting is empty
    #[error("configuration setting {field} must not be empty")]
    MissingSetting { field: &'static str },

    /// A rule CIDR does not parse
    #[error("config subnet contains invalid CIDR address {cidr:?}: {reason}")]
    InvalidCidr { cidr: String, reason: String },

    /// A rule name regex does not compile
    #[error("error compiling regex {pattern:?} for subnet {cidr}: {reason}")]
    InvalidRegex {
        cidr: String,
        pattern: String,
        reason: String,
    },
}

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// phpIPAM connection settings
    pub phpipam: PhpIpamSettings,

    /// Annotation whose value replaces the service name in the owner identifier
    #[serde(default = "default_shared_ip_annotation")]
    pub shared_ip_annotation: String,

    /// Ordered addressing rules
    #[serde(default)]
    pub subnets: Vec<SubnetRule>,
}

fn default_shared_ip_annotation() -> String {
    DEFAULT_SHARED_IP_ANNOTATION.to_string()
}

/// phpIPAM connection settings.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhpIpamSettings {
    pub host: String,
    pub app_id: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for PhpIpamSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhpIpamSettings")
            .field("host", &self.host)
            .field("app_id", &self.app_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Addressing rule as written in the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubnetRule {
    pub cidr: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default, rename = "type")]
    pub service_type: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
}

/// Compiled addressing rule used by the policy matcher.
#[derive(Debug, Clone)]
pub struct AddressingRule {
    /// CIDR exactly as configured; also the subnet cache key
    pub cidr: String,
    /// Parsed address range
    pub network: IpNetwork,
    /// Exact namespace filter
    pub namespace: Option<String>,
    /// Exact service type filter (e.g. `LoadBalancer`)
    pub service_kind: Option<String>,
    /// Anchored name pattern
    pub name_pattern: Option<Regex>,
}

impl SubnetRule {
    /// Compile this rule.
    ///
    /// The regex is anchored so it must match the whole service name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCidr`] or [`ConfigError::InvalidRegex`].
    pub fn compile(&self) -> Result<AddressingRule, ConfigError> {
        let network: IpNetwork = self.cidr.parse().map_err(|e: ipnetwork::IpNetworkError| {
            ConfigError::InvalidCidr {
                cidr: self.cidr.clone(),
                reason: e.to_string(),
            }
        })?;

        let name_pattern = self
            .regex
            .as_deref()
            .map(|pattern| {
                Regex::new(&format!("^(?:{pattern})$")).map_err(|e| ConfigError::InvalidRegex {
                    cidr: self.cidr.clone(),
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(AddressingRule {
            cidr: self.cidr.clone(),
            network,
            namespace: self.namespace.clone(),
            service_kind: self.service_type.clone(),
            name_pattern,
        })
    }
}

impl Config {
    /// Read and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or lacks
    /// connection settings. Invalid rules are not an error here; see
    /// [`Config::addressing_rules`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        info!(
            path = %path.display(),
            host = %config.phpipam.host,
            rules = config.subnets.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("phpipam.host", &self.phpipam.host),
            ("phpipam.appId", &self.phpipam.app_id),
            ("phpipam.username", &self.phpipam.username),
            ("sharedIpAnnotation", &self.shared_ip_annotation),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingSetting { field });
            }
        }
        Ok(())
    }

    /// Compile the configured rules in declaration order.
    ///
    /// Rules that fail to compile are logged once as configuration errors and
    /// excluded, so they are skipped for every future event without retry.
    #[must_use]
    pub fn addressing_rules(&self) -> Vec<AddressingRule> {
        self.subnets
            .iter()
            .filter_map(|rule| match rule.compile() {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    error!(cidr = %rule.cidr, error = %e, "Disabling invalid addressing rule");
                    crate::metrics::record_error("config", "configuration");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

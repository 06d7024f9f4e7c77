// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # kube-phpipam - Kubernetes Service address reservations in phpIPAM
//!
//! kube-phpipam watches Kubernetes `Service` objects and keeps phpIPAM in step
//! with the addresses they use: every load-balancer, cluster or external
//! address that falls inside a configured subnet is reserved in phpIPAM with
//! the owning Service as hostname, and released again when the Service goes
//! away.
//!
//! ## Modules
//!
//! - [`config`] - YAML configuration and addressing rules
//! - [`service`] - Service snapshots and owner identifiers
//! - [`registry`] - The registry seam used by the reconcilers
//! - [`phpipam`] - phpIPAM REST client and token renewal
//! - [`reconcilers`] - Policy matching, address extraction and reservation sync
//! - [`watch`] - Service watch loop feeding the reconcilers
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use kube_phpipam::config::Config;
//! use kube_phpipam::phpipam::{Credentials, PhpIpamClient};
//! use kube_phpipam::reconcilers::Reconciler;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load(Path::new("config.yaml"))?;
//! let client = PhpIpamClient::connect(
//!     &config.phpipam.host,
//!     &config.phpipam.app_id,
//!     Credentials {
//!         username: config.phpipam.username.clone(),
//!         password: config.phpipam.password.clone(),
//!     },
//! )
//! .await?;
//! let reconciler = Reconciler::new(Arc::new(client), config.addressing_rules());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod ipam_errors;
pub mod metrics;
pub mod phpipam;
pub mod reconcilers;
pub mod registry;
pub mod service;
pub mod watch;

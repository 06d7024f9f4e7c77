// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the kube-phpipam controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Controller Identity
// ============================================================================

/// Name used in logs, metrics and the registry note field
pub const CONTROLLER_NAME: &str = "kube-phpipam";

/// Note written on every reservation the controller creates or patches
pub const RESERVATION_NOTE: &str = "Added by kube-phpipam";

// ============================================================================
// Kubernetes Constants
// ============================================================================

/// Annotation directing several services to share one owner identifier.
///
/// `MetalLB` uses the same key to let services share a load balancer address,
/// so the shared key doubles as the registry owner.
pub const DEFAULT_SHARED_IP_ANNOTATION: &str = "metallb.universe.tf/allow-shared-ip";

/// Service type assumed when `spec.type` is unset
pub const DEFAULT_SERVICE_TYPE: &str = "ClusterIP";

// ============================================================================
// phpIPAM API Constants
// ============================================================================

/// Header carrying the session token on every authenticated request
pub const TOKEN_HEADER: &str = "token";

/// Timestamp format used by phpIPAM for token expiry (`2006-01-02 15:04:05`)
pub const PHPIPAM_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Login endpoint, relative to the application base URL
pub const PATH_USER: &str = "user/";

/// Address collection endpoint, relative to the application base URL
pub const PATH_ADDRESSES: &str = "addresses/";

/// phpIPAM application code for a successful read
pub const PHPIPAM_CODE_OK: i64 = 200;

/// phpIPAM application code reported when a search has no results
pub const PHPIPAM_CODE_NOT_FOUND: i64 = 404;

/// Lower bound applied to the token renewal delay (prevents hot loops on short-lived tokens)
pub const MIN_TOKEN_RENEWAL_SECS: u64 = 5;

// ============================================================================
// Controller Timing Constants
// ============================================================================

/// Default interval between full re-sync passes over all known services
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 60;

/// Default bind address for the Prometheus metrics endpoint
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9090";

/// Default path of the YAML configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use kube::Client;
use kube_phpipam::{
    config::Config,
    constants::{
        CONTROLLER_NAME, DEFAULT_CONFIG_PATH, DEFAULT_METRICS_ADDR, DEFAULT_RESYNC_INTERVAL_SECS,
    },
    metrics,
    phpipam::{run_token_renewal, Credentials, PhpIpamClient},
    reconcilers::Reconciler,
    watch::{run_service_watcher, WatchSettings},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Reserve Kubernetes Service addresses in phpIPAM.
#[derive(Debug, Parser)]
#[command(name = "kube-phpipam", version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Seconds between full re-syncs of all watched Services
    #[arg(long, default_value_t = DEFAULT_RESYNC_INTERVAL_SECS)]
    resync_interval_secs: u64,

    /// Listen address for the Prometheus `/metrics` endpoint
    #[arg(long, default_value = DEFAULT_METRICS_ADDR)]
    metrics_addr: SocketAddr,

    /// Only watch Services in this namespace (default: all namespaces)
    #[arg(long)]
    namespace: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name(CONTROLLER_NAME)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

fn init_tracing() {
    // Respects RUST_LOG (default INFO) and RUST_LOG_FORMAT=json|text
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(args: Args) -> Result<()> {
    init_tracing();
    info!(
        controller = CONTROLLER_NAME,
        version = env!("CARGO_PKG_VERSION"),
        "Starting controller"
    );

    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?;
    let rules = config.addressing_rules();
    info!(rules = rules.len(), "Addressing rules ready");

    let credentials = Credentials {
        username: config.phpipam.username.clone(),
        password: config.phpipam.password.clone(),
    };
    let ipam = PhpIpamClient::connect(&config.phpipam.host, &config.phpipam.app_id, credentials)
        .await
        .context("failed to authenticate against phpIPAM")?;
    info!(url = %ipam.base_url(), "Authenticated against phpIPAM");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let renewal = tokio::spawn(run_token_renewal(ipam.clone(), shutdown_rx.clone()));
    let metrics_server = tokio::spawn(run_metrics_server(args.metrics_addr, shutdown_rx.clone()));

    let mut reconciler = Reconciler::new(Arc::new(ipam), rules);
    let settings = WatchSettings {
        namespace: args.namespace,
        shared_ip_annotation: config.shared_ip_annotation.clone(),
        resync_interval: Duration::from_secs(args.resync_interval_secs),
    };

    let outcome = tokio::select! {
        result = run_service_watcher(client, settings, &mut reconciler, shutdown_rx) => {
            result.context("Service watcher failed")
        }
        result = renewal => {
            match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    error!(error = %e, "CRITICAL: phpIPAM token renewal failed");
                    Err(anyhow::Error::new(e).context("phpIPAM token renewal failed"))
                }
                Err(e) => Err(anyhow::Error::new(e).context("token renewal task panicked")),
            }
        }
        () = shutdown_signal() => {
            info!("Shutdown signal received");
            Ok(())
        }
    };

    let _ = shutdown_tx.send(true);
    match metrics_server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = ?e, "Metrics server failed"),
        Err(e) => error!(error = %e, "Metrics server task panicked"),
    }
    info!("kube-phpipam stopped");
    outcome
}

/// Resolve on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

fn metrics_router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

async fn metrics_handler() -> (StatusCode, String) {
    match metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {e}"),
        ),
    }
}

async fn run_metrics_server(addr: SocketAddr, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {addr}"))?;
    info!(addr = %addr, "Serving metrics on /metrics");

    axum::serve(listener, metrics_router())
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
        .context("metrics server crashed")
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod main_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `main.rs` - flags, signal handling and the metrics endpoint

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::time::Duration as StdDuration;
    use tokio::time::timeout;

    #[test]
    fn test_default_flags() {
        let args = Args::try_parse_from(["kube-phpipam"]).unwrap();

        assert_eq!(args.config, PathBuf::from("config.yaml"));
        assert_eq!(args.resync_interval_secs, 60);
        assert_eq!(args.metrics_addr, "0.0.0.0:9090".parse::<SocketAddr>().unwrap());
        assert!(args.namespace.is_none());
    }

    #[test]
    fn test_explicit_flags() {
        let args = Args::try_parse_from([
            "kube-phpipam",
            "--config",
            "/etc/kube-phpipam/config.yaml",
            "--resync-interval-secs",
            "15",
            "--metrics-addr",
            "127.0.0.1:9191",
            "--namespace",
            "prod",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from("/etc/kube-phpipam/config.yaml"));
        assert_eq!(args.resync_interval_secs, 15);
        assert_eq!(args.metrics_addr.port(), 9191);
        assert_eq!(args.namespace.as_deref(), Some("prod"));
    }

    #[test]
    fn test_invalid_metrics_addr_rejected() {
        assert!(Args::try_parse_from(["kube-phpipam", "--metrics-addr", "not-an-addr"]).is_err());
    }

    /// Test that SIGTERM signal handler can be created on Unix platforms
    #[tokio::test]
    #[cfg(unix)]
    async fn test_sigterm_signal_handler_creation() {
        use tokio::signal::unix::{signal, SignalKind};

        let result = signal(SignalKind::terminate());
        assert!(
            result.is_ok(),
            "Should be able to create SIGTERM signal handler"
        );
    }

    #[tokio::test]
    async fn test_shutdown_signal_pending_without_signal() {
        let result = timeout(StdDuration::from_millis(100), shutdown_signal()).await;
        assert!(
            result.is_err(),
            "shutdown_signal() should not resolve when no signal is sent"
        );
    }

    #[tokio::test]
    async fn test_metrics_handler_returns_text() {
        metrics::record_event("upserted");

        let (status, body) = metrics_handler().await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("kube_phpipam_events_total"));
    }

    #[tokio::test]
    async fn test_metrics_server_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let server = tokio::spawn(run_metrics_server(
            "127.0.0.1:0".parse().unwrap(),
            rx,
        ));

        tx.send(true).unwrap();
        let result = timeout(StdDuration::from_secs(5), server).await;

        assert!(matches!(result, Ok(Ok(Ok(())))));
    }
}

//! qscaled: the qscale daemon.
//!
//! Reads its targets once at startup, connects to the queue store and
//! the Kubernetes API, and runs the autoscaler until SIGINT or SIGTERM.
//!
//! # Usage
//!
//! ```text
//! REDIS_HOST=redis-master RESOURCE_NAME=redis-consumer qscaled
//! qscaled --config /etc/qscale/qscale.toml --redis-host redis-master
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use qscale_autoscale::Autoscaler;
use qscale_cluster::KubeControlPlane;
use qscale_queue::RedisBacklog;
use qscaled::{Cli, LogFormat};

const DEFAULT_FILTER: &str = "info,qscale=debug,qscaled=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let (targets, settings) = cli.load().context("invalid scaling configuration")?;
    for target in &targets {
        info!(
            resource = %target.id(),
            kind = %target.resource_kind,
            mode = %target.work_mode,
            consumes = %target.consumes,
            queues = ?target.queues,
            min = target.min_replicas,
            max = %target.max_replicas,
            items_per_replica = target.items_per_replica,
            "configured target"
        );
    }

    // ── Backends ───────────────────────────────────────────────

    let source = RedisBacklog::new(
        &cli.redis_host,
        cli.redis_port,
        Duration::from_secs(cli.redis_interval),
    )
    .context("invalid queue store address")?;
    info!(host = %cli.redis_host, port = cli.redis_port, "queue store configured");

    let plane = KubeControlPlane::try_default()
        .await
        .context("failed to build Kubernetes client")?;

    let mut autoscaler = Autoscaler::new(Arc::new(source), Arc::new(plane), targets, settings);

    // ── Run until signalled ────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        autoscaler.run(shutdown_rx).await;
    });

    shutdown_signal().await;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    handle.await.context("autoscaler task panicked")?;
    info!("qscaled stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

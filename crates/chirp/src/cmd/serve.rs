//! Serve command - run the relay
//!
//! Wires the upstream source, the broadcast loop and the subscriber server
//! together under one cancellation token.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use chirp::server::{self, AppState};
use chirp_config::Config;
use chirp_predicate::OperatorRegistry;
use chirp_sources::{UpstreamSource, UpstreamSourceConfig};
use chirp_tap::{Broadcaster, RegistryConfig, SubscriberRegistry};

/// Config files tried, in order, when `--config` is not given
const DEFAULT_CONFIG_PATHS: &[&str] = &["configs/config.toml", "chirp.toml"];

/// How long each task gets to finish after cancellation
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Serve command arguments
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file (defaults to configs/config.toml if not specified)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let config_path = find_config_path(args.config.as_deref())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        config = %config_path.as_deref().map_or("(default)".into(), |p| p.display().to_string()),
        "chirp starting"
    );

    let config = load_config(config_path.as_deref())?;

    if let Err(e) = run_server(config).await {
        error!(error = %e, "server error");
        return Err(e);
    }

    info!("chirp shutdown complete");
    Ok(())
}

/// Locate the config file
///
/// An explicit path must exist. Otherwise the first existing default path is
/// used, or `None` for built-in defaults.
pub fn find_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        return Ok(Some(path.to_path_buf()));
    }

    Ok(DEFAULT_CONFIG_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists()))
}

/// Load the config (or defaults) and apply environment overrides
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => {
            info!("no config file found, using defaults");
            Config::default()
        }
    };

    let config = config
        .with_env_overrides()
        .context("invalid environment override")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Which task ended the run
enum Exit {
    Signal,
    Broadcast(std::result::Result<chirp_tap::Result<()>, JoinError>),
    Server(std::result::Result<io::Result<()>, JoinError>),
}

/// Main server run loop
async fn run_server(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local_addr = listener.local_addr().context("failed to read bound address")?;

    let registry = Arc::new(SubscriberRegistry::new(RegistryConfig {
        max_subscribers: config.server.max_subscribers,
        cooldown: config.delivery.cooldown(),
    }));
    let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&registry)));

    let source = UpstreamSource::new(UpstreamSourceConfig::from(&config.upstream))
        .context("failed to create upstream source")?;
    let upstream_metrics = source.metrics();
    let (upstream_task, upstream_rx) = source.spawn(cancel.clone());

    let mut broadcast_task = tokio::spawn({
        let broadcaster = Arc::clone(&broadcaster);
        let cancel = cancel.clone();
        async move { broadcaster.run(upstream_rx, cancel).await }
    });

    let heartbeat = Duration::from_secs(config.server.heartbeat_interval_secs);
    let state = AppState::new(broadcaster, Arc::new(OperatorRegistry::new()))
        .with_upstream_metrics(upstream_metrics)
        .with_heartbeat(Some(heartbeat));
    let mut server_task = tokio::spawn(server::serve(listener, state, cancel.clone()));

    info!(
        address = %local_addr,
        upstream = %config.upstream.url,
        max_subscribers = config.server.max_subscribers,
        cooldown_ms = config.delivery.cooldown_ms,
        "relay listening"
    );

    let exit = tokio::select! {
        () = wait_for_shutdown() => Exit::Signal,
        result = &mut broadcast_task => Exit::Broadcast(result),
        result = &mut server_task => Exit::Server(result),
    };

    cancel.cancel();
    let closed = registry.close_all();
    info!(subscribers = closed, "closed subscriber channels");

    if let Some(Err(e)) = join_task("upstream", upstream_task).await {
        error!(error = %e, "upstream source stopped");
    }

    match exit {
        Exit::Signal => {
            info!("shutdown signal received, stopped server");
            if let Some(Err(e)) = join_task("broadcast", broadcast_task).await {
                warn!(error = %e, "broadcast loop failed during shutdown");
            }
            if let Some(Err(e)) = join_task("server", server_task).await {
                warn!(error = %e, "server failed during shutdown");
            }
            Ok(())
        }
        Exit::Broadcast(result) => {
            // Server is cancelled; the broadcast error is what gets reported
            let _ = join_task("server", server_task).await;
            result
                .context("broadcast loop panicked")?
                .context("broadcast loop stopped")
        }
        Exit::Server(result) => {
            let _ = join_task("broadcast", broadcast_task).await;
            result
                .context("server task panicked")?
                .context("server stopped")
        }
    }
}

/// Await a task with the shutdown timeout
async fn join_task<T>(name: &'static str, handle: JoinHandle<T>) -> Option<T> {
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
        Ok(Ok(output)) => Some(output),
        Ok(Err(e)) => {
            warn!(task = name, error = %e, "task panicked during shutdown");
            None
        }
        Err(_) => {
            warn!(task = name, "task did not finish within timeout, continuing shutdown");
            None
        }
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

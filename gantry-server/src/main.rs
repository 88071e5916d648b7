// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Gantry — authenticating reverse-proxy gateway
//
//  Front-end:  axum on tokio
//  Upstreams:  event service / auth service over reqwest
//  Audit:      one JSONL record per request, rotating file store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

mod auth;
mod handler;

use crate::auth::Authenticator;
use crate::handler::AppState;
use axum::Router;
use axum::routing::get;
use clap::Parser;
use gantry_audit::file_store::FileStore;
use gantry_audit::recorder::AuditRecorder;
use gantry_audit::sink::FileSink;
use gantry_core::config::GantryConfig;
use gantry_core::resolver::RouteTable;
use gantry_proxy::forwarder::Forwarder;
use gantry_proxy::gateway::{CaptureOptions, Gateway};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "gantry", version, about = "Gantry — authenticating reverse-proxy gateway")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/gantry/gantry.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Gantry starting");

    // ── Config ──
    let config = if cli.config.exists() {
        info!(path = %cli.config.display(), "Loading config file");
        GantryConfig::load(&cli.config)?
    } else {
        info!("No config file found, using defaults");
        GantryConfig::default()
    };

    // ── Wiring ──
    let routes = RouteTable::standard();
    let forwarder = Forwarder::new(config.services.clone(), &config.upstream)?;

    let store = FileStore::open(
        &config.audit.file_path,
        config.audit.max_file_size_bytes,
        config.audit.max_rotated_files,
    )?;
    let (recorder, audit_task) =
        AuditRecorder::spawn(Arc::new(FileSink::new(store)), config.audit.channel_capacity);

    let state = AppState {
        gateway: Arc::new(Gateway::new(
            routes,
            forwarder,
            recorder,
            CaptureOptions::from(&config.audit),
        )),
        authenticator: Arc::new(Authenticator::new(&config.jwt)),
    };

    let app = Router::new()
        .route("/health", get(handler::health))
        .fallback(handler::proxy_entry)
        .with_state(state);

    // ── Serve ──
    let listener = tokio::net::TcpListener::bind(&config.listen.addr).await?;
    info!(addr = %config.listen.addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Every recorder clone is gone once the router is dropped; awaiting
    // the writer task flushes whatever is still queued.
    audit_task.await?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

mod auth;
mod config;
mod error;
mod handlers;
mod health;
mod metrics;
mod proto;
mod server;


use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use config::ServerConfig;
use health::{health_router, shutdown_signal, ReadinessCheck};
use quire_events::EventBus;
use quire_events_memory::MemoryEventBus;
use quire_storage::AccountId;
use quire_store_sqlite::SqliteStore;
use server::QuireServer;

const DEFAULT_DATABASE_URL: &str = "sqlite://quire.db";

// ────────────────────────────────────── CLI Types ──────────────────────────────────────

#[derive(Parser)]
#[command(name = "quire-server")]
#[command(about = "Quire groups service: serving and administration")]
struct Cli {
    /// Database URL (sqlite://path/to/db.db)
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the RPC server
    Serve {
        /// RPC listen address
        #[arg(long, default_value = "0.0.0.0:50051")]
        addr: String,

        /// Health check and metrics HTTP address
        #[arg(long, default_value = "0.0.0.0:8080")]
        health_addr: String,
    },
    /// Run the account deletion cascade for one account and exit
    PurgeAccount {
        /// Account id of the deleted account
        account_id: Uuid,
    },
}

// ────────────────────────────────────── Commands ──────────────────────────────────────

async fn cmd_serve(
    db_url: &str,
    addr: &str,
    health_addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    cmd_serve_with_ready(db_url, addr, health_addr, None).await
}

/// Serve until SIGINT/SIGTERM. `ready_tx` receives the bound (RPC, health)
/// addresses once both listeners are up.
async fn cmd_serve_with_ready(
    db_url: &str,
    addr: &str,
    health_addr: &str,
    ready_tx: Option<oneshot::Sender<(SocketAddr, SocketAddr)>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = addr.parse()?;
    let health_addr: SocketAddr = health_addr.parse()?;

    let config = ServerConfig::from_env()?;
    let store = Arc::new(SqliteStore::open(db_url).await?);
    let events: Arc<dyn EventBus> = Arc::new(MemoryEventBus::new());
    let server = QuireServer::new(store, events, config);

    let listener = server.spawn_account_listener().await?;
    let metrics_handle = metrics::init_metrics()?;

    let (readiness_tx, readiness_rx) = tokio::sync::watch::channel(false);
    let health = health_router(ReadinessCheck::new(readiness_rx), Some(metrics_handle));
    let rpc = handlers::router(server);

    let rpc_listener = tokio::net::TcpListener::bind(addr).await?;
    let health_listener = tokio::net::TcpListener::bind(health_addr).await?;
    let bound = (rpc_listener.local_addr()?, health_listener.local_addr()?);
    info!(addr = %bound.0, "quire-server listening");
    info!(addr = %bound.1, "health checks listening");

    let _ = readiness_tx.send(true);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        shutdown_signal(Some(readiness_tx)).await;
        let _ = shutdown_tx_clone.send(());
    });

    let mut shutdown_rx1 = shutdown_tx.subscribe();
    let health_server = axum::serve(health_listener, health).with_graceful_shutdown(async move {
        let _ = shutdown_rx1.recv().await;
    });

    let mut shutdown_rx2 = shutdown_tx.subscribe();
    let rpc_server = axum::serve(rpc_listener, rpc).with_graceful_shutdown(async move {
        let _ = shutdown_rx2.recv().await;
    });

    let (rpc_result, health_result) = tokio::join!(rpc_server, health_server);
    listener.abort();

    rpc_result?;
    health_result?;
    Ok(())
}

async fn cmd_purge_account(
    db_url: &str,
    account_id: Uuid,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(SqliteStore::open(db_url).await?);
    let events: Arc<dyn EventBus> = Arc::new(MemoryEventBus::new());
    let server = QuireServer::new(store, events, ServerConfig::default());

    let purge = server.purge_account(&AccountId(account_id)).await?;

    println!("invites removed:         {}", purge.invites_removed);
    println!("invite links removed:    {}", purge.invite_links_removed);
    println!("workspaces deleted:      {}", purge.workspaces_deleted);
    println!("memberships removed:     {}", purge.memberships_removed);
    println!("admins promoted:         {}", purge.admins_promoted);
    println!("orphaned groups deleted: {}", purge.orphaned_groups_deleted);
    Ok(())
}

// ────────────────────────────────────── Main ──────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let db_url = cli
        .database_url
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

    match cli.command {
        Command::Serve { addr, health_addr } => {
            cmd_serve(&db_url, &addr, &health_addr).await?;
        }
        Command::PurgeAccount { account_id } => {
            cmd_purge_account(&db_url, account_id).await?;
        }
    }

    Ok(())
}

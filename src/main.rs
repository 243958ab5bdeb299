use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{broadcast, watch};
use anyhow;

use coordgate::{config, connection, election, gateway, maintenance, metrics, snapshot, transactor};
use connection::ConnectionManager;
use snapshot::{RpcSnapshotProvider, SnapshotSource};

#[derive(Parser)]
#[command(author, version, about = "coordgate — decentralized coordinator election gateway")]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log every maintenance tick, not only coordinator changes
    #[arg(long, default_value_t = false)]
    verbose_ticks: bool,

    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Fetch one snapshot, print the elected coordinator and exit
    Elect,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("--- coordgate ---");

    let cli = Cli::parse();
    if cli.verbose_ticks {
        maintenance::set_verbose_ticks(true);
    }

    // Try reading config from the CLI path, else fall back to the embedded default
    let cfg = match config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("⚠️  Could not read config from '{}': {}", &cli.config, e);
            const EMBEDDED_CONFIG: &str = include_str!("../config.toml");
            config::load_from_str(EMBEDDED_CONFIG)?
        }
    };

    let provider = Arc::new(RpcSnapshotProvider::new(cfg.chain.rpc_endpoint.clone())?);

    if let Some(Cmd::Elect) = cli.cmd {
        let snapshot = provider.snapshot().await?;
        let winner = election::select(&snapshot)?;
        println!(
            "🗳️  Coordinator: {} (identity {}, distance {})",
            winner.address, winner.identity, winner.distance
        );
        return Ok(());
    }

    metrics::serve(cfg.metrics.clone())?;

    let manager = Arc::new(ConnectionManager::new(
        Arc::new(transactor::HttpConnector),
        cfg.coordinator.port,
    ));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let (ready_tx, mut ready_rx) = watch::channel(false);

    let loop_handle = maintenance::spawn(
        provider.clone(),
        manager.clone(),
        cfg.coordinator.check_interval_secs,
        ready_tx,
        shutdown_tx.subscribe(),
    );

    // Readiness gate: the gateway must not touch the connection manager
    // before the first successful election-and-connect.
    println!("⏳ Waiting for the first coordinator connection...");
    tokio::select! {
        ready = ready_rx.wait_for(|ready| *ready) => {
            if ready.is_err() {
                anyhow::bail!("maintenance loop exited before the first coordinator connection");
            }
        }
        _ = signal::ctrl_c() => {
            println!("\n🛑 Shutting down...");
            let _ = shutdown_tx.send(());
            let _ = loop_handle.await;
            return Ok(());
        }
    }
    metrics::READY.set(1);

    let gateway_state = Arc::new(gateway::GatewayState {
        provider: provider.clone(),
        manager: manager.clone(),
    });
    let gateway_bind = cfg.gateway.bind.clone();
    let gateway_handle = tokio::spawn(async move {
        if let Err(e) = gateway::serve(&gateway_bind, gateway_state).await {
            eprintln!("🔥 Gateway server failed: {}", e);
        }
    });

    signal::ctrl_c().await?;
    println!("\n🛑 Shutting down...");
    let _ = shutdown_tx.send(());
    let _ = loop_handle.await;
    gateway_handle.abort();
    metrics::READY.set(0);
    println!("✅ Shutdown complete");
    Ok(())
}

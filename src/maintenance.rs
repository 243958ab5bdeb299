//! Maintenance loop: re-evaluates the election on a fixed period and keeps
//! the downstream connection pointed at the current coordinator.
//!
//! The first tick fires immediately so the process can gate readiness on
//! one successful `ensure_connected` before the gateway accepts requests.
//! Transient snapshot/connect failures are logged and absorbed; the loop
//! never crashes the process and never shortens the wait.

use crate::connection::ConnectionManager;
use crate::metrics;
use crate::snapshot::SnapshotSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::{task, time};

// Per-tick logs are noisy at 60s intervals over long uptimes; gate them
// behind a static flag disabled by default.
static ALLOW_ROUTINE_TICKS: AtomicBool = AtomicBool::new(false);

pub fn set_verbose_ticks(verbose: bool) {
    ALLOW_ROUTINE_TICKS.store(verbose, Ordering::Relaxed);
}

macro_rules! tick_log {
    ($($arg:tt)*) => {
        if ALLOW_ROUTINE_TICKS.load(Ordering::Relaxed) { println!($($arg)*); }
    };
}

/// Spawn the loop. `ready_tx` flips to `true` after the first successful
/// `ensure_connected`; the shutdown receiver stops the loop and closes the
/// downstream connection before the task exits.
pub fn spawn<S>(
    provider: Arc<S>,
    manager: Arc<ConnectionManager>,
    interval_secs: u64,
    ready_tx: watch::Sender<bool>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> task::JoinHandle<()>
where
    S: SnapshotSource + 'static,
{
    task::spawn(async move {
        let mut ticker = time::interval(time::Duration::from_secs(interval_secs.max(1)));
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    println!("🛑 Maintenance loop received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    let snapshot = match provider.snapshot().await {
                        Ok(s) => s,
                        Err(e) => {
                            metrics::SNAPSHOT_FAILURES_TOTAL.inc();
                            eprintln!("⚠️  Snapshot fetch failed, retrying next tick: {}", e);
                            continue;
                        }
                    };
                    match manager.ensure_connected(&snapshot).await {
                        Ok(handle) => {
                            tick_log!("🔄 Coordinator check ok: {}", handle.base_url());
                            if !*ready_tx.borrow() {
                                println!("✅ First coordinator connection established; gateway is ready");
                                let _ = ready_tx.send(true);
                            }
                        }
                        Err(e) => {
                            eprintln!("⚠️  Coordinator connection failed, retrying next tick: {}", e);
                        }
                    }
                }
            }
        }
        manager.shutdown().await;
        println!("✅ Maintenance loop shutdown complete");
    })
}

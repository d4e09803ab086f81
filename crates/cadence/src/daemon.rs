//! Run command: one repeating interval on the tokio runtime.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use miette::Result;
use tokio::sync::watch;
use tracing::info;

use cadence_scheduler::{DelaySequence, WaitingIntervals};

/// Fire `message` on the schedule described by `delays` until Ctrl-C or
/// until `max_firings` firings have happened.
pub async fn run(delays: DelaySequence, message: String, max_firings: Option<u64>) -> Result<()> {
    let scheduler = WaitingIntervals::new().map_err(|e| miette::miette!("{}", e))?;

    // Create shutdown channel
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    // Handle shutdown signals
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        let _ = shutdown_tx_clone.send(true);
    });

    let fired = Arc::new(AtomicU64::new(0));
    let id = scheduler
        .start_repeating(
            on_fire,
            delays,
            (message, Arc::clone(&fired), max_firings, shutdown_tx),
        )
        .map_err(|e| miette::miette!("failed to start interval: {}", e))?;

    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }

    scheduler.stop_repeating(id);
    info!(%id, fired = fired.load(Ordering::SeqCst), "shut down gracefully");
    Ok(())
}

/// Called on every firing.
fn on_fire(
    message: String,
    fired: Arc<AtomicU64>,
    max_firings: Option<u64>,
    shutdown: watch::Sender<bool>,
) {
    let count = fired.fetch_add(1, Ordering::SeqCst) + 1;
    info!(firing = count, %message, "interval fired");

    if max_firings.is_some_and(|max| count >= max) {
        info!(max = ?max_firings, "firing limit reached");
        let _ = shutdown.send(true);
    }
}

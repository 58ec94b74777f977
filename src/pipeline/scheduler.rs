// src/pipeline/scheduler.rs

//! Background refresh worker.
//!
//! On start the worker checks whether a cycle is due and runs one if so, then
//! sleeps until the caches expire and runs the next cycle. A cycle where every
//! brand failed still counts, so the next attempt is one TTL later. `stop()` wakes the
//! worker out of its sleep or an in-flight cycle and waits for it to exit.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::pipeline::CatalogRefresher;

/// Shortest wait between two scheduled cycles.
const MIN_WAIT: Duration = Duration::from_secs(1);

struct Worker {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns the single background refresh task.
pub struct RefreshScheduler {
    refresher: Arc<CatalogRefresher>,
    worker: Option<Worker>,
}

impl RefreshScheduler {
    pub fn new(refresher: Arc<CatalogRefresher>) -> Self {
        Self {
            refresher,
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// Spawn the worker. Returns `false` if one is already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_worker(Arc::clone(&self.refresher), stop_rx));
        self.worker = Some(Worker { stop_tx, handle });
        log::info!("Refresh scheduler started");
        true
    }

    /// Signal the worker and wait for it to exit.
    pub async fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = worker.stop_tx.send(true);
        if let Err(e) = worker.handle.await {
            log::error!("Refresh worker ended abnormally: {}", e);
        }
        log::info!("Refresh scheduler stopped");
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(true);
        }
    }
}

async fn run_worker(refresher: Arc<CatalogRefresher>, mut stop_rx: watch::Receiver<bool>) {
    if refresher.is_refresh_due(Utc::now()) {
        log::info!("Cache is stale or empty, refreshing now");
        tokio::select! {
            _ = refresher.run_cycle(Utc::now()) => {}
            _ = stop_rx.changed() => return,
        }
    } else {
        log::info!("Cache is fresh, skipping startup refresh");
    }

    loop {
        let wait = refresher.time_until_due(Utc::now()).max(MIN_WAIT);
        log::debug!("Next refresh in {}s", wait.as_secs());

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = stop_rx.changed() => break,
        }

        tokio::select! {
            _ = refresher.run_cycle(Utc::now()) => {}
            _ = stop_rx.changed() => break,
        }
    }
}

//! Wiring: feed → normalizer → gate → store.

use crate::config::AppConfig;
use crate::depth::DepthAggregator;
use crate::errors::{AppError, Result};
use crate::feed::{self, FeedEvent};
use crate::gate::{GateHandle, GateStats, spawn_update_gate};
use crate::normalizer::normalize;
use crate::store::OrderBookStore;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Running pipeline. Dropping it without [`Pipeline::shutdown`] closes the
/// shutdown channel, so every task still exits, but nothing waits for them.
pub struct Pipeline {
    store: Arc<OrderBookStore>,
    shutdown_tx: watch::Sender<bool>,
    gate_task: JoinHandle<GateStats>,
    dispatch_task: JoinHandle<()>,
    push_task: JoinHandle<()>,
    poll_task: JoinHandle<Result<()>>,
}

impl Pipeline {
    pub fn spawn(config: AppConfig) -> Self {
        let store = Arc::new(OrderBookStore::new(DepthAggregator::new(
            config.depth_mode.clone(),
        )));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (events_tx, events_rx) = mpsc::unbounded_channel::<FeedEvent>();

        let (gate, gate_task) = {
            let store = store.clone();
            spawn_update_gate(
                config.throttle_window,
                move |snapshot| {
                    store.accept(snapshot);
                },
                shutdown_rx.clone(),
            )
        };
        let dispatch_task = tokio::spawn(dispatch(
            events_rx,
            gate,
            store.clone(),
            shutdown_rx.clone(),
        ));
        let push_task = tokio::spawn(feed::run_push_feed(
            config.clone(),
            events_tx.clone(),
            shutdown_rx.clone(),
        ));
        let poll_task = tokio::spawn(feed::run_poll_feed(
            config.clone(),
            store.subscribe_status(),
            events_tx,
            shutdown_rx,
        ));

        info!(
            ws_url = %config.ws_url,
            backend_url = %config.backend_url,
            throttle_ms = config.throttle_window.as_millis() as u64,
            depth_mode = ?config.depth_mode,
            "[INIT] pipeline started"
        );

        Self {
            store,
            shutdown_tx,
            gate_task,
            dispatch_task,
            push_task,
            poll_task,
        }
    }

    pub fn store(&self) -> Arc<OrderBookStore> {
        self.store.clone()
    }

    /// Stop every task and wait for them. Pending gate timers are discarded
    /// and the feed connection is released before this returns.
    pub async fn shutdown(self) -> Result<GateStats> {
        self.shutdown_tx.send_replace(true);

        let join_err = |e: tokio::task::JoinError| AppError::Other(format!("task failed: {e}"));
        self.push_task.await.map_err(join_err)?;
        if let Err(e) = self.poll_task.await.map_err(join_err)? {
            warn!(error = %e, "[INIT] poll feed ended with error");
        }
        self.dispatch_task.await.map_err(join_err)?;
        let stats = self.gate_task.await.map_err(join_err)?;
        info!(?stats, "[INIT] pipeline stopped");
        Ok(stats)
    }
}

/// Route feed events: payloads are normalized and offered to the gate,
/// lifecycle events go straight to the store.
async fn dispatch(
    mut events: mpsc::UnboundedReceiver<FeedEvent>,
    gate: GateHandle,
    store: Arc<OrderBookStore>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            _ = feed::stopped(&mut shutdown) => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        match event {
            FeedEvent::Payload(raw) => {
                if !gate.submit(normalize(&raw)) {
                    debug!("[GATE] gate stopped, dropping snapshot");
                    break;
                }
            }
            FeedEvent::Lifecycle(lifecycle) => {
                store.apply_lifecycle(&lifecycle);
            }
        }
    }
}

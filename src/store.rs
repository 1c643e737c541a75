//! Current book, its depth curve and the feed status.
//!
//! Both values live in `watch` channels: readers either borrow the latest
//! value or subscribe and get woken on every change.

use crate::depth::DepthAggregator;
use crate::feed::LifecycleEvent;
use crate::models::{BookView, ConnectionStatus, OrderBookSnapshot};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

impl ConnectionStatus {
    /// Next status for a feed event, or `None` when the event does not apply
    /// in the current state.
    pub fn transition(self, event: &LifecycleEvent) -> Option<ConnectionStatus> {
        use ConnectionStatus::*;
        match (self, event) {
            (Connecting, LifecycleEvent::Connected) => Some(Connected),
            (Connected, LifecycleEvent::ConnectError(_)) => Some(Error),
            (Connected, LifecycleEvent::Disconnected) => Some(Disconnected),
            (Error | Disconnected, LifecycleEvent::Connecting) => Some(Connecting),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct OrderBookStore {
    aggregator: DepthAggregator,
    book_tx: watch::Sender<Arc<BookView>>,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl OrderBookStore {
    pub fn new(aggregator: DepthAggregator) -> Self {
        let (book_tx, _) = watch::channel(Arc::new(BookView::default()));
        let (status_tx, _) = watch::channel(ConnectionStatus::default());
        Self {
            aggregator,
            book_tx,
            status_tx,
        }
    }

    /// Replace the current book. The depth curve is computed first and both
    /// are published in one step.
    pub fn accept(&self, snapshot: OrderBookSnapshot) -> Arc<BookView> {
        let depth = self.aggregator.compute(&snapshot);
        let version = self.book_tx.borrow().version + 1;
        let view = Arc::new(BookView {
            version,
            snapshot,
            depth,
        });
        self.book_tx.send_replace(view.clone());
        debug!(
            version,
            bids = view.snapshot.bids.len(),
            asks = view.snapshot.asks.len(),
            points = view.depth.len(),
            "[STORE] snapshot accepted"
        );
        view
    }

    /// Apply a feed lifecycle event to the status. The book is left alone.
    pub fn apply_lifecycle(&self, event: &LifecycleEvent) -> ConnectionStatus {
        let current = *self.status_tx.borrow();
        match current.transition(event) {
            Some(next) => {
                self.status_tx.send_replace(next);
                info!(from = %current, to = %next, "[STORE] connection status changed");
                next
            }
            None => {
                debug!(status = %current, ?event, "[STORE] lifecycle event ignored");
                current
            }
        }
    }

    pub fn current(&self) -> Arc<BookView> {
        self.book_tx.borrow().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<BookView>> {
        self.book_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }
}

impl Default for OrderBookStore {
    fn default() -> Self {
        Self::new(DepthAggregator::default())
    }
}

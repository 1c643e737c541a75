//! Trailing-edge throttle with deduplication between the feed and the store.
//!
//! The first snapshot submitted to an idle gate arms a timer of one window.
//! Later submissions only replace the pending candidate. When the timer fires
//! the latest candidate is emitted, unless it is structurally equal to the
//! previous emission. Candidates replaced before the timer fires are never
//! seen downstream.

use crate::models::OrderBookSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// Handle for one armed timer. A ticket whose generation no longer matches
/// the gate is stale and firing it does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTicket {
    pub deadline: Instant,
    generation: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    pub submitted: u64,
    pub emitted: u64,
    pub suppressed_duplicates: u64,
    pub superseded: u64,
}

#[derive(Debug)]
pub struct UpdateGate {
    window: Duration,
    pending: Option<OrderBookSnapshot>,
    armed: Option<TimerTicket>,
    last_emitted: Option<OrderBookSnapshot>,
    generation: u64,
    closed: bool,
    stats: GateStats,
}

impl UpdateGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            armed: None,
            last_emitted: None,
            generation: 0,
            closed: false,
            stats: GateStats::default(),
        }
    }

    /// Currently armed timer, if any.
    pub fn armed(&self) -> Option<TimerTicket> {
        self.armed
    }

    pub fn last_emitted(&self) -> Option<&OrderBookSnapshot> {
        self.last_emitted.as_ref()
    }

    pub fn stats(&self) -> GateStats {
        self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Offer a snapshot. Returns a ticket only when this submission armed a
    /// new timer; the caller must call [`UpdateGate::fire`] with it at
    /// `ticket.deadline`.
    pub fn submit(&mut self, snapshot: OrderBookSnapshot, now: Instant) -> Option<TimerTicket> {
        if self.closed {
            debug!("[GATE] submission after shutdown ignored");
            return None;
        }
        self.stats.submitted += 1;
        if self.pending.replace(snapshot).is_some() {
            self.stats.superseded += 1;
        }
        if self.armed.is_some() {
            return None;
        }
        self.generation += 1;
        let ticket = TimerTicket {
            deadline: now + self.window,
            generation: self.generation,
        };
        self.armed = Some(ticket);
        Some(ticket)
    }

    /// Timer expiry. Returns the snapshot to publish, or `None` when the
    /// ticket is stale or the candidate duplicates the last emission.
    pub fn fire(&mut self, ticket: TimerTicket) -> Option<OrderBookSnapshot> {
        if self.closed || self.armed != Some(ticket) {
            debug!("[GATE] stale timer ignored");
            return None;
        }
        self.armed = None;
        let candidate = self.pending.take()?;

        let duplicate = self
            .last_emitted
            .as_ref()
            .is_some_and(|last| snapshots_equal(last, &candidate));
        if duplicate {
            self.stats.suppressed_duplicates += 1;
            debug!("[GATE] unchanged snapshot suppressed");
            return None;
        }

        self.stats.emitted += 1;
        self.last_emitted = Some(candidate.clone());
        Some(candidate)
    }

    /// Drop the pending candidate and invalidate any outstanding ticket.
    pub fn shutdown(&mut self) {
        self.closed = true;
        self.pending = None;
        self.armed = None;
        self.generation += 1;
    }
}

/// Field-by-field comparison of two snapshots. Decimals compare by value,
/// so `"1.50"` and `"1.5"` are the same level; the sums are compared as text.
pub fn snapshots_equal(a: &OrderBookSnapshot, b: &OrderBookSnapshot) -> bool {
    a.bid_sum == b.bid_sum
        && a.ask_sum == b.ask_sum
        && a.bids.len() == b.bids.len()
        && a.asks.len() == b.asks.len()
        && a.bids
            .iter()
            .zip(&b.bids)
            .all(|(x, y)| x.price == y.price && x.size == y.size)
        && a.asks
            .iter()
            .zip(&b.asks)
            .all(|(x, y)| x.price == y.price && x.size == y.size)
}

/// Submission side of a running gate task.
///
/// Submissions land in a single latest-wins slot, so a snapshot superseded
/// before the task reads it is dropped here and never buffered.
#[derive(Debug, Clone)]
pub struct GateHandle {
    slot: Arc<watch::Sender<Option<OrderBookSnapshot>>>,
}

impl GateHandle {
    /// Never blocks. Returns `false` once the gate task has stopped.
    pub fn submit(&self, snapshot: OrderBookSnapshot) -> bool {
        self.slot.send(Some(snapshot)).is_ok()
    }
}

/// Run an [`UpdateGate`] on its own task. `on_emit` is called for every
/// accepted snapshot. The task stops when `shutdown` turns `true` or every
/// [`GateHandle`] is dropped; a pending timer is discarded, never fired.
pub fn spawn_update_gate<F>(
    window: Duration,
    mut on_emit: F,
    mut shutdown: watch::Receiver<bool>,
) -> (GateHandle, JoinHandle<GateStats>)
where
    F: FnMut(OrderBookSnapshot) + Send + 'static,
{
    let (slot, mut incoming) = watch::channel::<Option<OrderBookSnapshot>>(None);

    let task = tokio::spawn(async move {
        let mut gate = UpdateGate::new(window);
        if !*shutdown.borrow() {
            loop {
                let armed = gate.armed();
                let deadline = armed.map(|t| t.deadline).unwrap_or_else(Instant::now);
                // An expired deadline must win over a busy submitter.
                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = sleep_until(deadline), if armed.is_some() => {
                        if let Some(ticket) = armed {
                            if let Some(snapshot) = gate.fire(ticket) {
                                on_emit(snapshot);
                            }
                        }
                    }
                    changed = incoming.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let latest = incoming.borrow_and_update().clone();
                        if let Some(snapshot) = latest {
                            gate.submit(snapshot, Instant::now());
                        }
                    }
                }
            }
        }
        gate.shutdown();
        let stats = gate.stats();
        debug!(?stats, "[GATE] stopped");
        stats
    });

    (GateHandle { slot: Arc::new(slot) }, task)
}

//! Order book feed.
//!
//! Responsibilities:
//! • Keep a WebSocket connection to the backend and forward snapshot payloads.
//! • Reconnect after a fixed delay, forever.
//! • Poll the REST endpoint while the push connection is down.

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch};

pub mod poll;
pub mod push;

pub use poll::run_poll_feed;
pub use push::run_push_feed;

/// Connection lifecycle as seen by the push transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connecting,
    Connected,
    ConnectError(String),
    Disconnected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Lifecycle(LifecycleEvent),
    /// Raw snapshot payload, not yet normalized.
    Payload(Value),
}

pub type FeedSender = mpsc::UnboundedSender<FeedEvent>;

/// Resolves once shutdown is requested or its sender is gone.
pub(crate) async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Text frame as sent by the backend: either an event envelope or a bare
/// snapshot object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Frame {
    Envelope {
        event: String,
        #[serde(default)]
        data: Option<Value>,
    },
    Bare(Value),
}

/// Pull the snapshot out of a text frame.
///
/// Envelopes for any event other than `update_event` are ignored.
pub fn extract_payload(text: &str, update_event: &str) -> serde_json::Result<Option<Value>> {
    let frame: Frame = serde_json::from_str(text)?;
    Ok(match frame {
        Frame::Envelope { event, data } if event == update_event => data,
        Frame::Envelope { .. } => None,
        Frame::Bare(value) => Some(value),
    })
}

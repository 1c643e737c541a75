use super::{FeedEvent, FeedSender, LifecycleEvent, extract_payload};
use crate::config::AppConfig;
use crate::errors::Result;
use futures::StreamExt;
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Keep a WebSocket session to the backend alive until `shutdown` flips.
///
/// Every attempt is announced as `Connecting`; failures and drops are
/// reported and retried after `reconnect_delay`, with no attempt limit.
pub async fn run_push_feed(
    config: AppConfig,
    events: FeedSender,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempts: u64 = 0;
    loop {
        if *shutdown.borrow() || !announce(&events, LifecycleEvent::Connecting) {
            break;
        }
        attempts += 1;

        let outcome = tokio::select! {
            _ = super::stopped(&mut shutdown) => break,
            outcome = stream_session(&config, &events) => outcome,
        };
        let event = match outcome {
            Ok(()) => {
                info!(url = %config.ws_url, "[FEED] websocket closed");
                LifecycleEvent::Disconnected
            }
            Err(e) => {
                warn!(url = %config.ws_url, attempts, error = %e, "[FEED] websocket error");
                LifecycleEvent::ConnectError(e.to_string())
            }
        };
        if !announce(&events, event) {
            break;
        }

        tokio::select! {
            _ = super::stopped(&mut shutdown) => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }
    debug!(attempts, "[FEED] push feed stopped");
}

/// One connection: connect, forward payloads until the server goes away.
async fn stream_session(config: &AppConfig, events: &FeedSender) -> Result<()> {
    let (mut ws_stream, _resp) = connect_async(config.ws_url.as_str()).await?;
    info!(url = %config.ws_url, "[FEED] websocket connected");
    if !announce(events, LifecycleEvent::Connected) {
        return Ok(());
    }

    while let Some(msg_res) = ws_stream.next().await {
        match msg_res? {
            Message::Text(txt) => match extract_payload(&txt, &config.update_event) {
                Ok(Some(payload)) => {
                    if events.send(FeedEvent::Payload(payload)).is_err() {
                        return Ok(());
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "[FEED] message JSON parse failed"),
            },
            Message::Close(frame) => {
                debug!(?frame, "[FEED] close frame received");
                break;
            }
            _ => {}
        }
    }
    Ok(())
}

fn announce(events: &FeedSender, event: LifecycleEvent) -> bool {
    events.send(FeedEvent::Lifecycle(event)).is_ok()
}

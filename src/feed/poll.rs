use super::{FeedEvent, FeedSender};
use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::ConnectionStatus;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetch the REST snapshot every `poll_interval` while the push feed is not
/// connected. The first tick is immediate.
pub async fn run_poll_feed(
    config: AppConfig,
    status: watch::Receiver<ConnectionStatus>,
    events: FeedSender,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let url = config.orderbook_url()?;
    let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = super::stopped(&mut shutdown) => break,
            _ = ticker.tick() => {}
        }
        if *status.borrow() == ConnectionStatus::Connected {
            debug!("[POLL] push feed connected, skipping poll");
            continue;
        }

        let fetched = tokio::select! {
            _ = super::stopped(&mut shutdown) => break,
            fetched = fetch_snapshot(&client, &url) => fetched,
        };
        match fetched {
            Ok(payload) => {
                if events.send(FeedEvent::Payload(payload)).is_err() {
                    break;
                }
            }
            Err(e) => warn!(url = %url, error = %e, "[POLL] order book fetch failed"),
        }
    }
    debug!("[POLL] poll feed stopped");
    Ok(())
}

/// `GET` the order book endpoint and return the JSON body.
pub async fn fetch_snapshot(client: &Client, url: &Url) -> Result<Value> {
    let response = client.get(url.clone()).send().await?.error_for_status()?;
    Ok(response.json::<Value>().await?)
}

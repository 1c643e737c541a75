//! Configuration loader and application settings.

use crate::depth::{DepthCaps, DepthMode};
use crate::errors::{AppError, Result};
use bigdecimal::BigDecimal;
use num_traits::Signed;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";
const DEFAULT_UPDATE_EVENT: &str = "orderbook";

/// Consolidated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base address of the order book backend (REST).
    pub backend_url: Url,
    /// WebSocket endpoint pushing snapshots.
    pub ws_url: Url,
    /// Envelope event name that carries snapshot payloads.
    pub update_event: String,
    /// Gate window: at most one accepted update per window.
    pub throttle_window: Duration,
    /// REST polling interval used while the push feed is down.
    pub poll_interval: Duration,
    /// Fixed delay between push reconnection attempts.
    pub reconnect_delay: Duration,
    pub depth_mode: DepthMode,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup; unset keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend_url = Url::parse(
            get("BACKEND_URL")
                .as_deref()
                .unwrap_or(DEFAULT_BACKEND_URL),
        )?;
        let ws_url = match get("BACKEND_WS_URL") {
            Some(raw) => Url::parse(&raw)?,
            None => websocket_url_for(&backend_url)?,
        };
        let update_event = get("UPDATE_EVENT").unwrap_or_else(|| DEFAULT_UPDATE_EVENT.into());

        let throttle_window = Duration::from_millis(positive("THROTTLE_WINDOW_MS", get, 1000)?);
        let poll_interval = Duration::from_secs(positive("POLL_INTERVAL_SECS", get, 30)?);
        let reconnect_delay = Duration::from_millis(positive("RECONNECT_DELAY_MS", get, 1000)?);

        let depth_mode = match get("DEPTH_MODE").as_deref().map(str::trim) {
            None | Some("full") => DepthMode::Full,
            Some("capped") => {
                let defaults = DepthCaps::default();
                DepthMode::Capped(DepthCaps {
                    notional_cap: decimal("DEPTH_NOTIONAL_CAP", get, defaults.notional_cap)?,
                    size_cap: decimal("DEPTH_SIZE_CAP", get, defaults.size_cap)?,
                })
            }
            Some(other) => {
                return Err(AppError::Config(format!(
                    "DEPTH_MODE must be `full` or `capped`, got `{other}`"
                )));
            }
        };

        Ok(Self {
            backend_url,
            ws_url,
            update_event,
            throttle_window,
            poll_interval,
            reconnect_delay,
            depth_mode,
        })
    }

    /// REST endpoint polled by the fallback feed.
    pub fn orderbook_url(&self) -> Result<Url> {
        Ok(self.backend_url.join("orderbook")?)
    }
}

/// `http(s)://host` → `ws(s)://host`.
fn websocket_url_for(backend: &Url) -> Result<Url> {
    let scheme = match backend.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(AppError::Config(format!(
                "unsupported backend scheme `{other}`"
            )));
        }
    };
    let mut ws = backend.clone();
    ws.set_scheme(scheme)
        .map_err(|_| AppError::Config(format!("cannot derive websocket url from {backend}")))?;
    Ok(ws)
}

fn positive<G>(key: &str, get: G, default: u64) -> Result<u64>
where
    G: Fn(&str) -> Option<String>,
{
    let value = match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| AppError::Config(format!("{key} must be a whole number: {e}")))?,
        None => default,
    };
    if value == 0 {
        return Err(AppError::Config(format!("{key} must be greater than zero")));
    }
    Ok(value)
}

fn decimal<G>(key: &str, get: G, default: BigDecimal) -> Result<BigDecimal>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    let value = BigDecimal::from_str(raw.trim())
        .map_err(|e| AppError::Config(format!("{key} must be a decimal: {e}")))?;
    if value.is_negative() {
        return Err(AppError::Config(format!("{key} must not be negative")));
    }
    Ok(value)
}

//! Shared data structures used throughout the application.

use bigdecimal::BigDecimal;
use num_traits::Zero;
use std::fmt;

/// A single price level of the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub price: BigDecimal,
    pub size: BigDecimal,
}

impl Order {
    pub fn new(price: BigDecimal, size: BigDecimal) -> Self {
        Self { price, size }
    }

    /// Monetary value of the level (`price × size`).
    pub fn notional(&self) -> BigDecimal {
        &self.price * &self.size
    }
}

/// Full replacement description of the book as received from the server.
///
/// Bids are best-first (descending price), asks best-first (ascending price).
/// `bid_sum` / `ask_sum` are server-computed display figures and are carried
/// through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBookSnapshot {
    pub bids: Vec<Order>,
    pub asks: Vec<Order>,
    pub bid_sum: String,
    pub ask_sum: String,
}

impl Default for OrderBookSnapshot {
    fn default() -> Self {
        Self {
            bids: Vec::new(),
            asks: Vec::new(),
            bid_sum: "0".to_string(),
            ask_sum: "0".to_string(),
        }
    }
}

impl OrderBookSnapshot {
    pub fn best_bid(&self) -> Option<&Order> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&Order> {
        self.asks.first()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bid,
    Ask,
}

/// One point of the combined depth curve. Only one of the two volumes is
/// ever non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthPoint {
    pub price: BigDecimal,
    pub cumulative_bid_volume: BigDecimal,
    pub cumulative_ask_volume: BigDecimal,
}

impl DepthPoint {
    pub fn bid(price: BigDecimal, cumulative: BigDecimal) -> Self {
        Self {
            price,
            cumulative_bid_volume: cumulative,
            cumulative_ask_volume: BigDecimal::zero(),
        }
    }

    pub fn ask(price: BigDecimal, cumulative: BigDecimal) -> Self {
        Self {
            price,
            cumulative_bid_volume: BigDecimal::zero(),
            cumulative_ask_volume: cumulative,
        }
    }
}

/// Both sides merged onto one price axis, sorted ascending by price.
pub type DepthCurve = Vec<DepthPoint>;

/// Feed connection state shown next to the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Error,
    Disconnected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
            ConnectionStatus::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Snapshot and depth curve published together by the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookView {
    /// Number of snapshots accepted so far; `0` before the first one.
    pub version: u64,
    pub snapshot: OrderBookSnapshot,
    pub depth: DepthCurve,
}

//! Miscellaneous helper utilities.

use crate::models::BookView;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize `tracing` subscriber with env-based filter.
///
/// If `RUST_LOG` is not set, defaults to `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// One-line summary of a published book for log output.
pub fn describe_book(view: &BookView) -> String {
    let best = |side: Option<&crate::models::Order>| match side {
        Some(order) => format!("{} x {}", order.price, order.size),
        None => "-".to_string(),
    };
    format!(
        "v{} bid {} | ask {} | bidSum {} askSum {} | {} depth points",
        view.version,
        best(view.snapshot.best_bid()),
        best(view.snapshot.best_ask()),
        view.snapshot.bid_sum,
        view.snapshot.ask_sum,
        view.depth.len()
    )
}

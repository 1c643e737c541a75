//! Core library for the orderbook-depth project.
//!
//! Raw order book snapshots flow from the feed through the normalizer and the
//! update gate into the store, which publishes each accepted book together
//! with its cumulative depth curve.

pub mod config;
pub mod depth;
pub mod errors;
pub mod feed;
pub mod gate;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod store;
pub mod utils;

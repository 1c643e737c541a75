//! Raw feed payload → canonical `OrderBookSnapshot`.
//!
//! Orders arrive either as positional `[price, size]` pairs or as
//! `{ "price": .., "size": .. }` records, with numbers encoded as JSON strings
//! or JSON numbers. Everything is resolved here so the rest of the crate only
//! ever sees `Order`.

use crate::errors::Result;
use crate::models::{Order, OrderBookSnapshot, Side};
use bigdecimal::BigDecimal;
use num_traits::{Signed, Zero};
use serde_json::Value;
use std::str::FromStr;
use tracing::warn;

/// Largest decimal exponent accepted in either direction. Anything beyond it
/// is not a real price or size, and arithmetic on it grows with the exponent.
const MAX_DECIMAL_EXPONENT: i64 = 1_000;

/// Wire encodings of a single order.
#[derive(Debug)]
enum WireOrder<'a> {
    Pair(&'a Value, &'a Value),
    Record { price: &'a Value, size: &'a Value },
}

impl<'a> WireOrder<'a> {
    fn classify(raw: &'a Value) -> Option<Self> {
        match raw {
            Value::Array(items) if items.len() == 2 => {
                Some(WireOrder::Pair(&items[0], &items[1]))
            }
            Value::Object(fields) => Some(WireOrder::Record {
                price: fields.get("price")?,
                size: fields.get("size")?,
            }),
            _ => None,
        }
    }

    fn into_order(self) -> Option<Order> {
        let (price, size) = match self {
            WireOrder::Pair(price, size) => (price, size),
            WireOrder::Record { price, size } => (price, size),
        };
        let price = parse_decimal(price)?;
        let size = parse_decimal(size)?;
        if !price.is_positive() || size.is_negative() {
            return None;
        }
        Some(Order { price, size })
    }
}

/// Data-quality findings for one normalized payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Sides that were present but not arrays (treated as empty).
    pub malformed_sides: Vec<Side>,
    pub skipped_bids: usize,
    pub skipped_asks: usize,
}

impl NormalizeReport {
    pub fn is_clean(&self) -> bool {
        self.malformed_sides.is_empty() && self.skipped_bids == 0 && self.skipped_asks == 0
    }
}

/// Normalize a raw payload. Never fails; problems are logged and the
/// affected entries dropped.
pub fn normalize(raw: &Value) -> OrderBookSnapshot {
    let (snapshot, report) = normalize_with_report(raw);
    if !report.is_clean() {
        warn!(
            malformed_sides = ?report.malformed_sides,
            skipped_bids = report.skipped_bids,
            skipped_asks = report.skipped_asks,
            "[NORM] payload contained malformed entries"
        );
    }
    snapshot
}

pub fn normalize_with_report(raw: &Value) -> (OrderBookSnapshot, NormalizeReport) {
    let mut report = NormalizeReport::default();

    let Some(fields) = raw.as_object() else {
        report.malformed_sides = vec![Side::Bid, Side::Ask];
        return (OrderBookSnapshot::default(), report);
    };

    let (bids, skipped_bids) = normalize_side(fields.get("bids"), Side::Bid, &mut report);
    let (asks, skipped_asks) = normalize_side(fields.get("asks"), Side::Ask, &mut report);
    report.skipped_bids = skipped_bids;
    report.skipped_asks = skipped_asks;

    let snapshot = OrderBookSnapshot {
        bids,
        asks,
        bid_sum: passthrough_sum(fields.get("bidSum")),
        ask_sum: passthrough_sum(fields.get("askSum")),
    };
    (snapshot, report)
}

/// Parse message text and normalize it. Only invalid JSON is an error.
pub fn parse_snapshot(text: &str) -> Result<OrderBookSnapshot> {
    let raw: Value = serde_json::from_str(text)?;
    Ok(normalize(&raw))
}

fn normalize_side(
    raw: Option<&Value>,
    side: Side,
    report: &mut NormalizeReport,
) -> (Vec<Order>, usize) {
    let items = match raw {
        None | Some(Value::Null) => return (Vec::new(), 0),
        Some(Value::Array(items)) => items,
        Some(_) => {
            report.malformed_sides.push(side);
            return (Vec::new(), 0);
        }
    };

    let orders: Vec<Order> = items
        .iter()
        .filter_map(|item| WireOrder::classify(item)?.into_order())
        .collect();
    let skipped = items.len() - orders.len();
    (orders, skipped)
}

fn parse_decimal(raw: &Value) -> Option<BigDecimal> {
    let value = match raw {
        Value::String(s) => BigDecimal::from_str(s.trim()).ok()?,
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok()?,
        _ => return None,
    };
    let (_, scale) = value.as_bigint_and_exponent();
    (scale.abs() <= MAX_DECIMAL_EXPONENT).then_some(value)
}

fn passthrough_sum(raw: Option<&Value>) -> String {
    match raw {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => BigDecimal::zero().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn pairs_and_records_normalize_to_same_orders() {
        let pairs = json!({
            "bids": [["100.5", "2"], [99, 1.25]],
            "asks": [["101", "3"]],
            "bidSum": "3.25",
            "askSum": "3"
        });
        let records = json!({
            "bids": [{"price": "100.5", "size": "2"}, {"price": 99, "size": 1.25}],
            "asks": [{"price": "101", "size": "3"}],
            "bidSum": "3.25",
            "askSum": "3"
        });
        let a = normalize(&pairs);
        let b = normalize(&records);
        assert_eq!(a, b);
        assert_eq!(a.bids[0], Order::new(dec("100.5"), dec("2")));
        assert_eq!(a.bids[1], Order::new(dec("99"), dec("1.25")));
        assert_eq!(a.bid_sum, "3.25");
    }

    #[test]
    fn one_invalid_ask_among_five_is_skipped() {
        let raw = json!({
            "bids": [],
            "asks": [
                ["101", "1"],
                ["102", "1"],
                ["bad", "1"],
                ["103", "1"],
                ["104", "1"]
            ]
        });
        let (snapshot, report) = normalize_with_report(&raw);
        assert_eq!(snapshot.asks.len(), 4);
        assert_eq!(report.skipped_asks, 1);
        assert!(report.malformed_sides.is_empty());
    }

    #[test]
    fn wrong_shapes_and_out_of_range_values_are_skipped() {
        let raw = json!({
            "bids": [
                ["100", "1", "extra"],
                {"price": "100"},
                "100",
                null,
                ["0", "1"],
                ["-1", "1"],
                ["100", "-1"],
                ["NaN", "1"],
                ["inf", "1"],
                [true, "1"],
                [" 98.5 ", "0"]
            ]
        });
        let (snapshot, report) = normalize_with_report(&raw);
        assert_eq!(snapshot.bids, vec![Order::new(dec("98.5"), dec("0"))]);
        assert_eq!(report.skipped_bids, 10);
    }

    #[test]
    fn extreme_exponents_are_skipped() {
        let raw = json!({
            "bids": [["100", "1"], ["99", "1e-10000000"], ["98", "1e-20"]],
            "asks": [["1e400000", "1"], ["101", "2.5e3"]]
        });
        let (snapshot, report) = normalize_with_report(&raw);
        assert_eq!(
            snapshot.bids,
            vec![
                Order::new(dec("100"), dec("1")),
                Order::new(dec("98"), dec("1e-20")),
            ]
        );
        assert_eq!(snapshot.asks, vec![Order::new(dec("101"), dec("2500"))]);
        assert_eq!(report.skipped_bids, 1);
        assert_eq!(report.skipped_asks, 1);
    }

    #[test]
    fn null_side_counts_as_absent() {
        let raw = json!({"bids": null, "asks": [["101", "1"]]});
        let (snapshot, report) = normalize_with_report(&raw);
        assert!(snapshot.bids.is_empty());
        assert_eq!(snapshot.asks.len(), 1);
        assert!(report.is_clean());
    }

    #[test]
    fn non_array_side_is_empty_and_reported() {
        let raw = json!({
            "bids": {"price": "100", "size": "1"},
            "asks": [["101", "1"]]
        });
        let (snapshot, report) = normalize_with_report(&raw);
        assert!(snapshot.bids.is_empty());
        assert_eq!(snapshot.asks.len(), 1);
        assert_eq!(report.malformed_sides, vec![Side::Bid]);
        assert!(!report.is_clean());
    }

    #[test]
    fn absent_fields_default() {
        let (snapshot, report) = normalize_with_report(&json!({}));
        assert_eq!(snapshot, OrderBookSnapshot::default());
        assert_eq!(snapshot.bid_sum, "0");
        assert_eq!(snapshot.ask_sum, "0");
        assert!(report.is_clean());
    }

    #[test]
    fn non_object_payload_yields_empty_book() {
        let (snapshot, report) = normalize_with_report(&json!([1, 2, 3]));
        assert!(snapshot.is_empty());
        assert_eq!(report.malformed_sides, vec![Side::Bid, Side::Ask]);
    }

    #[test]
    fn sums_pass_through_verbatim() {
        let raw = json!({"bidSum": "0012.500", "askSum": 7.5});
        let snapshot = normalize(&raw);
        assert_eq!(snapshot.bid_sum, "0012.500");
        assert_eq!(snapshot.ask_sum, "7.5");
    }

    #[test]
    fn parse_snapshot_rejects_invalid_json_only() {
        assert!(parse_snapshot("{not json").is_err());
        let snapshot = parse_snapshot(r#"{"bids": 5}"#).expect("valid json");
        assert!(snapshot.bids.is_empty());
    }
}

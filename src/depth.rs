//! Cumulative liquidity-depth curve for charting.
//!
//! Every function here is a pure function of the two book sides and the
//! chosen mode.

use crate::models::{DepthCurve, DepthPoint, Order, OrderBookSnapshot};
use bigdecimal::BigDecimal;
use num_traits::Zero;

/// Limits used by the near-the-money view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthCaps {
    /// Cap on cumulative bid notional (`price × size`), in server units.
    pub notional_cap: BigDecimal,
    /// Cap on cumulative ask size.
    pub size_cap: BigDecimal,
}

impl Default for DepthCaps {
    fn default() -> Self {
        Self {
            notional_cap: BigDecimal::from(5),
            size_cap: BigDecimal::from(150),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DepthMode {
    /// Every level on both sides, accumulating raw size.
    #[default]
    Full,
    /// Bids accumulate notional up to `notional_cap`, asks accumulate size up
    /// to `size_cap`. The level crossing a cap is the last one kept.
    Capped(DepthCaps),
}

/// Stateless depth calculator bound to one mode.
#[derive(Debug, Clone, Default)]
pub struct DepthAggregator {
    mode: DepthMode,
}

impl DepthAggregator {
    pub fn new(mode: DepthMode) -> Self {
        Self { mode }
    }

    pub fn compute(&self, snapshot: &OrderBookSnapshot) -> DepthCurve {
        compute_depth(&snapshot.bids, &snapshot.asks, &self.mode)
    }
}

pub fn compute_depth(bids: &[Order], asks: &[Order], mode: &DepthMode) -> DepthCurve {
    match mode {
        DepthMode::Full => full_depth(bids, asks),
        DepthMode::Capped(caps) => capped_depth(bids, asks, caps),
    }
}

/// Cumulative size on both sides, merged and sorted ascending by price.
pub fn full_depth(bids: &[Order], asks: &[Order]) -> DepthCurve {
    let bid_points = accumulate(bids, |o| o.size.clone(), None, DepthPoint::bid);
    let ask_points = accumulate(asks, |o| o.size.clone(), None, DepthPoint::ask);
    merge_sorted(bid_points, ask_points)
}

/// Near-the-money curve: bids by cumulative notional, asks by cumulative
/// size, each truncated after the level that crosses its cap.
pub fn capped_depth(bids: &[Order], asks: &[Order], caps: &DepthCaps) -> DepthCurve {
    let bid_points = accumulate(
        bids,
        Order::notional,
        Some(&caps.notional_cap),
        DepthPoint::bid,
    );
    let ask_points = accumulate(
        asks,
        |o| o.size.clone(),
        Some(&caps.size_cap),
        DepthPoint::ask,
    );
    merge_sorted(bid_points, ask_points)
}

/// Walk one side best-to-worst keeping a running total of `weight`. With a
/// cap, the walk stops right after the first level whose total exceeds it.
fn accumulate<W, P>(
    side: &[Order],
    weight: W,
    cap: Option<&BigDecimal>,
    point: P,
) -> Vec<DepthPoint>
where
    W: Fn(&Order) -> BigDecimal,
    P: Fn(BigDecimal, BigDecimal) -> DepthPoint,
{
    let mut points = Vec::with_capacity(side.len());
    let mut running = BigDecimal::zero();
    for order in side {
        running = &running + &weight(order);
        points.push(point(order.price.clone(), running.clone()));
        if cap.is_some_and(|cap| running > *cap) {
            break;
        }
    }
    points
}

/// Bids first, then asks; the sort is stable so equal prices keep that order.
fn merge_sorted(bids: Vec<DepthPoint>, asks: Vec<DepthPoint>) -> DepthCurve {
    let mut curve = bids;
    curve.extend(asks);
    curve.sort_by(|a, b| a.price.cmp(&b.price));
    curve
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn orders(levels: &[(&str, &str)]) -> Vec<Order> {
        levels
            .iter()
            .map(|(p, s)| Order::new(dec(p), dec(s)))
            .collect()
    }

    fn triples(curve: &DepthCurve) -> Vec<(BigDecimal, BigDecimal, BigDecimal)> {
        curve
            .iter()
            .map(|p| {
                (
                    p.price.clone(),
                    p.cumulative_bid_volume.clone(),
                    p.cumulative_ask_volume.clone(),
                )
            })
            .collect()
    }

    #[test]
    fn full_depth_worked_example() {
        let bids = orders(&[("100", "1"), ("99", "2")]);
        let asks = orders(&[("101", "1"), ("102", "3")]);
        let curve = full_depth(&bids, &asks);
        assert_eq!(
            triples(&curve),
            vec![
                (dec("99"), dec("3"), dec("0")),
                (dec("100"), dec("1"), dec("0")),
                (dec("101"), dec("0"), dec("1")),
                (dec("102"), dec("0"), dec("4")),
            ]
        );
    }

    #[test]
    fn compute_is_idempotent() {
        let bids = orders(&[("100.25", "1.5"), ("100", "0.75"), ("99.5", "4")]);
        let asks = orders(&[("100.5", "2"), ("101", "0.125")]);
        let caps = DepthCaps::default();
        for mode in [DepthMode::Full, DepthMode::Capped(caps)] {
            let first = compute_depth(&bids, &asks, &mode);
            let second = compute_depth(&bids, &asks, &mode);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn cumulative_volume_is_monotone_per_side() {
        let bids = orders(&[("10", "1"), ("9", "0"), ("8", "2.5"), ("7", "3")]);
        let asks = orders(&[("11", "0.5"), ("12", "0"), ("13", "7")]);
        let curve = full_depth(&bids, &asks);

        // bids appear in descending traversal order when read right-to-left
        let bid_cum: Vec<_> = curve
            .iter()
            .filter(|p| p.price <= dec("10"))
            .rev()
            .map(|p| p.cumulative_bid_volume.clone())
            .collect();
        let ask_cum: Vec<_> = curve
            .iter()
            .filter(|p| p.price >= dec("11"))
            .map(|p| p.cumulative_ask_volume.clone())
            .collect();
        assert!(bid_cum.windows(2).all(|w| w[0] <= w[1]));
        assert!(ask_cum.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(bid_cum.last(), Some(&dec("6.5")));
        assert_eq!(ask_cum.last(), Some(&dec("7.5")));
    }

    #[test]
    fn points_carry_one_side_only() {
        let bids = orders(&[("100", "1")]);
        let asks = orders(&[("101", "2")]);
        for point in full_depth(&bids, &asks) {
            assert!(
                point.cumulative_bid_volume.is_zero() || point.cumulative_ask_volume.is_zero()
            );
        }
    }

    #[test]
    fn equal_prices_keep_bids_before_asks() {
        let bids = orders(&[("100", "1")]);
        let asks = orders(&[("100", "2")]);
        let curve = full_depth(&bids, &asks);
        assert_eq!(curve[0], DepthPoint::bid(dec("100"), dec("1")));
        assert_eq!(curve[1], DepthPoint::ask(dec("100"), dec("2")));
    }

    #[test]
    fn capped_bids_stop_after_crossing_level() {
        // notional: 2, 2+1.9=3.9, 3.9+1.8=5.7 (crosses 5), then excluded
        let bids = orders(&[("2", "1"), ("1.9", "1"), ("1.8", "1"), ("1.7", "1")]);
        let curve = capped_depth(&bids, &[], &DepthCaps::default());
        assert_eq!(
            triples(&curve),
            vec![
                (dec("1.8"), dec("5.7"), dec("0")),
                (dec("1.9"), dec("3.9"), dec("0")),
                (dec("2"), dec("2"), dec("0")),
            ]
        );
    }

    #[test]
    fn capped_total_equal_to_cap_does_not_stop() {
        let caps = DepthCaps {
            notional_cap: dec("5"),
            size_cap: dec("10"),
        };
        let bids = orders(&[("5", "1"), ("1", "1"), ("0.5", "1")]);
        let asks = orders(&[("11", "10"), ("12", "1"), ("13", "1")]);
        let curve = capped_depth(&bids, &asks, &caps);
        // bids: 5 (== cap, keep going), 6 (> cap, last kept)
        // asks: 10 (== cap, keep going), 11 (> cap, last kept)
        assert_eq!(curve.len(), 4);
        assert_eq!(curve.last(), Some(&DepthPoint::ask(dec("12"), dec("11"))));
    }

    #[test]
    fn capped_asks_use_raw_size() {
        let caps = DepthCaps {
            notional_cap: dec("1000000"),
            size_cap: dec("150"),
        };
        let asks = orders(&[("101", "100"), ("102", "60"), ("103", "1")]);
        let curve = capped_depth(&[], &asks, &caps);
        assert_eq!(
            curve,
            vec![
                DepthPoint::ask(dec("101"), dec("100")),
                DepthPoint::ask(dec("102"), dec("160")),
            ]
        );
    }

    #[test]
    fn empty_sides_give_empty_curve() {
        assert!(full_depth(&[], &[]).is_empty());
        assert!(capped_depth(&[], &[], &DepthCaps::default()).is_empty());
    }

    #[test]
    fn aggregator_uses_configured_mode() {
        let snapshot = OrderBookSnapshot {
            bids: orders(&[("3", "1"), ("2", "1"), ("1", "1")]),
            asks: orders(&[("4", "1")]),
            ..OrderBookSnapshot::default()
        };
        let full = DepthAggregator::default().compute(&snapshot);
        let capped =
            DepthAggregator::new(DepthMode::Capped(DepthCaps::default())).compute(&snapshot);
        assert_eq!(full.len(), 4);
        // notional 3, then 5 (not over), then 6 (over, kept)
        assert_eq!(capped.len(), 4);
        assert_eq!(capped[0], DepthPoint::bid(dec("1"), dec("6")));
    }
}

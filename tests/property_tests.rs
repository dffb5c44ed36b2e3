//! Property tests for the stats and trending invariants.
//!
//! 1. The all-time high is the true maximum and the average the unfiltered mean
//! 2. The all-time low never drops below the true minimum
//! 3. Shuffling input never changes stats, trending or movers

use chrono::{DateTime, Duration, TimeZone, Utc};
use lithos_prices::{
    compute_stats, compute_trending, filter_movers, Material, MaterialPrices, PricePoint,
    PriceUnit, TrendingPolicy,
};
use proptest::prelude::*;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn arb_price() -> impl Strategy<Value = f64> {
    (0.01..10_000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_history() -> impl Strategy<Value = Vec<(i64, f64)>> {
    prop::collection::vec((0i64..96, arb_price()), 0..12)
}

fn build(histories: &[Vec<(i64, f64)>]) -> Vec<MaterialPrices> {
    histories
        .iter()
        .enumerate()
        .map(|(i, history)| {
            let key = format!("material-{}", i);
            MaterialPrices {
                material: Material {
                    key: key.clone(),
                    name: key.clone(),
                    symbol: format!("M{}", i),
                    unit: PriceUnit::Gram,
                },
                points: history
                    .iter()
                    .map(|(hours_ago, price)| PricePoint {
                        material_key: key.clone(),
                        price_usd: *price,
                        unit: PriceUnit::Gram,
                        recorded_at: now() - Duration::hours(*hours_ago),
                        source: None,
                    })
                    .collect(),
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn high_is_max_and_average_is_mean(prices in prop::collection::vec(arb_price(), 1..200)) {
        let stats = compute_stats(&prices);
        let max = prices.iter().cloned().fold(f64::MIN, f64::max);
        let min = prices.iter().cloned().fold(f64::MAX, f64::min);
        let mean = prices.iter().sum::<f64>() / prices.len() as f64;

        prop_assert_eq!(stats.all_time_high, Some(max));
        prop_assert_eq!(stats.average, Some(mean));
        prop_assert!(stats.all_time_low.unwrap() >= min);
        prop_assert!(stats.all_time_low.unwrap() <= max);
    }

    #[test]
    fn stats_ignore_input_order(prices in prop::collection::vec(arb_price(), 1..100)) {
        let forward = compute_stats(&prices);
        let mut reversed = prices.clone();
        reversed.reverse();
        let backward = compute_stats(&reversed);

        prop_assert_eq!(forward.all_time_high, backward.all_time_high);
        prop_assert_eq!(forward.all_time_low, backward.all_time_low);
        let (a, b) = (forward.average.unwrap(), backward.average.unwrap());
        prop_assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0));
    }

    #[test]
    fn trending_and_movers_ignore_input_order(
        histories in prop::collection::vec(arb_history(), 0..10),
        threshold in 0.0..50.0_f64,
    ) {
        let materials = build(&histories);
        let policy = TrendingPolicy::default();
        let trending = compute_trending(&materials, now(), &policy);
        let movers = filter_movers(&materials, threshold, now());

        let mut shuffled = materials.clone();
        shuffled.reverse();
        for m in &mut shuffled {
            m.points.reverse();
        }
        prop_assert_eq!(compute_trending(&shuffled, now(), &policy), trending.clone());
        prop_assert_eq!(filter_movers(&shuffled, threshold, now()), movers);

        prop_assert!(trending.gainers.len() <= policy.top_n);
        prop_assert!(trending.losers.len() <= policy.top_n);
        prop_assert!(trending.gainers.iter().all(|g| g.change_24h_percent > 0.0));
        prop_assert!(trending.losers.iter().all(|l| l.change_24h_percent < 0.0));
        prop_assert!(trending
            .gainers
            .iter()
            .chain(&trending.losers)
            .all(|i| i.change_24h_percent.abs() <= policy.max_abs_change_percent));
    }
}

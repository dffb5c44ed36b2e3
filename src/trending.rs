use crate::stats::percent_change;
use crate::types::{MaterialPrices, Mover, PricePoint, TrendingItem, TrendingResult};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::cmp::Ordering;

/// Lookback for the 24h change.
pub const CHANGE_WINDOW_HOURS: i64 = 24;

/// Ranking policy for the trending widget.
#[derive(Debug, Clone, Deserialize)]
pub struct TrendingPolicy {
    /// Length of the gainers and losers lists.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Moves larger than this (in either direction) are treated as data
    /// artifacts and left out of the ranking.
    #[serde(default = "default_max_abs_change_percent")]
    pub max_abs_change_percent: f64,
}

fn default_top_n() -> usize {
    3
}

fn default_max_abs_change_percent() -> f64 {
    200.0
}

impl Default for TrendingPolicy {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            max_abs_change_percent: default_max_abs_change_percent(),
        }
    }
}

/// Current price and 24h change of one material's points.
///
/// The reference is the newest point strictly older than `now - 24h`. When
/// all history is inside the window the current price is its own
/// reference, giving 0%. Returns `None` when there are no points.
pub fn change_24h(points: &[PricePoint], now: DateTime<Utc>) -> Option<(f64, f64)> {
    let mut by_time: Vec<&PricePoint> = points.iter().collect();
    // Newest first; equal timestamps fall back to price so input order never matters.
    by_time.sort_by(|a, b| {
        b.recorded_at
            .cmp(&a.recorded_at)
            .then_with(|| b.price_usd.total_cmp(&a.price_usd))
    });

    let current = by_time.first()?.price_usd;
    let cutoff = now - Duration::hours(CHANGE_WINDOW_HOURS);
    let reference = by_time
        .iter()
        .find(|p| p.recorded_at < cutoff)
        .map(|p| p.price_usd)
        .unwrap_or(current);

    Some((current, percent_change(current, reference)))
}

/// Top gainers and losers over the last 24h.
///
/// Flat materials (exactly 0%, which includes those without a day of
/// history) and moves beyond `policy.max_abs_change_percent` are left out.
/// Losers are listed worst first.
pub fn compute_trending(
    materials: &[MaterialPrices],
    now: DateTime<Utc>,
    policy: &TrendingPolicy,
) -> TrendingResult {
    let mut ranked: Vec<TrendingItem> = materials
        .iter()
        .filter_map(|m| {
            let (current_price, change) = change_24h(&m.points, now)?;
            if change == 0.0 || change.abs() > policy.max_abs_change_percent {
                return None;
            }
            Some(TrendingItem {
                material_key: m.material.key.clone(),
                display_name: m.material.name.clone(),
                display_symbol: m.material.symbol.clone(),
                current_price,
                change_24h_percent: change,
                unit: m.material.unit,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.change_24h_percent
            .total_cmp(&a.change_24h_percent)
            .then_with(|| a.material_key.cmp(&b.material_key))
    });

    let gainers: Vec<TrendingItem> = ranked
        .iter()
        .filter(|item| item.change_24h_percent > 0.0)
        .take(policy.top_n)
        .cloned()
        .collect();

    let negatives: Vec<&TrendingItem> = ranked
        .iter()
        .filter(|item| item.change_24h_percent < 0.0)
        .collect();
    let start = negatives.len().saturating_sub(policy.top_n);
    let losers: Vec<TrendingItem> = negatives[start..]
        .iter()
        .rev()
        .map(|item| (*item).clone())
        .collect();

    tracing::debug!(
        "trending: {} of {} material(s) ranked, {} gainer(s), {} loser(s)",
        ranked.len(),
        materials.len(),
        gainers.len(),
        losers.len()
    );

    TrendingResult { gainers, losers }
}

/// Materials whose 24h move is larger than `threshold_percent` in either
/// direction, biggest move first.
///
/// Unlike [`compute_trending`] nothing is excluded as flat or as an artifact;
/// the threshold is the only filter.
pub fn filter_movers(
    materials: &[MaterialPrices],
    threshold_percent: f64,
    now: DateTime<Utc>,
) -> Vec<Mover> {
    let mut movers: Vec<Mover> = materials
        .iter()
        .filter_map(|m| {
            let (current_price, change) = change_24h(&m.points, now)?;
            (change.abs() > threshold_percent).then(|| Mover {
                material: m.material.clone(),
                current_price,
                change_24h: change,
            })
        })
        .collect();

    movers.sort_by(|a, b| match b.change_24h.abs().total_cmp(&a.change_24h.abs()) {
        Ordering::Equal => a.material.key.cmp(&b.material.key),
        other => other,
    });
    movers
}

use crate::types::StatsResult;

/// Percentile rank used for the all-time low. Scraped auction history
/// carries misclassified near-zero listings, so the low is read from this
/// rank instead of the true minimum. The high is never trimmed.
pub const LOW_PERCENTILE: f64 = 0.05;

/// All-time high, outlier-suppressed all-time low, and unfiltered mean over
/// the full price history of one material.
pub fn compute_stats(prices: &[f64]) -> StatsResult {
    if prices.is_empty() {
        return StatsResult::default();
    }

    let mut sorted = prices.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let low_idx = ((LOW_PERCENTILE * n as f64).floor() as usize).min(n - 1);

    StatsResult {
        all_time_high: Some(sorted[n - 1]),
        all_time_low: Some(sorted[low_idx]),
        average: Some(mean(prices)),
    }
}

/// `(new - old) / old * 100`; a non-positive `old` is a 0% change.
pub fn percent_change(new: f64, old: f64) -> f64 {
    if old > 0.0 {
        (new - old) / old * 100.0
    } else {
        0.0
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

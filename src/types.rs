use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit a USD price is quoted per.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceUnit {
    Gram,
    Kilogram,
}

impl Default for PriceUnit {
    fn default() -> Self {
        PriceUnit::Gram
    }
}

impl std::fmt::Display for PriceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            PriceUnit::Gram => "gram",
            PriceUnit::Kilogram => "kilogram",
        })
    }
}

/// One timestamped price observation as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub material_key: String,
    pub price_usd: f64,
    #[serde(default)]
    pub unit: PriceUnit,
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Catalog entry for a tracked material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub key: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub unit: PriceUnit,
}

/// A catalog entry joined with the price points fetched for it.
#[derive(Debug, Clone)]
pub struct MaterialPrices {
    pub material: Material,
    pub points: Vec<PricePoint>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatsResult {
    pub all_time_high: Option<f64>,
    pub all_time_low: Option<f64>,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingItem {
    pub material_key: String,
    pub display_name: String,
    pub display_symbol: String,
    pub current_price: f64,
    pub change_24h_percent: f64,
    pub unit: PriceUnit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendingResult {
    pub gainers: Vec<TrendingItem>,
    pub losers: Vec<TrendingItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mover {
    #[serde(flatten)]
    pub material: Material,
    pub current_price: f64,
    pub change_24h: f64,
}

/// Parse a stored `recorded_at` value.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` with or without an offset, and a
/// bare `YYYY-MM-DD` (read as midnight UTC).
pub fn parse_recorded_at(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("unrecognized timestamp '{}'", raw))?;
    Ok(date
        .and_hms_opt(0, 0, 0)
        .context("midnight out of range")?
        .and_utc())
}

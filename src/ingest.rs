//! Auction-listing exports to monthly price points.
//!
//! Listing CSVs are noisy: titles for unrelated items, duplicate relists,
//! prices with currency symbols, weights buried in the title. Rows are
//! filtered by title keywords, deduplicated, normalized to a USD price per
//! gram, then collapsed to one median point per material per month.

use crate::stats::median;
use crate::types::{PricePoint, PriceUnit};
use crate::units::grams_per;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

/// Monthly points above this price per gram are discarded as bad parses.
pub const MAX_PRICE_PER_GRAM: f64 = 50_000.0;

const DEDUP_TITLE_CHARS: usize = 60;

const SALE_DATE_FORMATS: [&str; 4] = ["%b %d, %Y", "%B %d, %Y", "%m/%d/%Y", "%Y-%m-%d"];

/// Tried in order; the first match wins.
static WEIGHT_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)(\d+\.?\d*)\s*g(?:rams?)?(?:\s|$|,)", "g"),
        (r"(?i)(\d+\.?\d*)-g(?:rams?)?", "g"),
        (r"(?i)(\d+\.?\d*)\s*gr\.?(?:\s|$)", "gr"),
        (r"(?i)(\d+\.?\d*)\s*cts?(?:\s|$)", "ct"),
        (r"(?i)(\d+\.?\d*)\s*carat", "carat"),
        (r"(?i)(\d+\.?\d*)\s*oz(?:\s|$)", "oz"),
        (r"(?i)(\d+\.?\d*)\s*kg(?:\s|$)", "kg"),
        (r"(?i)(\d+\.?\d*)\s*lbs?(?:\s|$)", "lb"),
    ]
    .into_iter()
    .filter_map(|(pattern, suffix)| match Regex::new(pattern) {
        Ok(re) => Some((re, suffix)),
        Err(e) => {
            warn!("invalid weight pattern '{}': {}", pattern, e);
            None
        }
    })
    .collect()
});

/// One row of a listing export.
///
/// Exports name the price and date columns inconsistently; `price` and
/// `date` are only read when the primary column is empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingRow {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price_usd: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub sale_date: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub weight_grams: Option<String>,
}

impl ListingRow {
    pub fn raw_price(&self) -> Option<&str> {
        first_filled(&self.price_usd, &self.price)
    }

    pub fn raw_sale_date(&self) -> Option<&str> {
        first_filled(&self.sale_date, &self.date)
    }
}

fn first_filled<'a>(
    primary: &'a Option<String>,
    fallback: &'a Option<String>,
) -> Option<&'a str> {
    [primary, fallback]
        .into_iter()
        .filter_map(|v| v.as_deref())
        .find(|v| !v.trim().is_empty())
}

/// Title keywords deciding whether a listing belongs to a material.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingFilter {
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ListingFilter {
    pub fn matches(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.include
            .iter()
            .any(|k| title.contains(&k.to_lowercase()))
            && !self
                .exclude
                .iter()
                .any(|k| title.contains(&k.to_lowercase()))
    }
}

/// A listing that survived filtering and parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub material_key: String,
    pub title: String,
    pub price_usd: f64,
    pub sale_date: Option<NaiveDate>,
    pub weight_grams: Option<f64>,
    pub price_per_gram: Option<f64>,
}

pub fn read_listings(path: &Path) -> Result<Vec<ListingRow>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: ListingRow = record.with_context(|| format!("parsing {}", path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Parse a listing price like `"$1,234.50"`. Only `0 < p < 1_000_000` is
/// accepted; the result is rounded to cents.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    let price: f64 = cleaned.parse().ok()?;
    if price > 0.0 && price < 1_000_000.0 {
        Some(round_to(price, 2))
    } else {
        None
    }
}

pub fn parse_sale_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    SALE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Weight in grams named in a listing title, if any.
pub fn extract_weight_grams(title: &str) -> Option<f64> {
    for (re, suffix) in WEIGHT_PATTERNS.iter() {
        let Some(caps) = re.captures(title) else {
            continue;
        };
        let (Some(value), Some(per)) = (
            caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()),
            grams_per(suffix),
        ) else {
            continue;
        };
        let weight = value * per;
        if weight > 0.01 && weight < 100_000.0 {
            return Some(round_to(weight, 3));
        }
    }
    None
}

/// Filter, deduplicate and parse the rows of one material.
///
/// `seen_titles` is shared across calls so a relist exported under two
/// materials is only counted once.
pub fn normalize_listings(
    material_key: &str,
    rows: &[ListingRow],
    filter: &ListingFilter,
    seen_titles: &mut HashSet<String>,
) -> Vec<Sale> {
    let mut sales = Vec::new();
    let mut dropped = 0usize;

    for row in rows {
        let lower = row.title.to_lowercase();
        if !filter.matches(&lower) {
            dropped += 1;
            continue;
        }
        let title_key: String = lower.chars().take(DEDUP_TITLE_CHARS).collect();
        if !seen_titles.insert(title_key) {
            dropped += 1;
            continue;
        }

        let Some(price_usd) = row.raw_price().and_then(parse_price) else {
            dropped += 1;
            continue;
        };
        let sale_date = row.raw_sale_date().and_then(parse_sale_date);
        let weight_grams = row
            .weight_grams
            .as_deref()
            .and_then(|w| w.trim().parse::<f64>().ok())
            .filter(|w| *w > 0.0)
            .or_else(|| extract_weight_grams(&row.title));
        let price_per_gram = weight_grams.map(|w| round_to(price_usd / w, 2));

        sales.push(Sale {
            material_key: material_key.to_string(),
            title: row.title.clone(),
            price_usd,
            sale_date,
            weight_grams,
            price_per_gram,
        });
    }

    info!(
        "{}: {} -> {} listing(s) ({} dropped)",
        material_key,
        rows.len(),
        sales.len(),
        dropped
    );
    sales
}

/// One point per material per month: the median price per gram of that
/// month's dated, weighed sales, recorded on the 15th.
pub fn monthly_medians(sales: &[Sale], max_price_per_gram: f64) -> Vec<PricePoint> {
    let mut grouped: BTreeMap<(String, i32, u32), Vec<f64>> = BTreeMap::new();
    for sale in sales {
        let (Some(date), Some(ppg)) = (sale.sale_date, sale.price_per_gram) else {
            continue;
        };
        if ppg <= 0.0 || ppg > max_price_per_gram {
            continue;
        }
        grouped
            .entry((sale.material_key.clone(), date.year(), date.month()))
            .or_default()
            .push(ppg);
    }

    grouped
        .into_iter()
        .filter_map(|((material_key, year, month), prices)| {
            let price = median(&prices)?;
            let recorded_at = NaiveDate::from_ymd_opt(year, month, 15)?
                .and_hms_opt(0, 0, 0)?
                .and_utc();
            Some(PricePoint {
                material_key,
                price_usd: round_to(price, 2),
                unit: PriceUnit::Gram,
                recorded_at,
                source: Some(format!("listings (n={})", prices.len())),
            })
        })
        .collect()
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(title: &str, price: &str, date: &str) -> ListingRow {
        ListingRow {
            title: title.to_string(),
            price_usd: Some(price.to_string()),
            sale_date: Some(date.to_string()),
            ..ListingRow::default()
        }
    }

    fn filter(include: &[&str], exclude: &[&str]) -> ListingFilter {
        ListingFilter {
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn prices_are_cleaned_and_bounded() {
        assert_eq!(parse_price("$1,234.567"), Some(1234.57));
        assert_eq!(parse_price(" 12 "), Some(12.0));
        assert_eq!(parse_price("0"), None);
        assert_eq!(parse_price("$1,000,000"), None);
        assert_eq!(parse_price("n/a"), None);
    }

    #[test]
    fn sale_dates_in_listing_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 7);
        assert_eq!(parse_sale_date("Mar 07, 2023"), expected);
        assert_eq!(parse_sale_date("March 7, 2023"), expected);
        assert_eq!(parse_sale_date("03/07/2023"), expected);
        assert_eq!(parse_sale_date("2023-03-07"), expected);
        assert_eq!(parse_sale_date("sometime"), None);
    }

    #[test]
    fn weights_from_titles() {
        assert_eq!(extract_weight_grams("Gibeon slice 12.5g nice"), Some(12.5));
        assert_eq!(extract_weight_grams("Osmium bead 3 grams"), Some(3.0));
        assert_eq!(extract_weight_grams("Moldavite 10-gram lot"), Some(10.0));
        assert_eq!(extract_weight_grams("Tektite 25 ct"), Some(5.0));
        assert_eq!(extract_weight_grams("Bismuth ingot 2 oz"), Some(56.7));
        assert_eq!(extract_weight_grams("Iron 1.5 kg"), Some(1500.0));
        assert_eq!(extract_weight_grams("Campo del Cielo 1 lb"), Some(453.6));
        assert_eq!(extract_weight_grams("pretty rock"), None);
    }

    #[test]
    fn price_and_date_fall_back_per_row() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "title,price,price_usd,date,sale_date").unwrap();
        writeln!(file, "Osmium bead 2g,$35,$40,,2024-01-03").unwrap();
        writeln!(file, "Osmium bead 4g,$80,,\"Jan 05, 2024\",").unwrap();
        writeln!(file, "Osmium bead 8g,,,,").unwrap();
        file.flush().unwrap();

        let rows = read_listings(file.path()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].raw_price(), Some("$40"));
        assert_eq!(rows[0].raw_sale_date(), Some("2024-01-03"));
        assert_eq!(rows[1].raw_price(), Some("$80"));
        assert_eq!(rows[2].raw_price(), None);

        let sales = normalize_listings(
            "osmium",
            &rows,
            &filter(&["osmium"], &[]),
            &mut HashSet::new(),
        );
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].price_usd, 40.0);
        assert_eq!(sales[1].price_usd, 80.0);
        assert_eq!(sales[1].sale_date, NaiveDate::from_ymd_opt(2024, 1, 5));
    }

    #[test]
    fn filter_needs_include_and_no_exclude() {
        let f = filter(&["trinitite"], &["red"]);
        assert!(f.matches("Trinitite fragment"));
        assert!(!f.matches("RED trinitite fragment"));
        assert!(!f.matches("fulgurite"));
    }

    #[test]
    fn normalize_dedupes_across_calls() {
        let rows = vec![
            row("Osmium bead 2g", "$40", "2024-01-03"),
            row("Osmium bead 2g", "$42", "2024-01-09"),
            row("Iridium bead 2g", "$50", "2024-01-09"),
            row("Osmium cube", "$90", "Jan 12, 2024"),
            row("Osmium crystal 1g", "free", "2024-01-12"),
        ];
        let mut seen = HashSet::new();
        let sales = normalize_listings("osmium", &rows, &filter(&["osmium"], &[]), &mut seen);
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].price_per_gram, Some(20.0));
        assert_eq!(sales[1].weight_grams, None);
        assert_eq!(sales[1].price_per_gram, None);

        let again = normalize_listings("osmium", &rows, &filter(&["osmium"], &[]), &mut seen);
        assert!(again.is_empty());
    }

    #[test]
    fn explicit_weight_column_wins_over_title() {
        let mut r = row("Gallium 100g", "$30", "2024-02-01");
        r.weight_grams = Some("50".to_string());
        let sales = normalize_listings(
            "gallium",
            &[r],
            &filter(&["gallium"], &[]),
            &mut HashSet::new(),
        );
        assert_eq!(sales[0].price_per_gram, Some(0.6));
    }

    #[test]
    fn monthly_medians_group_by_material_and_month() {
        let sale = |key: &str, date: (i32, u32, u32), ppg: Option<f64>| Sale {
            material_key: key.to_string(),
            title: String::new(),
            price_usd: 1.0,
            sale_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            weight_grams: None,
            price_per_gram: ppg,
        };
        let sales = vec![
            sale("osmium", (2024, 1, 3), Some(10.0)),
            sale("osmium", (2024, 1, 20), Some(30.0)),
            sale("osmium", (2024, 1, 25), Some(20.0)),
            sale("osmium", (2024, 2, 1), Some(12.0)),
            sale("osmium", (2024, 2, 2), Some(60_000.0)),
            sale("osmium", (2024, 2, 3), None),
            sale("iridium", (2024, 1, 5), Some(8.0)),
            sale("iridium", (2024, 1, 6), Some(9.0)),
        ];
        let points = monthly_medians(&sales, MAX_PRICE_PER_GRAM);
        assert_eq!(points.len(), 3);

        assert_eq!(points[0].material_key, "iridium");
        assert_eq!(points[0].price_usd, 8.5);
        assert_eq!(points[0].source.as_deref(), Some("listings (n=2)"));

        assert_eq!(points[1].material_key, "osmium");
        assert_eq!(points[1].price_usd, 20.0);
        assert_eq!(
            points[1].recorded_at,
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(points[2].price_usd, 12.0);
        assert_eq!(points[2].unit, PriceUnit::Gram);
    }
}

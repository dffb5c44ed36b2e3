use crate::types::{Material, Mover, StatsResult, TrendingItem, TrendingResult};
use anyhow::{Context, Result};
use serde::Serialize;

/// Stats for one material, as printed.
#[derive(Debug, Clone, Serialize)]
pub struct MaterialStats {
    #[serde(flatten)]
    pub material: Material,
    pub points: usize,
    #[serde(flatten)]
    pub stats: StatsResult,
}

fn price_cell(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "—".to_string())
}

pub fn print_stats_table(rows: &[MaterialStats]) {
    println!(
        "\n{:<28} {:<6} {:<9} {:>8} {:>14} {:>14} {:>14}",
        "Material", "Symbol", "Unit", "Points", "ATH (USD)", "ATL (USD)", "Average"
    );
    println!("{}", "-".repeat(99));
    for r in rows {
        println!(
            "{:<28} {:<6} {:<9} {:>8} {:>14} {:>14} {:>14}",
            r.material.name,
            r.material.symbol,
            r.material.unit,
            r.points,
            price_cell(r.stats.all_time_high),
            price_cell(r.stats.all_time_low),
            price_cell(r.stats.average),
        );
    }
    println!();
}

fn print_trending_section(title: &str, items: &[TrendingItem]) {
    println!("\n{}", title);
    println!("{}", "-".repeat(72));
    if items.is_empty() {
        println!("  (none)");
        return;
    }
    for item in items {
        println!(
            "{:<28} {:<6} {:>14.2} /{:<9} {:>+9.2}%",
            item.display_name,
            item.display_symbol,
            item.current_price,
            item.unit,
            item.change_24h_percent
        );
    }
}

pub fn print_trending_table(result: &TrendingResult) {
    print_trending_section("Top gainers (24h)", &result.gainers);
    print_trending_section("Top losers (24h)", &result.losers);
    println!();
}

pub fn print_movers_table(movers: &[Mover], threshold_percent: f64) {
    println!("\nMovers beyond ±{:.2}% (24h)", threshold_percent);
    println!("{}", "-".repeat(72));
    if movers.is_empty() {
        println!("  (none)");
    }
    for m in movers {
        println!(
            "{:<28} {:<6} {:>14.2} /{:<9} {:>+9.2}%",
            m.material.name, m.material.symbol, m.current_price, m.material.unit, m.change_24h
        );
    }
    println!();
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{}", json);
    Ok(())
}

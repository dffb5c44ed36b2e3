use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use lithos_prices::config::Config;
use lithos_prices::ingest;
use lithos_prices::output::{self, MaterialStats};
use lithos_prices::sources::{self, file::write_json_points};
use lithos_prices::{compute_stats, compute_trending, filter_movers};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "lithos-prices",
    about = "All-time stats, 24h trending and movers for tracked materials"
)]
struct Args {
    /// Path to config YAML file
    #[arg(short, long, global = true, default_value = "config.yaml")]
    config: PathBuf,

    /// Output format: "table" (default) or "json"
    #[arg(short, long, global = true, default_value = "table")]
    output: String,

    /// Evaluate the 24h window as of this RFC 3339 instant instead of now
    #[arg(long, global = true, env = "LITHOS_NOW")]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// All-time high, low and average over full history
    Stats {
        /// Only report this material key
        #[arg(short, long)]
        material: Option<String>,
    },
    /// Top gainers and losers over the last 24h
    Trending,
    /// Materials that moved more than a threshold over the last 24h
    Movers {
        /// Absolute percentage change to exceed (defaults to movers.threshold_percent)
        #[arg(short, long, allow_negative_numbers = true)]
        threshold: Option<f64>,
    },
    /// Turn listing CSV exports into monthly price points
    Import {
        /// Material key the listings belong to
        #[arg(short, long)]
        material: String,

        /// Write the resulting points to this JSON file instead of the
        /// configured store (required for json and csv stores)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Listing CSV files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let cfg = Config::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    info!("Loaded {} material(s) from config", cfg.materials.len());

    let now = args.now.unwrap_or_else(Utc::now);
    let json = args.output == "json";

    match args.command {
        Command::Stats { material } => {
            let catalog: Vec<_> = cfg
                .catalog()
                .into_iter()
                .filter(|m| material.as_deref().map_or(true, |k| m.key == k))
                .collect();
            if catalog.is_empty() {
                anyhow::bail!("no material matches '{}'", material.unwrap_or_default());
            }

            let store = cfg.open_store()?;
            // Stats read unbounded history, never the recent window.
            let joined = sources::fetch_catalog_prices(store.as_ref(), &catalog, None).await;
            let rows: Vec<MaterialStats> = joined
                .into_iter()
                .map(|m| {
                    let prices: Vec<f64> = m.points.iter().map(|p| p.price_usd).collect();
                    MaterialStats {
                        stats: compute_stats(&prices),
                        points: prices.len(),
                        material: m.material,
                    }
                })
                .collect();

            if json {
                output::print_json(&rows)?;
            } else {
                output::print_stats_table(&rows);
            }
        }
        Command::Trending => {
            let store = cfg.open_store()?;
            let joined = sources::fetch_catalog_prices(
                store.as_ref(),
                &cfg.catalog(),
                Some(cfg.trending.recent_limit),
            )
            .await;
            let result = compute_trending(&joined, now, &cfg.trending.policy);
            info!(
                "{} gainer(s), {} loser(s) as of {}",
                result.gainers.len(),
                result.losers.len(),
                now
            );

            if json {
                output::print_json(&result)?;
            } else {
                output::print_trending_table(&result);
            }
        }
        Command::Movers { threshold } => {
            let threshold = threshold.unwrap_or(cfg.movers.threshold_percent);
            let store = cfg.open_store()?;
            let joined = sources::fetch_catalog_prices(
                store.as_ref(),
                &cfg.catalog(),
                Some(cfg.trending.recent_limit),
            )
            .await;
            let movers = filter_movers(&joined, threshold, now);

            if json {
                output::print_json(&movers)?;
            } else {
                output::print_movers_table(&movers, threshold);
            }
        }
        Command::Import {
            material,
            out,
            inputs,
        } => {
            let material_cfg = cfg
                .material(&material)
                .with_context(|| format!("unknown material '{}'", material))?;
            let filter = material_cfg.listing.as_ref().with_context(|| {
                format!("material '{}' has no listing filter configured", material)
            })?;

            let mut seen_titles = HashSet::new();
            let mut sales = Vec::new();
            for input in &inputs {
                let rows = ingest::read_listings(input)?;
                info!("{}: {} row(s)", input.display(), rows.len());
                sales.extend(ingest::normalize_listings(
                    &material,
                    &rows,
                    filter,
                    &mut seen_titles,
                ));
            }

            let weighed = sales.iter().filter(|s| s.price_per_gram.is_some()).count();
            info!("{} sale(s), {} with a weight", sales.len(), weighed);

            let mut points = ingest::monthly_medians(&sales, ingest::MAX_PRICE_PER_GRAM);
            for p in &mut points {
                p.price_usd = p.unit.convert_price(p.price_usd, material_cfg.unit);
                p.unit = material_cfg.unit;
            }
            match (out, cfg.open_rest_store()?) {
                (Some(out), _) => {
                    write_json_points(&out, &points)?;
                    println!(
                        "Wrote {} monthly point(s) for {} to {}",
                        points.len(),
                        material,
                        out.display()
                    );
                }
                (None, Some(store)) => {
                    info!("Inserting {} monthly point(s) into the price store", points.len());
                    let report = store.insert(&points).await;
                    println!(
                        "Inserted {} monthly point(s) for {}, {} error(s)",
                        report.inserted, material, report.errors
                    );
                    if report.errors > 0 {
                        anyhow::bail!("{} point(s) were rejected by the price store", report.errors);
                    }
                }
                (None, None) => {
                    anyhow::bail!("--out is required when the configured store is a local file")
                }
            }
        }
    }

    Ok(())
}

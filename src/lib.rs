//! Price statistics and trending for strategic metals, rare earths and
//! scientific collectibles.
//!
//! [`stats`] and [`trending`] are pure functions over in-memory price
//! points. [`sources`] provides the stores they are fed from, [`ingest`]
//! turns auction-listing exports into monthly points.

pub mod config;
pub mod ingest;
pub mod output;
pub mod sources;
pub mod stats;
pub mod trending;
pub mod types;
pub mod units;

pub use stats::compute_stats;
pub use trending::{compute_trending, filter_movers, TrendingPolicy};
pub use types::{
    Material, MaterialPrices, Mover, PricePoint, PriceUnit, StatsResult, TrendingItem,
    TrendingResult,
};

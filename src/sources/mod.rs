pub mod file;
pub mod memory;
pub mod rest;

use crate::types::{Material, MaterialPrices, PricePoint};
use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

/// Where price points come from.
#[async_trait]
pub trait PriceStore: Send + Sync {
    fn name(&self) -> &str;

    /// Every stored point for the material, in no particular order.
    async fn history(&self, material_key: &str) -> Result<Vec<PricePoint>>;

    /// At most `limit` points, newest first.
    async fn recent(&self, material_key: &str, limit: usize) -> Result<Vec<PricePoint>>;
}

/// Join the catalog with the store.
///
/// `recent_limit` of `None` fetches unbounded history. Points are re-quoted
/// in the catalog unit of their material. A material whose fetch fails is
/// logged and returned with no points.
pub async fn fetch_catalog_prices(
    store: &dyn PriceStore,
    catalog: &[Material],
    recent_limit: Option<usize>,
) -> Vec<MaterialPrices> {
    let mut joined = Vec::with_capacity(catalog.len());
    for material in catalog {
        let result = match recent_limit {
            Some(limit) => store.recent(&material.key, limit).await,
            None => store.history(&material.key).await,
        };
        let points = match result {
            Ok(points) => {
                info!(
                    "  [{}] {}: {} point(s)",
                    store.name(),
                    material.key,
                    points.len()
                );
                points
                    .into_iter()
                    .map(|mut p| {
                        p.price_usd = p.unit.convert_price(p.price_usd, material.unit);
                        p.unit = material.unit;
                        p
                    })
                    .collect()
            }
            Err(e) => {
                warn!("  [{}] {} failed: {:#}", store.name(), material.key, e);
                Vec::new()
            }
        };
        joined.push(MaterialPrices {
            material: material.clone(),
            points,
        });
    }
    joined
}

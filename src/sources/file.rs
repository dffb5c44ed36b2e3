use super::memory::MemoryStore;
use crate::types::PricePoint;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Load a JSON array of price points.
pub fn load_json_store(path: &Path) -> Result<MemoryStore> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let points: Vec<PricePoint> =
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    Ok(into_store(path, points))
}

/// Load a CSV of price points with a
/// `material_key,price_usd,unit,recorded_at,source` header.
pub fn load_csv_store(path: &Path) -> Result<MemoryStore> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut points = Vec::new();
    for (line, record) in reader.deserialize().enumerate() {
        let point: PricePoint = record
            .with_context(|| format!("parsing {} record {}", path.display(), line + 1))?;
        points.push(point);
    }
    Ok(into_store(path, points))
}

/// Write price points as a pretty JSON array, the format [`load_json_store`] reads.
pub fn write_json_points(path: &Path, points: &[PricePoint]) -> Result<()> {
    let json = serde_json::to_string_pretty(points).context("serializing price points")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn into_store(path: &Path, points: Vec<PricePoint>) -> MemoryStore {
    info!("Loaded {} price point(s) from {}", points.len(), path.display());
    let mut store = MemoryStore::new(path.display().to_string());
    store.extend(points);
    store
}

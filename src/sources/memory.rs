use super::PriceStore;
use crate::types::PricePoint;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Points held in memory, keyed by material.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    name: String,
    points: HashMap<String, Vec<PricePoint>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: HashMap::new(),
        }
    }

    pub fn from_points(points: Vec<PricePoint>) -> Self {
        let mut store = Self::new("memory");
        store.extend(points);
        store
    }

    pub fn extend(&mut self, points: impl IntoIterator<Item = PricePoint>) {
        for point in points {
            self.points
                .entry(point.material_key.clone())
                .or_default()
                .push(point);
        }
    }

    pub fn len(&self) -> usize {
        self.points.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PriceStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn history(&self, material_key: &str) -> Result<Vec<PricePoint>> {
        Ok(self.points.get(material_key).cloned().unwrap_or_default())
    }

    async fn recent(&self, material_key: &str, limit: usize) -> Result<Vec<PricePoint>> {
        let mut points = self.history(material_key).await?;
        // Same timestamp: higher price first, so the cut never depends on insertion order.
        points.sort_by(|a, b| {
            b.recorded_at
                .cmp(&a.recorded_at)
                .then_with(|| b.price_usd.total_cmp(&a.price_usd))
        });
        points.truncate(limit);
        Ok(points)
    }
}

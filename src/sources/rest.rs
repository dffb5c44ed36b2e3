use super::PriceStore;
use crate::types::{parse_recorded_at, PricePoint, PriceUnit};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const PAGE_SIZE: usize = 1000;
/// Rows per insert request.
pub const INSERT_BATCH_SIZE: usize = 100;
const COLUMNS: &str = "material_slug,price_usd,price_per,recorded_at,source";

/// Price table exposed over a PostgREST-style HTTP API.
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    table: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    material_slug: String,
    price_usd: f64,
    #[serde(default)]
    price_per: Option<PriceUnit>,
    recorded_at: String,
    #[serde(default)]
    source: Option<String>,
}

/// Row shape written to the price table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPriceRow {
    pub material_slug: String,
    pub price_usd: f64,
    pub price_per: PriceUnit,
    pub recorded_at: String,
    pub source: Option<String>,
}

impl From<&PricePoint> for NewPriceRow {
    fn from(p: &PricePoint) -> Self {
        Self {
            material_slug: p.material_key.clone(),
            price_usd: p.price_usd,
            price_per: p.unit,
            recorded_at: p.recorded_at.to_rfc3339(),
            source: p.source.clone(),
        }
    }
}

/// Destination accepting rows in one request.
#[async_trait]
pub trait RowSink: Send + Sync {
    async fn post_rows(&self, rows: &[NewPriceRow]) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertReport {
    pub inserted: usize,
    pub errors: usize,
}

/// Post `points` in batches of `batch_size`. A failed batch is retried one
/// row at a time and rows that still fail are counted as errors.
pub async fn insert_in_batches(
    sink: &dyn RowSink,
    points: &[PricePoint],
    batch_size: usize,
) -> InsertReport {
    let rows: Vec<NewPriceRow> = points.iter().map(NewPriceRow::from).collect();
    let mut report = InsertReport::default();

    for (i, batch) in rows.chunks(batch_size.max(1)).enumerate() {
        match sink.post_rows(batch).await {
            Ok(()) => {
                report.inserted += batch.len();
                info!("  Inserted batch {}: {} record(s)", i + 1, batch.len());
            }
            Err(e) => {
                warn!("  batch {} failed, retrying row by row: {:#}", i + 1, e);
                for row in batch {
                    match sink.post_rows(std::slice::from_ref(row)).await {
                        Ok(()) => report.inserted += 1,
                        Err(e) => {
                            report.errors += 1;
                            warn!(
                                "  {} at {} rejected: {:#}",
                                row.material_slug, row.recorded_at, e
                            );
                        }
                    }
                }
            }
        }
    }
    report
}

impl PriceRow {
    fn into_point(self) -> Option<PricePoint> {
        match parse_recorded_at(&self.recorded_at) {
            Ok(recorded_at) => Some(PricePoint {
                material_key: self.material_slug,
                price_usd: self.price_usd,
                unit: self.price_per.unwrap_or_default(),
                recorded_at,
                source: self.source,
            }),
            Err(e) => {
                warn!(
                    "dropping {} row with bad recorded_at: {:#}",
                    self.material_slug, e
                );
                None
            }
        }
    }
}

impl RestStore {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        table: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            table: table.into(),
            api_key,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    /// Append price points to the table.
    pub async fn insert(&self, points: &[PricePoint]) -> InsertReport {
        insert_in_batches(self, points, INSERT_BATCH_SIZE).await
    }

    async fn fetch_page(
        &self,
        material_key: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PricePoint>> {
        let mut req = self
            .client
            .get(self.table_url())
            .query(&[
                ("select", COLUMNS.to_string()),
                ("material_slug", format!("eq.{}", material_key)),
                ("order", "recorded_at.desc,price_usd.desc".to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ])
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            req = req.header("apikey", key).bearer_auth(key);
        }

        let resp = req.send().await.context("price store request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("price store HTTP {}: {}", status, body);
        }

        let rows: Vec<PriceRow> = resp.json().await.context("price store parse failed")?;
        Ok(rows.into_iter().filter_map(PriceRow::into_point).collect())
    }
}

#[async_trait]
impl RowSink for RestStore {
    async fn post_rows(&self, rows: &[NewPriceRow]) -> Result<()> {
        let mut req = self
            .client
            .post(self.table_url())
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(rows);
        if let Some(key) = &self.api_key {
            req = req.header("apikey", key).bearer_auth(key);
        }

        let resp = req.send().await.context("price store insert failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("price store HTTP {}: {}", status, body);
        }
        Ok(())
    }
}

#[async_trait]
impl PriceStore for RestStore {
    fn name(&self) -> &str {
        "rest"
    }

    async fn history(&self, material_key: &str) -> Result<Vec<PricePoint>> {
        let mut all = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.fetch_page(material_key, PAGE_SIZE, offset).await?;
            let fetched = page.len();
            all.extend(page);
            if fetched < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }
        Ok(all)
    }

    async fn recent(&self, material_key: &str, limit: usize) -> Result<Vec<PricePoint>> {
        self.fetch_page(material_key, limit, 0).await
    }
}

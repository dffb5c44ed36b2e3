use crate::ingest::ListingFilter;
use crate::sources::file::{load_csv_store, load_json_store};
use crate::sources::rest::RestStore;
use crate::sources::PriceStore;
use crate::trending::TrendingPolicy;
use crate::types::{Material, PriceUnit};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub trending: TrendingConfig,
    #[serde(default)]
    pub movers: MoversConfig,
    pub materials: Vec<MaterialConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Json {
        path: PathBuf,
    },
    Csv {
        path: PathBuf,
    },
    Rest {
        url: String,
        #[serde(default = "default_table")]
        table: String,
        /// Name of the environment variable holding the API key.
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
    },
}

fn default_table() -> String {
    "lithos_prices".to_string()
}

fn default_api_key_env() -> String {
    "PRICE_STORE_API_KEY".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendingConfig {
    #[serde(flatten)]
    pub policy: TrendingPolicy,
    /// Points fetched per material for the 24h change.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_recent_limit() -> usize {
    20
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            policy: TrendingPolicy::default(),
            recent_limit: default_recent_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoversConfig {
    #[serde(default = "default_threshold_percent")]
    pub threshold_percent: f64,
}

fn default_threshold_percent() -> f64 {
    5.0
}

impl Default for MoversConfig {
    fn default() -> Self {
        Self {
            threshold_percent: default_threshold_percent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialConfig {
    pub key: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub unit: PriceUnit,
    /// Title keywords used when importing listing exports.
    #[serde(default)]
    pub listing: Option<ListingFilter>,
}

impl MaterialConfig {
    pub fn to_material(&self) -> Material {
        Material {
            key: self.key.clone(),
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            unit: self.unit,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let policy = &self.trending.policy;
        if policy.top_n == 0 {
            anyhow::bail!("trending.top_n must be at least 1");
        }
        if !(policy.max_abs_change_percent > 0.0) {
            anyhow::bail!(
                "trending.max_abs_change_percent must be positive, got {}",
                policy.max_abs_change_percent
            );
        }
        if !(self.movers.threshold_percent >= 0.0) {
            anyhow::bail!(
                "movers.threshold_percent must not be negative, got {}",
                self.movers.threshold_percent
            );
        }

        let mut seen: HashMap<&str, &str> = HashMap::new();
        for m in &self.materials {
            if m.key.trim().is_empty() {
                anyhow::bail!("material '{}' has an empty key", m.name);
            }
            if let Some(prev) = seen.insert(m.key.as_str(), m.name.as_str()) {
                anyhow::bail!(
                    "duplicate material key '{}': '{}' and '{}'",
                    m.key,
                    prev,
                    m.name
                );
            }
            if let Some(listing) = &m.listing {
                if listing.include.iter().all(|k| k.trim().is_empty()) {
                    anyhow::bail!(
                        "material '{}' listing filter needs at least one include keyword",
                        m.key
                    );
                }
            }
        }
        Ok(())
    }

    pub fn catalog(&self) -> Vec<Material> {
        self.materials.iter().map(MaterialConfig::to_material).collect()
    }

    pub fn material(&self, key: &str) -> Option<&MaterialConfig> {
        self.materials.iter().find(|m| m.key == key)
    }

    /// Build the configured price store.
    pub fn open_store(&self) -> Result<Box<dyn PriceStore>> {
        match &self.store {
            StoreConfig::Json { path } => Ok(Box::new(load_json_store(path)?)),
            StoreConfig::Csv { path } => Ok(Box::new(load_csv_store(path)?)),
            StoreConfig::Rest { .. } => match self.open_rest_store()? {
                Some(store) => Ok(Box::new(store)),
                None => anyhow::bail!("store is not a rest store"),
            },
        }
    }

    /// The writable HTTP store, when one is configured.
    pub fn open_rest_store(&self) -> Result<Option<RestStore>> {
        let StoreConfig::Rest {
            url,
            table,
            api_key_env,
        } = &self.store
        else {
            return Ok(None);
        };
        let api_key = std::env::var(api_key_env).ok();
        if api_key.is_none() {
            tracing::warn!("{} not set; querying price store anonymously", api_key_env);
        }
        let client = reqwest::Client::builder()
            .user_agent("lithos-prices/0.1")
            .build()
            .context("building HTTP client")?;
        Ok(Some(RestStore::new(client, url.clone(), table.clone(), api_key)))
    }
}

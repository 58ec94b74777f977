//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Refresh and cache behavior settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Snapshot and data file locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Upstream catalog endpoint settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Brands refreshed on every cycle
    #[serde(default = "defaults::default_brands")]
    pub brands: Vec<BrandInfo>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.cache.ttl_hours == 0 {
            return Err(AppError::validation("cache.ttl_hours must be > 0"));
        }
        if self.cache.inspiration_cap == 0 {
            return Err(AppError::validation("cache.inspiration_cap must be > 0"));
        }
        if self.cache.fetch_limit == 0 {
            return Err(AppError::validation("cache.fetch_limit must be > 0"));
        }
        if self.cache.overflow_bucket.trim().is_empty() {
            return Err(AppError::validation("cache.overflow_bucket is empty"));
        }
        if self.catalog.timeout_secs == 0 {
            return Err(AppError::validation("catalog.timeout_secs must be > 0"));
        }
        if self.catalog.page_size == 0 {
            return Err(AppError::validation("catalog.page_size must be > 0"));
        }
        if self.catalog.user_agent.trim().is_empty() {
            return Err(AppError::validation("catalog.user_agent is empty"));
        }
        url::Url::parse(&self.catalog.base_url)?;

        if self.brands.is_empty() {
            return Err(AppError::validation("No brands defined"));
        }
        let mut seen = HashSet::new();
        for brand in &self.brands {
            if brand.id.trim().is_empty() {
                return Err(AppError::validation("brand id is empty"));
            }
            if brand.id != brand.id.to_lowercase() {
                return Err(AppError::validation(format!(
                    "brand id '{}' must be lowercase",
                    brand.id
                )));
            }
            if !seen.insert(brand.id.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate brand id '{}'",
                    brand.id
                )));
            }
        }
        Ok(())
    }

    /// Look up a configured brand by id.
    pub fn brand(&self, id: &str) -> Option<&BrandInfo> {
        self.brands.iter().find(|b| b.id == id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            paths: PathsConfig::default(),
            catalog: CatalogConfig::default(),
            logging: LoggingConfig::default(),
            brands: defaults::default_brands(),
        }
    }
}

/// Refresh schedule and cache sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Snapshot time-to-live, also the refresh period
    #[serde(default = "defaults::ttl_hours")]
    pub ttl_hours: u64,

    /// Minimum gap between two upstream calls in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum products kept per inspiration
    #[serde(default = "defaults::inspiration_cap")]
    pub inspiration_cap: usize,

    /// Maximum products requested per brand
    #[serde(default = "defaults::fetch_limit")]
    pub fetch_limit: usize,

    /// Bucket collecting items whose brand label did not match
    #[serde(default = "defaults::overflow_bucket")]
    pub overflow_bucket: String,

    /// Overflow size above which each merge logs a warning
    #[serde(default = "defaults::overflow_warn_size")]
    pub overflow_warn_size: usize,
}

impl CacheConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.ttl_hours as i64)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: defaults::ttl_hours(),
            request_delay_ms: defaults::request_delay(),
            inspiration_cap: defaults::inspiration_cap(),
            fetch_limit: defaults::fetch_limit(),
            overflow_bucket: defaults::overflow_bucket(),
            overflow_warn_size: defaults::overflow_warn_size(),
        }
    }
}

/// File locations. Everything lives under `snapshot_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::snapshot_dir")]
    pub snapshot_dir: String,

    #[serde(default = "defaults::products_file")]
    pub products_file: String,

    #[serde(default = "defaults::inspirations_file")]
    pub inspirations_file: String,

    /// Inspiration definition table (TOML)
    #[serde(default = "defaults::inspiration_table")]
    pub inspiration_table: String,
}

impl PathsConfig {
    pub fn products_path(&self) -> PathBuf {
        Path::new(&self.snapshot_dir).join(&self.products_file)
    }

    pub fn inspirations_path(&self) -> PathBuf {
        Path::new(&self.snapshot_dir).join(&self.inspirations_file)
    }

    pub fn inspiration_table_path(&self) -> PathBuf {
        Path::new(&self.snapshot_dir).join(&self.inspiration_table)
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: defaults::snapshot_dir(),
            products_file: defaults::products_file(),
            inspirations_file: defaults::inspirations_file(),
            inspiration_table: defaults::inspiration_table(),
        }
    }
}

/// Upstream catalog HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Items requested per page
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_size: defaults::page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// A configured brand bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrandInfo {
    /// Bucket key (lowercase)
    pub id: String,

    /// Name the upstream catalog uses for this brand
    pub display_name: String,

    /// Search term sent upstream; defaults to the display name
    #[serde(default)]
    pub search_term: Option<String>,
}

impl BrandInfo {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            search_term: None,
        }
    }

    pub fn search_term(&self) -> &str {
        self.search_term.as_deref().unwrap_or(&self.display_name)
    }

    /// Case-insensitive match of an upstream brand label against the key or display name.
    pub fn matches_label(&self, label: &str) -> bool {
        let label = label.trim().to_lowercase();
        label == self.id.to_lowercase() || label == self.display_name.to_lowercase()
    }
}

mod defaults {
    use super::BrandInfo;

    // Cache defaults
    pub fn ttl_hours() -> u64 {
        72
    }
    pub fn request_delay() -> u64 {
        300
    }
    pub fn inspiration_cap() -> usize {
        30
    }
    pub fn fetch_limit() -> usize {
        200
    }
    pub fn overflow_bucket() -> String {
        "amazon".into()
    }
    pub fn overflow_warn_size() -> usize {
        5000
    }

    // Path defaults
    pub fn snapshot_dir() -> String {
        "storage".into()
    }
    pub fn products_file() -> String {
        "products.json".into()
    }
    pub fn inspirations_file() -> String {
        "inspirations.json".into()
    }
    pub fn inspiration_table() -> String {
        "inspirations.toml".into()
    }

    // Catalog defaults
    pub fn base_url() -> String {
        "http://localhost:8080/api".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; catalog-cache/0.1)".into()
    }
    pub fn timeout() -> u64 {
        20
    }
    pub fn page_size() -> usize {
        50
    }

    pub fn log_level() -> String {
        "info".into()
    }

    // Brand defaults
    pub fn default_brands() -> Vec<BrandInfo> {
        vec![
            BrandInfo::new("adidas", "Adidas"),
            BrandInfo::new("hm", "H&M"),
            BrandInfo::new("lego", "LEGO"),
            BrandInfo::new("nike", "Nike"),
            BrandInfo::new("sephora", "Sephora"),
            BrandInfo::new("uniqlo", "Uniqlo"),
            BrandInfo::new("zara", "Zara"),
        ]
    }
}

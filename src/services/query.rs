// src/services/query.rs

//! Read-side query surface over the cache.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cache::CacheStore;
use crate::models::{InspirationEntry, Product, SnapshotKind};
use crate::pipeline::CatalogRefresher;

/// Products for one brand plus whether they are within TTL.
#[derive(Debug, Clone)]
pub struct BrandListing {
    pub products: Arc<Vec<Product>>,
    pub fresh: bool,
}

/// An inspiration read with the index's freshness.
#[derive(Debug, Clone)]
pub struct InspirationView {
    pub entry: Arc<InspirationEntry>,
    pub fresh: bool,
}

#[derive(Debug, Clone)]
pub struct InspirationListing {
    pub entries: Vec<Arc<InspirationEntry>>,
    pub fresh: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Answers catalog queries. Only `get_brand_products` may reach upstream.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<CacheStore>,
    refresher: Arc<CatalogRefresher>,
}

impl CatalogService {
    pub fn new(refresher: Arc<CatalogRefresher>) -> Self {
        Self {
            store: Arc::clone(refresher.store()),
            refresher,
        }
    }

    pub async fn get_brand_products(&self, brand: &str) -> BrandListing {
        self.get_brand_products_at(brand, Utc::now()).await
    }

    /// Cached bucket if fresh, otherwise an on-demand refresh. A failed
    /// refresh falls back to whatever is cached, then to an empty list.
    /// A refresh that finds the bucket fresh after waiting for a running
    /// cycle does not fetch again.
    pub async fn get_brand_products_at(&self, brand: &str, now: DateTime<Utc>) -> BrandListing {
        if self.store.is_bucket_fresh(brand, now) {
            if let Some(products) = self.store.get_bucket(brand) {
                return BrandListing {
                    products,
                    fresh: true,
                };
            }
        }

        let fresh = match self.refresher.refresh_brand_if_stale(brand, now).await {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Serving cached {} after refresh failure: {}", brand, e);
                false
            }
        };

        BrandListing {
            products: self.store.get_bucket(brand).unwrap_or_default(),
            fresh,
        }
    }

    /// Strict read; `None` if the bucket was never populated.
    pub fn get_cached_only(&self, brand: &str) -> Option<Arc<Vec<Product>>> {
        self.store.get_bucket(brand)
    }

    pub fn get_inspiration(&self, id: &str) -> Option<InspirationView> {
        let entry = self.store.get_inspiration(id)?;
        Some(InspirationView {
            entry,
            fresh: self.store.is_fresh(SnapshotKind::Inspirations, Utc::now()),
        })
    }

    pub fn list_inspirations(&self) -> InspirationListing {
        InspirationListing {
            entries: self.store.inspirations(),
            fresh: self.store.is_fresh(SnapshotKind::Inspirations, Utc::now()),
            expires_at: self.store.expires_at(SnapshotKind::Inspirations),
        }
    }
}

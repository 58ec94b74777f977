//! In-memory product and inspiration caches.
//!
//! Each map sits behind its own `RwLock`. Buckets are stored as `Arc<Vec<_>>`
//! so a reader clones a pointer under the shared lock and a writer swaps a
//! whole bucket under the exclusive lock; a reader never sees half a bucket.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};

use crate::models::{
    CacheSnapshot, InspirationEntry, InspirationSnapshot, Product, SnapshotKind,
};

#[derive(Debug, Default)]
struct ProductState {
    buckets: HashMap<String, Arc<Vec<Product>>>,
    last_updated: Option<DateTime<Utc>>,
    /// On-demand refresh times, never persisted
    refreshed_at: HashMap<String, DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct InspirationState {
    entries: HashMap<String, Arc<InspirationEntry>>,
    last_updated: Option<DateTime<Utc>>,
}

/// Concurrency-safe cache of brand buckets and inspiration entries.
#[derive(Debug)]
pub struct CacheStore {
    ttl: Duration,
    products: RwLock<ProductState>,
    inspirations: RwLock<InspirationState>,
}

impl CacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            products: RwLock::new(ProductState::default()),
            inspirations: RwLock::new(InspirationState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // A panicking writer only ever leaves a fully swapped map behind.
    fn products_read(&self) -> RwLockReadGuard<'_, ProductState> {
        self.products.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn products_write(&self) -> RwLockWriteGuard<'_, ProductState> {
        self.products.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn inspirations_read(&self) -> RwLockReadGuard<'_, InspirationState> {
        self.inspirations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn inspirations_write(&self) -> RwLockWriteGuard<'_, InspirationState> {
        self.inspirations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Products cached for a brand, without triggering any fetch.
    pub fn get_bucket(&self, brand: &str) -> Option<Arc<Vec<Product>>> {
        self.products_read().buckets.get(brand).cloned()
    }

    /// Inspiration entry by id.
    pub fn get_inspiration(&self, id: &str) -> Option<Arc<InspirationEntry>> {
        self.inspirations_read().entries.get(id).cloned()
    }

    /// All inspiration entries, sorted by id.
    pub fn inspirations(&self) -> Vec<Arc<InspirationEntry>> {
        let mut entries: Vec<_> = self.inspirations_read().entries.values().cloned().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    /// All buckets, sorted by brand.
    pub fn buckets(&self) -> Vec<(String, Arc<Vec<Product>>)> {
        let mut buckets: Vec<_> = self
            .products_read()
            .buckets
            .iter()
            .map(|(brand, products)| (brand.clone(), Arc::clone(products)))
            .collect();
        buckets.sort_by(|a, b| a.0.cmp(&b.0));
        buckets
    }

    /// Swap one bucket. Other brands are untouched.
    pub fn put_bucket(&self, brand: &str, products: Vec<Product>) {
        let products = Arc::new(products);
        self.products_write()
            .buckets
            .insert(brand.to_string(), products);
    }

    /// Swap the whole inspiration map.
    pub fn put_inspirations(&self, entries: HashMap<String, InspirationEntry>) {
        let entries = entries
            .into_iter()
            .map(|(id, entry)| (id, Arc::new(entry)))
            .collect();
        self.inspirations_write().entries = entries;
    }

    /// Record that a single bucket was refreshed outside a full cycle.
    pub fn mark_bucket_refreshed(&self, brand: &str, at: DateTime<Utc>) {
        self.products_write()
            .refreshed_at
            .insert(brand.to_string(), at);
    }

    /// Set the `lastUpdated` timestamp of one cache.
    pub fn stamp(&self, kind: SnapshotKind, at: DateTime<Utc>) {
        match kind {
            SnapshotKind::Products => {
                let mut state = self.products_write();
                state.last_updated = Some(at);
                state.refreshed_at.clear();
            }
            SnapshotKind::Inspirations => self.inspirations_write().last_updated = Some(at),
        }
    }

    pub fn last_updated(&self, kind: SnapshotKind) -> Option<DateTime<Utc>> {
        match kind {
            SnapshotKind::Products => self.products_read().last_updated,
            SnapshotKind::Inspirations => self.inspirations_read().last_updated,
        }
    }

    pub fn expires_at(&self, kind: SnapshotKind) -> Option<DateTime<Utc>> {
        self.last_updated(kind).map(|ts| ts + self.ttl)
    }

    /// `now < lastUpdated + TTL`. A cache that was never stamped is stale.
    pub fn is_fresh(&self, kind: SnapshotKind, now: DateTime<Utc>) -> bool {
        self.expires_at(kind).is_some_and(|expiry| now < expiry)
    }

    /// Whether a bucket exists and is covered by either the cache-wide stamp
    /// or its own on-demand refresh.
    pub fn is_bucket_fresh(&self, brand: &str, now: DateTime<Utc>) -> bool {
        let state = self.products_read();
        if !state.buckets.contains_key(brand) {
            return false;
        }
        let newest = match (state.last_updated, state.refreshed_at.get(brand).copied()) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        newest.is_some_and(|ts| now < ts + self.ttl)
    }

    pub fn bucket_count(&self) -> usize {
        self.products_read().buckets.len()
    }

    pub fn product_count(&self) -> usize {
        self.products_read().buckets.values().map(|b| b.len()).sum()
    }

    pub fn inspiration_count(&self) -> usize {
        self.inspirations_read().entries.len()
    }

    /// Deep copy of the product cache for persistence.
    pub fn snapshot(&self) -> CacheSnapshot {
        let (last_updated, buckets) = {
            let state = self.products_read();
            let buckets: Vec<_> = state
                .buckets
                .iter()
                .map(|(brand, products)| (brand.clone(), Arc::clone(products)))
                .collect();
            (state.last_updated, buckets)
        };

        CacheSnapshot {
            last_updated: last_updated.unwrap_or_default(),
            buckets: buckets
                .into_iter()
                .map(|(brand, products)| (brand, products.as_ref().clone()))
                .collect(),
        }
    }

    /// Deep copy of the inspiration index for persistence.
    pub fn inspiration_snapshot(&self) -> InspirationSnapshot {
        let (last_updated, entries) = {
            let state = self.inspirations_read();
            let entries: Vec<_> = state.entries.values().cloned().collect();
            (state.last_updated, entries)
        };

        InspirationSnapshot {
            last_updated: last_updated.unwrap_or_default(),
            entries: entries
                .into_iter()
                .map(|entry| (entry.id.clone(), entry.as_ref().clone()))
                .collect(),
        }
    }

    /// Replace the product cache with a loaded snapshot.
    pub fn restore(&self, snapshot: CacheSnapshot) {
        let buckets = snapshot
            .buckets
            .into_iter()
            .map(|(brand, products)| (brand, Arc::new(products)))
            .collect();
        let mut state = self.products_write();
        state.buckets = buckets;
        state.last_updated = Some(snapshot.last_updated);
        state.refreshed_at.clear();
    }

    /// Replace the inspiration index with a loaded snapshot.
    pub fn restore_inspirations(&self, snapshot: InspirationSnapshot) {
        let entries = snapshot
            .entries
            .into_iter()
            .map(|(id, entry)| (id, Arc::new(entry)))
            .collect();
        let mut state = self.inspirations_write();
        state.entries = entries;
        state.last_updated = Some(snapshot.last_updated);
    }
}

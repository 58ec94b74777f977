// src/pipeline/refresh.rs

//! Refresh cycle: fetch every brand, reconcile, rebuild inspirations, persist.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::cache::CacheStore;
use crate::error::{AppError, Result};
use crate::models::{BrandInfo, Config, Envelope, InspirationTable, SnapshotKind};
use crate::pipeline::{InspirationIndexBuilder, ReconcileStats, Reconciler};
use crate::services::CatalogClient;
use crate::storage::{Loaded, SnapshotStorage};

/// What was found on disk for one snapshot at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Loaded(usize),
    Legacy(usize),
    Missing,
    Quarantined(PathBuf),
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Loaded(n) => write!(f, "loaded {n} items"),
            LoadStatus::Legacy(n) => write!(f, "loaded {n} items (legacy format)"),
            LoadStatus::Missing => write!(f, "no snapshot"),
            LoadStatus::Quarantined(path) => write!(f, "corrupt, moved to {}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub products: LoadStatus,
    pub inspirations: LoadStatus,
}

/// Per-brand result within a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum BrandOutcome {
    Refreshed(ReconcileStats),
    /// Fetch kept nothing for the brand, previous bucket retained
    Preserved(ReconcileStats),
    Failed(String),
}

/// Summary of one full refresh cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub brands: Vec<(String, BrandOutcome)>,
    pub inspiration_count: usize,
    pub persist_failures: usize,
}

impl CycleReport {
    pub fn refreshed(&self) -> usize {
        self.count(|o| matches!(o, BrandOutcome::Refreshed(_)))
    }

    pub fn preserved(&self) -> usize {
        self.count(|o| matches!(o, BrandOutcome::Preserved(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, BrandOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&BrandOutcome) -> bool) -> usize {
        self.brands.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Owns the write path into the cache and the snapshot files.
///
/// Full cycles and single-brand refreshes take the same lock, so there is
/// only ever one writer.
pub struct CatalogRefresher {
    brands: Vec<BrandInfo>,
    fetch_limit: usize,
    request_delay: Duration,
    store: Arc<CacheStore>,
    client: Arc<dyn CatalogClient>,
    storage: Arc<dyn SnapshotStorage>,
    reconciler: Reconciler,
    index_builder: InspirationIndexBuilder,
    writer: Mutex<()>,
    last_call: Mutex<Option<Instant>>,
}

impl CatalogRefresher {
    pub fn new(
        config: &Config,
        table: &InspirationTable,
        store: Arc<CacheStore>,
        client: Arc<dyn CatalogClient>,
        storage: Arc<dyn SnapshotStorage>,
    ) -> Self {
        Self {
            brands: Self::brand_order(&config.brands),
            fetch_limit: config.cache.fetch_limit,
            request_delay: config.cache.request_delay(),
            store,
            client,
            storage,
            reconciler: Reconciler::from_config(&config.cache),
            index_builder: InspirationIndexBuilder::new(table, config.cache.inspiration_cap),
            writer: Mutex::new(()),
            last_call: Mutex::new(None),
        }
    }

    /// Brands sorted by id, each id once.
    pub fn brand_order(brands: &[BrandInfo]) -> Vec<BrandInfo> {
        let mut sorted: Vec<BrandInfo> = brands.to_vec();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        sorted.dedup_by(|a, b| a.id == b.id);
        sorted
    }

    pub fn brands(&self) -> &[BrandInfo] {
        &self.brands
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Restore both caches from disk. Never fails; unreadable files are
    /// quarantined and the cache starts empty.
    pub async fn load_snapshots(&self) -> LoadReport {
        let products = match self.storage.load_products().await {
            Loaded::Snapshot(snapshot) => {
                let count = snapshot.item_count();
                self.store.restore(snapshot);
                LoadStatus::Loaded(count)
            }
            Loaded::Legacy(snapshot) => {
                let count = snapshot.item_count();
                self.store.restore(snapshot);
                LoadStatus::Legacy(count)
            }
            Loaded::Missing => LoadStatus::Missing,
            Loaded::Quarantined { backup } => LoadStatus::Quarantined(backup),
        };

        let inspirations = match self.storage.load_inspirations().await {
            Loaded::Snapshot(snapshot) => {
                let count = snapshot.item_count();
                self.store.restore_inspirations(snapshot);
                LoadStatus::Loaded(count)
            }
            Loaded::Legacy(snapshot) => {
                let count = snapshot.item_count();
                self.store.restore_inspirations(snapshot);
                LoadStatus::Legacy(count)
            }
            Loaded::Missing => LoadStatus::Missing,
            Loaded::Quarantined { backup } => LoadStatus::Quarantined(backup),
        };

        log::info!("Product snapshot: {}", products);
        log::info!("Inspiration snapshot: {}", inspirations);

        LoadReport {
            products,
            inspirations,
        }
    }

    /// A full cycle is due when nothing is cached or either cache is stale.
    pub fn is_refresh_due(&self, now: DateTime<Utc>) -> bool {
        self.store.bucket_count() == 0
            || !self.store.is_fresh(SnapshotKind::Products, now)
            || !self.store.is_fresh(SnapshotKind::Inspirations, now)
    }

    /// Time until the earlier of the two cache stamps expires. Zero when
    /// either kind was never stamped or has already expired.
    ///
    /// Only the stamps count here. A cycle that fetched nothing still stamps
    /// both kinds, so the scheduler waits a full TTL before trying again.
    pub fn time_until_due(&self, now: DateTime<Utc>) -> Duration {
        let expiries: Option<Vec<_>> = [SnapshotKind::Products, SnapshotKind::Inspirations]
            .into_iter()
            .map(|kind| self.store.expires_at(kind))
            .collect();
        expiries
            .and_then(|e| e.into_iter().min())
            .and_then(|expiry| (expiry - now).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }

    /// Run one full cycle over every configured brand.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let _writer = self.writer.lock().await;
        log::info!("Refresh cycle starting for {} brands", self.brands.len());

        let mut report = CycleReport {
            started_at: now,
            ..CycleReport::default()
        };
        let mut processed: HashSet<&str> = HashSet::new();

        for brand in &self.brands {
            if !processed.insert(brand.id.as_str()) {
                continue;
            }

            let outcome = match self.fetch_and_reconcile(brand, now).await {
                Ok(stats) => {
                    if !self.persist_products().await {
                        report.persist_failures += 1;
                    }
                    if stats.preserved {
                        log::warn!(
                            "No {} items in fetch, keeping previous bucket",
                            brand.id
                        );
                        BrandOutcome::Preserved(stats)
                    } else {
                        log::info!(
                            "{}: {} kept ({} new, {} updated), {} evicted, {} overflowed",
                            brand.id,
                            stats.kept(),
                            stats.added,
                            stats.updated,
                            stats.evicted,
                            stats.overflowed
                        );
                        BrandOutcome::Refreshed(stats)
                    }
                }
                Err(e) if e.is_upstream() => {
                    log::warn!("Skipping {}: {}", brand.id, e);
                    BrandOutcome::Failed(e.to_string())
                }
                Err(e) => {
                    log::error!("Refresh of {} failed: {}", brand.id, e);
                    BrandOutcome::Failed(e.to_string())
                }
            };
            report.brands.push((brand.id.clone(), outcome));
        }

        self.store.stamp(SnapshotKind::Products, now);
        report.inspiration_count = self.rebuild_inspirations(now);

        if !self.persist_products().await {
            report.persist_failures += 1;
        }
        if !self.persist_inspirations().await {
            report.persist_failures += 1;
        }

        log::info!(
            "Refresh cycle complete: {} refreshed, {} preserved, {} failed, {} inspirations",
            report.refreshed(),
            report.preserved(),
            report.failed(),
            report.inspiration_count
        );
        report
    }

    /// Refresh a single brand outside the full cycle. The product cache keeps
    /// its `lastUpdated`; only this bucket becomes fresh.
    pub async fn refresh_brand(&self, brand_id: &str, now: DateTime<Utc>) -> Result<ReconcileStats> {
        let brand = self.find_brand(brand_id)?;
        let _writer = self.writer.lock().await;
        self.refresh_locked(brand, now).await
    }

    /// Like [`refresh_brand`](Self::refresh_brand), but returns `Ok(None)`
    /// without fetching when the bucket is fresh once the writer lock is
    /// held. A query that waited behind a full cycle reuses its result.
    pub async fn refresh_brand_if_stale(
        &self,
        brand_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ReconcileStats>> {
        let brand = self.find_brand(brand_id)?;
        let _writer = self.writer.lock().await;
        if self.store.is_bucket_fresh(&brand.id, now) {
            log::debug!("{} refreshed while waiting, skipping fetch", brand.id);
            return Ok(None);
        }
        self.refresh_locked(brand, now).await.map(Some)
    }

    fn find_brand(&self, brand_id: &str) -> Result<&BrandInfo> {
        self.brands
            .iter()
            .find(|b| b.id == brand_id)
            .ok_or_else(|| AppError::UnknownBrand(brand_id.to_string()))
    }

    /// Caller holds the writer lock.
    async fn refresh_locked(&self, brand: &BrandInfo, now: DateTime<Utc>) -> Result<ReconcileStats> {
        let stats = self.fetch_and_reconcile(brand, now).await?;
        self.persist_products().await;

        if stats.preserved {
            return Err(AppError::EmptyFetch {
                brand: brand.id.clone(),
            });
        }
        self.store.mark_bucket_refreshed(&brand.id, now);
        log::info!("On-demand refresh of {}: {} items", brand.id, stats.kept());
        Ok(stats)
    }

    /// Rebuild the inspiration map from the current buckets and stamp it.
    pub fn rebuild_inspirations(&self, now: DateTime<Utc>) -> usize {
        let entries = self.index_builder.build_from_store(&self.store);
        let count = entries.len();
        self.store.put_inspirations(entries);
        self.store.stamp(SnapshotKind::Inspirations, now);
        count
    }

    async fn fetch_and_reconcile(&self, brand: &BrandInfo, now: DateTime<Utc>) -> Result<ReconcileStats> {
        self.throttle().await;
        let fetched = self
            .client
            .fetch_products(&brand.id, brand.search_term(), self.fetch_limit)
            .await?;
        Ok(self.reconciler.apply(&self.store, brand, fetched, now))
    }

    /// Wait until `request_delay` has passed since the previous upstream call.
    async fn throttle(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.request_delay;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }

    async fn persist_products(&self) -> bool {
        let snapshot = self.store.snapshot();
        match self.storage.save_products(&snapshot).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to persist product snapshot: {}", e);
                false
            }
        }
    }

    async fn persist_inspirations(&self) -> bool {
        let snapshot = self.store.inspiration_snapshot();
        match self.storage.save_inspirations(&snapshot).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to persist inspiration snapshot: {}", e);
                false
            }
        }
    }
}

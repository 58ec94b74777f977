//! Reconciliation of a fresh brand fetch against the cached bucket.
//!
//! For brand `b`:
//!
//! 1. Items without a brand label are dropped.
//! 2. Items labelled `b` (case-insensitive, key or display name) are kept and
//!    relabelled to the bucket key; everything else is merged into the
//!    overflow bucket.
//! 3. Kept items are diffed by id against the previous bucket to carry
//!    `isNew`/`addedDate` forward, then replace the bucket wholesale.
//! 4. An empty kept set leaves the previous bucket in place.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::cache::CacheStore;
use crate::models::{BrandInfo, CacheConfig, Product};

/// How a fetched item relates to the previous bucket contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemChange {
    Added,
    Unchanged,
    Updated,
}

/// Counters describing one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub added: usize,
    pub unchanged: usize,
    pub updated: usize,
    /// Previously cached ids absent from the fetch
    pub evicted: usize,
    /// Items routed to the overflow bucket
    pub overflowed: usize,
    /// Items without a brand label
    pub dropped: usize,
    /// Repeated ids within the same fetch
    pub duplicates: usize,
    /// Kept set was empty, previous bucket retained
    pub preserved: bool,
}

impl ReconcileStats {
    pub fn kept(&self) -> usize {
        self.added + self.unchanged + self.updated
    }

    fn record(&mut self, change: ItemChange) {
        match change {
            ItemChange::Added => self.added += 1,
            ItemChange::Unchanged => self.unchanged += 1,
            ItemChange::Updated => self.updated += 1,
        }
    }
}

/// Result of reconciling one fetch, before it is applied to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// New bucket contents, `None` when the previous bucket is kept
    pub bucket: Option<Vec<Product>>,
    /// New overflow bucket contents, `None` when nothing overflowed
    pub overflow: Option<Vec<Product>>,
    pub stats: ReconcileStats,
}

/// Diffs fetches against cached buckets.
#[derive(Debug, Clone)]
pub struct Reconciler {
    overflow_bucket: String,
    ttl: Duration,
    overflow_warn_size: usize,
}

impl Reconciler {
    pub fn new(overflow_bucket: impl Into<String>, ttl: Duration) -> Self {
        Self {
            overflow_bucket: overflow_bucket.into(),
            ttl,
            overflow_warn_size: usize::MAX,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            overflow_bucket: config.overflow_bucket.clone(),
            ttl: config.ttl(),
            overflow_warn_size: config.overflow_warn_size,
        }
    }

    pub fn overflow_bucket(&self) -> &str {
        &self.overflow_bucket
    }

    /// Apply the id-keyed metadata rules to one incoming item.
    ///
    /// An unchanged item stays new only while it is inside the refresh window
    /// that first saw it, so it stops being new once a full TTL has passed.
    pub fn carry_forward(
        &self,
        mut item: Product,
        previous: Option<&Product>,
        now: DateTime<Utc>,
    ) -> (Product, ItemChange) {
        match previous {
            None => {
                item.is_new = true;
                item.added_date = Some(now);
                (item, ItemChange::Added)
            }
            Some(prev) => {
                let added = prev.added_date.unwrap_or(now);
                item.added_date = Some(added);
                if prev.same_content(&item) {
                    item.is_new = prev.is_new && now < added + self.ttl;
                    (item, ItemChange::Unchanged)
                } else {
                    item.is_new = false;
                    (item, ItemChange::Updated)
                }
            }
        }
    }

    /// Reconcile a fetch for `brand` against its previous bucket and the
    /// current overflow bucket. Pure; nothing is written.
    pub fn reconcile(
        &self,
        brand: &BrandInfo,
        fetched: Vec<Product>,
        previous: &[Product],
        previous_overflow: &[Product],
        now: DateTime<Utc>,
    ) -> Reconciliation {
        let mut stats = ReconcileStats::default();
        let is_overflow_brand = brand.id == self.overflow_bucket;

        let mut seen: HashSet<String> = HashSet::new();
        let mut kept = Vec::new();
        let mut overflow = Vec::new();

        for mut item in fetched {
            if item.brand.trim().is_empty() {
                stats.dropped += 1;
                continue;
            }
            if brand.matches_label(&item.brand) {
                if !seen.insert(item.id.clone()) {
                    stats.duplicates += 1;
                    continue;
                }
                item.brand = brand.id.clone();
                kept.push(item);
            } else {
                overflow.push(item);
            }
        }

        // The overflow bucket accumulates instead of being replaced, even
        // when it is the brand being refreshed.
        if is_overflow_brand {
            kept.append(&mut overflow);
            overflow = std::mem::take(&mut kept);
        }
        stats.overflowed = overflow.len();

        let overflow = if overflow.is_empty() {
            None
        } else {
            Some(self.merge_overflow(previous_overflow, overflow, now))
        };

        if is_overflow_brand {
            return Reconciliation {
                bucket: None,
                overflow,
                stats,
            };
        }

        if kept.is_empty() {
            stats.preserved = true;
            return Reconciliation {
                bucket: None,
                overflow,
                stats,
            };
        }

        let previous_by_id: HashMap<&str, &Product> =
            previous.iter().map(|p| (p.id.as_str(), p)).collect();

        let bucket: Vec<Product> = kept
            .into_iter()
            .map(|item| {
                let prev = previous_by_id.get(item.id.as_str()).copied();
                let (item, change) = self.carry_forward(item, prev, now);
                stats.record(change);
                item
            })
            .collect();

        stats.evicted = previous
            .iter()
            .filter(|p| !seen.contains(p.id.as_str()))
            .count();

        Reconciliation {
            bucket: Some(bucket),
            overflow,
            stats,
        }
    }

    /// Merge incoming items into the overflow bucket by id. Existing items
    /// are never removed; colliding ids take the incoming values.
    fn merge_overflow(
        &self,
        existing: &[Product],
        incoming: Vec<Product>,
        now: DateTime<Utc>,
    ) -> Vec<Product> {
        let mut merged: Vec<Product> = existing.to_vec();
        let mut index: HashMap<String, usize> = merged
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();

        for item in incoming {
            match index.get(&item.id).copied() {
                Some(i) => {
                    let (item, _) = self.carry_forward(item, Some(&merged[i]), now);
                    merged[i] = item;
                }
                None => {
                    let (item, _) = self.carry_forward(item, None, now);
                    index.insert(item.id.clone(), merged.len());
                    merged.push(item);
                }
            }
        }

        if merged.len() > self.overflow_warn_size {
            log::warn!(
                "Overflow bucket '{}' holds {} items and has no eviction",
                self.overflow_bucket,
                merged.len()
            );
        }
        merged
    }

    /// Reconcile against the store's current contents and swap the result in.
    pub fn apply(
        &self,
        store: &CacheStore,
        brand: &BrandInfo,
        fetched: Vec<Product>,
        now: DateTime<Utc>,
    ) -> ReconcileStats {
        let previous = store.get_bucket(&brand.id).unwrap_or_default();
        let previous_overflow = store.get_bucket(&self.overflow_bucket).unwrap_or_default();

        let result = self.reconcile(brand, fetched, &previous, &previous_overflow, now);

        if let Some(overflow) = result.overflow {
            store.put_bucket(&self.overflow_bucket, overflow);
        }
        if let Some(bucket) = result.bucket {
            store.put_bucket(&brand.id, bucket);
        }
        result.stats
    }
}

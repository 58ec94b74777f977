//! On-disk snapshot envelopes.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::{InspirationEntry, Product};

/// Which of the two independently persisted caches a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    Products,
    Inspirations,
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotKind::Products => f.write_str("products"),
            SnapshotKind::Inspirations => f.write_str("inspirations"),
        }
    }
}

/// Serialized product cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub last_updated: DateTime<Utc>,
    pub buckets: HashMap<String, Vec<Product>>,
}

/// Serialized inspiration index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct InspirationSnapshot {
    pub last_updated: DateTime<Utc>,
    pub entries: HashMap<String, InspirationEntry>,
}

/// A snapshot envelope that can also be recovered from its older bare-map form.
pub trait Envelope: Serialize + DeserializeOwned + Send + Sync {
    /// Payload written before the envelope carried a timestamp.
    type Legacy: DeserializeOwned + Send;

    const KIND: SnapshotKind;

    /// Wrap a legacy payload; with no timestamp it is treated as stale.
    fn from_legacy(legacy: Self::Legacy) -> Self;

    fn item_count(&self) -> usize;
}

impl Envelope for CacheSnapshot {
    type Legacy = HashMap<String, Vec<Product>>;

    const KIND: SnapshotKind = SnapshotKind::Products;

    fn from_legacy(buckets: Self::Legacy) -> Self {
        Self {
            last_updated: DateTime::<Utc>::default(),
            buckets,
        }
    }

    fn item_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

impl Envelope for InspirationSnapshot {
    type Legacy = HashMap<String, InspirationEntry>;

    const KIND: SnapshotKind = SnapshotKind::Inspirations;

    fn from_legacy(entries: Self::Legacy) -> Self {
        Self {
            last_updated: DateTime::<Utc>::default(),
            entries,
        }
    }

    fn item_count(&self) -> usize {
        self.entries.len()
    }
}

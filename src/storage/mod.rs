//! Storage abstractions for snapshot persistence.
//!
//! Two independent JSON snapshots are kept side by side:
//!
//! ```text
//! {snapshot_dir}/
//! ├── products.json                # { lastUpdated, buckets }
//! ├── inspirations.json            # { lastUpdated, entries }
//! └── products.json.corrupted      # quarantined copy of an unreadable snapshot
//! ```

pub mod local;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CacheSnapshot, InspirationSnapshot};

// Re-export for convenience
pub use local::LocalStorage;

/// Outcome of reading a snapshot file. Loading never fails.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    /// Current envelope shape
    Snapshot(T),
    /// Older bare-map shape, wrapped with an epoch timestamp
    Legacy(T),
    /// File missing or empty
    Missing,
    /// File unreadable; a copy was set aside at `backup`
    Quarantined { backup: PathBuf },
}

impl<T> Loaded<T> {
    pub fn into_snapshot(self) -> Option<T> {
        match self {
            Loaded::Snapshot(s) | Loaded::Legacy(s) => Some(s),
            Loaded::Missing | Loaded::Quarantined { .. } => None,
        }
    }
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Atomically replace the product snapshot.
    async fn save_products(&self, snapshot: &CacheSnapshot) -> Result<()>;

    /// Atomically replace the inspiration snapshot.
    async fn save_inspirations(&self, snapshot: &InspirationSnapshot) -> Result<()>;

    async fn load_products(&self) -> Loaded<CacheSnapshot>;

    async fn load_inspirations(&self) -> Loaded<InspirationSnapshot>;
}

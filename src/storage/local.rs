//! Local filesystem storage implementation.
//!
//! Writes go to a sibling `*.tmp` file that is renamed over the target, so a
//! crash mid-write never leaves a half-written snapshot for the next load.
//! Unreadable files are copied aside with a `.corrupted` suffix and treated
//! as absent.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{CacheSnapshot, Envelope, InspirationSnapshot, PathsConfig};
use crate::storage::{Loaded, SnapshotStorage};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    products_path: PathBuf,
    inspirations_path: PathBuf,
}

impl LocalStorage {
    /// Create a LocalStorage writing the two snapshots at the given paths.
    pub fn new(products_path: impl Into<PathBuf>, inspirations_path: impl Into<PathBuf>) -> Self {
        Self {
            products_path: products_path.into(),
            inspirations_path: inspirations_path.into(),
        }
    }

    pub fn from_paths(paths: &PathsConfig) -> Self {
        Self::new(paths.products_path(), paths.inspirations_path())
    }

    pub fn products_path(&self) -> &Path {
        &self.products_path
    }

    pub fn inspirations_path(&self) -> &Path {
        &self.inspirations_path
    }

    /// `path` with `suffix` appended to its file name.
    fn sibling(path: &Path, suffix: &str) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("snapshot"));
        name.push(suffix);
        path.with_file_name(name)
    }

    pub fn corrupted_path(path: &Path) -> PathBuf {
        Self::sibling(path, ".corrupted")
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_dir(path).await?;

        let tmp = Self::sibling(path, ".tmp");
        let written = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, path).await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::persistence(path, e));
        }
        Ok(())
    }

    async fn write_snapshot<T: Envelope>(path: &Path, snapshot: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        Self::write_bytes(path, &bytes).await?;
        log::debug!(
            "Saved {} snapshot ({} items) to {}",
            T::KIND,
            snapshot.item_count(),
            path.display()
        );
        Ok(())
    }

    /// Read a snapshot, falling back to the legacy shape, then to quarantine.
    async fn read_snapshot<T: Envelope>(path: &Path) -> Loaded<T> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No {} snapshot at {}", T::KIND, path.display());
                return Loaded::Missing;
            }
            Err(e) => {
                log::warn!(
                    "Cannot read {} snapshot at {}: {}",
                    T::KIND,
                    path.display(),
                    e
                );
                return Loaded::Missing;
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            log::info!("Empty {} snapshot at {}", T::KIND, path.display());
            return Loaded::Missing;
        }

        let envelope_err = match serde_json::from_slice::<T>(&bytes) {
            Ok(snapshot) => return Loaded::Snapshot(snapshot),
            Err(e) => e,
        };

        if let Ok(legacy) = serde_json::from_slice::<T::Legacy>(&bytes) {
            log::warn!(
                "Loaded {} snapshot in legacy format from {}; it will be rewritten on next refresh",
                T::KIND,
                path.display()
            );
            return Loaded::Legacy(T::from_legacy(legacy));
        }

        let backup = Self::corrupted_path(path);
        log::error!(
            "Corrupt {} snapshot at {} ({}); quarantining to {}",
            T::KIND,
            path.display(),
            envelope_err,
            backup.display()
        );
        if let Err(e) = tokio::fs::copy(path, &backup).await {
            log::error!("Failed to quarantine {}: {}", path.display(), e);
        }
        Loaded::Quarantined { backup }
    }
}

#[async_trait]
impl SnapshotStorage for LocalStorage {
    async fn save_products(&self, snapshot: &CacheSnapshot) -> Result<()> {
        Self::write_snapshot(&self.products_path, snapshot).await
    }

    async fn save_inspirations(&self, snapshot: &InspirationSnapshot) -> Result<()> {
        Self::write_snapshot(&self.inspirations_path, snapshot).await
    }

    async fn load_products(&self) -> Loaded<CacheSnapshot> {
        Self::read_snapshot(&self.products_path).await
    }

    async fn load_inspirations(&self) -> Loaded<InspirationSnapshot> {
        Self::read_snapshot(&self.inspirations_path).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::models::{InspirationEntry, Price, Product};
    use tempfile::TempDir;

    fn storage(tmp: &TempDir) -> LocalStorage {
        LocalStorage::new(
            tmp.path().join("products.json"),
            tmp.path().join("inspirations.json"),
        )
    }

    fn sample_snapshot() -> CacheSnapshot {
        let mut buckets = HashMap::new();
        buckets.insert(
            "nike".to_string(),
            vec![Product {
                id: "p1".into(),
                title: "Air Max".into(),
                description: "Running shoe".into(),
                price: Price {
                    amount: 120.0,
                    currency: "USD".into(),
                },
                brand: "nike".into(),
                is_new: true,
                added_date: Some("2026-02-01T10:00:00Z".parse().unwrap()),
                ..Default::default()
            }],
        );
        buckets.insert("zara".to_string(), Vec::new());
        CacheSnapshot {
            last_updated: "2026-02-01T10:00:00Z".parse().unwrap(),
            buckets,
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let snapshot = sample_snapshot();

        storage.save_products(&snapshot).await.unwrap();
        let loaded = storage.load_products().await;

        assert_eq!(loaded, Loaded::Snapshot(snapshot));
        assert!(!tmp.path().join("products.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_inspiration_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let mut entries = HashMap::new();
        entries.insert(
            "christmas".to_string(),
            InspirationEntry {
                id: "christmas".into(),
                name: "Christmas".into(),
                image: "https://img.example.com/c.jpg".into(),
                products: sample_snapshot().buckets["nike"].clone(),
            },
        );
        let snapshot = InspirationSnapshot {
            last_updated: "2026-02-01T10:00:00Z".parse().unwrap(),
            entries,
        };

        storage.save_inspirations(&snapshot).await.unwrap();
        assert_eq!(
            storage.load_inspirations().await.into_snapshot(),
            Some(snapshot)
        );
    }

    #[tokio::test]
    async fn test_missing_and_empty_files() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        assert_eq!(storage.load_products().await, Loaded::Missing);

        tokio::fs::write(storage.products_path(), b"").await.unwrap();
        assert_eq!(storage.load_products().await, Loaded::Missing);
        assert!(!LocalStorage::corrupted_path(storage.products_path()).exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_quarantined() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        tokio::fs::write(storage.products_path(), b"<html>not json")
            .await
            .unwrap();

        let loaded = storage.load_products().await;
        let backup = tmp.path().join("products.json.corrupted");

        assert_eq!(
            loaded,
            Loaded::Quarantined {
                backup: backup.clone()
            }
        );
        assert_eq!(std::fs::read(&backup).unwrap(), b"<html>not json");
    }

    #[tokio::test]
    async fn test_legacy_bare_map() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let legacy = r#"{"nike": [{"id": "p1", "title": "Air Max", "brand": "nike"}]}"#;
        tokio::fs::write(storage.products_path(), legacy)
            .await
            .unwrap();

        match storage.load_products().await {
            Loaded::Legacy(snapshot) => {
                assert_eq!(snapshot.buckets["nike"][0].id, "p1");
                assert_eq!(snapshot.last_updated.timestamp(), 0);
            }
            other => panic!("expected legacy snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_save_overwrites_and_creates_dirs() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(
            tmp.path().join("nested/dir/products.json"),
            tmp.path().join("nested/dir/inspirations.json"),
        );
        let mut snapshot = sample_snapshot();
        storage.save_products(&snapshot).await.unwrap();

        snapshot.buckets.remove("zara");
        storage.save_products(&snapshot).await.unwrap();

        let loaded = storage.load_products().await.into_snapshot().unwrap();
        assert_eq!(loaded.buckets.len(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        // Target path is an existing directory, so the rename cannot succeed.
        let target = tmp.path().join("products.json");
        std::fs::create_dir_all(target.join("occupied")).unwrap();
        let storage = LocalStorage::new(&target, tmp.path().join("inspirations.json"));

        let result = storage.save_products(&sample_snapshot()).await;
        assert!(matches!(result, Err(AppError::Persistence { .. })));
        assert!(!tmp.path().join("products.json.tmp").exists());
    }
}

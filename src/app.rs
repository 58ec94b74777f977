// src/app.rs

//! Wiring of the cache, refresher and query service.

use std::sync::Arc;

use crate::cache::CacheStore;
use crate::error::Result;
use crate::models::{Config, InspirationTable};
use crate::pipeline::{CatalogRefresher, LoadReport, RefreshScheduler};
use crate::services::{CatalogClient, CatalogService, HttpCatalogClient};
use crate::storage::{LocalStorage, SnapshotStorage};

/// A fully wired catalog cache.
pub struct App {
    pub config: Config,
    pub store: Arc<CacheStore>,
    pub refresher: Arc<CatalogRefresher>,
    pub service: CatalogService,
}

impl App {
    /// Build against the HTTP catalog and local snapshot files.
    pub fn build(config: Config) -> Result<Self> {
        config.validate()?;
        let table = load_inspiration_table(&config)?;
        let client = Arc::new(HttpCatalogClient::new(&config.catalog)?);
        let storage = Arc::new(LocalStorage::from_paths(&config.paths));
        Ok(Self::with_parts(config, &table, client, storage))
    }

    pub fn with_parts(
        config: Config,
        table: &InspirationTable,
        client: Arc<dyn CatalogClient>,
        storage: Arc<dyn SnapshotStorage>,
    ) -> Self {
        let store = Arc::new(CacheStore::new(config.cache.ttl()));
        let refresher = Arc::new(CatalogRefresher::new(
            &config,
            table,
            Arc::clone(&store),
            client,
            storage,
        ));
        let service = CatalogService::new(Arc::clone(&refresher));
        Self {
            config,
            store,
            refresher,
            service,
        }
    }

    /// Restore snapshots from disk into the cache.
    pub async fn load(&self) -> LoadReport {
        self.refresher.load_snapshots().await
    }

    pub fn scheduler(&self) -> RefreshScheduler {
        RefreshScheduler::new(Arc::clone(&self.refresher))
    }
}

/// Load the inspiration table. A missing file yields an empty table; a
/// malformed one is an error.
pub fn load_inspiration_table(config: &Config) -> Result<InspirationTable> {
    let path = config.paths.inspiration_table_path();
    if !path.exists() {
        log::warn!(
            "Inspiration table not found at {}, no inspirations will be built",
            path.display()
        );
        return Ok(InspirationTable::default());
    }
    let table = InspirationTable::load(&path)?;
    table.validate()?;
    log::info!("Loaded {} inspiration definitions", table.len());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::models::SnapshotKind;
    use crate::pipeline::LoadStatus;
    use crate::test_support::{Reply, ScriptedCatalog, product};

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.paths.snapshot_dir = dir.path().to_string_lossy().to_string();
        config.cache.request_delay_ms = 0;
        config.brands = vec![crate::models::BrandInfo::new("nike", "Nike")];
        config
    }

    #[test]
    fn test_missing_table_is_empty() {
        let dir = TempDir::new().unwrap();
        let table = load_inspiration_table(&config_in(&dir)).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_invalid_table_is_error() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::write(
            config.paths.inspiration_table_path(),
            "[[inspiration]]\nid = \"\"\nname = \"x\"\nkeywords = [\"a\"]\n",
        )
        .unwrap();
        assert!(load_inspiration_table(&config).is_err());
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = Config::default();
        config.cache.ttl_hours = 0;
        assert!(App::build(config).is_err());
    }

    #[tokio::test]
    async fn test_snapshots_survive_restart() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push("nike", Reply::Items(vec![product("n1", "Nike", "Air", 100.0)]));

        let now = chrono::Utc::now();
        let first = App::with_parts(
            config.clone(),
            &InspirationTable::default(),
            catalog.clone(),
            Arc::new(LocalStorage::from_paths(&config.paths)),
        );
        first.refresher.run_cycle(now).await;

        let second = App::with_parts(
            config.clone(),
            &InspirationTable::default(),
            catalog.clone(),
            Arc::new(LocalStorage::from_paths(&config.paths)),
        );
        second.load().await;

        assert_eq!(second.store.get_bucket("nike").unwrap()[0].id, "n1");
        assert!(second.store.is_fresh(SnapshotKind::Products, now));
        assert!(!second.refresher.is_refresh_due(now));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_starts_empty_and_due() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let products_path = config.paths.products_path();
        fs::write(&products_path, "not json {{{").unwrap();

        let app = App::with_parts(
            config.clone(),
            &InspirationTable::default(),
            Arc::new(ScriptedCatalog::new()),
            Arc::new(LocalStorage::from_paths(&config.paths)),
        );
        let report = app.load().await;

        assert!(matches!(report.products, LoadStatus::Quarantined(_)));
        assert_eq!(app.store.bucket_count(), 0);
        assert!(LocalStorage::corrupted_path(&products_path).exists());
        assert!(app.refresher.is_refresh_due(chrono::Utc::now()));
    }
}

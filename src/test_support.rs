//! Scripted catalog and in-memory storage shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{CacheSnapshot, InspirationSnapshot, Price, Product};
use crate::services::CatalogClient;
use crate::storage::{Loaded, SnapshotStorage};

pub fn product(id: &str, brand: &str, title: &str, amount: f64) -> Product {
    Product {
        id: id.into(),
        title: title.into(),
        description: String::new(),
        price: Price {
            amount,
            currency: "USD".into(),
        },
        brand: brand.into(),
        ..Default::default()
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Items(Vec<Product>),
    Fail,
}

/// Catalog that answers from a per-brand queue. When a brand's queue holds a
/// single reply it is repeated. An optional delay is slept after the call
/// is recorded.
#[derive(Debug, Default)]
pub struct ScriptedCatalog {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push(&self, brand: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(brand.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CatalogClient for ScriptedCatalog {
    async fn fetch_products(
        &self,
        brand: &str,
        _search_term: &str,
        limit: usize,
    ) -> Result<Vec<Product>> {
        self.calls.lock().unwrap().push(brand.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(brand) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        match reply {
            Some(Reply::Items(items)) => Ok(items.into_iter().take(limit).collect()),
            Some(Reply::Fail) | None => Err(AppError::fetch(brand, "scripted failure")),
        }
    }
}

/// Storage kept in memory; writes can be switched to fail.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    pub products: Mutex<Option<CacheSnapshot>>,
    pub inspirations: Mutex<Option<InspirationSnapshot>>,
    pub fail_writes: AtomicBool,
    pub product_writes: AtomicUsize,
    pub inspiration_writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let storage = Self::default();
        storage.fail_writes.store(true, Ordering::SeqCst);
        storage
    }

    pub fn saved_products(&self) -> Option<CacheSnapshot> {
        self.products.lock().unwrap().clone()
    }

    pub fn saved_inspirations(&self) -> Option<InspirationSnapshot> {
        self.inspirations.lock().unwrap().clone()
    }

    fn check_writable(&self, name: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::persistence(Path::new(name), "disk full"));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStorage for MemoryStorage {
    async fn save_products(&self, snapshot: &CacheSnapshot) -> Result<()> {
        self.check_writable("products.json")?;
        self.product_writes.fetch_add(1, Ordering::SeqCst);
        *self.products.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }

    async fn save_inspirations(&self, snapshot: &InspirationSnapshot) -> Result<()> {
        self.check_writable("inspirations.json")?;
        self.inspiration_writes.fetch_add(1, Ordering::SeqCst);
        *self.inspirations.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }

    async fn load_products(&self) -> Loaded<CacheSnapshot> {
        match self.saved_products() {
            Some(snapshot) => Loaded::Snapshot(snapshot),
            None => Loaded::Missing,
        }
    }

    async fn load_inspirations(&self) -> Loaded<InspirationSnapshot> {
        match self.saved_inspirations() {
            Some(snapshot) => Loaded::Snapshot(snapshot),
            None => Loaded::Missing,
        }
    }
}

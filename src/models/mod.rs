// src/models/mod.rs

//! Domain models for the catalog cache.

mod config;
mod inspiration;
mod product;
mod snapshot;

// Re-export all public types
pub use config::{BrandInfo, CacheConfig, CatalogConfig, Config, LoggingConfig, PathsConfig};
pub use inspiration::{InspirationDefinition, InspirationEntry, InspirationTable};
pub use product::{Price, Product};
pub use snapshot::{CacheSnapshot, Envelope, InspirationSnapshot, SnapshotKind};

//! Service layer.
//!
//! - Upstream catalog access (`CatalogClient`, `HttpCatalogClient`)
//! - Read-side queries over the cache (`CatalogService`)

mod catalog;
mod http_catalog;
mod query;

pub use catalog::CatalogClient;
pub use http_catalog::HttpCatalogClient;
pub use query::{BrandListing, CatalogService, InspirationListing, InspirationView};

//! Upstream catalog contract.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Product;

/// Fetches raw product listings for a brand.
///
/// Implementations page through upstream results until `limit` items are
/// gathered or pages run out, return the resolvable subset when some items
/// cannot be decoded, and fail only when no usable data was obtained. Each
/// implementation bounds its own network time.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn fetch_products(
        &self,
        brand: &str,
        search_term: &str,
        limit: usize,
    ) -> Result<Vec<Product>>;
}

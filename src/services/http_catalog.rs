// src/services/http_catalog.rs

//! JSON-over-HTTP catalog client.
//!
//! Talks to a paginated search endpoint:
//!
//! ```text
//! GET {base_url}/search?brand=nike&q=nike&page=1&pageSize=50
//! -> { "items": [ {product}, ... ], "hasMore": true }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CatalogConfig, Product};
use crate::services::CatalogClient;
use crate::utils::{http, with_trailing_slash};

/// Pages allowed beyond what `limit` needs, for pages thinned by
/// undecodable items.
const PAGE_MARGIN: usize = 2;

/// One page of search results.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    items: Vec<serde_json::Value>,
    #[serde(default)]
    has_more: bool,
}

/// Catalog client backed by the upstream search API.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: Client,
    base_url: Url,
    page_size: usize,
}

impl HttpCatalogClient {
    /// Create a client from catalog settings. The request timeout comes from
    /// `timeout_secs`.
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = http::create_async_client(config)?;
        let base_url = with_trailing_slash(Url::parse(&config.base_url)?);
        Ok(Self {
            client,
            base_url,
            page_size: config.page_size.max(1),
        })
    }

    fn page_url(&self, brand: &str, search_term: &str, page: usize, size: usize) -> Result<Url> {
        let mut url = self.base_url.join("search")?;
        url.query_pairs_mut()
            .append_pair("brand", brand)
            .append_pair("q", search_term)
            .append_pair("page", &page.to_string())
            .append_pair("pageSize", &size.to_string());
        Ok(url)
    }

    async fn fetch_page(&self, url: Url) -> Result<SearchPage> {
        let page = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<SearchPage>()
            .await?;
        Ok(page)
    }

    /// Decode items one by one, skipping any that do not resolve to a product.
    fn decode_items(values: Vec<serde_json::Value>) -> (Vec<Product>, usize) {
        let mut skipped = 0;
        let products = values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Product>(value) {
                Ok(product) if !product.id.trim().is_empty() => Some(product),
                Ok(_) => {
                    skipped += 1;
                    None
                }
                Err(e) => {
                    log::debug!("Skipping undecodable catalog item: {}", e);
                    skipped += 1;
                    None
                }
            })
            .collect();
        (products, skipped)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn fetch_products(
        &self,
        brand: &str,
        search_term: &str,
        limit: usize,
    ) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = Vec::new();
        let mut skipped_total = 0;
        let mut page = 1;
        let max_pages = limit.div_ceil(self.page_size) + PAGE_MARGIN;

        // Page size stays constant; the server derives offsets from it
        while products.len() < limit {
            if page > max_pages {
                log::warn!(
                    "Stopping {} after {} pages with {} of {} items",
                    brand,
                    max_pages,
                    products.len(),
                    limit
                );
                break;
            }
            let remaining = limit - products.len();
            let url = self.page_url(brand, search_term, page, self.page_size)?;

            let result = match self.fetch_page(url).await {
                Ok(result) => result,
                Err(e) if products.is_empty() => return Err(AppError::fetch(brand, e)),
                Err(e) => {
                    log::warn!(
                        "Catalog page {} for {} failed after {} items: {}",
                        page,
                        brand,
                        products.len(),
                        e
                    );
                    break;
                }
            };

            let page_len = result.items.len();
            let (items, skipped) = Self::decode_items(result.items);
            skipped_total += skipped;
            products.extend(items.into_iter().take(remaining));

            if page_len == 0 || !result.has_more {
                break;
            }
            page += 1;
        }

        if products.is_empty() && skipped_total > 0 {
            return Err(AppError::fetch(
                brand,
                format!("none of {skipped_total} returned items could be decoded"),
            ));
        }
        if skipped_total > 0 {
            log::info!(
                "Catalog returned {} usable items for {} ({} unresolvable skipped)",
                products.len(),
                brand,
                skipped_total
            );
        }
        Ok(products)
    }
}

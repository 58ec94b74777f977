//! Product data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Price of a catalog item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Price {
    pub amount: f64,
    #[serde(default)]
    pub currency: String,
}

/// A single catalog item cached under a brand bucket.
///
/// Upstream payloads carry everything except `isNew` and `addedDate`, which
/// are owned by reconciliation and default when absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Stable upstream identifier
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub price: Price,

    #[serde(default, rename = "imageURL", alias = "imageUrl")]
    pub image_url: String,

    /// Brand label; normalized to the bucket key once cached
    #[serde(default)]
    pub brand: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub is_new: bool,

    /// First time this id was seen in its bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_date: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether the user-visible content (title, price, description) matches.
    pub fn same_content(&self, other: &Product) -> bool {
        self.title == other.title
            && self.price == other.price
            && self.description == other.description
    }

    /// Lowercased title and description joined for keyword matching.
    pub fn search_text(&self) -> String {
        let mut text = String::with_capacity(self.title.len() + self.description.len() + 1);
        text.push_str(&self.title.to_lowercase());
        text.push(' ');
        text.push_str(&self.description.to_lowercase());
        text
    }
}

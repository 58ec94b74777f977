//! Keyword inspiration index.
//!
//! Every product is tested once against every definition's keywords
//! (case-insensitive substring over title and description). Each entry is
//! capped independently; a product may appear in several entries.

use std::collections::{HashMap, HashSet};

use crate::cache::CacheStore;
use crate::models::{InspirationDefinition, InspirationEntry, InspirationTable, Product};

/// Default number of products per inspiration entry.
pub const DEFAULT_CAP: usize = 30;

#[derive(Debug, Clone)]
struct Matcher {
    definition: InspirationDefinition,
    keywords: Vec<String>,
}

impl Matcher {
    fn new(definition: &InspirationDefinition) -> Self {
        let keywords = definition
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            definition: definition.clone(),
            keywords,
        }
    }

    fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

/// Builds inspiration entries from cached buckets.
#[derive(Debug, Clone)]
pub struct InspirationIndexBuilder {
    matchers: Vec<Matcher>,
    cap: usize,
}

impl InspirationIndexBuilder {
    pub fn new(table: &InspirationTable, cap: usize) -> Self {
        Self {
            matchers: table.definitions.iter().map(Matcher::new).collect(),
            cap,
        }
    }

    /// Build one entry per definition. Definitions without matches still
    /// produce an empty entry.
    pub fn build<'a, I>(&self, buckets: I) -> HashMap<String, InspirationEntry>
    where
        I: IntoIterator<Item = &'a [Product]>,
    {
        let mut entries: Vec<InspirationEntry> = self
            .matchers
            .iter()
            .map(|m| InspirationEntry::from_definition(&m.definition))
            .collect();
        // Same id can show up in a brand bucket and the overflow bucket
        let mut seen: Vec<HashSet<(String, String)>> = vec![HashSet::new(); entries.len()];

        'buckets: for bucket in buckets {
            for product in bucket {
                if entries.iter().all(|e| e.products.len() >= self.cap) {
                    break 'buckets;
                }

                let text = product.search_text();
                for (i, matcher) in self.matchers.iter().enumerate() {
                    let entry = &mut entries[i];
                    if entry.products.len() >= self.cap || !matcher.matches(&text) {
                        continue;
                    }
                    if seen[i].insert((product.brand.clone(), product.id.clone())) {
                        entry.products.push(product.clone());
                    }
                }
            }
        }

        entries.into_iter().map(|e| (e.id.clone(), e)).collect()
    }

    /// Build from the store's current buckets, scanned in brand order.
    pub fn build_from_store(&self, store: &CacheStore) -> HashMap<String, InspirationEntry> {
        let buckets = store.buckets();
        self.build(buckets.iter().map(|(_, products)| products.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn definition(id: &str, keywords: &[&str]) -> InspirationDefinition {
        InspirationDefinition {
            id: id.into(),
            name: id.to_uppercase(),
            image: format!("{id}.jpg"),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn table(definitions: Vec<InspirationDefinition>) -> InspirationTable {
        InspirationTable { definitions }
    }

    fn product(id: &str, title: &str, description: &str) -> Product {
        Product {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            brand: "nike".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_entry_is_capped() {
        let mut products: Vec<Product> = (0..40)
            .map(|i| product(&format!("c{i}"), &format!("Christmas sweater {i}"), ""))
            .collect();
        products.extend((0..960).map(|i| product(&format!("p{i}"), "Plain tee", "cotton")));

        let builder = InspirationIndexBuilder::new(
            &table(vec![definition("christmas", &["christmas"])]),
            30,
        );
        let entries = builder.build([products.as_slice()]);

        assert_eq!(entries["christmas"].products.len(), 30);
        assert_eq!(entries["christmas"].name, "CHRISTMAS");
    }

    #[test]
    fn test_case_insensitive_title_or_description() {
        let products = vec![
            product("1", "XMAS jumper", ""),
            product("2", "Jumper", "Great gift under the tree, xmas ready"),
            product("3", "Jumper", "wool"),
        ];
        let builder = InspirationIndexBuilder::new(
            &table(vec![definition("christmas", &["Xmas", " "])]),
            DEFAULT_CAP,
        );
        let entries = builder.build([products.as_slice()]);

        let ids: Vec<_> = entries["christmas"]
            .products
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_product_in_multiple_entries() {
        let products = vec![product("1", "Summer beach towel", "")];
        let builder = InspirationIndexBuilder::new(
            &table(vec![
                definition("summer", &["summer"]),
                definition("beach", &["beach"]),
            ]),
            DEFAULT_CAP,
        );
        let entries = builder.build([products.as_slice()]);

        assert_eq!(entries["summer"].products.len(), 1);
        assert_eq!(entries["beach"].products.len(), 1);
    }

    #[test]
    fn test_caps_are_independent() {
        let products: Vec<Product> = (0..5)
            .map(|i| product(&format!("{i}"), "gift", ""))
            .chain(std::iter::once(product("s", "summer", "")))
            .collect();
        let builder = InspirationIndexBuilder::new(
            &table(vec![
                definition("gifts", &["gift"]),
                definition("summer", &["summer"]),
            ]),
            2,
        );
        let entries = builder.build([products.as_slice()]);

        assert_eq!(entries["gifts"].products.len(), 2);
        assert_eq!(entries["summer"].products.len(), 1);
    }

    #[test]
    fn test_unmatched_definition_yields_empty_entry() {
        let builder = InspirationIndexBuilder::new(
            &table(vec![definition("halloween", &["pumpkin"])]),
            DEFAULT_CAP,
        );
        let entries = builder.build(std::iter::empty());

        assert!(entries["halloween"].products.is_empty());
        assert_eq!(entries["halloween"].image, "halloween.jpg");
    }

    #[test]
    fn test_build_from_store_dedupes_across_buckets() {
        let store = CacheStore::new(Duration::hours(72));
        store.put_bucket("nike", vec![product("1", "gift box", "")]);
        store.put_bucket("amazon", vec![product("1", "gift box", "")]);
        let builder =
            InspirationIndexBuilder::new(&table(vec![definition("gifts", &["gift"])]), DEFAULT_CAP);

        let entries = builder.build_from_store(&store);
        assert_eq!(entries["gifts"].products.len(), 1);
    }
}

//! Inspiration definitions and derived entries.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Product;

/// A keyword-driven topic, loaded from the inspiration table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspirationDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub keywords: Vec<String>,
}

/// Inspiration table as stored on disk.
///
/// ```toml
/// [[inspiration]]
/// id = "christmas"
/// name = "Christmas Gifts"
/// image = "https://img.example.com/christmas.jpg"
/// keywords = ["christmas", "xmas", "holiday"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InspirationTable {
    #[serde(default, rename = "inspiration")]
    pub definitions: Vec<InspirationDefinition>,
}

impl InspirationTable {
    /// Load the table from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load the table or return an empty one if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Inspiration table load failed from {:?}: {}. No inspirations will be built.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Reject duplicate ids and definitions that can never match.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for def in &self.definitions {
            if def.id.trim().is_empty() {
                return Err(AppError::validation("inspiration id is empty"));
            }
            if !seen.insert(def.id.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate inspiration id '{}'",
                    def.id
                )));
            }
            if def.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(AppError::validation(format!(
                    "inspiration '{}' has no keywords",
                    def.id
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Products collected for one inspiration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspirationEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl InspirationEntry {
    /// Empty entry carrying a definition's display fields.
    pub fn from_definition(def: &InspirationDefinition) -> Self {
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            image: def.image.clone(),
            products: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
[[inspiration]]
id = "christmas"
name = "Christmas Gifts"
keywords = ["christmas", "xmas"]

[[inspiration]]
id = "running"
name = "Running"
image = "https://img.example.com/run.jpg"
keywords = ["running", "marathon"]
"#;

    #[test]
    fn test_parse_table() {
        let table: InspirationTable = toml::from_str(TABLE).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.definitions[0].image, "");
        assert_eq!(table.definitions[1].keywords, vec!["running", "marathon"]);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut table: InspirationTable = toml::from_str(TABLE).unwrap();
        table.definitions[1].id = "christmas".into();
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_keywords() {
        let mut table: InspirationTable = toml::from_str(TABLE).unwrap();
        table.definitions[0].keywords = vec![" ".into()];
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let table = InspirationTable::load_or_default("/nonexistent/inspirations.toml");
        assert!(table.is_empty());
    }

    #[test]
    fn test_shipped_table_is_valid() {
        let table: InspirationTable =
            toml::from_str(include_str!("../../storage/inspirations.toml")).unwrap();
        table.validate().unwrap();
        assert!(table.definitions.iter().any(|d| d.id == "christmas"));
    }
}

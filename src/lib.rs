// src/lib.rs

//! Catalog cache library
//!
//! Keeps per-brand product listings from an upstream catalog in a TTL cache
//! backed by JSON snapshots, and derives a keyword inspiration index from it.

pub mod app;
pub mod cache;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::App;

//! In-memory cache state shared by the refresh pipeline and query callers.

mod store;

pub use store::CacheStore;

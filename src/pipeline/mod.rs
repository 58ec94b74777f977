//! Refresh pipeline.
//!
//! - `reconcile`: merge one brand fetch into the cache
//! - `inspirations`: build the keyword inspiration index
//! - `refresh`: full cycles and single-brand refreshes
//! - `scheduler`: background worker driving the cycles

pub mod inspirations;
pub mod reconcile;
pub mod refresh;
pub mod scheduler;

pub use inspirations::InspirationIndexBuilder;
pub use reconcile::{ReconcileStats, Reconciler};
pub use refresh::{BrandOutcome, CatalogRefresher, CycleReport, LoadReport, LoadStatus};
pub use scheduler::RefreshScheduler;

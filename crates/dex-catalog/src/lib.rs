//! # dex-catalog
//!
//! In-memory filtering, sorting, pagination and caching over the catalog
//! fetched from a [`CatalogGateway`](dex_core::traits::CatalogGateway).

pub mod cache;
pub mod debounce;
pub mod engine;
pub mod filter;
pub mod names;

pub use debounce::SearchDebouncer;
pub use engine::{CatalogEngine, EngineConfig, StatusCounts};
pub use filter::{CatalogFilter, FilterChange, SortDirection, SortField};
pub use names::{resolve_submitter_names, UNKNOWN_SUBMITTER};

//! animedex/crates/dex-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Animedex.

pub mod audit;
pub mod error;
pub mod models;
pub mod moderation;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;

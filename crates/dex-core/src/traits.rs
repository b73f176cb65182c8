//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use crate::models::{Category, Entry, EntryPatch, Identity, Profile};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Failure reported by a gateway plugin.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The targeted row does not exist (e.g., updating a deleted entry)
    #[error("row not found")]
    NotFound,

    /// Connection, query or mapping failure
    #[error("backend error: {0}")]
    Backend(String),
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Read/update contract for the `posts`, `profiles` and `categories` tables.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Every entry regardless of approval status.
    async fn fetch_entries(&self) -> GatewayResult<Vec<Entry>>;

    /// `Ok(None)` is the not-found signal.
    async fn fetch_entry(&self, id: Uuid) -> GatewayResult<Option<Entry>>;

    /// Batch lookup of profiles whose id is in `ids`.
    async fn fetch_profiles(&self, ids: &[Uuid]) -> GatewayResult<Vec<Profile>>;

    async fn fetch_categories(&self) -> GatewayResult<Vec<Category>>;

    /// Writes the present fields of `patch` and returns the stored row.
    async fn update_entry(&self, id: Uuid, patch: &EntryPatch) -> GatewayResult<Entry>;
}

/// Operations that need a credential able to bypass row-level policies.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ElevatedGateway: Send + Sync {
    /// Returns the number of rows removed.
    async fn delete_entry(&self, id: Uuid) -> GatewayResult<u64>;
}

/// Identity contract: who is making this request.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a bearer token. Invalid or missing tokens yield `None`.
    async fn current_user(&self, bearer: Option<&str>) -> Option<Identity>;
}

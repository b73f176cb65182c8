//! # dex-db-memory
//!
//! In-process implementation of the catalog gateways, backed by `DashMap`.
//! Used by the `dev` profile of the binary and by the HTTP tests.

use async_trait::async_trait;
use dashmap::DashMap;
use dex_core::models::{Category, Entry, EntryPatch, Profile};
use dex_core::traits::{CatalogGateway, ElevatedGateway, GatewayError, GatewayResult};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryCatalog {
    entries: DashMap<Uuid, Entry>,
    profiles: DashMap<Uuid, Profile>,
    categories: DashMap<String, Category>,
    unavailable: AtomicBool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_entry(&self, entry: Entry) {
        self.entries.insert(entry.id, entry);
    }

    pub fn insert_profile(&self, id: Uuid, username: impl Into<String>) {
        self.profiles.insert(
            id,
            Profile {
                id,
                username: Some(username.into()),
            },
        );
    }

    pub fn insert_category(&self, category: Category) {
        self.categories.insert(category.id.clone(), category);
    }

    pub fn entry(&self, id: Uuid) -> Option<Entry> {
        self.entries.get(&id).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Makes every call fail with a backend error until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> GatewayResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(GatewayError::Backend("memory store marked unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CatalogGateway for MemoryCatalog {
    /// Newest first, like the SQL plugin.
    async fn fetch_entries(&self) -> GatewayResult<Vec<Entry>> {
        self.check_available()?;
        let mut entries: Vec<Entry> = self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn fetch_entry(&self, id: Uuid) -> GatewayResult<Option<Entry>> {
        self.check_available()?;
        Ok(self.entry(id))
    }

    async fn fetch_profiles(&self, ids: &[Uuid]) -> GatewayResult<Vec<Profile>> {
        self.check_available()?;
        Ok(ids
            .iter()
            .filter_map(|id| self.profiles.get(id).map(|p| p.value().clone()))
            .collect())
    }

    async fn fetch_categories(&self) -> GatewayResult<Vec<Category>> {
        self.check_available()?;
        let mut categories: Vec<Category> =
            self.categories.iter().map(|c| c.value().clone()).collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn update_entry(&self, id: Uuid, patch: &EntryPatch) -> GatewayResult<Entry> {
        self.check_available()?;
        let mut stored = self.entries.get_mut(&id).ok_or(GatewayError::NotFound)?;
        patch.apply_to(stored.value_mut());
        tracing::debug!(entry_id = %id, "entry updated in memory");
        Ok(stored.value().clone())
    }
}

#[async_trait]
impl ElevatedGateway for MemoryCatalog {
    async fn delete_entry(&self, id: Uuid) -> GatewayResult<u64> {
        self.check_available()?;
        Ok(self.entries.remove(&id).map_or(0, |_| 1))
    }
}

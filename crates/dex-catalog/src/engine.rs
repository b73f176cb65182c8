//! # Catalog Engine
//!
//! Holds the fetched catalog in memory and derives the visible, sorted and
//! paginated view from a [`CatalogFilter`].
//!
//! ## Caching
//!
//! Recomputing the view costs a string scan over every entry, so two bounded
//! caches sit in front of it:
//!
//! - the filter cache maps `{category, search, sort field, direction}` to the
//!   final ordered list;
//! - the search cache maps a lowercased search string to the entries it
//!   matched, before sorting.
//!
//! Both hold shared [`Arc<Entry>`] handles rather than copies and are cleared
//! whenever category or sort criteria change, or the catalog is reloaded.

use crate::cache::BoundedCache;
use crate::filter::{by_category, matches_search, sort_entries, CatalogFilter, FilterChange};
use crate::names::resolve_submitter_names;
use dex_core::models::{ApprovalStatus, Category, Entry};
use dex_core::traits::{CatalogGateway, GatewayResult};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const NO_DATA_MESSAGE: &str = "No entries have been published yet.";
pub const LOAD_ERROR_MESSAGE: &str = "The catalog could not be loaded. Please try again later.";

/// Sizing knobs for a [`CatalogEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub page_size: usize,
    pub filter_cache_capacity: usize,
    pub search_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: crate::filter::DEFAULT_PAGE_SIZE,
            filter_cache_capacity: 100,
            search_cache_capacity: 50,
        }
    }
}

/// Entry totals per approval status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: usize,
    pub published: usize,
    pub rejected: usize,
    pub total: usize,
}

pub struct CatalogEngine {
    gateway: Arc<dyn CatalogGateway>,
    all_entries: Vec<Arc<Entry>>,
    filtered: Vec<Arc<Entry>>,
    filter: CatalogFilter,
    categories: Vec<Category>,
    filter_cache: BoundedCache<String, Vec<Arc<Entry>>>,
    search_cache: BoundedCache<String, Vec<Arc<Entry>>>,
    data_loaded: bool,
    categories_loaded: bool,
    message: Option<String>,
    error: Option<String>,
}

impl CatalogEngine {
    pub fn new(gateway: Arc<dyn CatalogGateway>) -> Self {
        Self::with_config(gateway, EngineConfig::default())
    }

    pub fn with_config(gateway: Arc<dyn CatalogGateway>, config: EngineConfig) -> Self {
        Self {
            gateway,
            all_entries: Vec::new(),
            filtered: Vec::new(),
            filter: CatalogFilter {
                page_size: config.page_size.max(1),
                ..CatalogFilter::default()
            },
            categories: Vec::new(),
            filter_cache: BoundedCache::new(config.filter_cache_capacity),
            search_cache: BoundedCache::new(config.search_cache_capacity),
            data_loaded: false,
            categories_loaded: false,
            message: None,
            error: None,
        }
    }

    /// Fetches every entry unless already loaded.
    ///
    /// Never fails: an empty catalog sets [`message`](Self::message), a
    /// gateway failure sets [`error`](Self::error). Both still count as loaded.
    pub async fn load_entries(&mut self, force_refresh: bool) {
        if self.data_loaded && !force_refresh {
            return;
        }

        self.message = None;
        self.error = None;

        match self.fetch_with_names().await {
            Ok(entries) if entries.is_empty() => {
                info!("catalog is empty");
                self.all_entries.clear();
                self.message = Some(NO_DATA_MESSAGE.to_string());
            }
            Ok(entries) => {
                info!(count = entries.len(), "catalog loaded");
                self.all_entries = entries.into_iter().map(Arc::new).collect();
            }
            Err(err) => {
                warn!(error = %err, "failed to load catalog");
                self.all_entries.clear();
                self.error = Some(LOAD_ERROR_MESSAGE.to_string());
            }
        }

        self.data_loaded = true;
        self.invalidate_caches();
        self.recompute_filtered();
    }

    /// Fetches categories unless already loaded, falling back to a single
    /// synthetic "All" category.
    pub async fn load_categories(&mut self, force_refresh: bool) {
        if self.categories_loaded && !force_refresh {
            return;
        }

        self.categories = match self.gateway.fetch_categories().await {
            Ok(categories) if !categories.is_empty() => categories,
            Ok(_) => vec![Category::all()],
            Err(err) => {
                warn!(error = %err, "failed to load categories, using fallback");
                vec![Category::all()]
            }
        };
        self.categories_loaded = true;
        self.invalidate_caches();
        self.recompute_filtered();
    }

    /// Drops both caches and reloads categories then entries.
    pub async fn refresh(&mut self) {
        self.invalidate_caches();
        self.load_categories(true).await;
        self.load_entries(true).await;
    }

    /// Entries with submitter names resolved in one batched profile lookup.
    async fn fetch_with_names(&self) -> GatewayResult<Vec<Entry>> {
        let mut entries = self.gateway.fetch_entries().await?;
        resolve_submitter_names(self.gateway.as_ref(), &mut entries).await;
        Ok(entries)
    }

    /// Derives `filtered_entries` from the current inputs.
    ///
    /// Only published entries are ever visible here.
    pub fn recompute_filtered(&mut self) {
        let key = self.filter.cache_key();
        if let Some(cached) = self.filter_cache.get(&key) {
            debug!(key = %key, "filter cache hit");
            self.filtered = cached.clone();
            self.reset_page_if_out_of_range();
            return;
        }

        let published: Vec<Arc<Entry>> = self
            .all_entries
            .iter()
            .filter(|e| e.is_published())
            .cloned()
            .collect();

        let mut result = by_category(published, &self.filter.category_id, &self.categories);

        let needle = self.filter.search_text.trim().to_lowercase();
        if !needle.is_empty() {
            result = self.search(result, needle);
        }

        sort_entries(&mut result, self.filter.sort_field, self.filter.sort_direction);

        self.filter_cache.insert(key, result.clone());
        self.filtered = result;
        self.reset_page_if_out_of_range();
    }

    fn search(&mut self, candidates: Vec<Arc<Entry>>, needle: String) -> Vec<Arc<Entry>> {
        if let Some(hits) = self.search_cache.get(&needle) {
            let ids: HashSet<Uuid> = hits.iter().map(|e| e.id).collect();
            return candidates
                .into_iter()
                .filter(|e| ids.contains(&e.id))
                .collect();
        }

        let hits: Vec<Arc<Entry>> = candidates
            .into_iter()
            .filter(|e| matches_search(e, &needle))
            .collect();
        self.search_cache.insert(needle, hits.clone());
        hits
    }

    /// Explicit recompute trigger after the inputs were changed from outside.
    pub fn notify_changed(&mut self) {
        self.invalidate_caches();
        self.recompute_filtered();
    }

    /// Merges `change` into the filter and recomputes.
    pub fn update_filter(&mut self, change: FilterChange) {
        let before = self.filter.clone();

        if let Some(category_id) = change.category_id {
            self.filter.category_id = category_id;
        }
        if let Some(search_text) = change.search_text {
            self.filter.search_text = search_text;
        }
        if let Some(field) = change.sort_field {
            self.filter.sort_field = field;
        }
        if let Some(direction) = change.sort_direction {
            self.filter.sort_direction = direction;
        }
        if let Some(page_size) = change.page_size {
            self.filter.page_size = page_size.max(1);
        }
        if let Some(page) = change.page {
            self.filter.page = page.max(1);
        }

        let criteria_changed = before.category_id != self.filter.category_id
            || before.sort_field != self.filter.sort_field
            || before.sort_direction != self.filter.sort_direction;

        if criteria_changed {
            self.invalidate_caches();
        }
        if criteria_changed || before.search_text != self.filter.search_text {
            self.filter.page = 1;
        }

        self.recompute_filtered();
    }

    /// Clamps `page` into `[1, total_pages]`.
    pub fn set_page(&mut self, page: usize) {
        self.filter.page = page.clamp(1, self.total_pages().max(1));
    }

    fn reset_page_if_out_of_range(&mut self) {
        let total = self.total_pages();
        if total > 0 && self.filter.page > total {
            self.filter.page = 1;
        }
    }

    fn invalidate_caches(&mut self) {
        self.filter_cache.clear();
        self.search_cache.clear();
    }

    pub fn total_count(&self) -> usize {
        self.filtered.len()
    }

    pub fn total_pages(&self) -> usize {
        self.filtered.len().div_ceil(self.filter.page_size.max(1))
    }

    /// The slice of `filtered_entries` for the current page.
    pub fn paginated_entries(&self) -> &[Arc<Entry>] {
        let size = self.filter.page_size.max(1);
        let start = (self.filter.page.max(1) - 1).saturating_mul(size);
        if start >= self.filtered.len() {
            return &[];
        }
        let end = (start + size).min(self.filtered.len());
        &self.filtered[start..end]
    }

    pub fn filtered_entries(&self) -> &[Arc<Entry>] {
        &self.filtered
    }

    pub fn all_entries(&self) -> &[Arc<Entry>] {
        &self.all_entries
    }

    pub fn filter(&self) -> &CatalogFilter {
        &self.filter
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn main_categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter().filter(|c| c.is_main())
    }

    pub fn subcategories<'a>(&'a self, parent_id: &'a str) -> impl Iterator<Item = &'a Category> {
        self.categories
            .iter()
            .filter(move |c| c.parent_id.as_deref() == Some(parent_id))
    }

    /// Moderation queue: pending entries, newest first.
    pub fn pending_entries(&self) -> Vec<Arc<Entry>> {
        let mut pending: Vec<Arc<Entry>> = self
            .all_entries
            .iter()
            .filter(|e| e.approval_status == ApprovalStatus::Pending)
            .cloned()
            .collect();
        sort_entries(
            &mut pending,
            crate::filter::SortField::Date,
            crate::filter::SortDirection::Desc,
        );
        pending
    }

    pub fn status_counts(&self) -> StatusCounts {
        self.all_entries
            .iter()
            .fold(StatusCounts::default(), |mut counts, entry| {
                match entry.approval_status {
                    ApprovalStatus::Pending => counts.pending += 1,
                    ApprovalStatus::Published => counts.published += 1,
                    ApprovalStatus::Rejected => counts.rejected += 1,
                }
                counts.total += 1;
                counts
            })
    }

    pub fn is_loaded(&self) -> bool {
        self.data_loaded
    }

    pub fn categories_loaded(&self) -> bool {
        self.categories_loaded
    }

    /// User-facing note for expected empty states.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// User-facing note when the last load failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn filter_cache_len(&self) -> usize {
        self.filter_cache.len()
    }

    pub fn search_cache_len(&self) -> usize {
        self.search_cache.len()
    }
}

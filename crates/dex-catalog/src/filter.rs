//! Filter state and the predicates/comparators applied to entries.

use chrono::{DateTime, Utc};
use dex_core::models::{Category, Entry, ALL_CATEGORIES};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Date,
    Title,
    Rating,
    Downloads,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Date => "date",
            SortField::Title => "title",
            SortField::Rating => "rating",
            SortField::Downloads => "downloads",
        }
    }
}

/// Unknown names fall back to [`SortField::Date`].
impl FromStr for SortField {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "title" => SortField::Title,
            "rating" => SortField::Rating,
            "downloads" => SortField::Downloads,
            _ => SortField::Date,
        })
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "asc" => SortDirection::Asc,
            _ => SortDirection::Desc,
        })
    }
}

/// User-controlled view over the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFilter {
    /// [`ALL_CATEGORIES`] or a category id.
    pub category_id: String,
    pub search_text: String,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl Default for CatalogFilter {
    fn default() -> Self {
        Self {
            category_id: ALL_CATEGORIES.to_string(),
            search_text: String::new(),
            sort_field: SortField::default(),
            sort_direction: SortDirection::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CatalogFilter {
    /// Key for the filter cache; page and page size do not affect the result set.
    ///
    /// Search text is keyed the way it is matched: trimmed and lowercased.
    pub fn cache_key(&self) -> String {
        format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}",
            self.category_id,
            self.search_text.trim().to_lowercase(),
            self.sort_field.as_str(),
            self.sort_direction.as_str()
        )
    }
}

/// Partial change merged into a [`CatalogFilter`]; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterChange {
    pub category_id: Option<String>,
    pub search_text: Option<String>,
    pub sort_field: Option<SortField>,
    pub sort_direction: Option<SortDirection>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// Entries visible under `category_id`.
///
/// A main category also matches its direct subcategories; a subcategory
/// only matches itself. An id missing from `categories` matches exactly.
pub fn by_category(
    entries: Vec<Arc<Entry>>,
    category_id: &str,
    categories: &[Category],
) -> Vec<Arc<Entry>> {
    if category_id == ALL_CATEGORIES {
        return entries;
    }

    let selected = categories.iter().find(|c| c.id == category_id);
    let mut accepted: HashSet<&str> = HashSet::from([category_id]);
    if selected.is_some_and(Category::is_main) {
        accepted.extend(
            categories
                .iter()
                .filter(|c| c.parent_id.as_deref() == Some(category_id))
                .map(|c| c.id.as_str()),
        );
    }

    entries
        .into_iter()
        .filter(|e| accepted.contains(e.category_id.as_str()))
        .collect()
}

/// Case-insensitive substring match over the searchable text fields.
///
/// `needle` must already be lowercased.
pub fn matches_search(entry: &Entry, needle: &str) -> bool {
    let fields = [
        Some(entry.title.as_str()),
        entry.title_alternate.as_deref(),
        entry.release_file_name.as_deref(),
        Some(entry.submitter_name.as_str()),
        entry.studio.as_deref(),
        entry.description_short.as_deref(),
    ];
    fields
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

fn compare(a: &Entry, b: &Entry, field: SortField) -> Ordering {
    match field {
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::Rating => a
            .rating_score
            .unwrap_or(0.0)
            .total_cmp(&b.rating_score.unwrap_or(0.0)),
        SortField::Downloads => a.download_count.cmp(&b.download_count),
        SortField::Date => {
            let epoch = DateTime::<Utc>::UNIX_EPOCH;
            a.sort_date()
                .unwrap_or(epoch)
                .cmp(&b.sort_date().unwrap_or(epoch))
        }
    }
}

/// Stable sort by `field` in `direction`.
pub fn sort_entries(entries: &mut [Arc<Entry>], field: SortField, direction: SortDirection) {
    entries.sort_by(|a, b| direction.apply(compare(a, b, field)));
}

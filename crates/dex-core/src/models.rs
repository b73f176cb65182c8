//! # Domain Models
//!
//! These structs represent the core entities of Animedex.
//! The public (wire) representation is camelCase; storage plugins own their
//! row shapes and translate through an explicit adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Category id used by filters to mean "every category".
pub const ALL_CATEGORIES: &str = "all";

/// Returned when a stored or submitted string does not name a known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Lowercases and folds spaces/hyphens so "Finished Airing" and
/// "finished-airing" both parse.
fn normalize_variant(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Moderation state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Published,
    Rejected,
}

impl ApprovalStatus {
    pub const ALL: [ApprovalStatus; 3] = [
        ApprovalStatus::Pending,
        ApprovalStatus::Published,
        ApprovalStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Published => "published",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_variant(s).as_str() {
            "pending" => Ok(ApprovalStatus::Pending),
            "published" => Ok(ApprovalStatus::Published),
            "rejected" => Ok(ApprovalStatus::Rejected),
            _ => Err(UnknownVariant {
                kind: "approval status",
                value: s.to_string(),
            }),
        }
    }
}

/// Real-world airing state, independent of moderation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    FinishedAiring,
    CurrentlyAiring,
    NotYetAired,
    Completed,
    Ongoing,
    Upcoming,
}

impl LifecycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::FinishedAiring => "finished_airing",
            LifecycleStatus::CurrentlyAiring => "currently_airing",
            LifecycleStatus::NotYetAired => "not_yet_aired",
            LifecycleStatus::Completed => "completed",
            LifecycleStatus::Ongoing => "ongoing",
            LifecycleStatus::Upcoming => "upcoming",
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_variant(s).as_str() {
            "finished_airing" => Ok(LifecycleStatus::FinishedAiring),
            "currently_airing" => Ok(LifecycleStatus::CurrentlyAiring),
            "not_yet_aired" => Ok(LifecycleStatus::NotYetAired),
            "completed" => Ok(LifecycleStatus::Completed),
            "ongoing" => Ok(LifecycleStatus::Ongoing),
            "upcoming" => Ok(LifecycleStatus::Upcoming),
            _ => Err(UnknownVariant {
                kind: "lifecycle status",
                value: s.to_string(),
            }),
        }
    }
}

/// Privilege level attached to an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// The "current user" fact supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A named mirror for a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLink {
    pub host_label: String,
    pub url: String,
}

/// A single catalog record (an anime release).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: Uuid,
    pub title: String,
    pub title_alternate: Option<String>,
    pub category_id: String,
    pub submitter_id: Option<Uuid>,
    pub submitter_name: String,
    pub episode_count: Option<i32>,
    pub release_year: Option<i32>,
    /// 0 to 10
    pub rating_score: Option<f64>,
    pub genres: Vec<String>,
    pub studio: Option<String>,
    pub release_file_name: Option<String>,
    pub description_short: Option<String>,
    pub description_long: Option<String>,
    pub cover_image_url: Option<String>,
    pub download_links: Vec<DownloadLink>,
    pub subtitle_kind: Option<String>,
    pub view_count: i64,
    pub download_count: i64,
    pub like_count: i64,
    pub lifecycle_status: Option<LifecycleStatus>,
    pub approval_status: ApprovalStatus,
    /// Only meaningful while `approval_status` is `Rejected`.
    pub rejection_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entry {
    /// Minimal pending entry; remaining fields start empty.
    pub fn new(title: impl Into<String>, category_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            title_alternate: None,
            category_id: category_id.into(),
            submitter_id: None,
            submitter_name: String::new(),
            episode_count: None,
            release_year: None,
            rating_score: None,
            genres: Vec::new(),
            studio: None,
            release_file_name: None,
            description_short: None,
            description_long: None,
            cover_image_url: None,
            download_links: Vec::new(),
            subtitle_kind: None,
            view_count: 0,
            download_count: 0,
            like_count: 0,
            lifecycle_status: None,
            approval_status: ApprovalStatus::Pending,
            rejection_reason: None,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    pub fn is_published(&self) -> bool {
        self.approval_status == ApprovalStatus::Published
    }

    /// Creation time, falling back to the last update.
    pub fn sort_date(&self) -> Option<DateTime<Utc>> {
        self.created_at.or(self.updated_at)
    }
}

/// Node of the two-level category tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
}

impl Category {
    /// Synthetic catch-all used when categories cannot be loaded.
    pub fn all() -> Self {
        Self {
            id: ALL_CATEGORIES.to_string(),
            name: "All".to_string(),
            parent_id: None,
        }
    }

    /// Main categories have no parent; sub categories do.
    pub fn is_main(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Slice of a `profiles` row used to resolve submitter names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: Option<String>,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Partial update of an [`Entry`].
///
/// Only fields present here are written; everything else is left untouched
/// in storage. Nullable columns use `Option<Option<T>>` so a caller can clear
/// them with an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub title_alternate: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub episode_count: Option<Option<i32>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub release_year: Option<Option<i32>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub rating_score: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub studio: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub release_file_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub description_short: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub description_long: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_links: Option<Vec<DownloadLink>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub subtitle_kind: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub lifecycle_status: Option<Option<LifecycleStatus>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ApprovalStatus>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<Option<String>>,
    /// Stamped by the update handler, never taken from callers.
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// `Some(new)` differs from `current`.
fn differs<T: PartialEq>(new: &Option<T>, current: &T) -> bool {
    new.as_ref().is_some_and(|v| v != current)
}

impl EntryPatch {
    /// True when no column would be written.
    pub fn is_empty(&self) -> bool {
        *self == EntryPatch::default()
    }

    /// Whether the patch alters any content field of `current`.
    ///
    /// Lifecycle and moderation fields are not content.
    pub fn changes_content(&self, current: &Entry) -> bool {
        differs(&self.title, &current.title)
            || differs(&self.title_alternate, &current.title_alternate)
            || differs(&self.episode_count, &current.episode_count)
            || differs(&self.release_year, &current.release_year)
            || differs(&self.rating_score, &current.rating_score)
            || differs(&self.category_id, &current.category_id)
            || differs(&self.cover_image_url, &current.cover_image_url)
            || differs(&self.description_long, &current.description_long)
            || differs(&self.description_short, &current.description_short)
            || differs(&self.genres, &current.genres)
            || differs(&self.studio, &current.studio)
            || differs(&self.release_file_name, &current.release_file_name)
            || differs(&self.download_links, &current.download_links)
            || differs(&self.subtitle_kind, &current.subtitle_kind)
    }

    /// Writes every present field onto `entry`.
    pub fn apply_to(&self, entry: &mut Entry) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }

        set(&mut entry.title, &self.title);
        set(&mut entry.title_alternate, &self.title_alternate);
        set(&mut entry.category_id, &self.category_id);
        set(&mut entry.episode_count, &self.episode_count);
        set(&mut entry.release_year, &self.release_year);
        set(&mut entry.rating_score, &self.rating_score);
        set(&mut entry.genres, &self.genres);
        set(&mut entry.studio, &self.studio);
        set(&mut entry.release_file_name, &self.release_file_name);
        set(&mut entry.description_short, &self.description_short);
        set(&mut entry.description_long, &self.description_long);
        set(&mut entry.cover_image_url, &self.cover_image_url);
        set(&mut entry.download_links, &self.download_links);
        set(&mut entry.subtitle_kind, &self.subtitle_kind);
        set(&mut entry.lifecycle_status, &self.lifecycle_status);
        set(&mut entry.approval_status, &self.approval_status);
        set(&mut entry.rejection_reason, &self.rejection_reason);
        if self.updated_at.is_some() {
            entry.updated_at = self.updated_at;
        }
    }
}

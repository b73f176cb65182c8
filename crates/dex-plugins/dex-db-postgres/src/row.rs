//! Explicit mapping between `posts` columns and the domain [`Entry`].

use chrono::{DateTime, Utc};
use dex_core::models::{ApprovalStatus, DownloadLink, Entry, LifecycleStatus};
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::warn;
use uuid::Uuid;

/// A row from the `posts` table.
#[derive(Debug, Clone, FromRow)]
pub struct EntryRow {
    pub id: Uuid,
    pub title: String,
    pub title_alternate: Option<String>,
    pub category_id: String,
    pub submitter_id: Option<Uuid>,
    pub submitter_name: Option<String>,
    pub episode_count: Option<i32>,
    pub release_year: Option<i32>,
    pub rating_score: Option<f64>,
    pub genres: Vec<String>,
    pub studio: Option<String>,
    pub release_file_name: Option<String>,
    pub description_short: Option<String>,
    pub description_long: Option<String>,
    pub cover_image_url: Option<String>,
    pub download_links: Json<Vec<DownloadLink>>,
    pub subtitle_kind: Option<String>,
    pub view_count: i64,
    pub download_count: i64,
    pub like_count: i64,
    pub lifecycle_status: Option<String>,
    pub approval_status: String,
    pub rejection_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<EntryRow> for Entry {
    /// Unknown status strings are logged and mapped to the most conservative
    /// value instead of dropping the row.
    fn from(row: EntryRow) -> Self {
        let approval_status = row.approval_status.parse().unwrap_or_else(|err| {
            warn!(entry_id = %row.id, error = %err, "treating entry as pending");
            ApprovalStatus::Pending
        });
        let lifecycle_status = row.lifecycle_status.as_deref().and_then(|raw| {
            raw.parse::<LifecycleStatus>()
                .map_err(|err| warn!(entry_id = %row.id, error = %err, "dropping lifecycle status"))
                .ok()
        });

        Entry {
            id: row.id,
            title: row.title,
            title_alternate: row.title_alternate,
            category_id: row.category_id,
            submitter_id: row.submitter_id,
            submitter_name: row.submitter_name.unwrap_or_default(),
            episode_count: row.episode_count,
            release_year: row.release_year,
            rating_score: row.rating_score,
            genres: row.genres,
            studio: row.studio,
            release_file_name: row.release_file_name,
            description_short: row.description_short,
            description_long: row.description_long,
            cover_image_url: row.cover_image_url,
            download_links: row.download_links.0,
            subtitle_kind: row.subtitle_kind,
            view_count: row.view_count,
            download_count: row.download_count,
            like_count: row.like_count,
            lifecycle_status,
            approval_status,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> EntryRow {
        EntryRow {
            id: Uuid::new_v4(),
            title: "Cowboy Bebop".into(),
            title_alternate: None,
            category_id: "tv".into(),
            submitter_id: Some(Uuid::new_v4()),
            submitter_name: None,
            episode_count: Some(26),
            release_year: Some(1998),
            rating_score: Some(8.9),
            genres: vec!["Sci-Fi".into(), "Noir".into()],
            studio: Some("Sunrise".into()),
            release_file_name: Some("[Group] Cowboy Bebop (BD 1080p)".into()),
            description_short: None,
            description_long: None,
            cover_image_url: None,
            download_links: Json(vec![DownloadLink {
                host_label: "Mirror".into(),
                url: "https://example.org/bebop".into(),
            }]),
            subtitle_kind: Some("softsub".into()),
            view_count: 10,
            download_count: 4,
            like_count: 1,
            lifecycle_status: Some("finished_airing".into()),
            approval_status: "published".into(),
            rejection_reason: None,
            created_at: Some(Utc::now()),
            updated_at: None,
        }
    }

    #[test]
    fn test_row_maps_to_entry() {
        let row = row();
        let id = row.id;
        let entry = Entry::from(row);

        assert_eq!(entry.id, id);
        assert_eq!(entry.approval_status, ApprovalStatus::Published);
        assert_eq!(entry.lifecycle_status, Some(LifecycleStatus::FinishedAiring));
        assert_eq!(entry.download_links.len(), 1);
        assert_eq!(entry.genres, vec!["Sci-Fi", "Noir"]);
        assert!(entry.submitter_name.is_empty());
    }

    #[test]
    fn test_stored_submitter_name_is_carried() {
        let mut row = row();
        row.submitter_name = Some("spike".into());
        assert_eq!(Entry::from(row).submitter_name, "spike");
    }

    #[test]
    fn test_unknown_statuses_are_tolerated() {
        let mut row = row();
        row.approval_status = "archived".into();
        row.lifecycle_status = Some("on_hiatus".into());

        let entry = Entry::from(row);
        assert_eq!(entry.approval_status, ApprovalStatus::Pending);
        assert_eq!(entry.lifecycle_status, None);
    }
}

//! # Update Schema
//!
//! Sanitizes and validates an [`EntryPatch`] before it reaches storage.
//! Every field is optional; a present field must satisfy its constraint.
//! All violations are collected, not just the first.

use crate::error::{AppError, FieldError};
use crate::models::{DownloadLink, EntryPatch};
use chrono::{Datelike, Utc};
use url::Url;

const MAX_TITLE: usize = 200;
const MAX_FILE_NAME: usize = 255;
const MAX_STUDIO: usize = 200;
const MAX_SUBTITLE_KIND: usize = 50;
const MAX_DESCRIPTION_SHORT: usize = 500;
const MAX_DESCRIPTION_LONG: usize = 10_000;
const MAX_REJECTION_REASON: usize = 1_000;
const MAX_CATEGORY_ID: usize = 64;
const MAX_GENRES: usize = 20;
const MAX_GENRE: usize = 50;
const MAX_LINKS: usize = 20;
const MAX_HOST_LABEL: usize = 50;
const MAX_EPISODES: i32 = 10_000;
const MIN_YEAR: i32 = 1900;
const YEARS_AHEAD: i32 = 5;

/// Trims and strips control characters other than newline and tab.
fn sanitize(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn sanitize_opt(value: Option<Option<String>>) -> Option<Option<String>> {
    value.map(|inner| inner.map(|s| sanitize(&s)))
}

struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.fail(field, "must not be empty");
        } else if len > max {
            self.fail(field, format!("must be at most {max} characters"));
        }
    }

    fn http_url(&mut self, field: &str, value: &str) {
        match Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(_) => self.fail(field, "must use http or https"),
            Err(_) => self.fail(field, "must be an absolute URL"),
        }
    }
}

/// Validates against the current calendar year.
pub fn validate_patch(patch: EntryPatch) -> Result<EntryPatch, AppError> {
    validate_patch_at(patch, Utc::now().year())
}

/// Validates with an explicit reference year for `releaseYear`.
pub fn validate_patch_at(patch: EntryPatch, current_year: i32) -> Result<EntryPatch, AppError> {
    let patch = EntryPatch {
        title: patch.title.map(|s| sanitize(&s)),
        title_alternate: sanitize_opt(patch.title_alternate),
        category_id: patch.category_id.map(|s| sanitize(&s)),
        genres: patch
            .genres
            .map(|genres| genres.iter().map(|g| sanitize(g)).collect()),
        studio: sanitize_opt(patch.studio),
        release_file_name: sanitize_opt(patch.release_file_name),
        description_short: sanitize_opt(patch.description_short),
        description_long: sanitize_opt(patch.description_long),
        cover_image_url: sanitize_opt(patch.cover_image_url),
        download_links: patch.download_links.map(|links| {
            links
                .into_iter()
                .map(|link| DownloadLink {
                    host_label: sanitize(&link.host_label),
                    url: sanitize(&link.url),
                })
                .collect()
        }),
        subtitle_kind: sanitize_opt(patch.subtitle_kind),
        rejection_reason: sanitize_opt(patch.rejection_reason),
        ..patch
    };

    let mut check = Checker { errors: Vec::new() };

    if let Some(title) = &patch.title {
        check.length("title", title, 1, MAX_TITLE);
    }
    if let Some(Some(alt)) = &patch.title_alternate {
        check.length("titleAlternate", alt, 0, MAX_TITLE);
    }
    if let Some(category) = &patch.category_id {
        check.length("categoryId", category, 1, MAX_CATEGORY_ID);
    }
    if let Some(Some(episodes)) = patch.episode_count {
        if !(0..=MAX_EPISODES).contains(&episodes) {
            check.fail("episodeCount", format!("must be between 0 and {MAX_EPISODES}"));
        }
    }
    if let Some(Some(year)) = patch.release_year {
        let max_year = current_year + YEARS_AHEAD;
        if !(MIN_YEAR..=max_year).contains(&year) {
            check.fail("releaseYear", format!("must be between {MIN_YEAR} and {max_year}"));
        }
    }
    if let Some(Some(rating)) = patch.rating_score {
        if !rating.is_finite() || !(0.0..=10.0).contains(&rating) {
            check.fail("ratingScore", "must be between 0 and 10");
        }
    }
    if let Some(genres) = &patch.genres {
        if genres.len() > MAX_GENRES {
            check.fail("genres", format!("must contain at most {MAX_GENRES} items"));
        }
        for (i, genre) in genres.iter().enumerate() {
            check.length(&format!("genres[{i}]"), genre, 1, MAX_GENRE);
        }
    }
    if let Some(Some(studio)) = &patch.studio {
        check.length("studio", studio, 0, MAX_STUDIO);
    }
    if let Some(Some(name)) = &patch.release_file_name {
        check.length("releaseFileName", name, 0, MAX_FILE_NAME);
    }
    if let Some(Some(short)) = &patch.description_short {
        check.length("descriptionShort", short, 0, MAX_DESCRIPTION_SHORT);
    }
    if let Some(Some(long)) = &patch.description_long {
        check.length("descriptionLong", long, 0, MAX_DESCRIPTION_LONG);
    }
    if let Some(Some(cover)) = &patch.cover_image_url {
        check.http_url("coverImageUrl", cover);
    }
    if let Some(links) = &patch.download_links {
        if links.len() > MAX_LINKS {
            check.fail("downloadLinks", format!("must contain at most {MAX_LINKS} items"));
        }
        for (i, link) in links.iter().enumerate() {
            check.length(&format!("downloadLinks[{i}].hostLabel"), &link.host_label, 1, MAX_HOST_LABEL);
            check.http_url(&format!("downloadLinks[{i}].url"), &link.url);
        }
    }
    if let Some(Some(kind)) = &patch.subtitle_kind {
        check.length("subtitleKind", kind, 0, MAX_SUBTITLE_KIND);
    }
    if let Some(Some(reason)) = &patch.rejection_reason {
        check.length("rejectionReason", reason, 0, MAX_REJECTION_REASON);
    }

    if check.errors.is_empty() {
        Ok(patch)
    } else {
        Err(AppError::ValidationError(check.errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(err: AppError) -> Vec<String> {
        match err {
            AppError::ValidationError(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_patch_is_valid() {
        assert!(validate_patch_at(EntryPatch::default(), 2026).is_ok());
    }

    #[test]
    fn test_strings_are_trimmed_and_stripped() {
        let patch = EntryPatch {
            title: Some("  Cowboy\u{0007} Bebop  ".into()),
            description_long: Some(Some("line one\nline two".into())),
            ..Default::default()
        };
        let clean = validate_patch_at(patch, 2026).unwrap();
        assert_eq!(clean.title.as_deref(), Some("Cowboy Bebop"));
        assert_eq!(
            clean.description_long,
            Some(Some("line one\nline two".to_string()))
        );
    }

    #[test]
    fn test_every_violation_is_reported() {
        let patch = EntryPatch {
            title: Some("   ".into()),
            rating_score: Some(Some(11.5)),
            release_year: Some(Some(1850)),
            cover_image_url: Some(Some("ftp://example.org/cover.png".into())),
            download_links: Some(vec![DownloadLink {
                host_label: "".into(),
                url: "not a url".into(),
            }]),
            ..Default::default()
        };

        let got = fields(validate_patch_at(patch, 2026).unwrap_err());
        assert_eq!(
            got,
            vec![
                "title",
                "releaseYear",
                "ratingScore",
                "coverImageUrl",
                "downloadLinks[0].hostLabel",
                "downloadLinks[0].url",
            ]
        );
    }

    #[test]
    fn test_release_year_window_follows_reference_year() {
        let patch = EntryPatch {
            release_year: Some(Some(2031)),
            ..Default::default()
        };
        assert!(validate_patch_at(patch.clone(), 2026).is_ok());
        assert!(validate_patch_at(patch, 2025).is_err());
    }

    #[test]
    fn test_rating_rejects_nan() {
        let patch = EntryPatch {
            rating_score: Some(Some(f64::NAN)),
            ..Default::default()
        };
        assert_eq!(fields(validate_patch_at(patch, 2026).unwrap_err()), vec!["ratingScore"]);
    }

    #[test]
    fn test_explicit_nulls_pass() {
        let patch = EntryPatch {
            studio: Some(None),
            rating_score: Some(None),
            cover_image_url: Some(None),
            ..Default::default()
        };
        assert!(validate_patch_at(patch, 2026).is_ok());
    }
}

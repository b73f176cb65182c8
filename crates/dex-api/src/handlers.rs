//! # dex-api Handlers
//!
//! This module coordinates the flow between HTTP requests, the
//! [`EntryService`] and the shared [`CatalogEngine`].

use crate::messages::{self, Locale};
use crate::response::{self, ApiError};
use crate::service::{parse_entry_id, DeleteOutcome, EntryService};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dex_catalog::{CatalogEngine, FilterChange, SortDirection, SortField, StatusCounts};
use dex_core::error::AppError;
use dex_core::models::{Category, Entry, EntryPatch, Identity, ALL_CATEGORIES};
use dex_core::moderation::StatusTransition;
use dex_core::traits::IdentityProvider;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub const MAX_PAGE_SIZE: usize = 100;

/// State shared across all request handlers.
pub struct AppState {
    pub entries: EntryService,
    pub auth: Arc<dyn IdentityProvider>,
    pub catalog: Mutex<CatalogEngine>,
    pub default_page_size: usize,
}

type HandlerResult<T> = std::result::Result<T, ApiError>;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn current_user(state: &AppState, headers: &HeaderMap) -> Option<Identity> {
    state.auth.current_user(bearer_token(headers)).await
}

/// Ensures the engine has data before it is queried.
async fn loaded_catalog(state: &AppState) -> tokio::sync::MutexGuard<'_, CatalogEngine> {
    let mut engine = state.catalog.lock().await;
    engine.load_categories(false).await;
    engine.load_entries(false).await;
    engine
}

/// Reloads the engine after a write so listings reflect it.
async fn refresh_catalog(state: &AppState) {
    let mut engine = state.catalog.lock().await;
    if engine.is_loaded() {
        engine.refresh().await;
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPage<'a> {
    pub entries: Vec<&'a Entry>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
}

fn parse_or_default<T: std::str::FromStr + Default>(raw: Option<&str>) -> T {
    raw.and_then(|s| s.parse().ok()).unwrap_or_default()
}

/// `GET /entries` - one page of published entries.
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Response {
    let mut engine = loaded_catalog(&state).await;

    let page_size = query
        .page_size
        .unwrap_or(state.default_page_size)
        .clamp(1, MAX_PAGE_SIZE);
    engine.update_filter(FilterChange {
        category_id: Some(query.category.unwrap_or_else(|| ALL_CATEGORIES.to_string())),
        search_text: Some(query.search.unwrap_or_default()),
        sort_field: Some(parse_or_default::<SortField>(query.sort.as_deref())),
        sort_direction: Some(parse_or_default::<SortDirection>(query.direction.as_deref())),
        page: None,
        page_size: Some(page_size),
    });
    engine.set_page(query.page.unwrap_or(1));

    let body = EntryPage {
        entries: engine.paginated_entries().iter().map(|e| e.as_ref()).collect(),
        page: engine.filter().page,
        page_size: engine.filter().page_size,
        total_pages: engine.total_pages(),
        total_count: engine.total_count(),
        message: engine.error().or(engine.message()),
    };
    Json(body).into_response()
}

/// `GET /categories`
pub async fn list_categories(State(state): State<Arc<AppState>>) -> Json<Vec<Category>> {
    let engine = loaded_catalog(&state).await;
    Json(engine.categories().to_vec())
}

/// `GET /entries/{id}`
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult<Json<Entry>> {
    let locale = Locale::from_headers(&headers);
    let id = parse_entry_id(&raw_id).map_err(|e| ApiError::new(e, locale))?;
    let user = current_user(&state, &headers).await;

    let entry = state
        .entries
        .get_entry(id, user.as_ref())
        .await
        .map_err(|e| ApiError::new(e, locale))?;
    Ok(Json(entry))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    #[serde(flatten)]
    pub entry: Entry,
    pub status_changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_change_message: Option<&'static str>,
}

/// `PUT /entries/{id}` - partial update.
pub async fn update_entry(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> HandlerResult<Json<UpdateResponse>> {
    let locale = Locale::from_headers(&headers);
    let id = parse_entry_id(&raw_id).map_err(|e| ApiError::new(e, locale))?;
    let patch: EntryPatch = serde_json::from_slice(&body)
        .map_err(|e| ApiError::new(AppError::invalid_body(e.to_string()), locale))?;
    let user = current_user(&state, &headers).await;

    let outcome = state
        .entries
        .update_entry(id, patch, user.as_ref())
        .await
        .map_err(|e| ApiError::new(e, locale))?;
    refresh_catalog(&state).await;

    let resubmitted = outcome.transition == StatusTransition::Resubmitted;
    Ok(Json(UpdateResponse {
        entry: outcome.entry,
        status_changed: outcome.transition.changed(),
        status_change_message: resubmitted.then(|| messages::resubmitted(locale)),
    }))
}

/// `DELETE /entries/{id}`
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult<Response> {
    let locale = Locale::from_headers(&headers);
    let id = parse_entry_id(&raw_id).map_err(|e| ApiError::new(e, locale))?;
    let user = current_user(&state, &headers).await;

    let outcome = state
        .entries
        .delete_entry(id, user.as_ref())
        .await
        .map_err(|e| ApiError::new(e, locale))?;
    if outcome == DeleteOutcome::Deleted {
        refresh_catalog(&state).await;
    } else {
        debug!(entry_id = %id, "delete was a no-op, catalog left as is");
    }

    Ok(Json(json!({ "success": true, "code": "DELETE_SUCCESS" })).into_response())
}

/// Fallback for unsupported methods on `/entries/{id}`.
pub async fn entry_method_not_allowed(headers: HeaderMap) -> Response {
    response::method_not_allowed(&["GET", "PUT", "DELETE"], Locale::from_headers(&headers))
}

async fn require_admin(state: &AppState, headers: &HeaderMap) -> HandlerResult<Identity> {
    match current_user(state, headers).await {
        Some(user) if user.is_admin() => Ok(user),
        _ => Err(ApiError::new(
            AppError::Forbidden("admin role required".into()),
            Locale::from_headers(headers),
        )),
    }
}

/// `GET /moderation/queue` - pending entries, newest first.
pub async fn moderation_queue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> HandlerResult<Json<Vec<Entry>>> {
    require_admin(&state, &headers).await?;
    let engine = loaded_catalog(&state).await;
    let pending = engine
        .pending_entries()
        .into_iter()
        .map(|e| e.as_ref().clone())
        .collect();
    Ok(Json(pending))
}

/// `GET /moderation/stats`
pub async fn moderation_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> HandlerResult<Json<StatusCounts>> {
    require_admin(&state, &headers).await?;
    let engine = loaded_catalog(&state).await;
    Ok(Json(engine.status_counts()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }
}

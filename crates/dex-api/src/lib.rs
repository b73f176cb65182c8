//! # dex-api
//!
//! The web routing and orchestration layer for Animedex.

pub mod handlers;
pub mod messages;
pub mod middleware;
pub mod response;
pub mod service;

pub use handlers::AppState;
pub use service::{DeleteOutcome, EntryService, UpdateOutcome};

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// Builds the application router.
///
/// The binary nests or serves this as-is; tests drive it with `oneshot`.
pub fn router(state: Arc<AppState>, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/entries", get(handlers::list_entries))
        .route(
            "/entries/{id}",
            get(handlers::get_entry)
                .put(handlers::update_entry)
                .delete(handlers::delete_entry)
                .fallback(handlers::entry_method_not_allowed),
        )
        .route("/categories", get(handlers::list_categories))
        .route("/moderation/queue", get(handlers::moderation_queue))
        .route("/moderation/stats", get(handlers::moderation_stats))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::trace_layer())
        .layer(middleware::cors_policy())
        .layer(middleware::panic_guard())
        .with_state(state)
}

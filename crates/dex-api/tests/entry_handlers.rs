//! Drives the full router against the in-memory gateway.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, TimeZone, Utc};
use dex_api::{router, AppState, EntryService};
use dex_catalog::CatalogEngine;
use dex_core::models::{ApprovalStatus, Entry, Identity, Role};
use dex_core::traits::{ElevatedGateway, IdentityProvider};
use dex_db_memory::MemoryCatalog;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

/// Maps fixed bearer tokens to identities.
struct StaticTokens(HashMap<&'static str, Identity>);

#[async_trait]
impl IdentityProvider for StaticTokens {
    async fn current_user(&self, bearer: Option<&str>) -> Option<Identity> {
        bearer.and_then(|token| self.0.get(token).cloned())
    }
}

struct Harness {
    store: Arc<MemoryCatalog>,
    owner: Identity,
    app: Router,
}

impl Harness {
    fn new(with_elevated: bool) -> Self {
        let store = Arc::new(MemoryCatalog::new());
        let owner = Identity {
            id: Uuid::new_v4(),
            role: Role::User,
        };
        let tokens = StaticTokens(HashMap::from([
            ("owner", owner.clone()),
            (
                "stranger",
                Identity {
                    id: Uuid::new_v4(),
                    role: Role::User,
                },
            ),
            (
                "admin",
                Identity {
                    id: Uuid::new_v4(),
                    role: Role::Admin,
                },
            ),
        ]));

        let elevated: Option<Arc<dyn ElevatedGateway>> = if with_elevated {
            Some(store.clone())
        } else {
            None
        };
        let state = Arc::new(AppState {
            entries: EntryService::new(store.clone(), elevated),
            auth: Arc::new(tokens),
            catalog: Mutex::new(CatalogEngine::new(store.clone())),
            default_page_size: 12,
        });

        Self {
            app: router(state, 64 * 1024),
            store,
            owner,
        }
    }

    fn seed(&self, title: &str, status: ApprovalStatus, days_ago: i64) -> Uuid {
        let mut entry = Entry::new(title, "tv");
        entry.submitter_id = Some(self.owner.id);
        entry.approval_status = status;
        entry.created_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() - Duration::days(days_ago));
        if status == ApprovalStatus::Rejected {
            entry.rejection_reason = Some("cover image missing".into());
        }
        let id = entry.id;
        self.store.insert_entry(entry);
        id
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send_request(request.body(body).unwrap()).await
    }

    async fn send_request(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, value)
    }
}

#[tokio::test]
async fn test_health() {
    let harness = Harness::new(true);
    let (status, _, body) = harness.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn test_listing_pages_published_entries_only() {
    let harness = Harness::new(true);
    harness.seed("Akira", ApprovalStatus::Published, 3);
    harness.seed("Berserk", ApprovalStatus::Published, 2);
    harness.seed("Claymore", ApprovalStatus::Published, 1);
    harness.seed("Dororo", ApprovalStatus::Pending, 0);

    let (status, _, body) = harness
        .send("GET", "/entries?pageSize=2&sort=title&direction=asc", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 3);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["entries"][0]["title"], "Akira");
    assert_eq!(body["entries"][1]["title"], "Berserk");

    let (_, _, body) = harness
        .send("GET", "/entries?pageSize=2&page=9", None, None)
        .await;
    assert_eq!(body["page"], 2);
    // Default sort is newest first; page 2 holds the oldest.
    assert_eq!(body["entries"][0]["title"], "Akira");
}

#[tokio::test]
async fn test_empty_catalog_carries_message() {
    let harness = Harness::new(true);
    let (status, _, body) = harness.send("GET", "/entries", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 0);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_update_rejects_malformed_id_and_body() {
    let harness = Harness::new(true);
    let (status, _, body) = harness
        .send("PUT", "/entries/not-a-uuid", Some("owner"), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ID");

    let id = harness.seed("Akira", ApprovalStatus::Published, 0);
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/entries/{id}"))
        .header(header::AUTHORIZATION, "Bearer owner")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = harness.send_request(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_BODY");
}

#[tokio::test]
async fn test_owner_edit_resubmits_rejected_entry() {
    let harness = Harness::new(true);
    let id = harness.seed("Akira", ApprovalStatus::Rejected, 0);

    let (status, _, body) = harness
        .send(
            "PUT",
            &format!("/entries/{id}"),
            Some("owner"),
            Some(json!({ "title": "AKIRA (1988)" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "AKIRA (1988)");
    assert_eq!(body["approvalStatus"], "pending");
    assert_eq!(body["rejectionReason"], Value::Null);
    assert_eq!(body["statusChanged"], true);
    assert!(body["statusChangeMessage"].is_string());

    let stored = harness.store.entry(id).unwrap();
    assert_eq!(stored.approval_status, ApprovalStatus::Pending);
}

#[tokio::test]
async fn test_non_content_edit_keeps_rejection() {
    let harness = Harness::new(true);
    let id = harness.seed("Akira", ApprovalStatus::Rejected, 0);

    let (status, _, body) = harness
        .send(
            "PUT",
            &format!("/entries/{id}"),
            Some("owner"),
            Some(json!({ "lifecycleStatus": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approvalStatus"], "rejected");
    assert_eq!(body["statusChanged"], false);
    assert!(body.get("statusChangeMessage").is_none());
}

#[tokio::test]
async fn test_update_authorization() {
    let harness = Harness::new(true);
    let id = harness.seed("Akira", ApprovalStatus::Published, 0);
    let uri = format!("/entries/{id}");

    let (status, _, body) = harness
        .send("PUT", &uri, Some("stranger"), Some(json!({ "title": "x" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _, _) = harness
        .send("PUT", &uri, None, Some(json!({ "title": "x" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(harness.store.entry(id).unwrap().title, "Akira");
}

#[tokio::test]
async fn test_validation_error_lists_fields() {
    let harness = Harness::new(true);
    let id = harness.seed("Akira", ApprovalStatus::Published, 0);

    let (status, _, body) = harness
        .send(
            "PUT",
            &format!("/entries/{id}"),
            Some("owner"),
            Some(json!({ "title": "", "ratingScore": 11, "coverImageUrl": "ftp://x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"title"));
    assert!(fields.contains(&"ratingScore"));
    assert!(fields.contains(&"coverImageUrl"));
}

#[tokio::test]
async fn test_update_of_unknown_entry_is_not_found() {
    let harness = Harness::new(true);
    let (status, _, body) = harness
        .send(
            "PUT",
            &format!("/entries/{}", Uuid::new_v4()),
            Some("admin"),
            Some(json!({ "title": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "POST_NOT_FOUND");
}

#[tokio::test]
async fn test_backend_failure_is_database_error() {
    let harness = Harness::new(true);
    let id = harness.seed("Akira", ApprovalStatus::Published, 0);
    harness.store.set_unavailable(true);

    let (status, _, body) = harness
        .send("PUT", &format!("/entries/{id}"), Some("admin"), Some(json!({ "title": "x" })))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "DATABASE_ERROR");
}

#[tokio::test]
async fn test_admin_publish_shows_up_in_listing() {
    let harness = Harness::new(true);
    let id = harness.seed("Akira", ApprovalStatus::Pending, 0);

    let (_, _, body) = harness.send("GET", "/entries", None, None).await;
    assert_eq!(body["totalCount"], 0);

    let (status, _, body) = harness
        .send(
            "PUT",
            &format!("/entries/{id}"),
            Some("admin"),
            Some(json!({ "approvalStatus": "published" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statusChanged"], true);

    let (_, _, body) = harness.send("GET", "/entries", None, None).await;
    assert_eq!(body["totalCount"], 1);
}

#[tokio::test]
async fn test_submitter_name_matches_across_list_get_and_update() {
    let harness = Harness::new(true);
    harness.store.insert_profile(harness.owner.id, "alice");
    let id = harness.seed("Akira", ApprovalStatus::Published, 0);
    let uri = format!("/entries/{id}");

    let (_, _, list) = harness.send("GET", "/entries", None, None).await;
    assert_eq!(list["entries"][0]["submitterName"], "alice");

    let (status, _, entry) = harness.send("GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["submitterName"], "alice");

    let (status, _, updated) = harness
        .send("PUT", &uri, Some("owner"), Some(json!({ "studio": "TMS" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["submitterName"], "alice");
}

#[tokio::test]
async fn test_submitter_without_profile_is_unknown() {
    let harness = Harness::new(true);
    let id = harness.seed("Akira", ApprovalStatus::Published, 0);

    let (_, _, entry) = harness.send("GET", &format!("/entries/{id}"), None, None).await;
    assert_eq!(entry["submitterName"], "Unknown");
}

#[tokio::test]
async fn test_delete_flows() {
    let harness = Harness::new(true);
    let id = harness.seed("Akira", ApprovalStatus::Published, 0);
    let uri = format!("/entries/{id}");

    let (status, _, _) = harness.send("DELETE", &uri, Some("stranger"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = harness.send("DELETE", &uri, Some("owner"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "code": "DELETE_SUCCESS" }));
    assert!(harness.store.entry(id).is_none());

    // A second delete matches nothing but still succeeds.
    let (status, _, body) = harness.send("DELETE", &uri, Some("admin"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "DELETE_SUCCESS");
}

#[tokio::test]
async fn test_delete_without_elevated_credential() {
    let harness = Harness::new(false);
    let id = harness.seed("Akira", ApprovalStatus::Published, 0);

    let (status, _, body) = harness
        .send("DELETE", &format!("/entries/{id}"), Some("admin"), None)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "CONFIGURATION_ERROR");
    assert!(harness.store.entry(id).is_some());
}

#[tokio::test]
async fn test_unsupported_method() {
    let harness = Harness::new(true);
    let (status, headers, body) = harness
        .send("PATCH", &format!("/entries/{}", Uuid::new_v4()), None, None)
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["code"], "METHOD_NOT_ALLOWED");
    assert_eq!(body["allowedMethods"], json!(["GET", "PUT", "DELETE"]));
    assert_eq!(headers[header::ALLOW], "GET, PUT, DELETE");
}

#[tokio::test]
async fn test_error_message_follows_accept_language() {
    let harness = Harness::new(true);
    let request = Request::builder()
        .method("GET")
        .uri("/entries/nope")
        .header(header::ACCEPT_LANGUAGE, "fr-FR,fr;q=0.9,en;q=0.5")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = harness.send_request(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ID");
    assert_eq!(body["message"], "L'identifiant de l'entrée n'est pas valide.");
}

#[tokio::test]
async fn test_moderation_endpoints_require_admin() {
    let harness = Harness::new(true);
    harness.seed("Akira", ApprovalStatus::Pending, 2);
    harness.seed("Berserk", ApprovalStatus::Pending, 1);
    harness.seed("Claymore", ApprovalStatus::Rejected, 0);
    harness.seed("Dororo", ApprovalStatus::Published, 0);

    let (status, _, _) = harness
        .send("GET", "/moderation/queue", Some("owner"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = harness
        .send("GET", "/moderation/queue", Some("admin"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["title"], "Berserk");
    assert_eq!(body[1]["title"], "Akira");

    let (_, _, body) = harness
        .send("GET", "/moderation/stats", Some("admin"), None)
        .await;
    assert_eq!(
        body,
        json!({ "pending": 2, "published": 1, "rejected": 1, "total": 4 })
    );
}

#[tokio::test]
async fn test_unpublished_entry_is_hidden_from_anonymous_readers() {
    let harness = Harness::new(true);
    let id = harness.seed("Akira", ApprovalStatus::Pending, 0);
    let uri = format!("/entries/{id}");

    let (status, _, _) = harness.send("GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, body) = harness.send("GET", &uri, Some("owner"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Akira");
}

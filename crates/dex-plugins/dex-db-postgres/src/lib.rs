//! # dex-db-postgres Implementation
//!
//! This module implements the data mapping between the Postgres relational
//! model (`posts`, `profiles`, `categories`) and the `dex-core` domain models.

pub mod row;

use async_trait::async_trait;
use dex_core::models::{Category, Entry, EntryPatch, Profile};
use dex_core::traits::{CatalogGateway, ElevatedGateway, GatewayError, GatewayResult};
use row::EntryRow;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

fn backend(err: sqlx::Error) -> GatewayError {
    match err {
        sqlx::Error::RowNotFound => GatewayError::NotFound,
        other => GatewayError::Backend(other.to_string()),
    }
}

pub async fn connect(url: &SecretString, max_connections: u32) -> GatewayResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url.expose_secret())
        .await
        .map_err(backend)
}

/// Applies the embedded schema migrations.
pub async fn migrate(pool: &PgPool) -> GatewayResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|err| GatewayError::Backend(err.to_string()))?;
    info!("database migrations applied");
    Ok(())
}

/// Row-level-policy bound gateway used for reads and updates.
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Builds `UPDATE posts SET ... WHERE id = $n RETURNING *` from the present
/// fields of `patch`. `None` when the patch writes nothing.
fn build_update(id: Uuid, patch: &EntryPatch) -> Option<QueryBuilder<'static, Postgres>> {
    if patch.is_empty() {
        return None;
    }

    let mut qb = QueryBuilder::new("UPDATE posts SET ");
    let mut set = qb.separated(", ");

    macro_rules! assign {
        ($column:literal, $value:expr) => {
            if let Some(value) = $value {
                set.push(concat!($column, " = "));
                set.push_bind_unseparated(value);
            }
        };
    }

    assign!("title", patch.title.clone());
    assign!("title_alternate", patch.title_alternate.clone());
    assign!("category_id", patch.category_id.clone());
    assign!("episode_count", patch.episode_count);
    assign!("release_year", patch.release_year);
    assign!("rating_score", patch.rating_score);
    assign!("genres", patch.genres.clone());
    assign!("studio", patch.studio.clone());
    assign!("release_file_name", patch.release_file_name.clone());
    assign!("description_short", patch.description_short.clone());
    assign!("description_long", patch.description_long.clone());
    assign!("cover_image_url", patch.cover_image_url.clone());
    assign!("download_links", patch.download_links.clone().map(Json));
    assign!("subtitle_kind", patch.subtitle_kind.clone());
    assign!(
        "lifecycle_status",
        patch.lifecycle_status.map(|s| s.map(|s| s.as_str().to_string()))
    );
    assign!("approval_status", patch.approval_status.map(|s| s.as_str().to_string()));
    assign!("rejection_reason", patch.rejection_reason.clone());
    assign!("updated_at", patch.updated_at);

    qb.push(" WHERE id = ");
    qb.push_bind(id);
    qb.push(" RETURNING *");
    Some(qb)
}

#[async_trait]
impl CatalogGateway for PgCatalog {
    async fn fetch_entries(&self) -> GatewayResult<Vec<Entry>> {
        let rows: Vec<EntryRow> =
            sqlx::query_as("SELECT * FROM posts ORDER BY created_at DESC NULLS LAST")
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;
        debug!(count = rows.len(), "fetched posts");
        Ok(rows.into_iter().map(Entry::from).collect())
    }

    async fn fetch_entry(&self, id: Uuid) -> GatewayResult<Option<Entry>> {
        let row: Option<EntryRow> = sqlx::query_as("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(row.map(Entry::from))
    }

    async fn fetch_profiles(&self, ids: &[Uuid]) -> GatewayResult<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<(Uuid, Option<String>)> =
            sqlx::query_as("SELECT id, username FROM profiles WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;
        Ok(rows
            .into_iter()
            .map(|(id, username)| Profile { id, username })
            .collect())
    }

    async fn fetch_categories(&self) -> GatewayResult<Vec<Category>> {
        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT id::text, name, parent_id::text FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(rows
            .into_iter()
            .map(|(id, name, parent_id)| Category {
                id,
                name,
                parent_id,
            })
            .collect())
    }

    async fn update_entry(&self, id: Uuid, patch: &EntryPatch) -> GatewayResult<Entry> {
        let Some(mut qb) = build_update(id, patch) else {
            return self.fetch_entry(id).await?.ok_or(GatewayError::NotFound);
        };

        let row: Option<EntryRow> = qb
            .build_query_as::<EntryRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.map(Entry::from).ok_or(GatewayError::NotFound)
    }
}

/// Gateway connected with the service-role credential, which bypasses
/// row-level policies. Only deletes go through it.
pub struct PgElevated {
    pool: PgPool,
}

impl PgElevated {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ElevatedGateway for PgElevated {
    async fn delete_entry(&self, id: Uuid) -> GatewayResult<u64> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }
}

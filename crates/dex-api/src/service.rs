//! # Entry Service
//!
//! Orchestrates single-entry reads, updates and deletes:
//! authorize, load current state, validate, apply the moderation rule,
//! persist, and emit an audit event at every decision point.

use chrono::Utc;
use dex_catalog::resolve_submitter_names;
use dex_core::audit::{AuditAction, AuditEvent, Outcome};
use dex_core::error::{AppError, Result};
use dex_core::models::{Entry, EntryPatch, Identity};
use dex_core::moderation::{self, EditorRights, StatusTransition};
use dex_core::traits::{CatalogGateway, ElevatedGateway};
use dex_core::validation::validate_patch;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Parses a path segment into an entry id.
pub fn parse_entry_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::invalid_id(format!("'{raw}' is not a UUID")))
}

/// Result of a successful update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub entry: Entry,
    pub transition: StatusTransition,
}

/// Result of a delete request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Nothing matched the id; reported as success to the caller.
    NoRowsAffected,
}

pub struct EntryService {
    gateway: Arc<dyn CatalogGateway>,
    elevated: Option<Arc<dyn ElevatedGateway>>,
}

impl EntryService {
    pub fn new(
        gateway: Arc<dyn CatalogGateway>,
        elevated: Option<Arc<dyn ElevatedGateway>>,
    ) -> Self {
        Self { gateway, elevated }
    }

    pub fn can_delete(&self) -> bool {
        self.elevated.is_some()
    }

    /// Unpublished entries are only visible to their submitter and admins.
    pub async fn get_entry(&self, id: Uuid, user: Option<&Identity>) -> Result<Entry> {
        let entry = self.load(id).await?;
        let visible = entry.is_published()
            || user.is_some_and(|u| u.is_admin() || entry.submitter_id == Some(u.id));
        if visible {
            Ok(self.with_submitter_name(entry).await)
        } else {
            Err(AppError::entry_not_found(id))
        }
    }

    async fn with_submitter_name(&self, entry: Entry) -> Entry {
        let mut entries = [entry];
        resolve_submitter_names(self.gateway.as_ref(), &mut entries).await;
        let [entry] = entries;
        entry
    }

    async fn load(&self, id: Uuid) -> Result<Entry> {
        match self.gateway.fetch_entry(id).await {
            Ok(Some(entry)) => Ok(entry),
            Ok(None) => Err(AppError::entry_not_found(id)),
            Err(err) => Err(AppError::from_gateway(err, id)),
        }
    }

    pub async fn update_entry(
        &self,
        id: Uuid,
        patch: EntryPatch,
        user: Option<&Identity>,
    ) -> Result<UpdateOutcome> {
        let entry_id = id.to_string();
        let audit = AuditEvent::new(AuditAction::EntryUpdate, user.map(|u| u.id), &entry_id);
        audit.emit();

        let result = self.apply_update(id, patch, user, &audit).await;
        match &result {
            Ok(outcome) => {
                let event = audit.clone().outcome(Outcome::Success);
                match outcome.transition {
                    StatusTransition::Resubmitted => event.reason("resubmitted for review").emit(),
                    _ => event.emit(),
                }
            }
            Err(AppError::Forbidden(_)) => {}
            Err(err) => audit.clone().outcome(Outcome::Failure).reason(err.code()).emit(),
        }
        result
    }

    async fn apply_update(
        &self,
        id: Uuid,
        patch: EntryPatch,
        user: Option<&Identity>,
        audit: &AuditEvent<'_>,
    ) -> Result<UpdateOutcome> {
        let user = require_user(user, audit)?;
        let current = self.load(id).await?;
        let rights = authorize(user, &current, audit)?;

        let mut patch = validate_patch(patch)?;
        let transition = moderation::apply(&mut patch, &current, rights);
        patch.updated_at = Some(Utc::now());

        let entry = self
            .gateway
            .update_entry(id, &patch)
            .await
            .map_err(|err| AppError::from_gateway(err, id))?;
        let entry = self.with_submitter_name(entry).await;

        Ok(UpdateOutcome { entry, transition })
    }

    pub async fn delete_entry(&self, id: Uuid, user: Option<&Identity>) -> Result<DeleteOutcome> {
        let entry_id = id.to_string();
        let audit = AuditEvent::new(AuditAction::EntryDelete, user.map(|u| u.id), &entry_id);
        audit.emit();

        let result = self.apply_delete(id, user, &audit).await;
        match &result {
            Ok(DeleteOutcome::Deleted) => audit.clone().outcome(Outcome::Success).emit(),
            Ok(DeleteOutcome::NoRowsAffected) => audit
                .clone()
                .outcome(Outcome::Success)
                .reason("no rows affected")
                .emit(),
            Err(AppError::Forbidden(_)) => {}
            Err(err) => audit.clone().outcome(Outcome::Failure).reason(err.code()).emit(),
        }
        result
    }

    async fn apply_delete(
        &self,
        id: Uuid,
        user: Option<&Identity>,
        audit: &AuditEvent<'_>,
    ) -> Result<DeleteOutcome> {
        let elevated = self.elevated.as_ref().ok_or_else(|| {
            AppError::ConfigurationError("delete requires an elevated database credential".into())
        })?;

        let user = require_user(user, audit)?;
        if !user.is_admin() {
            match self.gateway.fetch_entry(id).await {
                Ok(Some(current)) => {
                    authorize(user, &current, audit)?;
                }
                // Nothing to protect; the delete below reports zero rows.
                Ok(None) => {}
                Err(err) => return Err(AppError::from_gateway(err, id)),
            }
        } else {
            audit.clone().outcome(Outcome::Authorized).emit();
        }

        let affected = elevated
            .delete_entry(id)
            .await
            .map_err(|err| AppError::from_gateway(err, id))?;

        if affected == 0 {
            warn!(entry_id = %id, "delete affected no rows");
            Ok(DeleteOutcome::NoRowsAffected)
        } else {
            Ok(DeleteOutcome::Deleted)
        }
    }
}

fn require_user<'a>(user: Option<&'a Identity>, audit: &AuditEvent<'_>) -> Result<&'a Identity> {
    user.ok_or_else(|| {
        audit
            .clone()
            .outcome(Outcome::Denied)
            .reason("not authenticated")
            .emit();
        AppError::Forbidden("authentication required".into())
    })
}

fn authorize(user: &Identity, current: &Entry, audit: &AuditEvent<'_>) -> Result<EditorRights> {
    let rights = EditorRights {
        is_owner: current.submitter_id == Some(user.id),
        is_admin: user.is_admin(),
    };

    if rights.is_owner || rights.is_admin {
        audit.clone().outcome(Outcome::Authorized).emit();
        Ok(rights)
    } else {
        audit
            .clone()
            .outcome(Outcome::Denied)
            .reason("neither owner nor admin")
            .emit();
        Err(AppError::Forbidden("only the submitter or an admin may modify this entry".into()))
    }
}

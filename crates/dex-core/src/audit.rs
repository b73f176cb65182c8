//! # Audit Events
//!
//! Security-relevant decisions are emitted as `tracing` events under the
//! [`AUDIT_TARGET`] target so a subscriber can route them separately.

use std::fmt;
use uuid::Uuid;

pub const AUDIT_TARGET: &str = "animedex::audit";

/// Operation being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    EntryUpdate,
    EntryDelete,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuditAction::EntryUpdate => "entry.update",
            AuditAction::EntryDelete => "entry.delete",
        })
    }
}

/// Decision point reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Attempt,
    Authorized,
    Denied,
    Success,
    Failure,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Attempt => "attempt",
            Outcome::Authorized => "authorized",
            Outcome::Denied => "denied",
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        })
    }
}

#[derive(Debug, Clone)]
pub struct AuditEvent<'a> {
    pub action: AuditAction,
    pub actor_id: Option<Uuid>,
    pub entry_id: &'a str,
    pub outcome: Outcome,
    pub reason: Option<&'a str>,
}

impl<'a> AuditEvent<'a> {
    pub fn new(action: AuditAction, actor_id: Option<Uuid>, entry_id: &'a str) -> Self {
        Self {
            action,
            actor_id,
            entry_id,
            outcome: Outcome::Attempt,
            reason: None,
        }
    }

    pub fn outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn reason(mut self, reason: &'a str) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn emit(&self) {
        let actor = self
            .actor_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "anonymous".to_string());
        let reason = self.reason.unwrap_or("");

        match self.outcome {
            Outcome::Denied | Outcome::Failure => tracing::warn!(
                target: AUDIT_TARGET,
                event = %self.action,
                actor_id = %actor,
                entry_id = self.entry_id,
                outcome = %self.outcome,
                reason,
            ),
            _ => tracing::info!(
                target: AUDIT_TARGET,
                event = %self.action,
                actor_id = %actor,
                entry_id = self.entry_id,
                outcome = %self.outcome,
                reason,
            ),
        }
    }
}

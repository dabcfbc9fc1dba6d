// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (like "answer a fiction") lives in domain effects that use
// these traits.
//
// Naming convention: Base* for trait names (e.g., BaseScoreLedger)

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::common::{FictionId, MemberId};
use crate::domains::fictions::events::FictionEvent;

// =============================================================================
// Notification fan-out (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseNotificationService: Send + Sync {
    /// Publish a domain event to followers and affected members.
    ///
    /// Fire-and-forget from the caller's perspective: effects log a failure
    /// and move on; a state transition never rolls back over delivery.
    async fn publish(&self, event: FictionEvent) -> Result<()>;
}

// =============================================================================
// Gamification score ledger (Infrastructure)
// =============================================================================

/// Metrics the core touches. Scoring rules live with the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMetric {
    /// One point per support a member has placed.
    Support,
    /// One point per accepted fiction a member authored.
    AcceptedFictions,
}

#[async_trait]
pub trait BaseScoreLedger: Send + Sync {
    /// Best-effort increment; double delivery is tolerable.
    async fn increment(&self, member_id: MemberId, metric: ScoreMetric) -> Result<()>;

    /// Best-effort decrement; double delivery is tolerable.
    async fn decrement(&self, member_id: MemberId, metric: ScoreMetric) -> Result<()>;
}

// =============================================================================
// Audit trail (Infrastructure)
// =============================================================================

/// What a traceable change-record says happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Answered,
    AnswerPublished,
    Withdrawn,
    Created,
    ContentUpdated,
    ContentPublished,
}

#[async_trait]
pub trait BaseAuditTrail: Send + Sync {
    /// Record who changed what, when. Called exactly once per user-visible
    /// mutation, however many fields it touched.
    async fn record(&self, actor: MemberId, fiction_id: FictionId, action: AuditAction)
        -> Result<()>;
}

/// Scoped audit handle passed down a call path.
///
/// Bulk imports and internal propagations run with `suppressed()` so they
/// leave no per-fiction history; everything else runs `recorded(...)`. The
/// scope travels as a value, so suppression can never leak across tasks the
/// way a process-wide toggle would.
#[derive(Clone)]
pub struct AuditScope {
    trail: Option<Arc<dyn BaseAuditTrail>>,
}

impl AuditScope {
    pub fn recorded(trail: Arc<dyn BaseAuditTrail>) -> Self {
        Self { trail: Some(trail) }
    }

    pub fn suppressed() -> Self {
        Self { trail: None }
    }

    pub fn is_suppressed(&self) -> bool {
        self.trail.is_none()
    }

    /// Record one change-record, unless this scope is suppressed. Audit
    /// failures are logged and swallowed; they never fail the mutation.
    pub async fn record(&self, actor: MemberId, fiction_id: FictionId, action: AuditAction) {
        if let Some(trail) = &self.trail {
            if let Err(e) = trail.record(actor, fiction_id, action).await {
                tracing::warn!(
                    fiction_id = %fiction_id,
                    error = %e,
                    "Failed to write audit record"
                );
            }
        }
    }
}

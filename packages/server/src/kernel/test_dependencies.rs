// TestDependencies - recording implementations for testing
//
// Provides collaborator doubles that can be injected into ServerDeps for
// tests. Each double captures its calls so assertions can inspect exactly
// what the effects published, scored or audited.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::{AuditAction, BaseAuditTrail, BaseNotificationService, BaseScoreLedger, ScoreMetric};
use crate::common::{FictionId, MemberId};
use crate::domains::fictions::events::FictionEvent;

// =============================================================================
// Recording Notification Service
// =============================================================================

#[derive(Default)]
pub struct RecordingNotificationService {
    events: Arc<Mutex<Vec<FictionEvent>>>,
}

impl RecordingNotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far, in order.
    pub fn published(&self) -> Vec<FictionEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Whether an event with the given name was published.
    pub fn was_published(&self, name: &str) -> bool {
        self.events.lock().unwrap().iter().any(|e| e.name() == name)
    }
}

#[async_trait]
impl BaseNotificationService for RecordingNotificationService {
    async fn publish(&self, event: FictionEvent) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// A notification service that always fails delivery. State transitions must
/// still succeed when fan-out is down.
#[derive(Default)]
pub struct FailingNotificationService;

#[async_trait]
impl BaseNotificationService for FailingNotificationService {
    async fn publish(&self, _event: FictionEvent) -> Result<()> {
        Err(anyhow::anyhow!("notification bus unavailable"))
    }
}

// =============================================================================
// Recording Score Ledger
// =============================================================================

#[derive(Default)]
pub struct RecordingScoreLedger {
    deltas: Arc<Mutex<Vec<(MemberId, ScoreMetric, i64)>>>,
}

impl RecordingScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Net score for a member on one metric.
    pub fn score_for(&self, member_id: MemberId, metric: ScoreMetric) -> i64 {
        self.deltas
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, k, _)| *m == member_id && *k == metric)
            .map(|(_, _, delta)| delta)
            .sum()
    }
}

#[async_trait]
impl BaseScoreLedger for RecordingScoreLedger {
    async fn increment(&self, member_id: MemberId, metric: ScoreMetric) -> Result<()> {
        self.deltas.lock().unwrap().push((member_id, metric, 1));
        Ok(())
    }

    async fn decrement(&self, member_id: MemberId, metric: ScoreMetric) -> Result<()> {
        self.deltas.lock().unwrap().push((member_id, metric, -1));
        Ok(())
    }
}

// =============================================================================
// Recording Audit Trail
// =============================================================================

#[derive(Default)]
pub struct RecordingAuditTrail {
    records: Arc<Mutex<Vec<(MemberId, FictionId, AuditAction)>>>,
}

impl RecordingAuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Audit actions recorded against one fiction, in order.
    pub fn actions_for(&self, fiction_id: FictionId) -> Vec<AuditAction> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, f, _)| *f == fiction_id)
            .map(|(_, _, action)| *action)
            .collect()
    }

    /// Total records for one fiction - "exactly one change-record" checks.
    pub fn count_for(&self, fiction_id: FictionId) -> usize {
        self.actions_for(fiction_id).len()
    }
}

#[async_trait]
impl BaseAuditTrail for RecordingAuditTrail {
    async fn record(
        &self,
        actor: MemberId,
        fiction_id: FictionId,
        action: AuditAction,
    ) -> Result<()> {
        self.records.lock().unwrap().push((actor, fiction_id, action));
        Ok(())
    }
}

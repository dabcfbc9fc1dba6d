//! Server dependencies for effects (using traits for testability)
//!
//! The central dependency container handed to every domain effect. All
//! collaborators sit behind trait objects so tests can swap in the in-memory
//! store and the recording doubles from `test_dependencies`.

use std::sync::Arc;

use crate::domains::fictions::data::store::BaseFictionStore;
use crate::kernel::{AuditScope, BaseAuditTrail, BaseNotificationService, BaseScoreLedger};

/// Dependencies accessible to effects.
#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn BaseFictionStore>,
    pub notifications: Arc<dyn BaseNotificationService>,
    pub scores: Arc<dyn BaseScoreLedger>,
    pub audit_trail: Arc<dyn BaseAuditTrail>,
}

impl ServerDeps {
    pub fn new(
        store: Arc<dyn BaseFictionStore>,
        notifications: Arc<dyn BaseNotificationService>,
        scores: Arc<dyn BaseScoreLedger>,
        audit_trail: Arc<dyn BaseAuditTrail>,
    ) -> Self {
        Self {
            store,
            notifications,
            scores,
            audit_trail,
        }
    }

    /// A recording audit scope over the configured trail. Effects that must
    /// not pollute per-fiction history use [`AuditScope::suppressed`]
    /// instead.
    pub fn audit(&self) -> AuditScope {
        AuditScope::recorded(self.audit_trail.clone())
    }
}

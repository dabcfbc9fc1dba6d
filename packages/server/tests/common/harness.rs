use std::sync::Arc;

use server_core::domains::fictions::data::MemoryFictionStore;
use server_core::kernel::test_dependencies::{
    RecordingAuditTrail, RecordingNotificationService, RecordingScoreLedger,
};
use server_core::kernel::ServerDeps;

/// Test harness: in-memory store plus recording collaborator doubles, bundled
/// into the `ServerDeps` the effects take.
pub struct TestHarness {
    pub store: Arc<MemoryFictionStore>,
    pub notifications: Arc<RecordingNotificationService>,
    pub scores: Arc<RecordingScoreLedger>,
    pub audit: Arc<RecordingAuditTrail>,
    pub deps: ServerDeps,
}

impl TestHarness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryFictionStore::new());
        let notifications = Arc::new(RecordingNotificationService::new());
        let scores = Arc::new(RecordingScoreLedger::new());
        let audit = Arc::new(RecordingAuditTrail::new());
        let deps = ServerDeps::new(
            store.clone(),
            notifications.clone(),
            scores.clone(),
            audit.clone(),
        );
        Self {
            store,
            notifications,
            scores,
            audit,
            deps,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

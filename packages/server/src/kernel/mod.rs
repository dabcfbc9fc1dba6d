// Infrastructure kernel: dependency traits, the deps bundle, per-fiction
// locks and the recording doubles used by tests.

pub mod deps;
pub mod locks;
pub mod test_dependencies;
pub mod traits;

pub use deps::ServerDeps;
pub use locks::{FictionGuard, FictionLocks};
pub use traits::{
    AuditAction, AuditScope, BaseAuditTrail, BaseNotificationService, BaseScoreLedger,
    ScoreMetric,
};

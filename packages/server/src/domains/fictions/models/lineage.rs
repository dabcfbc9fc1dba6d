use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{FictionId, SpaceId};

/// LineageLink - "copied-from" provenance between an origin fiction and a copy
///
/// Written by Import, Merge and Split. Import consults these links to skip
/// origins already copied into a target space; same-space Merge and Split
/// consult them to link new copies to the origin's own provenance instead of
/// building multi-hop chains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageLink {
    pub origin_id: FictionId,
    pub copy_id: FictionId,
    /// Denormalized from the copy so idempotence checks need no join.
    pub copy_space_id: SpaceId,
    pub created_at: DateTime<Utc>,
}

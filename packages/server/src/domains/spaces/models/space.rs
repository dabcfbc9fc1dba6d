use serde::{Deserialize, Serialize};

use crate::common::{OrganizationId, SpaceId};

/// Space - a participatory space fictions live in
///
/// Read-mostly configuration input for the support engine and the answer
/// publication policy. Owned by an external admin surface; the core only
/// reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub id: SpaceId,
    pub organization_id: OrganizationId,
    pub support_settings: SupportSettings,
    /// When true, recording an answer also publishes it in the same unit.
    pub publish_answers_immediately: bool,
}

/// Per-space support (vote) configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SupportSettings {
    /// Maximum ledger rows (temporary + final) per fiction. 0 = unlimited.
    pub threshold_per_fiction: i64,
    /// When true, casts are still accepted once the threshold is reached.
    pub can_accumulate_supports_beyond_threshold: bool,
    /// Votes a member must place in the space before any of them count.
    /// 0 = disabled; every vote is final immediately.
    pub minimum_votes_per_user: i64,
}

impl Default for SupportSettings {
    fn default() -> Self {
        Self {
            threshold_per_fiction: 0,
            can_accumulate_supports_beyond_threshold: false,
            minimum_votes_per_user: 0,
        }
    }
}

impl SupportSettings {
    pub fn threshold_enabled(&self) -> bool {
        self.threshold_per_fiction > 0
    }

    pub fn minimum_votes_enabled(&self) -> bool {
        self.minimum_votes_per_user > 0
    }
}

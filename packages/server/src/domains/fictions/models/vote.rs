use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{FictionId, MemberId, SpaceId, VoteId};

/// Vote - one ledger row per (fiction, member)
///
/// `temporary` rows exist while the casting member has not yet committed to
/// the space's per-member minimum; they hold a slot against the fiction's
/// threshold but do not count toward `vote_count` until promoted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub id: VoteId,
    pub fiction_id: FictionId,
    pub author_id: MemberId,
    /// Kept on the row so promotion scans stay a single-table pass.
    pub space_id: SpaceId,
    pub temporary: bool,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn is_final(&self) -> bool {
        !self.temporary
    }
}

/// Input for persisting a vote through the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewVote {
    pub fiction_id: FictionId,
    pub author_id: MemberId,
    pub space_id: SpaceId,
    pub temporary: bool,
}

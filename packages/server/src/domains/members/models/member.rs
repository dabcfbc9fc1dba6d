use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{MemberId, OrganizationId};

/// Member - an organization member who submits and supports fictions
///
/// Authorization policy lives upstream; the core only needs organization
/// membership (vote validity) and the admin flag (answer/bulk commands).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    pub id: MemberId,
    pub organization_id: OrganizationId,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
}

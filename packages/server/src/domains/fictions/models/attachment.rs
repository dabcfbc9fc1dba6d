use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{AttachmentId, FictionId};

/// Attachment - file metadata hanging off a fiction
///
/// Only the metadata row lives here; blob storage is an external collaborator
/// addressed through `content_ref`. Import duplicates these rows onto copies.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FictionAttachment {
    pub id: AttachmentId,
    pub fiction_id: FictionId,
    pub filename: String,
    pub content_ref: String,
    pub created_at: DateTime<Utc>,
}

impl FictionAttachment {
    /// A duplicate of this attachment for a copied fiction. The blob is
    /// shared; only the metadata row is new.
    pub fn duplicate_for(&self, fiction_id: FictionId) -> Self {
        Self {
            id: AttachmentId::new(),
            fiction_id,
            filename: self.filename.clone(),
            content_ref: self.content_ref.clone(),
            created_at: Utc::now(),
        }
    }
}

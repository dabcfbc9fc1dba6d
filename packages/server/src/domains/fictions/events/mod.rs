use serde::{Deserialize, Serialize};

use crate::common::FictionId;
use crate::domains::fictions::models::InternalState;

/// Fictions domain events - immutable facts handed to the notification
/// fan-out. Delivery (recipient resolution, batching, retries) is owned by
/// the collaborator behind `BaseNotificationService`; publishing never blocks
/// a state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FictionEvent {
    /// A fiction's answer state became publicly observable, or moved while
    /// public.
    StatePublished {
        fiction_id: FictionId,
        previous: Option<InternalState>,
        state: InternalState,
    },

    /// An author withdrew their fiction.
    FictionWithdrawn { fiction_id: FictionId },
}

impl FictionEvent {
    /// Stable event name for routing and logs.
    pub fn name(&self) -> &'static str {
        match self {
            FictionEvent::StatePublished { .. } => "fictions.state_published",
            FictionEvent::FictionWithdrawn { .. } => "fictions.withdrawn",
        }
    }

    pub fn fiction_id(&self) -> FictionId {
        match self {
            FictionEvent::StatePublished { fiction_id, .. }
            | FictionEvent::FictionWithdrawn { fiction_id } => *fiction_id,
        }
    }
}

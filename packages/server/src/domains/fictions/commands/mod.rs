// Fictions domain command forms and their denial enums
//
// Forms arrive shape-checked by the presentation layer; the semantic checks
// live here and in the machines. Each command's denial enum lists exactly the
// reasons that command can refuse, so callers render distinct messages
// instead of parsing strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::{FictionId, SpaceId};
use crate::domains::fictions::models::InternalState;

// =============================================================================
// Answer
// =============================================================================

/// Administrator answer payload for a fiction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerForm {
    pub state: InternalState,
    pub answer: String,
    pub cost: Option<f64>,
    pub cost_report: Option<String>,
    pub execution_period: Option<String>,
}

impl AnswerForm {
    pub fn validate(&self) -> Result<(), FormViolation> {
        if !self.state.is_answerable() {
            return Err(FormViolation::UnanswerableState);
        }
        if self.answer.trim().is_empty() {
            return Err(FormViolation::MissingAnswerText);
        }
        Ok(())
    }
}

/// Shape problems in a submitted form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormViolation {
    #[error("answer text is required")]
    MissingAnswerText,
    #[error("withdrawal cannot be recorded as an answer")]
    UnanswerableState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AnswerDenial {
    #[error("fiction not found")]
    NotFound,
    #[error("fiction is not published")]
    NotPublished,
    #[error("fiction has been withdrawn")]
    Withdrawn,
    #[error("invalid answer: {0}")]
    InvalidForm(FormViolation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PublishAnswersDenial {
    #[error("no fiction in the set is eligible for publication")]
    NoEligibleFictions,
}

// =============================================================================
// Withdraw
// =============================================================================

/// Internal refusal set for the withdraw machine. The effects layer maps
/// `HasSupports` to its own outcome tag; the rest become `Invalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawRefusal {
    NotAuthor,
    AlreadyWithdrawn,
    HasSupports,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WithdrawDenial {
    #[error("fiction not found")]
    NotFound,
    #[error("only an author may withdraw a fiction")]
    NotAuthor,
    #[error("fiction is already withdrawn")]
    AlreadyWithdrawn,
}

/// Three-way outcome: withdrawal blocked by existing supports is a
/// user-facing condition distinct from validation failure.
#[derive(Debug, Clone)]
pub enum WithdrawOutcome {
    Ok(crate::domains::fictions::models::Fiction),
    Invalid(WithdrawDenial),
    HasSupports,
}

impl WithdrawOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

// =============================================================================
// Amendment outcome propagation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveDenial {
    #[error("fiction not found")]
    NotFound,
    #[error("fiction is withdrawn; its state is frozen")]
    Withdrawn,
}

// =============================================================================
// Votes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CastDenial {
    #[error("fiction not found")]
    NotFound,
    #[error("fiction has reached its support threshold")]
    ThresholdReached,
    #[error("member already supports this fiction")]
    AlreadyVoted,
    #[error("member and fiction belong to different organizations")]
    CrossOrganization,
    #[error("rejected fictions cannot receive supports")]
    FictionRejected,
    #[error("fiction is not open for supports")]
    FictionNotOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UncastDenial {
    #[error("fiction not found")]
    NotFound,
    #[error("member holds no support on this fiction")]
    VoteNotFound,
}

// =============================================================================
// Bulk commands
// =============================================================================

/// Import fictions from one space into another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportForm {
    pub origin_space: SpaceId,
    pub target_space: SpaceId,
    /// Internal states eligible for copying. Must be non-empty.
    pub states: Vec<InternalState>,
    /// Keep the origin authorship set; otherwise copies are official
    /// (organization-authored).
    pub keep_authors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ImportDenial {
    #[error("origin and target space are the same")]
    SameSpace,
    #[error("state filter is empty")]
    EmptyStateFilter,
    #[error("space not found")]
    UnknownSpace,
    #[error("origin and target belong to different organizations")]
    CrossOrganization,
}

/// Merge a set of fictions into one new fiction in the target space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeForm {
    pub fiction_ids: Vec<FictionId>,
    pub target_space: SpaceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MergeDenial {
    #[error("merging requires at least two fictions")]
    TooFewFictions,
    #[error("fiction not found")]
    UnknownFiction,
    #[error("only published fictions can be merged")]
    NotPublished,
    #[error("fictions to merge must share a space")]
    MixedOrigins,
    #[error("space not found")]
    UnknownSpace,
}

/// Split each fiction into independent copies in the target space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitForm {
    pub fiction_ids: Vec<FictionId>,
    pub target_space: SpaceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SplitDenial {
    #[error("no fictions to split")]
    NoFictions,
    #[error("fiction not found")]
    UnknownFiction,
    #[error("only published fictions can be split")]
    NotPublished,
    #[error("space not found")]
    UnknownSpace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BulkUpdateDenial {
    #[error("no fictions in the input set")]
    EmptyInput,
}

// =============================================================================
// Participatory text
// =============================================================================

/// One edit inside a participatory-text reorder batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextEditItem {
    pub fiction_id: FictionId,
    pub position: i32,
    pub title: String,
    pub body: String,
}

/// Why a single edit was refused. The reorder command reports these keyed by
/// fiction id and applies nothing when any edit is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EditRejection {
    #[error("title is empty")]
    EmptyTitle,
    #[error("body is empty")]
    EmptyBody,
    #[error("fiction not found")]
    UnknownFiction,
    #[error("fiction appears twice in the batch")]
    DuplicateFiction,
}

/// Failure map for the all-or-nothing reorder, keyed by fiction id.
pub type ReorderFailures = BTreeMap<FictionId, EditRejection>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PublishTextDenial {
    #[error("no fictions in the input set")]
    EmptyInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_form_requires_text_and_answerable_state() {
        let mut form = AnswerForm {
            state: InternalState::Accepted,
            answer: "We will fund this next quarter".to_string(),
            cost: Some(12_000.0),
            cost_report: None,
            execution_period: None,
        };
        assert!(form.validate().is_ok());

        form.answer = "   ".to_string();
        assert_eq!(form.validate(), Err(FormViolation::MissingAnswerText));

        form.answer = "ok".to_string();
        form.state = InternalState::Withdrawn;
        assert_eq!(form.validate(), Err(FormViolation::UnanswerableState));
    }
}

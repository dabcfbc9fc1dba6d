use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{AmendmentId, FictionId, MemberId, OrganizationId, SpaceId};

/// Fiction - a citizen proposal inside a participatory space
///
/// Carries two independent state dimensions: the internal answer state set by
/// an administrator (or by withdrawal), and the publication stamp that makes
/// that state publicly observable. Emendations delegate their observable state
/// to their amendment entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fiction {
    pub id: FictionId,
    pub space_id: SpaceId,
    pub organization_id: OrganizationId,

    // Content
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub scope: Option<String>,

    // Ordering key inside a participatory-text document
    pub position: Option<i32>,

    // Authorship set
    pub authors: Vec<Authorship>,

    // Lifecycle
    /// `None` means draft: mutable, excluded from counting, search and
    /// notifications.
    pub published_at: Option<DateTime<Utc>>,
    pub internal_state: Option<InternalState>,
    /// When set, `internal_state` is the publicly observable state.
    /// Withdrawal is observable without this stamp.
    pub state_published_at: Option<DateTime<Utc>>,
    pub answered_at: Option<DateTime<Utc>>,

    // Answer payload
    pub answer: Option<String>,
    pub cost: Option<f64>,
    pub cost_report: Option<String>,
    pub execution_period: Option<String>,

    /// Present iff this fiction is an emendation of another fiction.
    pub amendment_id: Option<AmendmentId>,

    /// Denormalized count of final ledger rows. Owned by the ledger write
    /// path; recomputed from the ledger, never incremented in place.
    pub vote_count: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fiction {
    pub fn is_draft(&self) -> bool {
        self.published_at.is_none()
    }

    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    pub fn is_withdrawn(&self) -> bool {
        self.internal_state == Some(InternalState::Withdrawn)
    }

    pub fn is_answered(&self) -> bool {
        self.answered_at.is_some()
    }

    pub fn is_emendation(&self) -> bool {
        self.amendment_id.is_some()
    }

    pub fn authored_by(&self, member_id: MemberId) -> bool {
        self.authors
            .iter()
            .any(|author| matches!(author, Authorship::Member(id) if *id == member_id))
    }

    /// The state dimension of this fiction as an explicit tagged union.
    pub fn state(&self) -> FictionState {
        match self.amendment_id {
            Some(amendment_id) => FictionState::Delegated(amendment_id),
            None => FictionState::Owned {
                internal: self.internal_state,
                published_at: self.state_published_at,
            },
        }
    }

    /// Read-time state resolution. Pure, no side effects.
    ///
    /// For an emendation the amendment's state is authoritative and the
    /// fiction's own fields are ignored; otherwise the internal state is
    /// visible once published, with withdrawal always visible.
    pub fn observable_state(
        &self,
        amendment_state: Option<InternalState>,
    ) -> Option<InternalState> {
        match self.state() {
            FictionState::Delegated(_) => amendment_state,
            FictionState::Owned {
                internal,
                published_at,
            } => match internal {
                Some(InternalState::Withdrawn) => Some(InternalState::Withdrawn),
                Some(state) if published_at.is_some() => Some(state),
                _ => None,
            },
        }
    }
}

/// One entry of a fiction's authorship set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Authorship {
    Member(MemberId),
    /// Official authorship - the organization itself signs the fiction.
    Organization(OrganizationId),
}

/// The state dimension of a fiction, made explicit.
///
/// `Delegated` replaces the aliased-column-plus-getter-override trick: an
/// emendation's observable state is the amendment's state, full stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FictionState {
    Delegated(AmendmentId),
    Owned {
        internal: Option<InternalState>,
        published_at: Option<DateTime<Utc>>,
    },
}

// =============================================================================
// Enums for type-safe states
// =============================================================================

/// Internal answer state enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InternalState {
    Evaluating,
    Accepted,
    Rejected,
    Withdrawn,
}

impl InternalState {
    /// States an administrator may record through the answer command.
    /// Withdrawal only ever happens through the withdraw command.
    pub fn is_answerable(&self) -> bool {
        !matches!(self, InternalState::Withdrawn)
    }
}

impl std::fmt::Display for InternalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InternalState::Evaluating => write!(f, "evaluating"),
            InternalState::Accepted => write!(f, "accepted"),
            InternalState::Rejected => write!(f, "rejected"),
            InternalState::Withdrawn => write!(f, "withdrawn"),
        }
    }
}

impl std::str::FromStr for InternalState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "evaluating" => Ok(InternalState::Evaluating),
            "accepted" => Ok(InternalState::Accepted),
            "rejected" => Ok(InternalState::Rejected),
            "withdrawn" => Ok(InternalState::Withdrawn),
            _ => Err(anyhow::anyhow!("Invalid internal state: {}", s)),
        }
    }
}

/// Input for creating a fiction through the store.
#[derive(Debug, Clone)]
pub struct NewFiction {
    pub space_id: SpaceId,
    pub organization_id: OrganizationId,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub scope: Option<String>,
    pub position: Option<i32>,
    pub authors: Vec<Authorship>,
    pub published_at: Option<DateTime<Utc>>,
    pub amendment_id: Option<AmendmentId>,
}

impl NewFiction {
    /// A scrubbed copy of `origin` for Import/Merge/Split: title, body and
    /// category only. State, answer, timestamps, position and amendment
    /// reference are deliberately reset; the copy is published immediately.
    pub fn scrubbed_from(origin: &Fiction, target_space: SpaceId, authors: Vec<Authorship>) -> Self {
        Self {
            space_id: target_space,
            organization_id: origin.organization_id,
            title: origin.title.clone(),
            body: origin.body.clone(),
            category: origin.category.clone(),
            scope: None,
            position: None,
            authors,
            published_at: Some(Utc::now()),
            amendment_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fiction() -> Fiction {
        Fiction {
            id: FictionId::new(),
            space_id: SpaceId::new(),
            organization_id: OrganizationId::new(),
            title: "Shade the playground".to_string(),
            body: "Plant trees along the south fence".to_string(),
            category: Some("parks".to_string()),
            scope: None,
            position: None,
            authors: vec![],
            published_at: Some(Utc::now()),
            internal_state: None,
            state_published_at: None,
            answered_at: None,
            answer: None,
            cost: None,
            cost_report: None,
            execution_period: None,
            amendment_id: None,
            vote_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unanswered_fiction_has_no_observable_state() {
        let f = fiction();
        assert_eq!(f.observable_state(None), None);
    }

    #[test]
    fn internal_state_is_hidden_until_published() {
        let mut f = fiction();
        f.internal_state = Some(InternalState::Accepted);
        assert_eq!(f.observable_state(None), None);

        f.state_published_at = Some(Utc::now());
        assert_eq!(f.observable_state(None), Some(InternalState::Accepted));
    }

    #[test]
    fn withdrawal_is_observable_without_publication() {
        let mut f = fiction();
        f.internal_state = Some(InternalState::Withdrawn);
        assert_eq!(f.observable_state(None), Some(InternalState::Withdrawn));
    }

    #[test]
    fn emendation_delegates_to_amendment_state() {
        let mut f = fiction();
        f.amendment_id = Some(AmendmentId::new());
        // Own fields are ignored entirely, even a published rejection.
        f.internal_state = Some(InternalState::Rejected);
        f.state_published_at = Some(Utc::now());

        assert_eq!(
            f.observable_state(Some(InternalState::Evaluating)),
            Some(InternalState::Evaluating)
        );
        assert_eq!(f.observable_state(None), None);
    }

    #[test]
    fn authorship_lookup_only_matches_members() {
        let member = MemberId::new();
        let mut f = fiction();
        f.authors = vec![
            Authorship::Organization(f.organization_id),
            Authorship::Member(member),
        ];

        assert!(f.authored_by(member));
        assert!(!f.authored_by(MemberId::new()));
    }

    #[test]
    fn scrubbed_copy_resets_lifecycle_fields() {
        let mut origin = fiction();
        origin.internal_state = Some(InternalState::Accepted);
        origin.state_published_at = Some(Utc::now());
        origin.answered_at = Some(Utc::now());
        origin.answer = Some("done".to_string());
        origin.position = Some(3);

        let target = SpaceId::new();
        let copy = NewFiction::scrubbed_from(&origin, target, vec![]);

        assert_eq!(copy.space_id, target);
        assert_eq!(copy.title, origin.title);
        assert_eq!(copy.body, origin.body);
        assert_eq!(copy.category, origin.category);
        assert_eq!(copy.position, None);
        assert!(copy.published_at.is_some());
        assert!(copy.amendment_id.is_none());
    }
}

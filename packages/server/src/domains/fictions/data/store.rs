//! The persistence contract for the fiction core.
//!
//! Effects depend on this narrow abstraction, never on a concrete backend.
//! The two backends are `MemoryFictionStore` (hermetic tests, single-node
//! deployments) and `PgFictionStore` (sqlx/Postgres).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::common::{AmendmentId, FictionId, MemberId, SpaceId};
use crate::domains::fictions::models::{
    Fiction, FictionAttachment, InternalState, LineageLink, NewFiction, NewVote, Vote,
};
use crate::domains::members::models::Member;
use crate::domains::spaces::models::Space;
use crate::kernel::locks::FictionGuard;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    /// The `(fiction_id, author_id)` uniqueness constraint fired.
    #[error("member {author_id} already holds a vote on fiction {fiction_id}")]
    DuplicateVote {
        fiction_id: FictionId,
        author_id: MemberId,
    },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Backend(e.into())
    }
}

/// The answer payload persisted in one write by [`BaseFictionStore::record_answer`].
#[derive(Debug, Clone)]
pub struct AnswerRecord {
    pub state: InternalState,
    pub answer: String,
    pub cost: Option<f64>,
    pub cost_report: Option<String>,
    pub execution_period: Option<String>,
    pub answered_at: DateTime<Utc>,
    /// `Some` stamps `state_published_at`; an existing stamp is never
    /// overwritten (the machines only plan a stamp when none exists).
    pub publish_stamp: Option<DateTime<Utc>>,
}

/// Abstraction over the fiction core's storage backend.
///
/// Mutating methods are single round trips; multi-step sequences are composed
/// by the effects layer while holding the fiction's lock from
/// [`lock_fiction`](Self::lock_fiction).
#[async_trait]
pub trait BaseFictionStore: Send + Sync {
    // ── Locking ───────────────────────────────────────────────────────────

    /// Acquire the exclusive per-fiction lock guarding check-then-act
    /// sequences on that fiction's ledger and counters.
    async fn lock_fiction(&self, id: FictionId) -> FictionGuard;

    /// Acquire a whole set of fiction locks in deadlock-safe order.
    async fn lock_fictions(&self, ids: &[FictionId]) -> Vec<FictionGuard>;

    // ── Read-mostly collaborator entities ─────────────────────────────────

    async fn find_space(&self, id: SpaceId) -> StoreResult<Option<Space>>;

    async fn find_member(&self, id: MemberId) -> StoreResult<Option<Member>>;

    // ── Fictions ──────────────────────────────────────────────────────────

    async fn find_fiction(&self, id: FictionId) -> StoreResult<Option<Fiction>>;

    async fn fictions_in_space(&self, space_id: SpaceId) -> StoreResult<Vec<Fiction>>;

    async fn insert_fiction(&self, new: NewFiction) -> StoreResult<Fiction>;

    /// Hard delete. Cascades to the fiction's votes, attachments and lineage
    /// rows referencing it.
    async fn delete_fiction(&self, id: FictionId) -> StoreResult<()>;

    /// Record an administrator answer in one write.
    async fn record_answer(&self, id: FictionId, record: &AnswerRecord) -> StoreResult<Fiction>;

    /// Stamp `state_published_at` if it is still unset.
    async fn publish_state(&self, id: FictionId, at: DateTime<Utc>) -> StoreResult<Fiction>;

    /// Set the internal state directly (withdrawal, amendment propagation),
    /// optionally stamping `state_published_at` when still unset.
    async fn set_internal_state(
        &self,
        id: FictionId,
        state: InternalState,
        publish_stamp: Option<DateTime<Utc>>,
    ) -> StoreResult<Fiction>;

    /// Replace title, body and position in one write.
    async fn update_content(
        &self,
        id: FictionId,
        title: &str,
        body: &str,
        position: Option<i32>,
    ) -> StoreResult<Fiction>;

    /// Stamp `published_at` if the fiction is still a draft.
    async fn publish_fiction(&self, id: FictionId, at: DateTime<Utc>) -> StoreResult<Fiction>;

    async fn set_category(&self, id: FictionId, category: Option<&str>) -> StoreResult<Fiction>;

    async fn set_scope(&self, id: FictionId, scope: Option<&str>) -> StoreResult<Fiction>;

    // ── Vote ledger ───────────────────────────────────────────────────────

    async fn find_vote(
        &self,
        fiction_id: FictionId,
        author_id: MemberId,
    ) -> StoreResult<Option<Vote>>;

    /// Persist a vote row. Fails with [`StoreError::DuplicateVote`] when the
    /// member already holds a row on the fiction.
    async fn insert_vote(&self, new: NewVote) -> StoreResult<Vote>;

    /// Remove a member's row. Returns `false` when none existed.
    async fn delete_vote(&self, fiction_id: FictionId, author_id: MemberId) -> StoreResult<bool>;

    /// Total row count for a fiction, temporary rows included. This is the
    /// number the threshold check runs against.
    async fn ledger_count(&self, fiction_id: FictionId) -> StoreResult<i64>;

    /// A member's total row count across one space.
    async fn member_vote_total(
        &self,
        author_id: MemberId,
        space_id: SpaceId,
    ) -> StoreResult<i64>;

    /// Flip all of a member's rows in a space to the given temporary flag.
    /// Returns the fictions whose rows actually changed.
    async fn set_member_votes_temporary(
        &self,
        author_id: MemberId,
        space_id: SpaceId,
        temporary: bool,
    ) -> StoreResult<Vec<FictionId>>;

    /// Recompute `vote_count` from the ledger (final rows only) and persist
    /// it. Returns the fresh count.
    async fn recount_votes(&self, fiction_id: FictionId) -> StoreResult<i64>;

    // ── Amendments (externally resolved) ──────────────────────────────────

    /// Current state of an amendment, if known.
    async fn amendment_state(&self, id: AmendmentId) -> StoreResult<Option<InternalState>>;

    /// Emendation fictions of `fiction_id` whose amendment is still open.
    async fn open_emendations_of(&self, fiction_id: FictionId) -> StoreResult<Vec<Fiction>>;

    /// Reject an amendment if it is still open. Returns whether the
    /// rejection took effect.
    async fn reject_amendment(&self, id: AmendmentId) -> StoreResult<bool>;

    // ── Lineage & attachments ─────────────────────────────────────────────

    async fn record_lineage(&self, link: LineageLink) -> StoreResult<()>;

    /// Whether `origin` already has a copied-from link into `space`.
    async fn has_copy_in_space(&self, origin: FictionId, space: SpaceId) -> StoreResult<bool>;

    /// The fictions `fiction_id` was itself copied from.
    async fn provenance_of(&self, fiction_id: FictionId) -> StoreResult<Vec<FictionId>>;

    async fn attachments_for(&self, fiction_id: FictionId)
        -> StoreResult<Vec<FictionAttachment>>;

    async fn insert_attachment(&self, attachment: FictionAttachment) -> StoreResult<()>;
}

//! In-process storage backend.
//!
//! Backs the hermetic test suite and single-node deployments. All tables
//! live behind one `RwLock`, so every trait method is atomic on its own;
//! multi-step sequences are serialized by the per-fiction locks the effects
//! hold around them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::common::{AmendmentId, FictionId, MemberId, SpaceId};
use crate::domains::fictions::models::{
    Fiction, FictionAttachment, InternalState, LineageLink, NewFiction, NewVote, Vote,
};
use crate::domains::members::models::Member;
use crate::domains::spaces::models::Space;
use crate::kernel::locks::{FictionGuard, FictionLocks};

use super::store::{AnswerRecord, BaseFictionStore, StoreError, StoreResult};

/// An amendment row as maintained by the external resolver.
#[derive(Debug, Clone)]
pub struct AmendmentRecord {
    pub id: AmendmentId,
    /// The fiction being amended.
    pub amendable_id: FictionId,
    /// The emendation fiction carrying the proposed text.
    pub emendation_id: FictionId,
    pub state: Option<InternalState>,
}

impl AmendmentRecord {
    pub fn is_open(&self) -> bool {
        matches!(self.state, None | Some(InternalState::Evaluating))
    }
}

#[derive(Default)]
struct Tables {
    spaces: HashMap<SpaceId, Space>,
    members: HashMap<MemberId, Member>,
    fictions: HashMap<FictionId, Fiction>,
    votes: HashMap<(FictionId, MemberId), Vote>,
    amendments: HashMap<AmendmentId, AmendmentRecord>,
    lineage: Vec<LineageLink>,
    attachments: Vec<FictionAttachment>,
}

/// In-memory `BaseFictionStore` backend.
#[derive(Clone, Default)]
pub struct MemoryFictionStore {
    tables: Arc<RwLock<Tables>>,
    locks: FictionLocks,
}

impl MemoryFictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Seeding (spaces, members and amendments are owned by external
    //    collaborators; tests and hosts load them directly) ───────────────

    pub async fn seed_space(&self, space: Space) {
        self.tables.write().await.spaces.insert(space.id, space);
    }

    pub async fn seed_member(&self, member: Member) {
        self.tables.write().await.members.insert(member.id, member);
    }

    pub async fn seed_amendment(&self, record: AmendmentRecord) {
        self.tables.write().await.amendments.insert(record.id, record);
    }

    /// Test hook: the resolver-side amendment state.
    pub async fn set_amendment_state(&self, id: AmendmentId, state: Option<InternalState>) {
        if let Some(record) = self.tables.write().await.amendments.get_mut(&id) {
            record.state = state;
        }
    }
}

#[async_trait]
impl BaseFictionStore for MemoryFictionStore {
    // ── Locking ───────────────────────────────────────────────────────────

    async fn lock_fiction(&self, id: FictionId) -> FictionGuard {
        self.locks.acquire(id).await
    }

    async fn lock_fictions(&self, ids: &[FictionId]) -> Vec<FictionGuard> {
        self.locks.acquire_all(ids).await
    }

    // ── Read-mostly collaborator entities ─────────────────────────────────

    async fn find_space(&self, id: SpaceId) -> StoreResult<Option<Space>> {
        Ok(self.tables.read().await.spaces.get(&id).cloned())
    }

    async fn find_member(&self, id: MemberId) -> StoreResult<Option<Member>> {
        Ok(self.tables.read().await.members.get(&id).cloned())
    }

    // ── Fictions ──────────────────────────────────────────────────────────

    async fn find_fiction(&self, id: FictionId) -> StoreResult<Option<Fiction>> {
        Ok(self.tables.read().await.fictions.get(&id).cloned())
    }

    async fn fictions_in_space(&self, space_id: SpaceId) -> StoreResult<Vec<Fiction>> {
        let tables = self.tables.read().await;
        let mut fictions: Vec<Fiction> = tables
            .fictions
            .values()
            .filter(|f| f.space_id == space_id)
            .cloned()
            .collect();
        // V7 ids are time-ordered; sort for deterministic iteration.
        fictions.sort_by_key(|f| f.id);
        Ok(fictions)
    }

    async fn insert_fiction(&self, new: NewFiction) -> StoreResult<Fiction> {
        let now = Utc::now();
        let fiction = Fiction {
            id: FictionId::new(),
            space_id: new.space_id,
            organization_id: new.organization_id,
            title: new.title,
            body: new.body,
            category: new.category,
            scope: new.scope,
            position: new.position,
            authors: new.authors,
            published_at: new.published_at,
            internal_state: None,
            state_published_at: None,
            answered_at: None,
            answer: None,
            cost: None,
            cost_report: None,
            execution_period: None,
            amendment_id: new.amendment_id,
            vote_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .fictions
            .insert(fiction.id, fiction.clone());
        Ok(fiction)
    }

    async fn delete_fiction(&self, id: FictionId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.fictions.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        tables.votes.retain(|(fiction_id, _), _| *fiction_id != id);
        tables.attachments.retain(|a| a.fiction_id != id);
        tables
            .lineage
            .retain(|link| link.origin_id != id && link.copy_id != id);
        Ok(())
    }

    async fn record_answer(&self, id: FictionId, record: &AnswerRecord) -> StoreResult<Fiction> {
        let mut tables = self.tables.write().await;
        let fiction = tables.fictions.get_mut(&id).ok_or(StoreError::NotFound)?;
        fiction.internal_state = Some(record.state);
        fiction.answer = Some(record.answer.clone());
        fiction.cost = record.cost;
        fiction.cost_report = record.cost_report.clone();
        fiction.execution_period = record.execution_period.clone();
        fiction.answered_at = Some(record.answered_at);
        if fiction.state_published_at.is_none() {
            fiction.state_published_at = record.publish_stamp;
        }
        fiction.updated_at = Utc::now();
        Ok(fiction.clone())
    }

    async fn publish_state(&self, id: FictionId, at: DateTime<Utc>) -> StoreResult<Fiction> {
        let mut tables = self.tables.write().await;
        let fiction = tables.fictions.get_mut(&id).ok_or(StoreError::NotFound)?;
        if fiction.state_published_at.is_none() {
            fiction.state_published_at = Some(at);
            fiction.updated_at = Utc::now();
        }
        Ok(fiction.clone())
    }

    async fn set_internal_state(
        &self,
        id: FictionId,
        state: InternalState,
        publish_stamp: Option<DateTime<Utc>>,
    ) -> StoreResult<Fiction> {
        let mut tables = self.tables.write().await;
        let fiction = tables.fictions.get_mut(&id).ok_or(StoreError::NotFound)?;
        fiction.internal_state = Some(state);
        if fiction.state_published_at.is_none() {
            fiction.state_published_at = publish_stamp;
        }
        fiction.updated_at = Utc::now();
        Ok(fiction.clone())
    }

    async fn update_content(
        &self,
        id: FictionId,
        title: &str,
        body: &str,
        position: Option<i32>,
    ) -> StoreResult<Fiction> {
        let mut tables = self.tables.write().await;
        let fiction = tables.fictions.get_mut(&id).ok_or(StoreError::NotFound)?;
        fiction.title = title.to_string();
        fiction.body = body.to_string();
        fiction.position = position;
        fiction.updated_at = Utc::now();
        Ok(fiction.clone())
    }

    async fn publish_fiction(&self, id: FictionId, at: DateTime<Utc>) -> StoreResult<Fiction> {
        let mut tables = self.tables.write().await;
        let fiction = tables.fictions.get_mut(&id).ok_or(StoreError::NotFound)?;
        if fiction.published_at.is_none() {
            fiction.published_at = Some(at);
            fiction.updated_at = Utc::now();
        }
        Ok(fiction.clone())
    }

    async fn set_category(&self, id: FictionId, category: Option<&str>) -> StoreResult<Fiction> {
        let mut tables = self.tables.write().await;
        let fiction = tables.fictions.get_mut(&id).ok_or(StoreError::NotFound)?;
        fiction.category = category.map(str::to_string);
        fiction.updated_at = Utc::now();
        Ok(fiction.clone())
    }

    async fn set_scope(&self, id: FictionId, scope: Option<&str>) -> StoreResult<Fiction> {
        let mut tables = self.tables.write().await;
        let fiction = tables.fictions.get_mut(&id).ok_or(StoreError::NotFound)?;
        fiction.scope = scope.map(str::to_string);
        fiction.updated_at = Utc::now();
        Ok(fiction.clone())
    }

    // ── Vote ledger ───────────────────────────────────────────────────────

    async fn find_vote(
        &self,
        fiction_id: FictionId,
        author_id: MemberId,
    ) -> StoreResult<Option<Vote>> {
        Ok(self
            .tables
            .read()
            .await
            .votes
            .get(&(fiction_id, author_id))
            .cloned())
    }

    async fn insert_vote(&self, new: NewVote) -> StoreResult<Vote> {
        let mut tables = self.tables.write().await;
        let key = (new.fiction_id, new.author_id);
        if tables.votes.contains_key(&key) {
            return Err(StoreError::DuplicateVote {
                fiction_id: new.fiction_id,
                author_id: new.author_id,
            });
        }
        let vote = Vote {
            id: crate::common::VoteId::new(),
            fiction_id: new.fiction_id,
            author_id: new.author_id,
            space_id: new.space_id,
            temporary: new.temporary,
            created_at: Utc::now(),
        };
        tables.votes.insert(key, vote.clone());
        Ok(vote)
    }

    async fn delete_vote(&self, fiction_id: FictionId, author_id: MemberId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.votes.remove(&(fiction_id, author_id)).is_some())
    }

    async fn ledger_count(&self, fiction_id: FictionId) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .votes
            .values()
            .filter(|v| v.fiction_id == fiction_id)
            .count() as i64)
    }

    async fn member_vote_total(
        &self,
        author_id: MemberId,
        space_id: SpaceId,
    ) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .votes
            .values()
            .filter(|v| v.author_id == author_id && v.space_id == space_id)
            .count() as i64)
    }

    async fn set_member_votes_temporary(
        &self,
        author_id: MemberId,
        space_id: SpaceId,
        temporary: bool,
    ) -> StoreResult<Vec<FictionId>> {
        let mut tables = self.tables.write().await;
        let mut changed = Vec::new();
        for vote in tables.votes.values_mut() {
            if vote.author_id == author_id
                && vote.space_id == space_id
                && vote.temporary != temporary
            {
                vote.temporary = temporary;
                changed.push(vote.fiction_id);
            }
        }
        Ok(changed)
    }

    async fn recount_votes(&self, fiction_id: FictionId) -> StoreResult<i64> {
        let mut tables = self.tables.write().await;
        let count = tables
            .votes
            .values()
            .filter(|v| v.fiction_id == fiction_id && v.is_final())
            .count() as i64;
        let fiction = tables
            .fictions
            .get_mut(&fiction_id)
            .ok_or(StoreError::NotFound)?;
        fiction.vote_count = count;
        fiction.updated_at = Utc::now();
        Ok(count)
    }

    // ── Amendments ────────────────────────────────────────────────────────

    async fn amendment_state(&self, id: AmendmentId) -> StoreResult<Option<InternalState>> {
        let tables = self.tables.read().await;
        Ok(tables.amendments.get(&id).and_then(|record| record.state))
    }

    async fn open_emendations_of(&self, fiction_id: FictionId) -> StoreResult<Vec<Fiction>> {
        let tables = self.tables.read().await;
        let mut emendations: Vec<Fiction> = tables
            .amendments
            .values()
            .filter(|record| record.amendable_id == fiction_id && record.is_open())
            .filter_map(|record| tables.fictions.get(&record.emendation_id).cloned())
            .collect();
        emendations.sort_by_key(|f| f.id);
        Ok(emendations)
    }

    async fn reject_amendment(&self, id: AmendmentId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let record = tables.amendments.get_mut(&id).ok_or(StoreError::NotFound)?;
        if !record.is_open() {
            return Ok(false);
        }
        record.state = Some(InternalState::Rejected);
        Ok(true)
    }

    // ── Lineage & attachments ─────────────────────────────────────────────

    async fn record_lineage(&self, link: LineageLink) -> StoreResult<()> {
        self.tables.write().await.lineage.push(link);
        Ok(())
    }

    async fn has_copy_in_space(&self, origin: FictionId, space: SpaceId) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .lineage
            .iter()
            .any(|link| link.origin_id == origin && link.copy_space_id == space))
    }

    async fn provenance_of(&self, fiction_id: FictionId) -> StoreResult<Vec<FictionId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .lineage
            .iter()
            .filter(|link| link.copy_id == fiction_id)
            .map(|link| link.origin_id)
            .collect())
    }

    async fn attachments_for(
        &self,
        fiction_id: FictionId,
    ) -> StoreResult<Vec<FictionAttachment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .attachments
            .iter()
            .filter(|a| a.fiction_id == fiction_id)
            .cloned()
            .collect())
    }

    async fn insert_attachment(&self, attachment: FictionAttachment) -> StoreResult<()> {
        self.tables.write().await.attachments.push(attachment);
        Ok(())
    }
}

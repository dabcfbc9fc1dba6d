//! sqlx/Postgres storage backend.
//!
//! Expects the following tables (schema owned by the host's migrations):
//! `fictions`, `votes` (UNIQUE on `(fiction_id, author_id)`), `spaces`,
//! `members`, `amendments`, `fiction_lineage`, `fiction_attachments`.
//!
//! Single-statement mutations rely on Postgres atomicity; multi-row
//! sequences run in a transaction with a `FOR UPDATE` row claim. The
//! per-fiction check-then-act lock itself is the in-process map shared with
//! the effects layer; a multi-process deployment shards fictions per
//! process or fronts this store with an advisory-lock wrapper.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::common::{AmendmentId, FictionId, MemberId, OrganizationId, SpaceId, VoteId};
use crate::domains::fictions::models::{
    Authorship, Fiction, FictionAttachment, InternalState, LineageLink, NewFiction, NewVote,
    Vote,
};
use crate::domains::members::models::Member;
use crate::domains::spaces::models::{Space, SupportSettings};
use crate::kernel::locks::{FictionGuard, FictionLocks};

use super::store::{AnswerRecord, BaseFictionStore, StoreError, StoreResult};

const FICTION_COLUMNS: &str = "id, space_id, organization_id, title, body, category, scope, \
     position, authors, published_at, internal_state, state_published_at, answered_at, answer, \
     cost, cost_report, execution_period, amendment_id, vote_count, created_at, updated_at";

/// Postgres `BaseFictionStore` backend.
#[derive(Clone)]
pub struct PgFictionStore {
    pool: PgPool,
    locks: FictionLocks,
}

impl PgFictionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            locks: FictionLocks::new(),
        }
    }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct FictionRow {
    id: FictionId,
    space_id: SpaceId,
    organization_id: OrganizationId,
    title: String,
    body: String,
    category: Option<String>,
    scope: Option<String>,
    position: Option<i32>,
    authors: Json<Vec<Authorship>>,
    published_at: Option<DateTime<Utc>>,
    internal_state: Option<String>,
    state_published_at: Option<DateTime<Utc>>,
    answered_at: Option<DateTime<Utc>>,
    answer: Option<String>,
    cost: Option<f64>,
    cost_report: Option<String>,
    execution_period: Option<String>,
    amendment_id: Option<AmendmentId>,
    vote_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FictionRow> for Fiction {
    type Error = StoreError;

    fn try_from(row: FictionRow) -> Result<Self, StoreError> {
        let internal_state = row
            .internal_state
            .as_deref()
            .map(str::parse::<InternalState>)
            .transpose()
            .map_err(StoreError::Backend)?;
        Ok(Fiction {
            id: row.id,
            space_id: row.space_id,
            organization_id: row.organization_id,
            title: row.title,
            body: row.body,
            category: row.category,
            scope: row.scope,
            position: row.position,
            authors: row.authors.0,
            published_at: row.published_at,
            internal_state,
            state_published_at: row.state_published_at,
            answered_at: row.answered_at,
            answer: row.answer,
            cost: row.cost,
            cost_report: row.cost_report,
            execution_period: row.execution_period,
            amendment_id: row.amendment_id,
            vote_count: row.vote_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SpaceRow {
    id: SpaceId,
    organization_id: OrganizationId,
    threshold_per_fiction: i64,
    can_accumulate_supports_beyond_threshold: bool,
    minimum_votes_per_user: i64,
    publish_answers_immediately: bool,
}

impl From<SpaceRow> for Space {
    fn from(row: SpaceRow) -> Self {
        Space {
            id: row.id,
            organization_id: row.organization_id,
            support_settings: SupportSettings {
                threshold_per_fiction: row.threshold_per_fiction,
                can_accumulate_supports_beyond_threshold: row
                    .can_accumulate_supports_beyond_threshold,
                minimum_votes_per_user: row.minimum_votes_per_user,
            },
            publish_answers_immediately: row.publish_answers_immediately,
        }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[async_trait]
impl BaseFictionStore for PgFictionStore {
    // ── Locking ───────────────────────────────────────────────────────────

    async fn lock_fiction(&self, id: FictionId) -> FictionGuard {
        self.locks.acquire(id).await
    }

    async fn lock_fictions(&self, ids: &[FictionId]) -> Vec<FictionGuard> {
        self.locks.acquire_all(ids).await
    }

    // ── Read-mostly collaborator entities ─────────────────────────────────

    async fn find_space(&self, id: SpaceId) -> StoreResult<Option<Space>> {
        let row = sqlx::query_as::<_, SpaceRow>(
            "SELECT id, organization_id, threshold_per_fiction, \
             can_accumulate_supports_beyond_threshold, minimum_votes_per_user, \
             publish_answers_immediately \
             FROM spaces WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Space::from))
    }

    async fn find_member(&self, id: MemberId) -> StoreResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(
            "SELECT id, organization_id, admin, created_at FROM members WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    // ── Fictions ──────────────────────────────────────────────────────────

    async fn find_fiction(&self, id: FictionId) -> StoreResult<Option<Fiction>> {
        let row = sqlx::query_as::<_, FictionRow>(&format!(
            "SELECT {FICTION_COLUMNS} FROM fictions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Fiction::try_from).transpose()
    }

    async fn fictions_in_space(&self, space_id: SpaceId) -> StoreResult<Vec<Fiction>> {
        let rows = sqlx::query_as::<_, FictionRow>(&format!(
            "SELECT {FICTION_COLUMNS} FROM fictions WHERE space_id = $1 ORDER BY id"
        ))
        .bind(space_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Fiction::try_from).collect()
    }

    async fn insert_fiction(&self, new: NewFiction) -> StoreResult<Fiction> {
        let row = sqlx::query_as::<_, FictionRow>(&format!(
            "INSERT INTO fictions (id, space_id, organization_id, title, body, category, \
             scope, position, authors, published_at, amendment_id, vote_count) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0) \
             RETURNING {FICTION_COLUMNS}"
        ))
        .bind(FictionId::new())
        .bind(new.space_id)
        .bind(new.organization_id)
        .bind(&new.title)
        .bind(&new.body)
        .bind(&new.category)
        .bind(&new.scope)
        .bind(new.position)
        .bind(Json(&new.authors))
        .bind(new.published_at)
        .bind(new.amendment_id)
        .fetch_one(&self.pool)
        .await?;
        Fiction::try_from(row)
    }

    async fn delete_fiction(&self, id: FictionId) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM votes WHERE fiction_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM fiction_attachments WHERE fiction_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM fiction_lineage WHERE origin_id = $1 OR copy_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM fictions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }

    async fn record_answer(&self, id: FictionId, record: &AnswerRecord) -> StoreResult<Fiction> {
        let row = sqlx::query_as::<_, FictionRow>(&format!(
            "UPDATE fictions SET internal_state = $2, answer = $3, cost = $4, \
             cost_report = $5, execution_period = $6, answered_at = $7, \
             state_published_at = COALESCE(state_published_at, $8), updated_at = NOW() \
             WHERE id = $1 RETURNING {FICTION_COLUMNS}"
        ))
        .bind(id)
        .bind(record.state.to_string())
        .bind(&record.answer)
        .bind(record.cost)
        .bind(&record.cost_report)
        .bind(&record.execution_period)
        .bind(record.answered_at)
        .bind(record.publish_stamp)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Fiction::try_from(row)
    }

    async fn publish_state(&self, id: FictionId, at: DateTime<Utc>) -> StoreResult<Fiction> {
        let row = sqlx::query_as::<_, FictionRow>(&format!(
            "UPDATE fictions SET state_published_at = COALESCE(state_published_at, $2), \
             updated_at = NOW() WHERE id = $1 RETURNING {FICTION_COLUMNS}"
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Fiction::try_from(row)
    }

    async fn set_internal_state(
        &self,
        id: FictionId,
        state: InternalState,
        publish_stamp: Option<DateTime<Utc>>,
    ) -> StoreResult<Fiction> {
        let row = sqlx::query_as::<_, FictionRow>(&format!(
            "UPDATE fictions SET internal_state = $2, \
             state_published_at = COALESCE(state_published_at, $3), updated_at = NOW() \
             WHERE id = $1 RETURNING {FICTION_COLUMNS}"
        ))
        .bind(id)
        .bind(state.to_string())
        .bind(publish_stamp)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Fiction::try_from(row)
    }

    async fn update_content(
        &self,
        id: FictionId,
        title: &str,
        body: &str,
        position: Option<i32>,
    ) -> StoreResult<Fiction> {
        let row = sqlx::query_as::<_, FictionRow>(&format!(
            "UPDATE fictions SET title = $2, body = $3, position = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING {FICTION_COLUMNS}"
        ))
        .bind(id)
        .bind(title)
        .bind(body)
        .bind(position)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Fiction::try_from(row)
    }

    async fn publish_fiction(&self, id: FictionId, at: DateTime<Utc>) -> StoreResult<Fiction> {
        let row = sqlx::query_as::<_, FictionRow>(&format!(
            "UPDATE fictions SET published_at = COALESCE(published_at, $2), updated_at = NOW() \
             WHERE id = $1 RETURNING {FICTION_COLUMNS}"
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Fiction::try_from(row)
    }

    async fn set_category(&self, id: FictionId, category: Option<&str>) -> StoreResult<Fiction> {
        let row = sqlx::query_as::<_, FictionRow>(&format!(
            "UPDATE fictions SET category = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {FICTION_COLUMNS}"
        ))
        .bind(id)
        .bind(category)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Fiction::try_from(row)
    }

    async fn set_scope(&self, id: FictionId, scope: Option<&str>) -> StoreResult<Fiction> {
        let row = sqlx::query_as::<_, FictionRow>(&format!(
            "UPDATE fictions SET scope = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {FICTION_COLUMNS}"
        ))
        .bind(id)
        .bind(scope)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Fiction::try_from(row)
    }

    // ── Vote ledger ───────────────────────────────────────────────────────

    async fn find_vote(
        &self,
        fiction_id: FictionId,
        author_id: MemberId,
    ) -> StoreResult<Option<Vote>> {
        let vote = sqlx::query_as::<_, Vote>(
            "SELECT id, fiction_id, author_id, space_id, temporary, created_at \
             FROM votes WHERE fiction_id = $1 AND author_id = $2",
        )
        .bind(fiction_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vote)
    }

    async fn insert_vote(&self, new: NewVote) -> StoreResult<Vote> {
        let result = sqlx::query_as::<_, Vote>(
            "INSERT INTO votes (id, fiction_id, author_id, space_id, temporary) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, fiction_id, author_id, space_id, temporary, created_at",
        )
        .bind(VoteId::new())
        .bind(new.fiction_id)
        .bind(new.author_id)
        .bind(new.space_id)
        .bind(new.temporary)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(vote) => Ok(vote),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateVote {
                fiction_id: new.fiction_id,
                author_id: new.author_id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_vote(&self, fiction_id: FictionId, author_id: MemberId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM votes WHERE fiction_id = $1 AND author_id = $2")
            .bind(fiction_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ledger_count(&self, fiction_id: FictionId) -> StoreResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE fiction_id = $1")
                .bind(fiction_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn member_vote_total(
        &self,
        author_id: MemberId,
        space_id: SpaceId,
    ) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM votes WHERE author_id = $1 AND space_id = $2",
        )
        .bind(author_id)
        .bind(space_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn set_member_votes_temporary(
        &self,
        author_id: MemberId,
        space_id: SpaceId,
        temporary: bool,
    ) -> StoreResult<Vec<FictionId>> {
        let changed: Vec<FictionId> = sqlx::query_scalar(
            "UPDATE votes SET temporary = $3 \
             WHERE author_id = $1 AND space_id = $2 AND temporary <> $3 \
             RETURNING fiction_id",
        )
        .bind(author_id)
        .bind(space_id)
        .bind(temporary)
        .fetch_all(&self.pool)
        .await?;
        Ok(changed)
    }

    async fn recount_votes(&self, fiction_id: FictionId) -> StoreResult<i64> {
        // Claim the row so the recount serializes with other writers even
        // outside the in-process lock.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT id FROM fictions WHERE id = $1 FOR UPDATE")
            .bind(fiction_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;
        let count: i64 = sqlx::query_scalar(
            "UPDATE fictions SET vote_count = \
             (SELECT COUNT(*) FROM votes WHERE fiction_id = $1 AND temporary = false), \
             updated_at = NOW() WHERE id = $1 RETURNING vote_count",
        )
        .bind(fiction_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(count)
    }

    // ── Amendments ────────────────────────────────────────────────────────

    async fn amendment_state(&self, id: AmendmentId) -> StoreResult<Option<InternalState>> {
        let state: Option<Option<String>> =
            sqlx::query_scalar("SELECT state FROM amendments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        state
            .flatten()
            .map(|s| s.parse::<InternalState>().map_err(StoreError::Backend))
            .transpose()
    }

    async fn open_emendations_of(&self, fiction_id: FictionId) -> StoreResult<Vec<Fiction>> {
        let rows = sqlx::query_as::<_, FictionRow>(&format!(
            "SELECT {FICTION_COLUMNS} FROM fictions \
             WHERE id IN (SELECT emendation_id FROM amendments \
                          WHERE amendable_id = $1 \
                            AND (state IS NULL OR state = 'evaluating')) \
             ORDER BY id"
        ))
        .bind(fiction_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Fiction::try_from).collect()
    }

    async fn reject_amendment(&self, id: AmendmentId) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE amendments SET state = 'rejected' \
             WHERE id = $1 AND (state IS NULL OR state = 'evaluating')",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM amendments WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            Ok(false)
        } else {
            Err(StoreError::NotFound)
        }
    }

    // ── Lineage & attachments ─────────────────────────────────────────────

    async fn record_lineage(&self, link: LineageLink) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO fiction_lineage (origin_id, copy_id, copy_space_id, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(link.origin_id)
        .bind(link.copy_id)
        .bind(link.copy_space_id)
        .bind(link.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn has_copy_in_space(&self, origin: FictionId, space: SpaceId) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM fiction_lineage \
             WHERE origin_id = $1 AND copy_space_id = $2)",
        )
        .bind(origin)
        .bind(space)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn provenance_of(&self, fiction_id: FictionId) -> StoreResult<Vec<FictionId>> {
        let origins: Vec<FictionId> =
            sqlx::query_scalar("SELECT origin_id FROM fiction_lineage WHERE copy_id = $1")
                .bind(fiction_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(origins)
    }

    async fn attachments_for(
        &self,
        fiction_id: FictionId,
    ) -> StoreResult<Vec<FictionAttachment>> {
        let attachments = sqlx::query_as::<_, FictionAttachment>(
            "SELECT id, fiction_id, filename, content_ref, created_at \
             FROM fiction_attachments WHERE fiction_id = $1",
        )
        .bind(fiction_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attachments)
    }

    async fn insert_attachment(&self, attachment: FictionAttachment) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO fiction_attachments (id, fiction_id, filename, content_ref, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(attachment.id)
        .bind(attachment.fiction_id)
        .bind(&attachment.filename)
        .bind(&attachment.content_ref)
        .bind(attachment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

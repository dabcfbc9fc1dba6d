// Support (vote) effects
//
// Cast and uncast run entirely inside the target fiction's exclusive lock:
// threshold check, ledger write, recount and the promotion scan appear atomic
// to every other writer of that fiction. The scan flips a member's votes
// across the whole space, so every fiction whose rows changed is recounted in
// the same unit.

use anyhow::{Context, Result};

use crate::common::{FictionId, MemberId, Outcome};
use crate::domains::fictions::commands::{CastDenial, UncastDenial};
use crate::domains::fictions::data::store::StoreError;
use crate::domains::fictions::machines::support::{evaluate_cast, member_votes_final};
use crate::domains::fictions::models::Vote;
use crate::kernel::{ScoreMetric, ServerDeps};

/// Cast a member's support on a fiction.
pub async fn cast_vote(
    fiction_id: FictionId,
    member_id: MemberId,
    deps: &ServerDeps,
) -> Result<Outcome<Vote, CastDenial>> {
    let _guard = deps.store.lock_fiction(fiction_id).await;

    let Some(fiction) = deps.store.find_fiction(fiction_id).await? else {
        return Ok(Outcome::Invalid(CastDenial::NotFound));
    };
    let Some(member) = deps.store.find_member(member_id).await? else {
        return Ok(Outcome::Invalid(CastDenial::NotFound));
    };
    let space = deps
        .store
        .find_space(fiction.space_id)
        .await?
        .context("Fiction references a missing space")?;
    let settings = space.support_settings;

    let ledger_rows = deps.store.ledger_count(fiction_id).await?;
    let already_voted = deps
        .store
        .find_vote(fiction_id, member_id)
        .await?
        .is_some();

    let candidate = match evaluate_cast(&fiction, &member, &settings, ledger_rows, already_voted)
    {
        Ok(candidate) => candidate,
        Err(denial) => return Ok(Outcome::Invalid(denial)),
    };

    let vote = match deps.store.insert_vote(candidate).await {
        Ok(vote) => vote,
        // Uniqueness backstop; the pre-check above makes this rare.
        Err(StoreError::DuplicateVote { .. }) => {
            return Ok(Outcome::Invalid(CastDenial::AlreadyVoted));
        }
        Err(e) => return Err(e).context("Failed to persist vote"),
    };

    deps.store.recount_votes(fiction_id).await?;

    // Promotion scan: once the member's space-wide total reaches the
    // minimum, all their votes in the space become final.
    if settings.minimum_votes_enabled() {
        let total = deps
            .store
            .member_vote_total(member_id, fiction.space_id)
            .await?;
        if member_votes_final(total, &settings) {
            let changed = deps
                .store
                .set_member_votes_temporary(member_id, fiction.space_id, false)
                .await?;
            for affected in changed {
                deps.store.recount_votes(affected).await?;
            }
        }
    }

    if let Err(e) = deps.scores.increment(member_id, ScoreMetric::Support).await {
        tracing::warn!(member_id = %member_id, error = %e, "Failed to award support point");
    }

    tracing::debug!(
        fiction_id = %fiction_id,
        member_id = %member_id,
        temporary = vote.temporary,
        "Vote cast"
    );

    Ok(Outcome::Ok(vote))
}

/// Remove a member's support from a fiction.
pub async fn uncast_vote(
    fiction_id: FictionId,
    member_id: MemberId,
    deps: &ServerDeps,
) -> Result<Outcome<(), UncastDenial>> {
    let _guard = deps.store.lock_fiction(fiction_id).await;

    let Some(fiction) = deps.store.find_fiction(fiction_id).await? else {
        return Ok(Outcome::Invalid(UncastDenial::NotFound));
    };
    let space = deps
        .store
        .find_space(fiction.space_id)
        .await?
        .context("Fiction references a missing space")?;
    let settings = space.support_settings;

    let removed = deps.store.delete_vote(fiction_id, member_id).await?;
    if !removed {
        return Ok(Outcome::Invalid(UncastDenial::VoteNotFound));
    }

    deps.store.recount_votes(fiction_id).await?;

    // Demotion scan: dropping below the minimum makes the member's
    // remaining votes temporary again.
    if settings.minimum_votes_enabled() {
        let total = deps
            .store
            .member_vote_total(member_id, fiction.space_id)
            .await?;
        if !member_votes_final(total, &settings) {
            let changed = deps
                .store
                .set_member_votes_temporary(member_id, fiction.space_id, true)
                .await?;
            for affected in changed {
                deps.store.recount_votes(affected).await?;
            }
        }
    }

    if let Err(e) = deps.scores.decrement(member_id, ScoreMetric::Support).await {
        tracing::warn!(member_id = %member_id, error = %e, "Failed to deduct support point");
    }

    tracing::debug!(fiction_id = %fiction_id, member_id = %member_id, "Vote removed");

    Ok(Outcome::Ok(()))
}

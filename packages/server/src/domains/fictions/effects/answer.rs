// Answer / publication / withdrawal effects
//
// Orchestration only: load under the fiction's lock, ask the machines for a
// transition plan, persist it, then run the notification and score side
// effects. Side effects are fire-and-forget; a failed fan-out never rolls
// back a transition.

use anyhow::{Context, Result};
use chrono::Utc;

use crate::common::{BatchReport, FictionId, MemberId, Outcome};
use crate::domains::fictions::commands::{
    AnswerDenial, AnswerForm, PublishAnswersDenial, ResolveDenial, WithdrawDenial,
    WithdrawOutcome, WithdrawRefusal,
};
use crate::domains::fictions::data::store::AnswerRecord;
use crate::domains::fictions::events::FictionEvent;
use crate::domains::fictions::machines::answer::{
    plan_amendment_outcome, plan_answer, plan_publish_answer, plan_withdraw, PublicStateChange,
};
use crate::domains::fictions::models::{Authorship, Fiction, InternalState};
use crate::kernel::{AuditAction, ScoreMetric, ServerDeps};

/// Record an administrator's answer on a fiction.
///
/// Publishes the state in the same unit when the space is configured for
/// immediate publication. Produces exactly one audit record however many
/// fields changed.
pub async fn answer_fiction(
    fiction_id: FictionId,
    form: &AnswerForm,
    actor: MemberId,
    deps: &ServerDeps,
) -> Result<Outcome<Fiction, AnswerDenial>> {
    if let Err(violation) = form.validate() {
        return Ok(Outcome::Invalid(AnswerDenial::InvalidForm(violation)));
    }

    let _guard = deps.store.lock_fiction(fiction_id).await;

    let Some(fiction) = deps.store.find_fiction(fiction_id).await? else {
        return Ok(Outcome::Invalid(AnswerDenial::NotFound));
    };
    let space = deps
        .store
        .find_space(fiction.space_id)
        .await?
        .context("Fiction references a missing space")?;

    let transition = match plan_answer(
        &fiction,
        form.state,
        space.publish_answers_immediately,
        Utc::now(),
    ) {
        Ok(transition) => transition,
        Err(denial) => return Ok(Outcome::Invalid(denial)),
    };

    let updated = deps
        .store
        .record_answer(
            fiction_id,
            &AnswerRecord {
                state: transition.state,
                answer: form.answer.clone(),
                cost: form.cost,
                cost_report: form.cost_report.clone(),
                execution_period: form.execution_period.clone(),
                answered_at: transition.answered_at,
                publish_stamp: transition.publish_stamp,
            },
        )
        .await
        .context("Failed to record answer")?;

    deps.audit()
        .record(actor, fiction_id, AuditAction::Answered)
        .await;

    if let Some(change) = transition.public_change {
        run_public_change_effects(&updated, change, deps).await;
    }

    tracing::info!(
        fiction_id = %fiction_id,
        state = %transition.state,
        published = transition.publish_stamp.is_some(),
        "Recorded answer"
    );

    Ok(Outcome::Ok(updated))
}

/// Publish the recorded answers of a set of fictions.
///
/// Each fiction is an independent unit: a failure lands it in the errored
/// partition without touching the others. Invalid only when the input set
/// resolves to zero eligible fictions.
pub async fn publish_answers_batch(
    fiction_ids: &[FictionId],
    actor: MemberId,
    deps: &ServerDeps,
) -> Result<Outcome<BatchReport, PublishAnswersDenial>> {
    let mut report = BatchReport::new();
    let mut eligible = 0usize;

    for &fiction_id in fiction_ids {
        let _guard = deps.store.lock_fiction(fiction_id).await;

        let Some(fiction) = deps.store.find_fiction(fiction_id).await? else {
            continue;
        };
        let Some(plan) = plan_publish_answer(&fiction, Utc::now()) else {
            continue;
        };
        eligible += 1;

        match deps.store.publish_state(fiction_id, plan.publish_stamp).await {
            Ok(updated) => {
                deps.audit()
                    .record(actor, fiction_id, AuditAction::AnswerPublished)
                    .await;
                run_public_change_effects(&updated, plan.public_change, deps).await;
                report.succeed(fiction_id);
            }
            Err(e) => {
                tracing::warn!(
                    fiction_id = %fiction_id,
                    error = %e,
                    "Failed to publish answer state"
                );
                report.fail(fiction_id);
            }
        }
    }

    if eligible == 0 {
        return Ok(Outcome::Invalid(PublishAnswersDenial::NoEligibleFictions));
    }
    Ok(Outcome::Ok(report))
}

/// Withdraw a fiction on behalf of one of its authors.
///
/// Blocked with the distinct `HasSupports` tag while any vote row exists.
/// Open emendations are auto-rejected one by one; the cascade stops at the
/// first rejection that takes effect.
pub async fn withdraw_fiction(
    fiction_id: FictionId,
    actor: MemberId,
    deps: &ServerDeps,
) -> Result<WithdrawOutcome> {
    let _guard = deps.store.lock_fiction(fiction_id).await;

    let Some(fiction) = deps.store.find_fiction(fiction_id).await? else {
        return Ok(WithdrawOutcome::Invalid(WithdrawDenial::NotFound));
    };
    let ledger_rows = deps.store.ledger_count(fiction_id).await?;

    match plan_withdraw(&fiction, actor, ledger_rows) {
        Ok(()) => {}
        Err(WithdrawRefusal::NotAuthor) => {
            return Ok(WithdrawOutcome::Invalid(WithdrawDenial::NotAuthor));
        }
        Err(WithdrawRefusal::AlreadyWithdrawn) => {
            return Ok(WithdrawOutcome::Invalid(WithdrawDenial::AlreadyWithdrawn));
        }
        Err(WithdrawRefusal::HasSupports) => return Ok(WithdrawOutcome::HasSupports),
    }

    let previously_public = fiction.observable_state(None);
    let updated = deps
        .store
        .set_internal_state(fiction_id, InternalState::Withdrawn, None)
        .await
        .context("Failed to withdraw fiction")?;

    deps.audit()
        .record(actor, fiction_id, AuditAction::Withdrawn)
        .await;

    if let Err(e) = deps
        .notifications
        .publish(FictionEvent::FictionWithdrawn { fiction_id })
        .await
    {
        tracing::warn!(fiction_id = %fiction_id, error = %e, "Failed to publish withdrawal");
    }

    // Withdrawal leaves the accepted state like any other exit.
    if previously_public == Some(InternalState::Accepted) {
        score_authors(&updated, deps, false).await;
    }

    // Auto-reject open emendations, stopping at the first rejection that
    // itself succeeds.
    for emendation in deps.store.open_emendations_of(fiction_id).await? {
        let Some(amendment_id) = emendation.amendment_id else {
            continue;
        };
        if deps.store.reject_amendment(amendment_id).await? {
            tracing::info!(
                fiction_id = %fiction_id,
                emendation_id = %emendation.id,
                "Auto-rejected emendation after withdrawal"
            );
            break;
        }
    }

    Ok(WithdrawOutcome::Ok(updated))
}

/// Propagate a terminal amendment outcome onto the amendable fiction.
///
/// Internal propagation: no audit record and no fan-out. A withdrawn
/// amendable is never modified.
pub async fn resolve_amendment_outcome(
    fiction_id: FictionId,
    outcome: InternalState,
    deps: &ServerDeps,
) -> Result<Outcome<Fiction, ResolveDenial>> {
    let _guard = deps.store.lock_fiction(fiction_id).await;

    let Some(fiction) = deps.store.find_fiction(fiction_id).await? else {
        return Ok(Outcome::Invalid(ResolveDenial::NotFound));
    };
    let Some(plan) = plan_amendment_outcome(&fiction, outcome, Utc::now()) else {
        return Ok(Outcome::Invalid(ResolveDenial::Withdrawn));
    };

    let updated = deps
        .store
        .set_internal_state(fiction_id, plan.state, plan.publish_stamp)
        .await
        .context("Failed to propagate amendment outcome")?;

    tracing::debug!(
        fiction_id = %fiction_id,
        state = %plan.state,
        "Propagated amendment outcome"
    );

    Ok(Outcome::Ok(updated))
}

/// Notification fan-out plus the reversible accepted-score delta for a
/// public state change.
async fn run_public_change_effects(
    fiction: &Fiction,
    change: PublicStateChange,
    deps: &ServerDeps,
) {
    if let Err(e) = deps
        .notifications
        .publish(FictionEvent::StatePublished {
            fiction_id: fiction.id,
            previous: change.previous,
            state: change.next,
        })
        .await
    {
        tracing::warn!(
            fiction_id = %fiction.id,
            error = %e,
            "Failed to publish state change"
        );
    }

    if change.entered_accepted() {
        score_authors(fiction, deps, true).await;
    } else if change.left_accepted() {
        score_authors(fiction, deps, false).await;
    }
}

/// Best-effort accepted-score delta for every member author.
async fn score_authors(fiction: &Fiction, deps: &ServerDeps, increment: bool) {
    for author in &fiction.authors {
        let Authorship::Member(member_id) = author else {
            continue;
        };
        let result = if increment {
            deps.scores
                .increment(*member_id, ScoreMetric::AcceptedFictions)
                .await
        } else {
            deps.scores
                .decrement(*member_id, ScoreMetric::AcceptedFictions)
                .await
        };
        if let Err(e) = result {
            tracing::warn!(
                fiction_id = %fiction.id,
                member_id = %member_id,
                error = %e,
                "Failed to apply accepted-score delta"
            );
        }
    }
}

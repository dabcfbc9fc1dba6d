//! Answer / publication / withdrawal transitions.
//!
//! Pure decision logic - NO IO, only state transitions. Every function here
//! takes a loaded fiction plus the facts the decision needs and returns either
//! a transition plan for the effects layer to persist, or a denial. Nothing in
//! this module can thaw a withdrawn fiction.

use chrono::{DateTime, Utc};

use crate::common::MemberId;
use crate::domains::fictions::commands::{AnswerDenial, WithdrawRefusal};
use crate::domains::fictions::models::{Fiction, InternalState};

/// A public-state edge observed by a transition. Drives the notification
/// fan-out and the gamification deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicStateChange {
    pub previous: Option<InternalState>,
    pub next: InternalState,
}

impl PublicStateChange {
    pub fn entered_accepted(&self) -> bool {
        self.previous != Some(InternalState::Accepted) && self.next == InternalState::Accepted
    }

    pub fn left_accepted(&self) -> bool {
        self.previous == Some(InternalState::Accepted) && self.next != InternalState::Accepted
    }
}

/// The persistable plan produced by [`plan_answer`].
#[derive(Debug, Clone)]
pub struct AnswerTransition {
    pub state: InternalState,
    pub answered_at: DateTime<Utc>,
    /// `Some` when this transition stamps `state_published_at`. Only ever set
    /// on the first unpublished-to-published edge; an existing stamp is never
    /// overwritten.
    pub publish_stamp: Option<DateTime<Utc>>,
    pub public_change: Option<PublicStateChange>,
}

/// Decide how recording `state` changes `fiction`.
///
/// Requires the fiction to be published and not withdrawn. The caller has
/// already validated the answer form; `state` is one of the answerable states.
pub fn plan_answer(
    fiction: &Fiction,
    state: InternalState,
    publish_immediately: bool,
    now: DateTime<Utc>,
) -> Result<AnswerTransition, AnswerDenial> {
    if fiction.is_draft() {
        return Err(AnswerDenial::NotPublished);
    }
    if fiction.is_withdrawn() {
        return Err(AnswerDenial::Withdrawn);
    }

    let publish_stamp = if publish_immediately && fiction.state_published_at.is_none() {
        Some(now)
    } else {
        None
    };

    Ok(AnswerTransition {
        state,
        answered_at: now,
        publish_stamp,
        public_change: public_change_for(
            fiction,
            state,
            fiction.state_published_at.or(publish_stamp).is_some(),
        ),
    })
}

/// The persistable plan produced by [`plan_publish_answer`].
#[derive(Debug, Clone)]
pub struct PublishTransition {
    pub publish_stamp: DateTime<Utc>,
    pub public_change: PublicStateChange,
}

/// Decide whether a batch publication applies to `fiction`.
///
/// Eligible fictions are published, answered with an administrator state and
/// not yet state-published. Everything else is skipped, not errored.
pub fn plan_publish_answer(fiction: &Fiction, now: DateTime<Utc>) -> Option<PublishTransition> {
    if fiction.is_draft() || !fiction.is_answered() || fiction.state_published_at.is_some() {
        return None;
    }
    let state = fiction.internal_state?;
    if !state.is_answerable() {
        // Withdrawal is already public; a stamp would change nothing.
        return None;
    }

    Some(PublishTransition {
        publish_stamp: now,
        public_change: PublicStateChange {
            previous: fiction.observable_state(None),
            next: state,
        },
    })
}

/// Gate for the withdraw command. `ledger_rows` is the fiction's total vote
/// row count, temporary rows included.
pub fn plan_withdraw(
    fiction: &Fiction,
    actor: MemberId,
    ledger_rows: i64,
) -> Result<(), WithdrawRefusal> {
    if !fiction.authored_by(actor) {
        return Err(WithdrawRefusal::NotAuthor);
    }
    if fiction.is_withdrawn() {
        return Err(WithdrawRefusal::AlreadyWithdrawn);
    }
    if ledger_rows > 0 {
        return Err(WithdrawRefusal::HasSupports);
    }
    Ok(())
}

/// The persistable plan produced by [`plan_amendment_outcome`].
#[derive(Debug, Clone)]
pub struct AmendmentPropagation {
    pub state: InternalState,
    /// `Some` when the amendable has never been state-published; an existing
    /// stamp is preserved.
    pub publish_stamp: Option<DateTime<Utc>>,
}

/// Decide how a terminal amendment outcome propagates onto the amendable
/// fiction. Returns `None` for a withdrawn amendable: its state is frozen.
pub fn plan_amendment_outcome(
    fiction: &Fiction,
    outcome: InternalState,
    now: DateTime<Utc>,
) -> Option<AmendmentPropagation> {
    if fiction.is_withdrawn() {
        return None;
    }

    Some(AmendmentPropagation {
        state: outcome,
        publish_stamp: if fiction.state_published_at.is_none() {
            Some(now)
        } else {
            None
        },
    })
}

fn public_change_for(
    fiction: &Fiction,
    next_state: InternalState,
    published: bool,
) -> Option<PublicStateChange> {
    if fiction.is_emendation() {
        // Observable state is delegated; answering the emendation itself
        // never moves the public needle.
        return None;
    }
    if !published {
        return None;
    }
    let previous = fiction.observable_state(None);
    if previous == Some(next_state) {
        return None;
    }
    Some(PublicStateChange {
        previous,
        next: next_state,
    })
}

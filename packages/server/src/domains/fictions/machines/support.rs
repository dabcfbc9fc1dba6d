//! Support threshold and promotion decisions.
//!
//! Pure decision logic - NO IO. The effects layer feeds in the facts read
//! under the per-fiction lock (ledger counts, existing rows) and persists
//! whatever these functions decide.

use crate::domains::fictions::commands::CastDenial;
use crate::domains::fictions::models::{Fiction, InternalState, NewVote};
use crate::domains::members::models::Member;
use crate::domains::spaces::models::SupportSettings;

/// Decide whether `member` may cast on `fiction`, and with which flags.
///
/// `ledger_rows` is the fiction's current row count (temporary + final);
/// `already_voted` is whether the member already holds a row. Checks run in a
/// fixed order so concurrent racers at the threshold always lose with
/// `ThresholdReached`, not a coincidental later denial.
pub fn evaluate_cast(
    fiction: &Fiction,
    member: &Member,
    settings: &SupportSettings,
    ledger_rows: i64,
    already_voted: bool,
) -> Result<NewVote, CastDenial> {
    // 1. Per-fiction maximum, unless the space accumulates beyond it.
    if settings.threshold_enabled()
        && ledger_rows >= settings.threshold_per_fiction
        && !settings.can_accumulate_supports_beyond_threshold
    {
        return Err(CastDenial::ThresholdReached);
    }

    // 2. Candidate row: temporary while a per-member minimum is configured.
    let candidate = NewVote {
        fiction_id: fiction.id,
        author_id: member.id,
        space_id: fiction.space_id,
        temporary: settings.minimum_votes_enabled(),
    };

    // 3. Ledger validity.
    if already_voted {
        return Err(CastDenial::AlreadyVoted);
    }
    if member.organization_id != fiction.organization_id {
        return Err(CastDenial::CrossOrganization);
    }
    match fiction.internal_state {
        Some(InternalState::Rejected) => return Err(CastDenial::FictionRejected),
        Some(InternalState::Withdrawn) => return Err(CastDenial::FictionNotOpen),
        _ => {}
    }
    if fiction.is_draft() {
        return Err(CastDenial::FictionNotOpen);
    }

    Ok(candidate)
}

/// Whether a member's votes in a space count as final, given their total row
/// count there. With the minimum disabled every vote is final immediately.
pub fn member_votes_final(total_in_space: i64, settings: &SupportSettings) -> bool {
    !settings.minimum_votes_enabled() || total_in_space >= settings.minimum_votes_per_user
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{FictionId, MemberId, OrganizationId, SpaceId};
    use chrono::Utc;

    fn space_settings(threshold: i64, accumulate: bool, minimum: i64) -> SupportSettings {
        SupportSettings {
            threshold_per_fiction: threshold,
            can_accumulate_supports_beyond_threshold: accumulate,
            minimum_votes_per_user: minimum,
        }
    }

    fn fiction_and_member() -> (Fiction, Member) {
        let organization_id = OrganizationId::new();
        let fiction = Fiction {
            id: FictionId::new(),
            space_id: SpaceId::new(),
            organization_id,
            title: "Bike lane on 3rd".to_string(),
            body: "Protected lane between the bridge and the market".to_string(),
            category: None,
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
        };
        let member = Member {
            id: MemberId::new(),
            organization_id,
            admin: false,
            created_at: Utc::now(),
        };
        (fiction, member)
    }

    #[test]
    fn threshold_blocks_without_accumulation() {
        let (fiction, member) = fiction_and_member();
        let settings = space_settings(5, false, 0);

        assert!(evaluate_cast(&fiction, &member, &settings, 4, false).is_ok());
        assert_eq!(
            evaluate_cast(&fiction, &member, &settings, 5, false),
            Err(CastDenial::ThresholdReached)
        );
    }

    #[test]
    fn accumulation_lets_casts_through_the_threshold() {
        let (fiction, member) = fiction_and_member();
        let settings = space_settings(5, true, 0);
        assert!(evaluate_cast(&fiction, &member, &settings, 50, false).is_ok());
    }

    #[test]
    fn threshold_denial_wins_over_duplicate() {
        // A racer that lost the threshold should hear about the threshold,
        // even if it also happens to hold a row already.
        let (fiction, member) = fiction_and_member();
        let settings = space_settings(1, false, 0);
        assert_eq!(
            evaluate_cast(&fiction, &member, &settings, 1, true),
            Err(CastDenial::ThresholdReached)
        );
    }

    #[test]
    fn candidate_is_temporary_only_under_a_minimum() {
        let (fiction, member) = fiction_and_member();

        let no_minimum = space_settings(0, false, 0);
        let vote = evaluate_cast(&fiction, &member, &no_minimum, 0, false).unwrap();
        assert!(!vote.temporary);

        let with_minimum = space_settings(0, false, 3);
        let vote = evaluate_cast(&fiction, &member, &with_minimum, 0, false).unwrap();
        assert!(vote.temporary);
    }

    #[test]
    fn ledger_validity_denials() {
        let (mut fiction, mut member) = fiction_and_member();
        let settings = space_settings(0, false, 0);

        assert_eq!(
            evaluate_cast(&fiction, &member, &settings, 1, true),
            Err(CastDenial::AlreadyVoted)
        );

        member.organization_id = OrganizationId::new();
        assert_eq!(
            evaluate_cast(&fiction, &member, &settings, 0, false),
            Err(CastDenial::CrossOrganization)
        );
        member.organization_id = fiction.organization_id;

        fiction.internal_state = Some(InternalState::Rejected);
        assert_eq!(
            evaluate_cast(&fiction, &member, &settings, 0, false),
            Err(CastDenial::FictionRejected)
        );

        fiction.internal_state = Some(InternalState::Withdrawn);
        assert_eq!(
            evaluate_cast(&fiction, &member, &settings, 0, false),
            Err(CastDenial::FictionNotOpen)
        );

        fiction.internal_state = None;
        fiction.published_at = None;
        assert_eq!(
            evaluate_cast(&fiction, &member, &settings, 0, false),
            Err(CastDenial::FictionNotOpen)
        );
    }

    #[test]
    fn rejected_state_blocks_even_when_unpublished() {
        // Internal rejection is enough; visibility does not matter.
        let (mut fiction, member) = fiction_and_member();
        fiction.internal_state = Some(InternalState::Rejected);
        assert!(fiction.observable_state(None).is_none());

        let settings = space_settings(0, false, 0);
        assert_eq!(
            evaluate_cast(&fiction, &member, &settings, 0, false),
            Err(CastDenial::FictionRejected)
        );
    }

    #[test]
    fn finality_follows_the_minimum() {
        let disabled = space_settings(0, false, 0);
        assert!(member_votes_final(0, &disabled));

        let enabled = space_settings(0, false, 2);
        assert!(!member_votes_final(1, &enabled));
        assert!(member_votes_final(2, &enabled));
        assert!(member_votes_final(5, &enabled));
    }
}

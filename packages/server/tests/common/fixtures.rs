use chrono::Utc;

use server_core::common::{AmendmentId, OrganizationId};
use server_core::domains::fictions::data::{AmendmentRecord, BaseFictionStore};
use server_core::domains::fictions::models::{Authorship, Fiction, NewFiction};
use server_core::domains::members::models::Member;
use server_core::domains::spaces::models::{Space, SupportSettings};

use super::TestHarness;

pub fn settings(threshold: i64, accumulate: bool, minimum: i64) -> SupportSettings {
    SupportSettings {
        threshold_per_fiction: threshold,
        can_accumulate_supports_beyond_threshold: accumulate,
        minimum_votes_per_user: minimum,
    }
}

/// Seed a space owned by a fresh organization.
pub async fn seed_space(
    ctx: &TestHarness,
    support_settings: SupportSettings,
    publish_answers_immediately: bool,
) -> Space {
    let space = Space {
        id: server_core::common::SpaceId::new(),
        organization_id: OrganizationId::new(),
        support_settings,
        publish_answers_immediately,
    };
    ctx.store.seed_space(space.clone()).await;
    space
}

/// Seed a second space in the same organization (import/merge targets).
pub async fn seed_sibling_space(ctx: &TestHarness, space: &Space) -> Space {
    let sibling = Space {
        id: server_core::common::SpaceId::new(),
        organization_id: space.organization_id,
        support_settings: space.support_settings,
        publish_answers_immediately: space.publish_answers_immediately,
    };
    ctx.store.seed_space(sibling.clone()).await;
    sibling
}

pub async fn seed_member(ctx: &TestHarness, organization_id: OrganizationId) -> Member {
    let member = Member {
        id: server_core::common::MemberId::new(),
        organization_id,
        admin: false,
        created_at: Utc::now(),
    };
    ctx.store.seed_member(member.clone()).await;
    member
}

pub async fn seed_published_fiction(
    ctx: &TestHarness,
    space: &Space,
    authors: Vec<Authorship>,
) -> Fiction {
    ctx.store
        .insert_fiction(NewFiction {
            space_id: space.id,
            organization_id: space.organization_id,
            title: "Open the riverside path at night".to_string(),
            body: "Install lighting so the path stays usable after dark".to_string(),
            category: Some("mobility".to_string()),
            scope: None,
            position: None,
            authors,
            published_at: Some(Utc::now()),
            amendment_id: None,
        })
        .await
        .expect("Failed to seed fiction")
}

pub async fn seed_draft_fiction(ctx: &TestHarness, space: &Space) -> Fiction {
    ctx.store
        .insert_fiction(NewFiction {
            space_id: space.id,
            organization_id: space.organization_id,
            title: "Draft: community garden".to_string(),
            body: "Still collecting signatures".to_string(),
            category: None,
            scope: None,
            position: None,
            authors: vec![],
            published_at: None,
            amendment_id: None,
        })
        .await
        .expect("Failed to seed draft")
}

/// Seed an emendation of `amendable` with an open amendment record.
pub async fn seed_emendation(
    ctx: &TestHarness,
    space: &Space,
    amendable: &Fiction,
) -> (Fiction, AmendmentId) {
    let amendment_id = AmendmentId::new();
    let emendation = ctx
        .store
        .insert_fiction(NewFiction {
            space_id: space.id,
            organization_id: space.organization_id,
            title: format!("Emendation of: {}", amendable.title),
            body: "Proposed wording change".to_string(),
            category: None,
            scope: None,
            position: None,
            authors: vec![],
            published_at: Some(Utc::now()),
            amendment_id: Some(amendment_id),
        })
        .await
        .expect("Failed to seed emendation");
    ctx.store
        .seed_amendment(AmendmentRecord {
            id: amendment_id,
            amendable_id: amendable.id,
            emendation_id: emendation.id,
            state: None,
        })
        .await;
    (emendation, amendment_id)
}

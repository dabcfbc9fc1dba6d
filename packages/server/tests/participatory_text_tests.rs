//! Integration tests for the all-or-nothing participatory-text commands.

mod common;

use crate::common::{seed_draft_fiction, seed_published_fiction, seed_space, settings, TestHarness};
use server_core::common::MemberId;
use server_core::domains::fictions::data::BaseFictionStore;
use server_core::domains::fictions::commands::{EditRejection, TextEditItem};
use server_core::domains::fictions::effects::{
    publish_participatory_text, reorder_participatory_text,
};
use server_core::domains::fictions::models::Fiction;
use server_core::kernel::AuditAction;

fn edit(fiction: &Fiction, position: i32, title: &str, body: &str) -> TextEditItem {
    TextEditItem {
        fiction_id: fiction.id,
        position,
        title: title.to_string(),
        body: body.to_string(),
    }
}

#[tokio::test]
async fn one_bad_edit_rolls_back_the_whole_batch() {
    let ctx = TestHarness::new();
    let space = seed_space(&ctx, settings(0, false, 0), true).await;
    let first = seed_published_fiction(&ctx, &space, vec![]).await;
    let second = seed_published_fiction(&ctx, &space, vec![]).await;
    let third = seed_published_fiction(&ctx, &space, vec![]).await;

    let edits = vec![
        edit(&first, 1, "Article 1", "Scope of the regulation"),
        edit(&second, 2, "", "Definitions"),
        edit(&third, 3, "Article 3", "Obligations"),
    ];

    let outcome = reorder_participatory_text(&edits, MemberId::new(), &ctx.deps)
        .await
        .unwrap();
    let failures = outcome.invalid().expect("batch refused");

    // Exactly one failure entry, keyed by the bad edit's fiction.
    assert_eq!(failures.len(), 1);
    assert_eq!(failures.get(&second.id), Some(&EditRejection::EmptyTitle));

    // All three fictions are completely unchanged.
    for original in [&first, &second, &third] {
        let loaded = ctx
            .store
            .find_fiction(original.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.title, original.title);
        assert_eq!(loaded.body, original.body);
        assert_eq!(loaded.position, original.position);
    }
}

#[tokio::test]
async fn a_clean_batch_applies_every_edit_without_versions() {
    let ctx = TestHarness::new();
    let space = seed_space(&ctx, settings(0, false, 0), true).await;
    let first = seed_published_fiction(&ctx, &space, vec![]).await;
    let second = seed_published_fiction(&ctx, &space, vec![]).await;

    let edits = vec![
        edit(&first, 2, "Article 2", "Moved down"),
        edit(&second, 1, "Article 1", "Moved up"),
    ];

    let updated = reorder_participatory_text(&edits, MemberId::new(), &ctx.deps)
        .await
        .unwrap()
        .ok()
        .expect("batch applied");
    assert_eq!(updated.len(), 2);

    let loaded = ctx.store.find_fiction(second.id).await.unwrap().unwrap();
    assert_eq!(loaded.position, Some(1));
    assert_eq!(loaded.title, "Article 1");

    // Bulk edits leave no per-fiction history.
    assert_eq!(ctx.audit.count_for(first.id), 0);
    assert_eq!(ctx.audit.count_for(second.id), 0);
}

#[tokio::test]
async fn duplicate_fictions_in_a_batch_are_refused() {
    let ctx = TestHarness::new();
    let space = seed_space(&ctx, settings(0, false, 0), true).await;
    let fiction = seed_published_fiction(&ctx, &space, vec![]).await;

    let edits = vec![
        edit(&fiction, 1, "Article 1", "First"),
        edit(&fiction, 2, "Article 1 again", "Second"),
    ];

    let failures = reorder_participatory_text(&edits, MemberId::new(), &ctx.deps)
        .await
        .unwrap()
        .invalid()
        .expect("batch refused");
    assert_eq!(
        failures.get(&fiction.id),
        Some(&EditRejection::DuplicateFiction)
    );
}

#[tokio::test]
async fn publication_stamps_drafts_with_exactly_one_version() {
    let ctx = TestHarness::new();
    let space = seed_space(&ctx, settings(0, false, 0), true).await;
    let draft_one = seed_draft_fiction(&ctx, &space).await;
    let draft_two = seed_draft_fiction(&ctx, &space).await;
    let unknown = server_core::common::FictionId::new();
    let actor = MemberId::new();

    let report = publish_participatory_text(
        &[draft_one.id, draft_two.id, unknown],
        actor,
        &ctx.deps,
    )
    .await
    .unwrap()
    .ok()
    .expect("publication ran");

    assert_eq!(report.successful, vec![draft_one.id, draft_two.id]);
    assert_eq!(report.errored, vec![unknown]);

    for id in [draft_one.id, draft_two.id] {
        let published = ctx.store.find_fiction(id).await.unwrap().unwrap();
        assert!(published.is_published());
        assert_eq!(
            ctx.audit.actions_for(id),
            vec![AuditAction::ContentPublished]
        );
    }
}

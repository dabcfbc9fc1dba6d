// Participatory-text effects
//
// Reordering is the one all-or-nothing bulk operation: a partial reorder
// would corrupt the document's position sequence, so the whole batch
// validates first under every affected fiction's lock and applies only when
// the failure map is empty. Edits run audit-suppressed; publication later
// produces exactly one audit version per fiction.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::common::{BatchReport, FictionId, MemberId, Outcome};
use crate::domains::fictions::commands::{
    EditRejection, PublishTextDenial, ReorderFailures, TextEditItem,
};
use crate::domains::fictions::models::Fiction;
use crate::kernel::{AuditAction, AuditScope, ServerDeps};

/// Apply an ordered batch of participatory-text edits atomically.
///
/// Any single invalid edit aborts the whole batch: the failure map keyed by
/// fiction id comes back as `Invalid` and no fiction is touched.
pub async fn reorder_participatory_text(
    edits: &[TextEditItem],
    actor: MemberId,
    deps: &ServerDeps,
) -> Result<Outcome<Vec<Fiction>, ReorderFailures>> {
    let ids: Vec<FictionId> = edits.iter().map(|e| e.fiction_id).collect();
    // One outer unit: hold every affected lock for the whole batch.
    let _guards = deps.store.lock_fictions(&ids).await;

    let mut failures = ReorderFailures::new();
    let mut seen = HashSet::new();
    for edit in edits {
        if !seen.insert(edit.fiction_id) {
            failures.insert(edit.fiction_id, EditRejection::DuplicateFiction);
            continue;
        }
        if deps.store.find_fiction(edit.fiction_id).await?.is_none() {
            failures.insert(edit.fiction_id, EditRejection::UnknownFiction);
            continue;
        }
        if edit.title.trim().is_empty() {
            failures.insert(edit.fiction_id, EditRejection::EmptyTitle);
            continue;
        }
        if edit.body.trim().is_empty() {
            failures.insert(edit.fiction_id, EditRejection::EmptyBody);
        }
    }
    if !failures.is_empty() {
        return Ok(Outcome::Invalid(failures));
    }

    // A document import must not pollute per-fiction history.
    let audit = AuditScope::suppressed();

    let mut updated = Vec::with_capacity(edits.len());
    for edit in edits {
        let fiction = deps
            .store
            .update_content(edit.fiction_id, &edit.title, &edit.body, Some(edit.position))
            .await
            .context("Failed to apply participatory-text edit")?;
        audit
            .record(actor, edit.fiction_id, AuditAction::ContentUpdated)
            .await;
        updated.push(fiction);
    }

    tracing::info!(edits = edits.len(), "Reordered participatory text");

    Ok(Outcome::Ok(updated))
}

/// Publish the finished participatory-text document.
///
/// Per fiction: one content write and one audit record - the single version
/// the published document should carry - then the draft's publication stamp.
/// Partitions per fiction like the other batches.
pub async fn publish_participatory_text(
    fiction_ids: &[FictionId],
    actor: MemberId,
    deps: &ServerDeps,
) -> Result<Outcome<BatchReport, PublishTextDenial>> {
    if fiction_ids.is_empty() {
        return Ok(Outcome::Invalid(PublishTextDenial::EmptyInput));
    }

    let audit = deps.audit();
    let mut report = BatchReport::new();

    for &fiction_id in fiction_ids {
        let _guard = deps.store.lock_fiction(fiction_id).await;

        let Some(fiction) = deps.store.find_fiction(fiction_id).await? else {
            report.fail(fiction_id);
            continue;
        };

        // Reassign title/body in one write so the published fiction carries
        // exactly one version, then stamp publication.
        let result = async {
            deps.store
                .update_content(fiction_id, &fiction.title, &fiction.body, fiction.position)
                .await?;
            deps.store.publish_fiction(fiction_id, Utc::now()).await
        }
        .await;

        match result {
            Ok(_) => {
                audit
                    .record(actor, fiction_id, AuditAction::ContentPublished)
                    .await;
                report.succeed(fiction_id);
            }
            Err(e) => {
                tracing::warn!(
                    fiction_id = %fiction_id,
                    error = %e,
                    "Failed to publish participatory text"
                );
                report.fail(fiction_id);
            }
        }
    }

    Ok(Outcome::Ok(report))
}

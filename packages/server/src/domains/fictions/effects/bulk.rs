// Bulk mutation effects: Import, Merge, Split and the category/scope batches
//
// Import, Merge and Split validate their form-level preconditions before any
// mutation and then treat every fiction independently; they either refuse as
// a whole (invalid) or return the produced set. The category/scope batches
// partition per fiction instead.

use anyhow::{Context, Result};
use chrono::Utc;

use crate::common::{BatchReport, FictionId, MemberId, Outcome};
use crate::domains::fictions::commands::{
    BulkUpdateDenial, ImportDenial, ImportForm, MergeDenial, MergeForm, SplitDenial, SplitForm,
};
use crate::domains::fictions::models::{Authorship, Fiction, LineageLink, NewFiction};
use crate::kernel::{AuditAction, ServerDeps};

/// Copy fictions matching a state filter from one space into another.
///
/// Idempotent across runs: an origin already linked copied-from into the
/// target space is skipped. Copies are scrubbed (title/body/category only),
/// published immediately and keep their attachments.
pub async fn import_fictions(
    form: &ImportForm,
    actor: MemberId,
    deps: &ServerDeps,
) -> Result<Outcome<Vec<Fiction>, ImportDenial>> {
    if form.origin_space == form.target_space {
        return Ok(Outcome::Invalid(ImportDenial::SameSpace));
    }
    if form.states.is_empty() {
        return Ok(Outcome::Invalid(ImportDenial::EmptyStateFilter));
    }
    let Some(origin) = deps.store.find_space(form.origin_space).await? else {
        return Ok(Outcome::Invalid(ImportDenial::UnknownSpace));
    };
    let Some(target) = deps.store.find_space(form.target_space).await? else {
        return Ok(Outcome::Invalid(ImportDenial::UnknownSpace));
    };
    if origin.organization_id != target.organization_id {
        return Ok(Outcome::Invalid(ImportDenial::CrossOrganization));
    }

    let mut copies = Vec::new();
    for fiction in deps.store.fictions_in_space(form.origin_space).await? {
        if fiction.is_draft() {
            continue;
        }
        let matches_filter = fiction
            .internal_state
            .map(|state| form.states.contains(&state))
            .unwrap_or(false);
        if !matches_filter {
            continue;
        }
        // Skip origins copied into the target by a previous run.
        if deps
            .store
            .has_copy_in_space(fiction.id, form.target_space)
            .await?
        {
            continue;
        }

        let authors = if form.keep_authors {
            fiction.authors.clone()
        } else {
            vec![Authorship::Organization(target.organization_id)]
        };
        let copy = deps
            .store
            .insert_fiction(NewFiction::scrubbed_from(
                &fiction,
                form.target_space,
                authors,
            ))
            .await
            .context("Failed to create imported copy")?;

        for attachment in deps.store.attachments_for(fiction.id).await? {
            deps.store
                .insert_attachment(attachment.duplicate_for(copy.id))
                .await?;
        }
        deps.store
            .record_lineage(LineageLink {
                origin_id: fiction.id,
                copy_id: copy.id,
                copy_space_id: form.target_space,
                created_at: Utc::now(),
            })
            .await?;
        deps.audit()
            .record(actor, copy.id, AuditAction::Created)
            .await;

        copies.push(copy);
    }

    tracing::info!(
        origin_space = %form.origin_space,
        target_space = %form.target_space,
        copied = copies.len(),
        "Imported fictions"
    );

    Ok(Outcome::Ok(copies))
}

/// Merge a set of fictions into one official copy in the target space.
///
/// The first listed fiction supplies the copy's content. A same-space merge
/// links the copy to the originals' own provenance (no multi-hop chains) and
/// hard-deletes the originals once linked; a cross-space merge links the copy
/// to the originals and leaves them in place.
pub async fn merge_fictions(
    form: &MergeForm,
    actor: MemberId,
    deps: &ServerDeps,
) -> Result<Outcome<Fiction, MergeDenial>> {
    if form.fiction_ids.len() < 2 {
        return Ok(Outcome::Invalid(MergeDenial::TooFewFictions));
    }
    let Some(target) = deps.store.find_space(form.target_space).await? else {
        return Ok(Outcome::Invalid(MergeDenial::UnknownSpace));
    };

    let mut originals = Vec::with_capacity(form.fiction_ids.len());
    for &id in &form.fiction_ids {
        let Some(fiction) = deps.store.find_fiction(id).await? else {
            return Ok(Outcome::Invalid(MergeDenial::UnknownFiction));
        };
        if fiction.is_draft() {
            return Ok(Outcome::Invalid(MergeDenial::NotPublished));
        }
        originals.push(fiction);
    }
    let origin_space = originals[0].space_id;
    if originals.iter().any(|f| f.space_id != origin_space) {
        return Ok(Outcome::Invalid(MergeDenial::MixedOrigins));
    }
    let same_space = origin_space == form.target_space;

    let copy = deps
        .store
        .insert_fiction(NewFiction::scrubbed_from(
            &originals[0],
            form.target_space,
            vec![Authorship::Organization(target.organization_id)],
        ))
        .await
        .context("Failed to create merged fiction")?;

    let mut link_targets = Vec::new();
    if same_space {
        for original in &originals {
            link_targets.extend(deps.store.provenance_of(original.id).await?);
        }
    } else {
        link_targets.extend(originals.iter().map(|f| f.id));
    }
    link_targets.sort();
    link_targets.dedup();

    for origin_id in link_targets {
        deps.store
            .record_lineage(LineageLink {
                origin_id,
                copy_id: copy.id,
                copy_space_id: form.target_space,
                created_at: Utc::now(),
            })
            .await?;
    }
    deps.audit()
        .record(actor, copy.id, AuditAction::Created)
        .await;

    // Same-space merges retire the originals once the copy is linked.
    if same_space {
        for original in &originals {
            let _guard = deps.store.lock_fiction(original.id).await;
            deps.store
                .delete_fiction(original.id)
                .await
                .context("Failed to delete merged original")?;
        }
    }

    tracing::info!(
        copy_id = %copy.id,
        merged = originals.len(),
        same_space,
        "Merged fictions"
    );

    Ok(Outcome::Ok(copy))
}

/// Split each fiction into independent official copies in the target space.
///
/// Two copies per original across spaces; one inside the same space, where
/// the original itself stays as the other half. Copies link to the original
/// (cross-space) or to its provenance set (same-space).
pub async fn split_fictions(
    form: &SplitForm,
    actor: MemberId,
    deps: &ServerDeps,
) -> Result<Outcome<Vec<Fiction>, SplitDenial>> {
    if form.fiction_ids.is_empty() {
        return Ok(Outcome::Invalid(SplitDenial::NoFictions));
    }
    let Some(target) = deps.store.find_space(form.target_space).await? else {
        return Ok(Outcome::Invalid(SplitDenial::UnknownSpace));
    };

    let mut originals = Vec::with_capacity(form.fiction_ids.len());
    for &id in &form.fiction_ids {
        let Some(fiction) = deps.store.find_fiction(id).await? else {
            return Ok(Outcome::Invalid(SplitDenial::UnknownFiction));
        };
        if fiction.is_draft() {
            return Ok(Outcome::Invalid(SplitDenial::NotPublished));
        }
        originals.push(fiction);
    }

    let mut copies = Vec::new();
    for original in &originals {
        let same_space = original.space_id == form.target_space;
        let copies_wanted = if same_space { 1 } else { 2 };

        let link_targets: Vec<FictionId> = if same_space {
            deps.store.provenance_of(original.id).await?
        } else {
            vec![original.id]
        };

        for _ in 0..copies_wanted {
            let copy = deps
                .store
                .insert_fiction(NewFiction::scrubbed_from(
                    original,
                    form.target_space,
                    vec![Authorship::Organization(target.organization_id)],
                ))
                .await
                .context("Failed to create split copy")?;

            for &origin_id in &link_targets {
                deps.store
                    .record_lineage(LineageLink {
                        origin_id,
                        copy_id: copy.id,
                        copy_space_id: form.target_space,
                        created_at: Utc::now(),
                    })
                    .await?;
            }
            deps.audit()
                .record(actor, copy.id, AuditAction::Created)
                .await;
            copies.push(copy);
        }
    }

    tracing::info!(
        split = originals.len(),
        produced = copies.len(),
        "Split fictions"
    );

    Ok(Outcome::Ok(copies))
}

/// Re-categorize a set of fictions, partitioning per fiction.
///
/// A fiction errors when it is unknown or already carries the value; nothing
/// aborts the batch.
pub async fn update_category_batch(
    fiction_ids: &[FictionId],
    category: Option<&str>,
    deps: &ServerDeps,
) -> Result<Outcome<BatchReport, BulkUpdateDenial>> {
    update_label_batch(fiction_ids, category, LabelKind::Category, deps).await
}

/// Re-scope a set of fictions, partitioning per fiction.
pub async fn update_scope_batch(
    fiction_ids: &[FictionId],
    scope: Option<&str>,
    deps: &ServerDeps,
) -> Result<Outcome<BatchReport, BulkUpdateDenial>> {
    update_label_batch(fiction_ids, scope, LabelKind::Scope, deps).await
}

enum LabelKind {
    Category,
    Scope,
}

async fn update_label_batch(
    fiction_ids: &[FictionId],
    value: Option<&str>,
    kind: LabelKind,
    deps: &ServerDeps,
) -> Result<Outcome<BatchReport, BulkUpdateDenial>> {
    if fiction_ids.is_empty() {
        return Ok(Outcome::Invalid(BulkUpdateDenial::EmptyInput));
    }

    let mut report = BatchReport::new();
    for &fiction_id in fiction_ids {
        let _guard = deps.store.lock_fiction(fiction_id).await;

        let Some(fiction) = deps.store.find_fiction(fiction_id).await? else {
            report.fail(fiction_id);
            continue;
        };
        let current = match kind {
            LabelKind::Category => fiction.category.as_deref(),
            LabelKind::Scope => fiction.scope.as_deref(),
        };
        if current == value {
            // Already carrying the value counts as errored, matching the
            // partitioned reporting the admin surface expects.
            report.fail(fiction_id);
            continue;
        }

        let result = match kind {
            LabelKind::Category => deps.store.set_category(fiction_id, value).await,
            LabelKind::Scope => deps.store.set_scope(fiction_id, value).await,
        };
        match result {
            Ok(_) => report.succeed(fiction_id),
            Err(e) => {
                tracing::warn!(fiction_id = %fiction_id, error = %e, "Bulk update failed");
                report.fail(fiction_id);
            }
        }
    }

    Ok(Outcome::Ok(report))
}

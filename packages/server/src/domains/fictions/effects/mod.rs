// Effects (side effects) for the fictions domain
//
// Effects orchestrate IO: load under the per-fiction lock, ask the machines
// for a decision, persist it through the store, then run the notification,
// score and audit side effects.

pub mod answer;
pub mod bulk;
pub mod participatory_text;
pub mod support;

pub use answer::{
    answer_fiction, publish_answers_batch, resolve_amendment_outcome, withdraw_fiction,
};
pub use bulk::{
    import_fictions, merge_fictions, split_fictions, update_category_batch, update_scope_batch,
};
pub use participatory_text::{publish_participatory_text, reorder_participatory_text};
pub use support::{cast_vote, uncast_vote};

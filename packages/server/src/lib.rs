// Fiction lifecycle and support engine
//
// In-process core for a participatory democracy platform: members submit and
// support "fictions" (citizen proposals), administrators answer them, and
// bulk commands reshape whole sets at once. Presentation, authorization and
// delivery live upstream; this crate owns the state machine, the
// threshold-gated vote ledger and the bulk mutation semantics.

pub mod common;
pub mod domains;
pub mod kernel;

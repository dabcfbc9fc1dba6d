pub mod attachment;
pub mod fiction;
pub mod lineage;
pub mod vote;

pub use attachment::FictionAttachment;
pub use fiction::{Authorship, Fiction, FictionState, InternalState, NewFiction};
pub use lineage::LineageLink;
pub use vote::{NewVote, Vote};

pub mod space;

pub use space::{Space, SupportSettings};

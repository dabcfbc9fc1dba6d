// Fiction state machines
// Pure decision logic - NO IO, only state transitions

pub mod answer;
pub mod support;

pub mod commands;
pub mod data;
pub mod effects;
pub mod events;
pub mod machines;
pub mod models;

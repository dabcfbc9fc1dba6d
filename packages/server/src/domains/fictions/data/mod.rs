// Persistence contract and backends for the fictions domain

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::{AmendmentRecord, MemoryFictionStore};
pub use postgres::PgFictionStore;
pub use store::{AnswerRecord, BaseFictionStore, StoreError, StoreResult};

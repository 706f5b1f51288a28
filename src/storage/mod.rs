pub mod dump;
pub mod memory;
pub mod postgres;
pub mod sqlite;
pub mod trait_def;

#[cfg(test)]
mod soft_delete_tests;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{Storage, StorageError, StorageResult};

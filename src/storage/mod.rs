//! Index persistence
//!
//! Sites, pages, lemmas and occurrences are stored behind the [`Storage`]
//! trait, with SQLite for durable indexes and an in-memory backend for tests.

pub mod memory;
pub mod repository;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod testing;

pub use memory::MemoryStorage;
pub use repository::{create_memory_storage, create_sqlite_storage, SharedStorage, Storage};
pub use sqlite::SqliteStorage;

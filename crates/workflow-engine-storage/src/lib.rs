//! SQLite-backed [`StorageAdapter`](workflow_engine_core::storage::StorageAdapter)
//! implementation: connection pooling, schema, and row (de)serialization.

pub mod models;
pub mod pool;
pub mod repository;
pub mod schema;

pub use pool::{init_pool, DbPool};
pub use repository::SqliteStorageAdapter;

//! SQLite connection pool and migration runner.
//!
//! Grounded on the teacher's `db/session.rs` (`r2d2::Pool<ConnectionManager<PgConnection>>`),
//! swapped to `SqliteConnection` per the storage crate's SQLite target.

use diesel::r2d2::{self, ConnectionManager};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use workflow_engine_core::error::{Result, WorkflowError};

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type PooledConn = r2d2::PooledConnection<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Builds the pool for `database_path` and applies any pending migrations.
/// `:memory:` is accepted for tests, matching the teacher's pattern of
/// pointing `DATABASE_URL` at a throwaway database in its test harness.
pub fn init_pool(database_path: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_path);
    let mut builder = r2d2::Pool::builder();
    // `:memory:` gives each connection its own private database, so a pool
    // of more than one connection would silently scatter writes and reads
    // across unrelated in-memory databases. Pin it to a single connection.
    if database_path == ":memory:" {
        builder = builder.max_size(1);
    }
    let pool = builder.build(manager).map_err(|e| WorkflowError::StorageError {
        message: format!("failed to build sqlite connection pool: {}", e),
    })?;

    let mut conn = pool.get().map_err(|e| WorkflowError::StorageError {
        message: format!("failed to obtain connection for migrations: {}", e),
    })?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| WorkflowError::StorageError {
            message: format!("failed to run migrations: {}", e),
        })?;

    Ok(pool)
}

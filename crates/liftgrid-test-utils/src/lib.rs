//! Shared test utilities for liftgrid integration tests.
//!
//! - [`create_test_pool`]: private in-memory SQLite with migrations applied.
//! - [`create_file_test_pool`]: file-backed SQLite inside a temp directory,
//!   for tests that reopen the same database.
//! - [`fixtures`]: sample workout grids as plain rows of strings.
//! - [`fake_google`]: an HTTP server emulating the OAuth token endpoint, the
//!   spreadsheet values API and the CSV export.

pub mod fake_google;
pub mod fixtures;

use sqlx::SqlitePool;
use tempfile::TempDir;

use liftgrid_store::config::StoreConfig;
use liftgrid_store::pool;

pub use fake_google::FakeGoogle;

/// Create an in-memory database with migrations applied.
///
/// Every call returns an independent database; it disappears with the pool.
pub async fn create_test_pool() -> SqlitePool {
    let config = StoreConfig::new(StoreConfig::MEMORY_URL);
    let pool = pool::create_pool(&config)
        .await
        .expect("failed to open in-memory database");
    pool::run_migrations(&pool)
        .await
        .expect("migrations should succeed");
    pool
}

/// Create a file-backed database in a fresh temp directory.
///
/// Returns `(pool, config, dir)`; keep `dir` alive for the duration of the
/// test. `config` can be used to open a second pool on the same file.
pub async fn create_file_test_pool() -> (SqlitePool, StoreConfig, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("nested").join("liftgrid.db");
    let config = StoreConfig::new(format!("sqlite://{}", path.display()));

    pool::ensure_database_dir(&config)
        .await
        .expect("should create database directory");
    let pool = pool::create_pool(&config)
        .await
        .expect("failed to open file database");
    pool::run_migrations(&pool)
        .await
        .expect("migrations should succeed");

    (pool, config, dir)
}

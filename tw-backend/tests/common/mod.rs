//! Shared test utilities for integration tests.

use tempfile::TempDir;
use tw_backend::{seed_demo_data, BackendStatus, Connectivity, LocalBackend, SeedSummary};
use tw_core::config::DatabaseConfig;
use tw_models::Database;

/// Create a temporary database with full schema and migrations applied.
/// Returns the Database and the TempDir (must be held alive for the duration of the test).
pub fn create_test_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("test.db");
    let db = Database::init(&path, &DatabaseConfig::default()).expect("failed to init test database");
    (db, dir)
}

/// An online backend over a seeded temporary database.
pub fn create_seeded_backend() -> (LocalBackend, SeedSummary, TempDir) {
    let (db, dir) = create_test_db();
    let summary = seed_demo_data(&db).expect("failed to seed test database");
    let backend = LocalBackend::new(db, Connectivity::new(BackendStatus::Online));
    (backend, summary, dir)
}

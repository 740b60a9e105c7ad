//! Versioned database migrations.
//!
//! The table layout itself comes from `schema::create_tables`; migrations
//! carry data changes. Each one runs at most once, in version order, and
//! the stored version is bumped after every successful step.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;
use tw_core::constants::{DB_SCHEMA_VERSION, DEFAULT_SPACE_NAME};
use tw_core::error::{TwError, TwResult};

use crate::models::db_err;
use crate::models::space::Space;

struct Migration {
    version: i32,
    name: &'static str,
    apply: fn(&Connection) -> TwResult<()>,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "default current space",
    apply: seed_default_space,
}];

/// Run all pending migrations on the database.
pub fn run_migrations(conn: &Connection) -> TwResult<()> {
    let current = schema_version(conn)?;
    if current > DB_SCHEMA_VERSION {
        return Err(TwError::Migration(format!(
            "database schema version {current} is newer than supported version {DB_SCHEMA_VERSION}"
        )));
    }

    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
    if pending.is_empty() {
        info!("database schema is up to date (version {current})");
        return Ok(());
    }

    for migration in pending {
        info!("applying migration v{} ({})", migration.version, migration.name);
        (migration.apply)(conn).map_err(|e| {
            TwError::Migration(format!("v{} {} failed: {e}", migration.version, migration.name))
        })?;
        store_version(conn, migration.version)?;
    }

    info!("migrations complete, schema at version {DB_SCHEMA_VERSION}");
    Ok(())
}

/// Stored schema version, 0 for a fresh database.
fn schema_version(conn: &Connection) -> TwResult<i32> {
    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(db_err)?;
    Ok(version.unwrap_or(0))
}

fn store_version(conn: &Connection, version: i32) -> TwResult<()> {
    let updated = conn
        .execute("UPDATE schema_version SET version = ?1", [version])
        .map_err(db_err)?;
    if updated == 0 {
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
            .map_err(db_err)?;
    }
    Ok(())
}

/// A fresh store always has a current space.
fn seed_default_space(conn: &Connection) -> TwResult<()> {
    if Space::find_current(conn)?.is_none() {
        let mut space = Space::new(DEFAULT_SPACE_NAME, None);
        space.is_current = true;
        space.save(conn)?;
        info!("seeded default space");
    }
    Ok(())
}

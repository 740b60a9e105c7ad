//! Database schema definitions and table creation.

use rusqlite::Connection;
use tw_core::error::{TwError, TwResult};
use tracing::debug;

/// Create all database tables and indexes if they do not exist.
pub fn create_tables(conn: &Connection) -> TwResult<()> {
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|e| TwError::Database(format!("failed to create schema: {e}")))?;
    debug!("database schema verified");
    Ok(())
}

/// Drop all tables (used for database reset).
pub fn drop_tables(conn: &Connection) -> TwResult<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS room_configs;
         DROP TABLE IF EXISTS notifications;
         DROP TABLE IF EXISTS contacts;
         DROP TABLE IF EXISTS subscriptions;
         DROP TABLE IF EXISTS account_migrations;
         DROP TABLE IF EXISTS spaces;
         DROP TABLE IF EXISTS profiles;
         DROP TABLE IF EXISTS twincodes;
         DROP TABLE IF EXISTS schema_version;",
    )
    .map_err(|e| TwError::Database(format!("failed to drop tables: {e}")))?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

-- Twincodes: public identities shared through links and QR codes
CREATE TABLE IF NOT EXISTS twincodes (
    id          TEXT PRIMARY KEY,
    kind        TEXT NOT NULL,
    name        TEXT,
    created_at  TEXT NOT NULL
);

-- Profiles (identity shown to contacts of a space)
CREATE TABLE IF NOT EXISTS profiles (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    description  TEXT,
    twincode_id  TEXT NOT NULL REFERENCES twincodes(id),
    created_at   TEXT NOT NULL
);

-- Spaces (containers grouping a profile and its contacts)
CREATE TABLE IF NOT EXISTS spaces (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    description  TEXT,
    profile_id   TEXT REFERENCES profiles(id) ON DELETE SET NULL,
    is_current   INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_spaces_current ON spaces(is_current);

-- Contacts and rooms
CREATE TABLE IF NOT EXISTS contacts (
    id                TEXT PRIMARY KEY,
    space_id          TEXT NOT NULL REFERENCES spaces(id) ON DELETE CASCADE,
    name              TEXT NOT NULL,
    description       TEXT,
    peer_twincode_id  TEXT,
    is_room           INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contacts_space ON contacts(space_id);

-- Notifications shown in a space
CREATE TABLE IF NOT EXISTS notifications (
    id            TEXT PRIMARY KEY,
    space_id      TEXT NOT NULL REFERENCES spaces(id) ON DELETE CASCADE,
    contact_id    TEXT REFERENCES contacts(id) ON DELETE CASCADE,
    kind          TEXT NOT NULL,
    acknowledged  INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_space ON notifications(space_id, created_at);

-- Account migrations started by scanning a migration code
CREATE TABLE IF NOT EXISTS account_migrations (
    id                TEXT PRIMARY KEY,
    peer_twincode_id  TEXT NOT NULL REFERENCES twincodes(id),
    device_name       TEXT NOT NULL,
    state             TEXT NOT NULL,
    created_at        TEXT NOT NULL
);

-- In-app subscriptions
CREATE TABLE IF NOT EXISTS subscriptions (
    product_id    TEXT PRIMARY KEY,
    twincode_id   TEXT REFERENCES twincodes(id),
    status        TEXT NOT NULL,
    activated_at  TEXT,
    updated_at    TEXT NOT NULL
);

-- Room configuration
CREATE TABLE IF NOT EXISTS room_configs (
    room_id          TEXT PRIMARY KEY REFERENCES contacts(id) ON DELETE CASCADE,
    welcome_message  TEXT,
    chat_mode        TEXT NOT NULL,
    invitation_mode  TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);
"#;

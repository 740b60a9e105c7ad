//! Account migration entity model.

use serde::{Deserialize, Serialize};
use rusqlite::{params, Connection, Row};
use tw_core::error::TwResult;

use super::{db_err, new_id, now_timestamp, optional_row};

/// Progress of an account migration between two devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    /// Created locally, peer not contacted yet.
    Pending,
    /// Peer contacted, exchanging account data.
    Negotiating,
    Done,
    Cancelled,
}

impl MigrationState {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Negotiating => "negotiating",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the storage representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "negotiating" => Some(Self::Negotiating),
            "done" => Some(Self::Done),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether the migration still occupies the device.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Negotiating)
    }
}

/// An account migration started from a scanned migration code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMigration {
    pub id: String,
    /// Migration twincode shown by the other device.
    pub peer_twincode_id: String,
    /// Name of this device, shown on the peer.
    pub device_name: String,
    pub state: MigrationState,
    pub created_at: String,
}

impl AccountMigration {
    /// Build a new pending migration.
    pub fn new(peer_twincode_id: &str, device_name: &str) -> Self {
        Self {
            id: new_id(),
            peer_twincode_id: peer_twincode_id.to_string(),
            device_name: device_name.to_string(),
            state: MigrationState::Pending,
            created_at: now_timestamp(),
        }
    }

    /// Construct an AccountMigration from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let state: String = row.get("state")?;
        Ok(Self {
            id: row.get("id")?,
            peer_twincode_id: row.get("peer_twincode_id")?,
            device_name: row.get("device_name")?,
            state: MigrationState::parse(&state).unwrap_or(MigrationState::Cancelled),
            created_at: row.get("created_at")?,
        })
    }

    /// Find a migration by id.
    pub fn find_by_id(conn: &Connection, id: &str) -> TwResult<Option<Self>> {
        optional_row(conn.query_row(
            "SELECT * FROM account_migrations WHERE id = ?1",
            [id],
            Self::from_row,
        ))
    }

    /// Find the migration that is still running, if any.
    pub fn find_active(conn: &Connection) -> TwResult<Option<Self>> {
        optional_row(conn.query_row(
            "SELECT * FROM account_migrations WHERE state IN ('pending', 'negotiating')
             ORDER BY created_at DESC LIMIT 1",
            [],
            Self::from_row,
        ))
    }

    /// Insert or update this migration.
    pub fn save(&self, conn: &Connection) -> TwResult<()> {
        conn.execute(
            "INSERT INTO account_migrations (id, peer_twincode_id, device_name, state, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET state = excluded.state",
            params![
                self.id,
                self.peer_twincode_id,
                self.device_name,
                self.state.as_str(),
                self.created_at,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

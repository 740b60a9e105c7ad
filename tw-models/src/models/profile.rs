//! Profile entity model.

use serde::{Deserialize, Serialize};
use rusqlite::{params, Connection, Row};
use tw_core::error::TwResult;

use super::{db_err, new_id, now_timestamp, optional_row};

/// The identity presented to the contacts of a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Twincode other users scan to reach this profile.
    pub twincode_id: String,
    pub created_at: String,
}

impl Profile {
    /// Build a new, unsaved profile bound to the given twincode.
    pub fn new(name: &str, description: Option<&str>, twincode_id: &str) -> Self {
        Self {
            id: new_id(),
            name: name.trim().to_string(),
            description: description.map(str::to_string),
            twincode_id: twincode_id.to_string(),
            created_at: now_timestamp(),
        }
    }

    /// Construct a Profile from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            twincode_id: row.get("twincode_id")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Find a profile by id.
    pub fn find_by_id(conn: &Connection, id: &str) -> TwResult<Option<Self>> {
        optional_row(conn.query_row("SELECT * FROM profiles WHERE id = ?1", [id], Self::from_row))
    }

    /// Insert or update this profile.
    pub fn save(&self, conn: &Connection) -> TwResult<()> {
        conn.execute(
            "INSERT INTO profiles (id, name, description, twincode_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, description = excluded.description",
            params![self.id, self.name, self.description, self.twincode_id, self.created_at],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

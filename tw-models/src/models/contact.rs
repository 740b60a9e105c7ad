//! Contact entity model.
//!
//! Rooms are contacts with `is_room` set; their settings live in
//! `room_configs`.

use serde::{Deserialize, Serialize};
use rusqlite::{params, Connection, Row};
use tw_core::error::TwResult;

use super::{db_err, new_id, now_timestamp, optional_row};

/// A contact (or room) inside a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub space_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Twincode of the peer, absent until the invitation is accepted.
    pub peer_twincode_id: Option<String>,
    pub is_room: bool,
    pub created_at: String,
}

/// Pending edits to a contact's editable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl ContactUpdate {
    /// Whether there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    /// Apply the pending edits to a contact.
    pub fn apply_to(&self, contact: &mut Contact) {
        if let Some(name) = &self.name {
            contact.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            contact.description = if description.is_empty() {
                None
            } else {
                Some(description.clone())
            };
        }
    }
}

impl Contact {
    /// Build a new, unsaved contact in the given space.
    pub fn new(space_id: &str, name: &str) -> Self {
        Self {
            id: new_id(),
            space_id: space_id.to_string(),
            name: name.trim().to_string(),
            description: None,
            peer_twincode_id: None,
            is_room: false,
            created_at: now_timestamp(),
        }
    }

    /// Build a new, unsaved room in the given space.
    pub fn new_room(space_id: &str, name: &str) -> Self {
        Self {
            is_room: true,
            ..Self::new(space_id, name)
        }
    }

    /// Construct a Contact from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            space_id: row.get("space_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            peer_twincode_id: row.get("peer_twincode_id")?,
            is_room: row.get("is_room")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Find a contact by id.
    pub fn find_by_id(conn: &Connection, id: &str) -> TwResult<Option<Self>> {
        optional_row(conn.query_row("SELECT * FROM contacts WHERE id = ?1", [id], Self::from_row))
    }

    /// Insert or update this contact.
    pub fn save(&self, conn: &Connection) -> TwResult<()> {
        conn.execute(
            "INSERT INTO contacts (id, space_id, name, description, peer_twincode_id, is_room, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                space_id = excluded.space_id,
                name = excluded.name,
                description = excluded.description,
                peer_twincode_id = excluded.peer_twincode_id,
                is_room = excluded.is_room",
            params![
                self.id,
                self.space_id,
                self.name,
                self.description,
                self.peer_twincode_id,
                self.is_room,
                self.created_at,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Delete a contact by id.
    pub fn delete(conn: &Connection, id: &str) -> TwResult<bool> {
        let changed = conn
            .execute("DELETE FROM contacts WHERE id = ?1", [id])
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    /// Initials for avatar placeholders.
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }
}

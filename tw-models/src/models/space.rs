//! Space entity model.

use serde::{Deserialize, Serialize};
use rusqlite::{params, Connection, Row};
use tw_core::error::TwResult;

use super::{db_err, new_id, now_timestamp, optional_row};

/// A space groups one profile with the contacts met under it.
///
/// Exactly one space is current at a time; new contacts and
/// notifications are shown in the current space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Profile bound to this space, if any.
    pub profile_id: Option<String>,
    pub is_current: bool,
    pub created_at: String,
}

impl Space {
    /// Build a new, unsaved, non-current space.
    pub fn new(name: &str, description: Option<&str>) -> Self {
        Self {
            id: new_id(),
            name: name.trim().to_string(),
            description: description.map(str::to_string),
            profile_id: None,
            is_current: false,
            created_at: now_timestamp(),
        }
    }

    /// Construct a Space from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            profile_id: row.get("profile_id")?,
            is_current: row.get("is_current")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Find a space by id.
    pub fn find_by_id(conn: &Connection, id: &str) -> TwResult<Option<Self>> {
        optional_row(conn.query_row("SELECT * FROM spaces WHERE id = ?1", [id], Self::from_row))
    }

    /// Find the current space.
    pub fn find_current(conn: &Connection) -> TwResult<Option<Self>> {
        optional_row(conn.query_row(
            "SELECT * FROM spaces WHERE is_current = 1 LIMIT 1",
            [],
            Self::from_row,
        ))
    }

    /// Insert or update this space.
    pub fn save(&self, conn: &Connection) -> TwResult<()> {
        conn.execute(
            "INSERT INTO spaces (id, name, description, profile_id, is_current, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                profile_id = excluded.profile_id,
                is_current = excluded.is_current",
            params![
                self.id,
                self.name,
                self.description,
                self.profile_id,
                self.is_current,
                self.created_at,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Make the given space the only current space. Returns false if it does not exist.
    pub fn make_current(conn: &Connection, id: &str) -> TwResult<bool> {
        let exists: i64 = conn
            .query_row("SELECT COUNT(*) FROM spaces WHERE id = ?1", [id], |row| row.get(0))
            .map_err(db_err)?;
        if exists == 0 {
            return Ok(false);
        }
        conn.execute("UPDATE spaces SET is_current = (id = ?1)", [id])
            .map_err(db_err)?;
        Ok(true)
    }

    /// Delete a space by id.
    pub fn delete(conn: &Connection, id: &str) -> TwResult<bool> {
        let changed = conn
            .execute("DELETE FROM spaces WHERE id = ?1", [id])
            .map_err(db_err)?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::create_tables(&conn).unwrap();
        conn
    }

    #[test]
    fn test_save_and_find() {
        let conn = conn();
        let space = Space::new("  Work ", Some("office"));
        space.save(&conn).unwrap();

        let found = Space::find_by_id(&conn, &space.id).unwrap().unwrap();
        assert_eq!(found.name, "Work");
        assert_eq!(found.description.as_deref(), Some("office"));
        assert!(!found.is_current);
    }

    #[test]
    fn test_make_current_is_exclusive() {
        let conn = conn();
        let mut a = Space::new("A", None);
        a.is_current = true;
        a.save(&conn).unwrap();
        let b = Space::new("B", None);
        b.save(&conn).unwrap();

        assert!(Space::make_current(&conn, &b.id).unwrap());
        assert_eq!(Space::find_current(&conn).unwrap().unwrap().id, b.id);
        assert!(!Space::find_by_id(&conn, &a.id).unwrap().unwrap().is_current);
        assert!(!Space::make_current(&conn, "missing").unwrap());
    }

    #[test]
    fn test_delete() {
        let conn = conn();
        let space = Space::new("Gone", None);
        space.save(&conn).unwrap();
        assert!(Space::delete(&conn, &space.id).unwrap());
        assert!(Space::find_by_id(&conn, &space.id).unwrap().is_none());
    }
}

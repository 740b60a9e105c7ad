//! Twincode entity model.
//!
//! A twincode is the public half of an identity: what a QR code or link
//! points to. Its kind says which workflow may consume it.

use serde::{Deserialize, Serialize};
use rusqlite::{params, Connection, Row};
use tw_core::error::TwResult;

use super::{db_err, new_id, now_timestamp, optional_row};

/// What a twincode can be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwincodeKind {
    /// Identity of a local profile.
    Profile,
    /// Invitation to become a contact.
    Invitation,
    /// Entry point of a room.
    Room,
    /// Code displayed by a device offering an account migration.
    Migration,
    /// Code activating a subscription product.
    Activation,
}

impl TwincodeKind {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Invitation => "invitation",
            Self::Room => "room",
            Self::Migration => "migration",
            Self::Activation => "activation",
        }
    }

    /// Parse the storage representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "profile" => Some(Self::Profile),
            "invitation" => Some(Self::Invitation),
            "room" => Some(Self::Room),
            "migration" => Some(Self::Migration),
            "activation" => Some(Self::Activation),
            _ => None,
        }
    }
}

impl std::fmt::Display for TwincodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A twincode record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Twincode {
    pub id: String,
    pub kind: TwincodeKind,
    /// Name advertised with the code, shown before accepting it.
    pub name: Option<String>,
    pub created_at: String,
}

impl Twincode {
    /// Build a new, unsaved twincode.
    pub fn new(kind: TwincodeKind, name: Option<&str>) -> Self {
        Self {
            id: new_id(),
            kind,
            name: name.map(str::to_string),
            created_at: now_timestamp(),
        }
    }

    /// Construct a Twincode from a database row.
    ///
    /// Rows with an unknown kind are read as invitations, the least
    /// privileged kind.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let kind: String = row.get("kind")?;
        Ok(Self {
            id: row.get("id")?,
            kind: TwincodeKind::parse(&kind).unwrap_or(TwincodeKind::Invitation),
            name: row.get("name")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Find a twincode by id.
    pub fn find_by_id(conn: &Connection, id: &str) -> TwResult<Option<Self>> {
        optional_row(conn.query_row("SELECT * FROM twincodes WHERE id = ?1", [id], Self::from_row))
    }

    /// Insert or update this twincode.
    pub fn save(&self, conn: &Connection) -> TwResult<()> {
        conn.execute(
            "INSERT INTO twincodes (id, kind, name, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET kind = excluded.kind, name = excluded.name",
            params![self.id, self.kind.as_str(), self.name, self.created_at],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    #[test]
    fn test_kind_roundtrip_and_unknown() {
        assert_eq!(TwincodeKind::parse("migration"), Some(TwincodeKind::Migration));
        assert_eq!(TwincodeKind::parse("bogus"), None);
        assert_eq!(TwincodeKind::Activation.to_string(), "activation");
    }

    #[test]
    fn test_save_and_find() {
        let conn = Connection::open_in_memory().unwrap();
        schema::create_tables(&conn).unwrap();

        let code = Twincode::new(TwincodeKind::Migration, Some("Old phone"));
        code.save(&conn).unwrap();

        let found = Twincode::find_by_id(&conn, &code.id).unwrap().unwrap();
        assert_eq!(found, code);
        assert!(Twincode::find_by_id(&conn, "nope").unwrap().is_none());
    }
}

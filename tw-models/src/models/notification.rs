//! Notification entity model.

use serde::{Deserialize, Serialize};
use rusqlite::{params, Connection, Row};
use tw_core::error::TwResult;

use super::{db_err, new_id, now_timestamp, optional_row};

/// Kind of event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewContact,
    UpdatedContact,
    DeletedContact,
    MissedCall,
    Message,
}

impl NotificationKind {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewContact => "new_contact",
            Self::UpdatedContact => "updated_contact",
            Self::DeletedContact => "deleted_contact",
            Self::MissedCall => "missed_call",
            Self::Message => "message",
        }
    }

    /// Parse the storage representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new_contact" => Some(Self::NewContact),
            "updated_contact" => Some(Self::UpdatedContact),
            "deleted_contact" => Some(Self::DeletedContact),
            "missed_call" => Some(Self::MissedCall),
            "message" => Some(Self::Message),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification displayed in a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub space_id: String,
    pub contact_id: Option<String>,
    pub kind: NotificationKind,
    pub acknowledged: bool,
    pub created_at: String,
}

impl Notification {
    /// Build a new, unsaved, unacknowledged notification.
    pub fn new(space_id: &str, contact_id: Option<&str>, kind: NotificationKind) -> Self {
        Self {
            id: new_id(),
            space_id: space_id.to_string(),
            contact_id: contact_id.map(str::to_string),
            kind,
            acknowledged: false,
            created_at: now_timestamp(),
        }
    }

    /// Construct a Notification from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let kind: String = row.get("kind")?;
        Ok(Self {
            id: row.get("id")?,
            space_id: row.get("space_id")?,
            contact_id: row.get("contact_id")?,
            kind: NotificationKind::parse(&kind).unwrap_or(NotificationKind::Message),
            acknowledged: row.get("acknowledged")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Find a notification by id.
    pub fn find_by_id(conn: &Connection, id: &str) -> TwResult<Option<Self>> {
        optional_row(conn.query_row(
            "SELECT * FROM notifications WHERE id = ?1",
            [id],
            Self::from_row,
        ))
    }

    /// Insert or update this notification.
    pub fn save(&self, conn: &Connection) -> TwResult<()> {
        conn.execute(
            "INSERT INTO notifications (id, space_id, contact_id, kind, acknowledged, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET acknowledged = excluded.acknowledged",
            params![
                self.id,
                self.space_id,
                self.contact_id,
                self.kind.as_str(),
                self.acknowledged,
                self.created_at,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

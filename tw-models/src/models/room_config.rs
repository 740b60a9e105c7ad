//! Room configuration entity model.

use serde::{Deserialize, Serialize};
use rusqlite::{params, Connection, Row};
use tw_core::error::TwResult;

use super::{db_err, now_timestamp, optional_row};

/// Who may post in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    /// Every member may post.
    Public,
    /// Only administrators post; members read.
    ChannelOnly,
    /// Members post privately to administrators.
    FeedbackOnly,
}

impl ChatMode {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::ChannelOnly => "channel_only",
            Self::FeedbackOnly => "feedback_only",
        }
    }

    /// Parse the storage representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "channel_only" => Some(Self::ChannelOnly),
            "feedback_only" => Some(Self::FeedbackOnly),
            _ => None,
        }
    }
}

/// Who may invite new members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationMode {
    Public,
    AdminOnly,
}

impl InvitationMode {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::AdminOnly => "admin_only",
        }
    }

    /// Parse the storage representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "admin_only" => Some(Self::AdminOnly),
            _ => None,
        }
    }
}

/// Settings of a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub room_id: String,
    pub welcome_message: Option<String>,
    pub chat_mode: ChatMode,
    pub invitation_mode: InvitationMode,
    pub updated_at: String,
}

/// Pending changes to a room configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomConfigUpdate {
    /// `Some("")` clears the welcome message.
    pub welcome_message: Option<String>,
    pub chat_mode: Option<ChatMode>,
    pub invitation_mode: Option<InvitationMode>,
}

impl RoomConfigUpdate {
    /// Whether there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.welcome_message.is_none() && self.chat_mode.is_none() && self.invitation_mode.is_none()
    }

    /// Produce the configuration resulting from applying these changes.
    pub fn applied_to(&self, config: &RoomConfig) -> RoomConfig {
        let mut next = config.clone();
        if let Some(message) = &self.welcome_message {
            next.welcome_message = if message.is_empty() { None } else { Some(message.clone()) };
        }
        if let Some(mode) = self.chat_mode {
            next.chat_mode = mode;
        }
        if let Some(mode) = self.invitation_mode {
            next.invitation_mode = mode;
        }
        next.updated_at = now_timestamp();
        next
    }
}

impl RoomConfig {
    /// Configuration of a room that was never configured.
    pub fn default_for(room_id: &str) -> Self {
        Self {
            room_id: room_id.to_string(),
            welcome_message: None,
            chat_mode: ChatMode::Public,
            invitation_mode: InvitationMode::Public,
            updated_at: now_timestamp(),
        }
    }

    /// Construct a RoomConfig from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let chat_mode: String = row.get("chat_mode")?;
        let invitation_mode: String = row.get("invitation_mode")?;
        Ok(Self {
            room_id: row.get("room_id")?,
            welcome_message: row.get("welcome_message")?,
            chat_mode: ChatMode::parse(&chat_mode).unwrap_or(ChatMode::Public),
            invitation_mode: InvitationMode::parse(&invitation_mode)
                .unwrap_or(InvitationMode::AdminOnly),
            updated_at: row.get("updated_at")?,
        })
    }

    /// Find the configuration of a room.
    pub fn find_by_room(conn: &Connection, room_id: &str) -> TwResult<Option<Self>> {
        optional_row(conn.query_row(
            "SELECT * FROM room_configs WHERE room_id = ?1",
            [room_id],
            Self::from_row,
        ))
    }

    /// Insert or update this configuration.
    pub fn save(&self, conn: &Connection) -> TwResult<()> {
        conn.execute(
            "INSERT INTO room_configs (room_id, welcome_message, chat_mode, invitation_mode, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(room_id) DO UPDATE SET
                welcome_message = excluded.welcome_message,
                chat_mode = excluded.chat_mode,
                invitation_mode = excluded.invitation_mode,
                updated_at = excluded.updated_at",
            params![
                self.room_id,
                self.welcome_message,
                self.chat_mode.as_str(),
                self.invitation_mode.as_str(),
                self.updated_at,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

//! Twincode link parsing.
//!
//! A QR code or pasted link carries a twincode id in one of two forms:
//! - `twinflow://<kind>?id=<uuid>` (in-app scheme)
//! - `https://<kind>.twin.me/?id=<uuid>` (web fallback)
//!
//! where `<kind>` is `migration`, `invite` or `room`.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use tw_core::constants::{LINK_SCHEME, MIGRATION_LINK_HOST};
use tw_core::error::{BackendError, ErrorKind};

lazy_static! {
    // twinflow://migration?id=...
    static ref APP_LINK: Regex = Regex::new(
        r"^(?i)twinflow://(?P<kind>migration|invite|room)/?\?id=(?P<id>[^&#\s]+)$"
    ).unwrap();

    // https://migration.twin.me/?id=...
    static ref WEB_LINK: Regex = Regex::new(
        r"^(?i)https://(?P<kind>migration|invite|room)\.twin\.me/?\?id=(?P<id>[^&#\s]+)$"
    ).unwrap();
}

/// Why a link could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("empty link")]
    Empty,

    /// Neither an app link nor a web link.
    #[error("unsupported link format")]
    UnsupportedFormat,

    #[error("invalid twincode id: {0}")]
    InvalidId(String),

    /// A well-formed link of another kind than the one expected.
    #[error("expected a {expected} link, got a {actual} link")]
    WrongKind { expected: LinkKind, actual: LinkKind },
}

impl From<LinkError> for BackendError {
    fn from(e: LinkError) -> Self {
        BackendError::other(ErrorKind::InvalidCode, e.to_string())
    }
}

/// What a link points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Migration,
    Invitation,
    Room,
}

impl LinkKind {
    fn from_path(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "migration" => Some(Self::Migration),
            "invite" => Some(Self::Invitation),
            "room" => Some(Self::Room),
            _ => None,
        }
    }

    /// Path segment used in both link forms.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Migration => "migration",
            Self::Invitation => "invite",
            Self::Room => "room",
        }
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// A parsed twincode link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwincodeLink {
    pub kind: LinkKind,
    /// Normalized (lowercase, hyphenated) twincode id.
    pub twincode_id: String,
}

impl TwincodeLink {
    /// Parse an app or web link.
    pub fn parse(input: &str) -> Result<Self, LinkError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(LinkError::Empty);
        }

        let captures = APP_LINK
            .captures(input)
            .or_else(|| WEB_LINK.captures(input))
            .ok_or(LinkError::UnsupportedFormat)?;

        let kind = LinkKind::from_path(&captures["kind"]).ok_or(LinkError::UnsupportedFormat)?;
        let raw_id = &captures["id"];
        let id = uuid::Uuid::parse_str(raw_id).map_err(|_| LinkError::InvalidId(raw_id.to_string()))?;

        Ok(Self {
            kind,
            twincode_id: id.hyphenated().to_string(),
        })
    }

    /// Parse a link and require it to be a migration link.
    pub fn parse_migration(input: &str) -> Result<Self, LinkError> {
        let link = Self::parse(input)?;
        if link.kind != LinkKind::Migration {
            return Err(LinkError::WrongKind {
                expected: LinkKind::Migration,
                actual: link.kind,
            });
        }
        Ok(link)
    }

    /// In-app form of this link.
    pub fn to_app_link(&self) -> String {
        format!("{LINK_SCHEME}://{}?id={}", self.kind.path(), self.twincode_id)
    }

    /// Web form of this link.
    pub fn to_web_link(&self) -> String {
        match self.kind {
            LinkKind::Migration => format!("https://{MIGRATION_LINK_HOST}/?id={}", self.twincode_id),
            other => format!("https://{}.twin.me/?id={}", other.path(), self.twincode_id),
        }
    }
}

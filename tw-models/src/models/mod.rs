//! Entity models persisted by the local store.

pub mod space;
pub mod profile;
pub mod contact;
pub mod notification;
pub mod twincode;
pub mod account_migration;
pub mod subscription;
pub mod room_config;

use tw_core::constants::{MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH};
use tw_core::error::{TwError, TwResult};

/// Generate a new entity identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time as an RFC 3339 string.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Validate a user-supplied name (profile, space, contact).
pub fn validate_name(name: &str) -> TwResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TwError::InvalidInput("name must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(TwError::InvalidInput(format!(
            "name exceeds {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate an optional free-form description.
pub fn validate_description(description: Option<&str>) -> TwResult<()> {
    match description {
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LENGTH => Err(TwError::InvalidInput(
            format!("description exceeds {MAX_DESCRIPTION_LENGTH} characters"),
        )),
        _ => Ok(()),
    }
}

/// Map a single-row query result into an Option, treating "no rows" as None.
pub(crate) fn optional_row<T>(result: rusqlite::Result<T>) -> TwResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(TwError::Database(e.to_string())),
    }
}

/// Convert a rusqlite error into the application error.
pub(crate) fn db_err(e: rusqlite::Error) -> TwError {
    TwError::Database(e.to_string())
}

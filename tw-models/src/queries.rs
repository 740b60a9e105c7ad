//! Query builders for list and batch access patterns.
//!
//! Single-entity lookups live on the models themselves; this module holds
//! the queries that return collections or touch many rows at once. All
//! queries use parameterized SQL.

use rusqlite::{params, params_from_iter, Connection};
use tw_core::error::{TwError, TwResult};

use crate::models::account_migration::AccountMigration;
use crate::models::contact::Contact;
use crate::models::notification::Notification;
use crate::models::space::Space;
use crate::models::subscription::Subscription;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(&self) -> &str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

// ─── Space Queries ──────────────────────────────────────────────────────────

/// Space with computed fields from a join query.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SpaceWithDetails {
    pub space: Space,
    pub profile_name: Option<String>,
    pub contact_count: i64,
}

/// List every space, current space first, then by creation date.
pub fn list_spaces_with_details(conn: &Connection) -> TwResult<Vec<SpaceWithDetails>> {
    let mut stmt = conn
        .prepare(
            "SELECT s.*,
                p.name AS profile_name,
                COALESCE((SELECT COUNT(*) FROM contacts c WHERE c.space_id = s.id), 0) AS contact_count
             FROM spaces s
             LEFT JOIN profiles p ON p.id = s.profile_id
             ORDER BY s.is_current DESC, s.created_at ASC",
        )
        .map_err(|e| TwError::Database(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(SpaceWithDetails {
                space: Space::from_row(row)?,
                profile_name: row.get("profile_name")?,
                contact_count: row.get("contact_count")?,
            })
        })
        .map_err(|e| TwError::Database(e.to_string()))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| TwError::Database(e.to_string()))
}

// ─── Contact Queries ────────────────────────────────────────────────────────

/// Which contacts of a space to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactFilter {
    All,
    ContactsOnly,
    RoomsOnly,
}

/// List the contacts of a space ordered by name.
pub fn list_contacts_in_space(
    conn: &Connection,
    space_id: &str,
    filter: ContactFilter,
) -> TwResult<Vec<Contact>> {
    let room_filter = match filter {
        ContactFilter::All => "",
        ContactFilter::ContactsOnly => "AND is_room = 0",
        ContactFilter::RoomsOnly => "AND is_room = 1",
    };
    let sql = format!(
        "SELECT * FROM contacts WHERE space_id = ?1 {room_filter} ORDER BY name COLLATE NOCASE ASC"
    );

    let mut stmt = conn.prepare(&sql).map_err(|e| TwError::Database(e.to_string()))?;
    let rows = stmt
        .query_map([space_id], Contact::from_row)
        .map_err(|e| TwError::Database(e.to_string()))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| TwError::Database(e.to_string()))
}

// ─── Notification Queries ───────────────────────────────────────────────────

/// List the notifications of a space by creation date.
pub fn list_notifications(
    conn: &Connection,
    space_id: &str,
    sort: SortDirection,
) -> TwResult<Vec<Notification>> {
    let sql = format!(
        "SELECT * FROM notifications WHERE space_id = ?1 ORDER BY created_at {}, id ASC",
        sort.as_sql()
    );

    let mut stmt = conn.prepare(&sql).map_err(|e| TwError::Database(e.to_string()))?;
    let rows = stmt
        .query_map([space_id], Notification::from_row)
        .map_err(|e| TwError::Database(e.to_string()))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| TwError::Database(e.to_string()))
}

/// Number of unacknowledged notifications in a space.
pub fn count_unacknowledged(conn: &Connection, space_id: &str) -> TwResult<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE space_id = ?1 AND acknowledged = 0",
        params![space_id],
        |row| row.get(0),
    )
    .map_err(|e| TwError::Database(e.to_string()))
}

/// Mark the given notifications acknowledged. Returns how many changed.
pub fn acknowledge_notifications(conn: &Connection, ids: &[String]) -> TwResult<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let sql = format!(
        "UPDATE notifications SET acknowledged = 1 WHERE acknowledged = 0 AND id IN ({})",
        placeholders(ids.len())
    );
    conn.execute(&sql, params_from_iter(ids.iter()))
        .map_err(|e| TwError::Database(e.to_string()))
}

/// Delete the given notifications. Returns how many were removed.
pub fn delete_notifications(conn: &Connection, ids: &[String]) -> TwResult<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let sql = format!("DELETE FROM notifications WHERE id IN ({})", placeholders(ids.len()));
    conn.execute(&sql, params_from_iter(ids.iter()))
        .map_err(|e| TwError::Database(e.to_string()))
}

// ─── Migration / Subscription Queries ───────────────────────────────────────

/// List account migrations, newest first.
pub fn list_migrations(conn: &Connection) -> TwResult<Vec<AccountMigration>> {
    let mut stmt = conn
        .prepare("SELECT * FROM account_migrations ORDER BY created_at DESC")
        .map_err(|e| TwError::Database(e.to_string()))?;
    let rows = stmt
        .query_map([], AccountMigration::from_row)
        .map_err(|e| TwError::Database(e.to_string()))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| TwError::Database(e.to_string()))
}

/// List every stored subscription ordered by product.
pub fn list_subscriptions(conn: &Connection) -> TwResult<Vec<Subscription>> {
    let mut stmt = conn
        .prepare("SELECT * FROM subscriptions ORDER BY product_id ASC")
        .map_err(|e| TwError::Database(e.to_string()))?;
    let rows = stmt
        .query_map([], Subscription::from_row)
        .map_err(|e| TwError::Database(e.to_string()))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| TwError::Database(e.to_string()))
}

fn placeholders(count: usize) -> String {
    (1..=count).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

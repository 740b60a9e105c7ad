//! Subscription entity model.

use serde::{Deserialize, Serialize};
use rusqlite::{params, Connection, Row};
use tw_core::error::TwResult;

use super::{db_err, now_timestamp, optional_row};

/// Lifecycle of a subscription product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Inactive,
    Active,
    Cancelled,
}

impl SubscriptionStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the storage representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inactive" => Some(Self::Inactive),
            "active" => Some(Self::Active),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Subscription state of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub product_id: String,
    /// Activation twincode that unlocked the product.
    pub twincode_id: Option<String>,
    pub status: SubscriptionStatus,
    pub activated_at: Option<String>,
    pub updated_at: String,
}

impl Subscription {
    /// An inactive subscription for a product never activated.
    pub fn inactive(product_id: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
            twincode_id: None,
            status: SubscriptionStatus::Inactive,
            activated_at: None,
            updated_at: now_timestamp(),
        }
    }

    /// Whether the product is currently unlocked.
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    /// Construct a Subscription from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let status: String = row.get("status")?;
        Ok(Self {
            product_id: row.get("product_id")?,
            twincode_id: row.get("twincode_id")?,
            status: SubscriptionStatus::parse(&status).unwrap_or(SubscriptionStatus::Inactive),
            activated_at: row.get("activated_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Find the subscription of a product.
    pub fn find_by_product(conn: &Connection, product_id: &str) -> TwResult<Option<Self>> {
        optional_row(conn.query_row(
            "SELECT * FROM subscriptions WHERE product_id = ?1",
            [product_id],
            Self::from_row,
        ))
    }

    /// Insert or update this subscription.
    pub fn save(&self, conn: &Connection) -> TwResult<()> {
        conn.execute(
            "INSERT INTO subscriptions (product_id, twincode_id, status, activated_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(product_id) DO UPDATE SET
                twincode_id = excluded.twincode_id,
                status = excluded.status,
                activated_at = excluded.activated_at,
                updated_at = excluded.updated_at",
            params![
                self.product_id,
                self.twincode_id,
                self.status.as_str(),
                self.activated_at,
                self.updated_at,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

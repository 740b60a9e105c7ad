//! Twinflow Models - Local store schema, entity models, migrations, and queries.
//!
//! This crate owns persistence for the local reference backend: SQLite
//! initialization, entity models, versioned migrations, and the list/filter
//! queries the backend capabilities are built on.

pub mod db;
pub mod schema;
pub mod models;
pub mod queries;
pub mod migrations;

// Re-export key types
pub use db::{Database, DbPool, DatabaseStats};
pub use models::space::Space;
pub use models::profile::Profile;
pub use models::contact::{Contact, ContactUpdate};
pub use models::notification::{Notification, NotificationKind};
pub use models::twincode::{Twincode, TwincodeKind};
pub use models::account_migration::{AccountMigration, MigrationState};
pub use models::subscription::{Subscription, SubscriptionStatus};
pub use models::room_config::{ChatMode, InvitationMode, RoomConfig, RoomConfigUpdate};

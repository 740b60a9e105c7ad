//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "Twinflow";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory name used under the platform data/config directories.
pub const APP_DIR_NAME: &str = "Twinflow";

/// Environment variable overriding the data and config directories.
pub const HOME_ENV_VAR: &str = "TWINFLOW_HOME";

/// Rotated log file prefix.
pub const LOG_FILE_NAME: &str = "twinflow.log";

/// Database schema version.
pub const DB_SCHEMA_VERSION: i32 = 1;

/// Name of the space seeded into a fresh database.
pub const DEFAULT_SPACE_NAME: &str = "General";

/// Default capacity of the diagnostics event bus.
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 256;

/// Maximum length accepted for profile, space and contact names.
pub const MAX_NAME_LENGTH: usize = 64;

/// Maximum length accepted for descriptions and welcome messages.
pub const MAX_DESCRIPTION_LENGTH: usize = 512;

/// URI scheme of in-app links.
pub const LINK_SCHEME: &str = "twinflow";

/// Web host serving account migration links.
pub const MIGRATION_LINK_HOST: &str = "migration.twin.me";

/// Known subscription products.
pub mod products {
    /// Premium feature bundle.
    pub const PREMIUM: &str = "premium";
    /// Group calls add-on.
    pub const GROUP_CALLS: &str = "group-calls";

    /// All known product identifiers.
    pub const ALL: &[&str] = &[PREMIUM, GROUP_CALLS];

    /// Whether a product identifier is known.
    pub fn is_known(product_id: &str) -> bool {
        ALL.contains(&product_id)
    }
}

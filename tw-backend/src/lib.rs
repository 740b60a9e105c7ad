//! Twinflow Backend - The calls controllers are allowed to make.
//!
//! This crate defines the backend call interface as narrow capability
//! traits, one per concern, so each controller only receives the calls it
//! uses. It also provides:
//! - `Connectivity`, the explicit ready/online signal sequencers follow
//! - Twincode link parsing for scanned QR codes and pasted links
//! - `LocalBackend`, a SQLite implementation of every capability
//! - Demo data seeding for the CLI and tests

pub mod capabilities;
pub mod connectivity;
pub mod links;
pub mod local;
pub mod seed;

// Re-export key types
pub use capabilities::{
    Backend, ContactRepository, MigrationRepository, NotificationRepository,
    ProfileRepository, RoomRepository, SpaceRepository, SubscriptionRepository,
    TwincodeRepository,
};
pub use connectivity::{BackendStatus, Connectivity};
pub use links::{LinkError, LinkKind, TwincodeLink};
pub use local::LocalBackend;
pub use seed::{seed_demo_data, SeedSummary};

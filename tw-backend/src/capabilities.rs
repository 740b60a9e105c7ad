//! Capability traits forming the backend call interface.
//!
//! Every call is asynchronous and yields exactly one `BackendResult`.
//! `BackendError::TransientOffline` means "try again once online"; callers
//! never see it surface as a user-visible error.

use async_trait::async_trait;

use tw_core::error::BackendResult;
use tw_models::queries::SpaceWithDetails;
use tw_models::{
    AccountMigration, Contact, ContactUpdate, Notification, Profile, RoomConfig,
    RoomConfigUpdate, Space, Subscription, Twincode,
};

/// Spaces and the current-space selection.
#[async_trait]
pub trait SpaceRepository: Send + Sync {
    /// The space new contacts land in.
    async fn get_current_space(&self) -> BackendResult<Space>;

    /// Load a space by id.
    async fn get_space(&self, space_id: &str) -> BackendResult<Space>;

    /// Every space with its profile name and contact count.
    async fn list_spaces(&self) -> BackendResult<Vec<SpaceWithDetails>>;

    /// Create a new, non-current space.
    async fn create_space(&self, name: &str, description: Option<&str>) -> BackendResult<Space>;

    /// Make a space the current one.
    async fn set_current_space(&self, space_id: &str) -> BackendResult<Space>;

    /// Attach a profile to a space.
    async fn bind_profile(&self, space_id: &str, profile_id: &str) -> BackendResult<Space>;
}

/// Profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Create a profile together with its identity twincode.
    async fn create_profile(&self, name: &str, description: Option<&str>) -> BackendResult<Profile>;

    async fn get_profile(&self, profile_id: &str) -> BackendResult<Profile>;
}

/// Contacts of a space.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn get_contact(&self, contact_id: &str) -> BackendResult<Contact>;

    /// Write the given edits and return the updated contact.
    async fn update_contact(&self, contact_id: &str, update: &ContactUpdate) -> BackendResult<Contact>;

    async fn delete_contact(&self, contact_id: &str) -> BackendResult<()>;

    /// Contacts and rooms of a space, by name.
    async fn list_contacts(&self, space_id: &str) -> BackendResult<Vec<Contact>>;
}

/// Notifications of a space.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Notifications of a space, newest first.
    async fn list_notifications(&self, space_id: &str) -> BackendResult<Vec<Notification>>;

    /// Returns how many notifications changed state.
    async fn acknowledge_notifications(&self, ids: &[String]) -> BackendResult<usize>;

    /// Returns how many notifications were removed.
    async fn delete_notifications(&self, ids: &[String]) -> BackendResult<usize>;
}

/// Twincode resolution.
#[async_trait]
pub trait TwincodeRepository: Send + Sync {
    async fn get_twincode(&self, twincode_id: &str) -> BackendResult<Twincode>;
}

/// Account migration between devices.
#[async_trait]
pub trait MigrationRepository: Send + Sync {
    /// Start migrating the account from the device that shows `peer_twincode_id`.
    async fn create_account_migration(
        &self,
        peer_twincode_id: &str,
        device_name: &str,
    ) -> BackendResult<AccountMigration>;
}

/// In-app subscriptions.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Fails with `ItemNotFound` for a product that was never activated.
    async fn get_subscription(&self, product_id: &str) -> BackendResult<Subscription>;

    async fn activate_subscription(
        &self,
        product_id: &str,
        twincode_id: &str,
    ) -> BackendResult<Subscription>;

    async fn cancel_subscription(&self, product_id: &str) -> BackendResult<Subscription>;
}

/// Rooms and their configuration.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Load a room. Contacts that are not rooms are reported as not found.
    async fn get_room(&self, room_id: &str) -> BackendResult<Contact>;

    /// Stored configuration, or the defaults for a room never configured.
    async fn get_room_config(&self, room_id: &str) -> BackendResult<RoomConfig>;

    async fn update_room_config(
        &self,
        room_id: &str,
        update: &RoomConfigUpdate,
    ) -> BackendResult<RoomConfig>;
}

/// A backend offering every capability.
pub trait Backend:
    SpaceRepository
    + ProfileRepository
    + ContactRepository
    + NotificationRepository
    + TwincodeRepository
    + MigrationRepository
    + SubscriptionRepository
    + RoomRepository
{
}

impl<T> Backend for T where
    T: SpaceRepository
        + ProfileRepository
        + ContactRepository
        + NotificationRepository
        + TwincodeRepository
        + MigrationRepository
        + SubscriptionRepository
        + RoomRepository
{
}

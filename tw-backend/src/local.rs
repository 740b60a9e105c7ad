//! SQLite-backed implementation of every backend capability.
//!
//! Each call checks connectivity first and fails with `TransientOffline`
//! while the backend is not online, then runs its storage work on the
//! blocking pool.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use tw_core::config::BackendConfig;
use tw_core::constants::products;
use tw_core::error::{BackendError, BackendResult, ErrorKind, TwResult};
use tw_models::models::{now_timestamp, validate_description, validate_name};
use tw_models::queries::{self, ContactFilter, SortDirection, SpaceWithDetails};
use tw_models::{
    AccountMigration, Contact, ContactUpdate, Database, Notification, Profile, RoomConfig,
    RoomConfigUpdate, Space, Subscription, SubscriptionStatus, Twincode, TwincodeKind,
};

use crate::capabilities::{
    ContactRepository, MigrationRepository, NotificationRepository, ProfileRepository,
    RoomRepository, SpaceRepository, SubscriptionRepository, TwincodeRepository,
};
use crate::connectivity::Connectivity;

/// Local backend over the Twinflow SQLite store.
#[derive(Clone)]
pub struct LocalBackend {
    database: Database,
    connectivity: Connectivity,
    latency: Duration,
}

impl LocalBackend {
    /// Create a backend with no simulated latency.
    pub fn new(database: Database, connectivity: Connectivity) -> Self {
        Self {
            database,
            connectivity,
            latency: Duration::ZERO,
        }
    }

    /// Create a backend using the `[backend]` configuration section.
    pub fn from_config(database: Database, connectivity: Connectivity, config: &BackendConfig) -> Self {
        Self::new(database, connectivity).with_latency(config.latency())
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Run one backend call against the store.
    async fn call<T, F>(&self, op: &'static str, f: F) -> BackendResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> TwResult<T> + Send + 'static,
    {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if !self.connectivity.is_online() {
            debug!("{op}: backend is {}, reporting offline", self.connectivity.status());
            return Err(BackendError::TransientOffline);
        }

        let db = self.database.clone();
        let result = tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| BackendError::other(ErrorKind::Internal, format!("{op} task failed: {e}")))?
            .map_err(BackendError::from);

        match &result {
            Ok(_) => debug!("{op}: ok"),
            Err(e) if e.is_not_found() => debug!("{op}: {e}"),
            Err(e) => warn!("{op} failed: {e}"),
        }
        result
    }
}

fn room_of(db: &Database, room_id: &str) -> TwResult<Contact> {
    let conn = db.conn()?;
    match Contact::find_by_id(&conn, room_id)? {
        Some(contact) if contact.is_room => Ok(contact),
        _ => Err(BackendError::not_found(format!("room {room_id}")).into()),
    }
}

#[async_trait]
impl SpaceRepository for LocalBackend {
    async fn get_current_space(&self) -> BackendResult<Space> {
        self.call("get_current_space", |db| {
            let conn = db.conn()?;
            Ok(Space::find_current(&conn)?.ok_or_else(|| BackendError::not_found("current space"))?)
        })
        .await
    }

    async fn get_space(&self, space_id: &str) -> BackendResult<Space> {
        let space_id = space_id.to_string();
        self.call("get_space", move |db| {
            let conn = db.conn()?;
            Ok(Space::find_by_id(&conn, &space_id)?
                .ok_or_else(|| BackendError::not_found(format!("space {space_id}")))?)
        })
        .await
    }

    async fn list_spaces(&self) -> BackendResult<Vec<SpaceWithDetails>> {
        self.call("list_spaces", |db| {
            let conn = db.conn()?;
            queries::list_spaces_with_details(&conn)
        })
        .await
    }

    async fn create_space(&self, name: &str, description: Option<&str>) -> BackendResult<Space> {
        validate_name(name)?;
        validate_description(description)?;
        let space = Space::new(name, description);
        self.call("create_space", move |db| {
            let conn = db.conn()?;
            space.save(&conn)?;
            Ok(space)
        })
        .await
    }

    async fn set_current_space(&self, space_id: &str) -> BackendResult<Space> {
        let space_id = space_id.to_string();
        self.call("set_current_space", move |db| {
            db.transaction(|conn| {
                if !Space::make_current(conn, &space_id)? {
                    return Err(BackendError::not_found(format!("space {space_id}")).into());
                }
                Ok(Space::find_by_id(conn, &space_id)?
                    .ok_or_else(|| BackendError::not_found(format!("space {space_id}")))?)
            })
        })
        .await
    }

    async fn bind_profile(&self, space_id: &str, profile_id: &str) -> BackendResult<Space> {
        let space_id = space_id.to_string();
        let profile_id = profile_id.to_string();
        self.call("bind_profile", move |db| {
            db.transaction(|conn| {
                if Profile::find_by_id(conn, &profile_id)?.is_none() {
                    return Err(BackendError::not_found(format!("profile {profile_id}")).into());
                }
                let mut space = Space::find_by_id(conn, &space_id)?
                    .ok_or_else(|| BackendError::not_found(format!("space {space_id}")))?;
                space.profile_id = Some(profile_id.clone());
                space.save(conn)?;
                Ok(space)
            })
        })
        .await
    }
}

#[async_trait]
impl ProfileRepository for LocalBackend {
    async fn create_profile(&self, name: &str, description: Option<&str>) -> BackendResult<Profile> {
        validate_name(name)?;
        validate_description(description)?;
        let name = name.to_string();
        let description = description.map(str::to_string);
        self.call("create_profile", move |db| {
            db.transaction(|conn| {
                let twincode = Twincode::new(TwincodeKind::Profile, Some(name.trim()));
                twincode.save(conn)?;
                let profile = Profile::new(&name, description.as_deref(), &twincode.id);
                profile.save(conn)?;
                Ok(profile)
            })
        })
        .await
    }

    async fn get_profile(&self, profile_id: &str) -> BackendResult<Profile> {
        let profile_id = profile_id.to_string();
        self.call("get_profile", move |db| {
            let conn = db.conn()?;
            Ok(Profile::find_by_id(&conn, &profile_id)?
                .ok_or_else(|| BackendError::not_found(format!("profile {profile_id}")))?)
        })
        .await
    }
}

#[async_trait]
impl ContactRepository for LocalBackend {
    async fn get_contact(&self, contact_id: &str) -> BackendResult<Contact> {
        let contact_id = contact_id.to_string();
        self.call("get_contact", move |db| {
            let conn = db.conn()?;
            Ok(Contact::find_by_id(&conn, &contact_id)?
                .ok_or_else(|| BackendError::not_found(format!("contact {contact_id}")))?)
        })
        .await
    }

    async fn update_contact(&self, contact_id: &str, update: &ContactUpdate) -> BackendResult<Contact> {
        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        validate_description(update.description.as_deref())?;
        let contact_id = contact_id.to_string();
        let update = update.clone();
        self.call("update_contact", move |db| {
            db.transaction(|conn| {
                let mut contact = Contact::find_by_id(conn, &contact_id)?
                    .ok_or_else(|| BackendError::not_found(format!("contact {contact_id}")))?;
                if !update.is_empty() {
                    update.apply_to(&mut contact);
                    contact.save(conn)?;
                }
                Ok(contact)
            })
        })
        .await
    }

    async fn delete_contact(&self, contact_id: &str) -> BackendResult<()> {
        let contact_id = contact_id.to_string();
        self.call("delete_contact", move |db| {
            let conn = db.conn()?;
            if !Contact::delete(&conn, &contact_id)? {
                return Err(BackendError::not_found(format!("contact {contact_id}")).into());
            }
            Ok(())
        })
        .await
    }

    async fn list_contacts(&self, space_id: &str) -> BackendResult<Vec<Contact>> {
        let space_id = space_id.to_string();
        self.call("list_contacts", move |db| {
            let conn = db.conn()?;
            queries::list_contacts_in_space(&conn, &space_id, ContactFilter::All)
        })
        .await
    }
}

#[async_trait]
impl NotificationRepository for LocalBackend {
    async fn list_notifications(&self, space_id: &str) -> BackendResult<Vec<Notification>> {
        let space_id = space_id.to_string();
        self.call("list_notifications", move |db| {
            let conn = db.conn()?;
            queries::list_notifications(&conn, &space_id, SortDirection::Desc)
        })
        .await
    }

    async fn acknowledge_notifications(&self, ids: &[String]) -> BackendResult<usize> {
        let ids = ids.to_vec();
        self.call("acknowledge_notifications", move |db| {
            let conn = db.conn()?;
            queries::acknowledge_notifications(&conn, &ids)
        })
        .await
    }

    async fn delete_notifications(&self, ids: &[String]) -> BackendResult<usize> {
        let ids = ids.to_vec();
        self.call("delete_notifications", move |db| {
            let conn = db.conn()?;
            queries::delete_notifications(&conn, &ids)
        })
        .await
    }
}

#[async_trait]
impl TwincodeRepository for LocalBackend {
    async fn get_twincode(&self, twincode_id: &str) -> BackendResult<Twincode> {
        let twincode_id = twincode_id.to_string();
        self.call("get_twincode", move |db| {
            let conn = db.conn()?;
            Ok(Twincode::find_by_id(&conn, &twincode_id)?
                .ok_or_else(|| BackendError::not_found(format!("twincode {twincode_id}")))?)
        })
        .await
    }
}

#[async_trait]
impl MigrationRepository for LocalBackend {
    async fn create_account_migration(
        &self,
        peer_twincode_id: &str,
        device_name: &str,
    ) -> BackendResult<AccountMigration> {
        let peer_twincode_id = peer_twincode_id.to_string();
        let device_name = device_name.to_string();
        self.call("create_account_migration", move |db| {
            db.transaction(|conn| {
                let twincode = Twincode::find_by_id(conn, &peer_twincode_id)?
                    .ok_or_else(|| BackendError::not_found(format!("twincode {peer_twincode_id}")))?;
                if twincode.kind != TwincodeKind::Migration {
                    return Err(BackendError::other(
                        ErrorKind::InvalidCode,
                        format!("twincode {} is a {} code", twincode.id, twincode.kind),
                    )
                    .into());
                }
                if let Some(active) = AccountMigration::find_active(conn)? {
                    return Err(BackendError::other(
                        ErrorKind::InvalidState,
                        format!("migration {} is already in progress", active.id),
                    )
                    .into());
                }
                let migration = AccountMigration::new(&peer_twincode_id, &device_name);
                migration.save(conn)?;
                Ok(migration)
            })
        })
        .await
    }
}

fn known_product(product_id: &str) -> BackendResult<()> {
    if products::is_known(product_id) {
        Ok(())
    } else {
        Err(BackendError::other(
            ErrorKind::BadRequest,
            format!("unknown product {product_id}"),
        ))
    }
}

#[async_trait]
impl SubscriptionRepository for LocalBackend {
    async fn get_subscription(&self, product_id: &str) -> BackendResult<Subscription> {
        known_product(product_id)?;
        let product_id = product_id.to_string();
        self.call("get_subscription", move |db| {
            let conn = db.conn()?;
            Ok(Subscription::find_by_product(&conn, &product_id)?
                .ok_or_else(|| BackendError::not_found(format!("subscription {product_id}")))?)
        })
        .await
    }

    async fn activate_subscription(
        &self,
        product_id: &str,
        twincode_id: &str,
    ) -> BackendResult<Subscription> {
        known_product(product_id)?;
        let product_id = product_id.to_string();
        let twincode_id = twincode_id.to_string();
        self.call("activate_subscription", move |db| {
            db.transaction(|conn| {
                let twincode = Twincode::find_by_id(conn, &twincode_id)?
                    .ok_or_else(|| BackendError::not_found(format!("twincode {twincode_id}")))?;
                if twincode.kind != TwincodeKind::Activation {
                    return Err(BackendError::other(
                        ErrorKind::InvalidCode,
                        format!("twincode {} is not an activation code", twincode.id),
                    )
                    .into());
                }
                let mut subscription = Subscription::find_by_product(conn, &product_id)?
                    .unwrap_or_else(|| Subscription::inactive(&product_id));
                let now = now_timestamp();
                subscription.status = SubscriptionStatus::Active;
                subscription.twincode_id = Some(twincode.id);
                subscription.activated_at = Some(now.clone());
                subscription.updated_at = now;
                subscription.save(conn)?;
                Ok(subscription)
            })
        })
        .await
    }

    async fn cancel_subscription(&self, product_id: &str) -> BackendResult<Subscription> {
        known_product(product_id)?;
        let product_id = product_id.to_string();
        self.call("cancel_subscription", move |db| {
            db.transaction(|conn| {
                let mut subscription = Subscription::find_by_product(conn, &product_id)?
                    .ok_or_else(|| BackendError::not_found(format!("subscription {product_id}")))?;
                if !subscription.is_active() {
                    return Err(BackendError::other(
                        ErrorKind::InvalidState,
                        format!("subscription {product_id} is not active"),
                    )
                    .into());
                }
                subscription.status = SubscriptionStatus::Cancelled;
                subscription.updated_at = now_timestamp();
                subscription.save(conn)?;
                Ok(subscription)
            })
        })
        .await
    }
}

#[async_trait]
impl RoomRepository for LocalBackend {
    async fn get_room(&self, room_id: &str) -> BackendResult<Contact> {
        let room_id = room_id.to_string();
        self.call("get_room", move |db| room_of(db, &room_id)).await
    }

    async fn get_room_config(&self, room_id: &str) -> BackendResult<RoomConfig> {
        let room_id = room_id.to_string();
        self.call("get_room_config", move |db| {
            room_of(db, &room_id)?;
            let conn = db.conn()?;
            Ok(RoomConfig::find_by_room(&conn, &room_id)?
                .unwrap_or_else(|| RoomConfig::default_for(&room_id)))
        })
        .await
    }

    async fn update_room_config(
        &self,
        room_id: &str,
        update: &RoomConfigUpdate,
    ) -> BackendResult<RoomConfig> {
        validate_description(update.welcome_message.as_deref())?;
        let room_id = room_id.to_string();
        let update = update.clone();
        self.call("update_room_config", move |db| {
            room_of(db, &room_id)?;
            db.transaction(|conn| {
                let current = RoomConfig::find_by_room(conn, &room_id)?
                    .unwrap_or_else(|| RoomConfig::default_for(&room_id));
                let next = update.applied_to(&current);
                next.save(conn)?;
                Ok(next)
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::BackendStatus;
    use tempfile::TempDir;
    use tw_core::config::DatabaseConfig;

    fn backend(status: BackendStatus) -> (LocalBackend, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::init(&dir.path().join("backend.db"), &DatabaseConfig::default()).unwrap();
        (LocalBackend::new(db, Connectivity::new(status)), dir)
    }

    #[tokio::test]
    async fn test_offline_calls_report_transient_offline() {
        let (backend, _dir) = backend(BackendStatus::Offline);
        let err = backend.get_current_space().await.unwrap_err();
        assert!(err.is_offline());

        backend.connectivity().set_online();
        assert!(backend.get_current_space().await.is_ok());
    }

    #[tokio::test]
    async fn test_not_ready_is_offline_too() {
        let (backend, _dir) = backend(BackendStatus::NotReady);
        assert_eq!(
            backend.get_twincode("x").await.unwrap_err(),
            BackendError::TransientOffline
        );
    }

    #[tokio::test]
    async fn test_validation_maps_to_bad_request() {
        let (backend, _dir) = backend(BackendStatus::Online);
        let err = backend.create_space("  ", None).await.unwrap_err();
        assert!(matches!(err, BackendError::Other { kind: ErrorKind::BadRequest, .. }));
    }

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let (backend, _dir) = backend(BackendStatus::Online);
        let err = backend.get_subscription("platinum").await.unwrap_err();
        assert!(matches!(err, BackendError::Other { kind: ErrorKind::BadRequest, .. }));
        assert!(backend.get_subscription(products::PREMIUM).await.unwrap_err().is_not_found());
    }
}

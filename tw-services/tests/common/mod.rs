//! Shared test utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use tw_backend::{seed_demo_data, BackendStatus, Connectivity, LocalBackend, SeedSummary};
use tw_core::config::DatabaseConfig;
use tw_core::error::BackendError;
use tw_models::{
    AccountMigration, Contact, Database, Notification, Profile, RoomConfig, Space, Subscription,
    Twincode,
};
use tw_services::controllers::{
    CreateProfileObserver, CreateSpaceObserver, EditContactObserver, MigrationScanObserver,
    NotificationsObserver, RoomConfigObserver, SubscriptionObserver,
};
use tw_services::event_bus::EventBus;
use tw_services::{ProgressObserver, ServiceContext, UiHandle, UiThread};

/// How long a test waits for an expected callback.
pub const WAIT: Duration = Duration::from_secs(5);

/// How long a test waits before concluding nothing else happens.
pub const QUIET: Duration = Duration::from_millis(100);

/// Create a temporary database with full schema and migrations applied.
/// Returns the Database and the TempDir (must be held alive for the duration of the test).
pub fn create_test_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("test.db");
    let db = Database::init(&path, &DatabaseConfig::default()).expect("failed to init test database");
    (db, dir)
}

/// Create an EventBus with a small buffer suitable for tests.
pub fn create_test_event_bus() -> EventBus {
    EventBus::new(64)
}

/// Everything a controller test needs: a seeded local backend, the UI
/// thread and a context wired to both.
pub struct TestEnv {
    pub ctx: ServiceContext,
    pub backend: Arc<LocalBackend>,
    pub summary: SeedSummary,
    pub ui: UiHandle,
    pub bus: EventBus,
    _dir: TempDir,
}

impl TestEnv {
    pub fn connectivity(&self) -> &Connectivity {
        self.backend.connectivity()
    }
}

/// Build a test environment whose backend starts in `status`.
pub fn create_test_env(status: BackendStatus) -> TestEnv {
    let (db, dir) = create_test_db();
    let summary = seed_demo_data(&db).expect("failed to seed test database");
    let backend = Arc::new(LocalBackend::new(db, Connectivity::new(status)));
    let (ui, _thread) = UiThread::spawn().expect("failed to start ui thread");
    let bus = create_test_event_bus();
    let ctx = ServiceContext::from_backend(
        backend.clone(),
        ui.clone(),
        bus.clone(),
        backend.connectivity().subscribe(),
    )
    .with_trace_steps(true)
    .with_device_name("test-device");
    TestEnv {
        ctx,
        backend,
        summary,
        ui,
        bus,
        _dir: dir,
    }
}

/// Observer recording every callback as a short string.
///
/// A callback delivered outside the UI thread is recorded as
/// `off_ui_thread` so tests can assert it never happens.
pub struct Recorder {
    tx: mpsc::UnboundedSender<String>,
}

impl Recorder {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    fn record(&self, entry: String) {
        if !UiHandle::is_ui_thread() {
            let _ = self.tx.send("off_ui_thread".to_string());
        }
        let _ = self.tx.send(entry);
    }
}

impl ProgressObserver for Recorder {
    fn show_progress(&self) {
        self.record("show_progress".into());
    }

    fn hide_progress(&self) {
        self.record("hide_progress".into());
    }

    fn on_error(&self, step: &str, error: &BackendError) {
        self.record(format!("error:{step}:{}", error.code()));
    }
}

impl CreateProfileObserver for Recorder {
    fn on_get_space(&self, space: &Space) {
        self.record(format!("get_space:{}", space.name));
    }

    fn on_create_profile(&self, profile: &Profile) {
        self.record(format!("create_profile:{}", profile.name));
    }

    fn on_update_space(&self, space: &Space) {
        let profile = space.profile_id.is_some();
        self.record(format!("update_space:{}:{profile}", space.name));
    }
}

impl CreateSpaceObserver for Recorder {
    fn on_create_space(&self, space: &Space) {
        self.record(format!("create_space:{}", space.name));
    }

    fn on_set_current_space(&self, space: &Space) {
        self.record(format!("set_current_space:{}:{}", space.name, space.is_current));
    }
}

impl EditContactObserver for Recorder {
    fn on_get_contact(&self, contact: &Contact) {
        self.record(format!("get_contact:{}", contact.name));
    }

    fn on_contact_not_found(&self) {
        self.record("contact_not_found".into());
    }

    fn on_update_contact(&self, contact: &Contact) {
        let description = contact.description.clone().unwrap_or_default();
        self.record(format!("update_contact:{}:{description}", contact.name));
    }

    fn on_delete_contact(&self, contact_id: &str) {
        self.record(format!("delete_contact:{contact_id}"));
    }
}

impl MigrationScanObserver for Recorder {
    fn on_invalid_code(&self, code: &str) {
        self.record(format!("invalid_code:{code}"));
    }

    fn on_get_twincode(&self, twincode: &Twincode) {
        self.record(format!("get_twincode:{}", twincode.kind));
    }

    fn on_twincode_not_found(&self) {
        self.record("twincode_not_found".into());
    }

    fn on_migration_created(&self, migration: &AccountMigration) {
        self.record(format!("migration_created:{}", migration.device_name));
    }
}

impl NotificationsObserver for Recorder {
    fn on_get_notifications(&self, notifications: &[Notification], unacknowledged: usize) {
        self.record(format!("notifications:{}:{unacknowledged}", notifications.len()));
    }

    fn on_acknowledged(&self, count: usize) {
        self.record(format!("acknowledged:{count}"));
    }

    fn on_deleted(&self, count: usize) {
        self.record(format!("deleted:{count}"));
    }
}

impl SubscriptionObserver for Recorder {
    fn on_get_subscription(&self, subscription: &Subscription) {
        self.record(format!("get_subscription:{}", subscription.status.as_str()));
    }

    fn on_activation_code_not_found(&self) {
        self.record("activation_code_not_found".into());
    }

    fn on_subscription_updated(&self, subscription: &Subscription) {
        self.record(format!("subscription_updated:{}", subscription.status.as_str()));
    }
}

impl RoomConfigObserver for Recorder {
    fn on_get_room(&self, room: &Contact) {
        self.record(format!("get_room:{}", room.name));
    }

    fn on_room_not_found(&self) {
        self.record("room_not_found".into());
    }

    fn on_get_room_config(&self, config: &RoomConfig) {
        self.record(format!("get_room_config:{}", config.chat_mode.as_str()));
    }

    fn on_update_room_config(&self, config: &RoomConfig) {
        let message = config.welcome_message.clone().unwrap_or_default();
        self.record(format!(
            "update_room_config:{}:{}:{message}",
            config.chat_mode.as_str(),
            config.invitation_mode.as_str()
        ));
    }
}

/// Collect callbacks until `last` is recorded. Panics on timeout.
pub async fn record_until(rx: &mut mpsc::UnboundedReceiver<String>, last: &str) -> Vec<String> {
    let mut seen = Vec::new();
    loop {
        let entry = tokio::time::timeout(WAIT, rx.recv())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {last}, saw {seen:?}"))
            .expect("recorder closed");
        let done = entry == last;
        seen.push(entry);
        if done {
            return seen;
        }
    }
}

/// Collect whatever is recorded within `QUIET`.
pub async fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    tokio::time::sleep(QUIET).await;
    let mut seen = Vec::new();
    while let Ok(entry) = rx.try_recv() {
        seen.push(entry);
    }
    seen
}

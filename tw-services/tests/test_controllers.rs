//! Controller integration tests against a seeded local backend.

mod common;

use std::sync::Arc;

use tw_backend::{BackendStatus, ContactRepository, ProfileRepository, RoomRepository, SpaceRepository};
use tw_core::error::TwError;
use tw_models::{ChatMode, InvitationMode};
use tw_services::controllers::{
    CreateProfileController, CreateSpaceController, EditContactController, EditContactStep,
    MigrationScanController, NotificationsController, RoomConfigController, SubscriptionController,
};
use tw_services::service::{Service, ServiceState};
use tw_services::{AppEvent, StepStatus};

use common::{create_test_env, drain, record_until, Recorder};

fn strings(entries: &[&str]) -> Vec<String> {
    entries.iter().map(|e| e.to_string()).collect()
}

// ---- Create profile ----

#[tokio::test]
async fn create_profile_binds_it_to_the_current_space() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = CreateProfileController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();
    assert_eq!(controller.state(), ServiceState::Running);

    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(seen, strings(&["get_space:General", "hide_progress"]));

    controller.create_profile("Alice", Some("work")).unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&[
            "show_progress",
            "get_space:General",
            "create_profile:Alice",
            "update_space:General:true",
            "hide_progress",
        ])
    );

    let space = env.backend.get_current_space().await.unwrap();
    assert!(space.profile_id.is_some());

    controller.shutdown().unwrap();
    assert_eq!(controller.state(), ServiceState::Stopped);
}

#[tokio::test]
async fn create_profile_waits_out_an_offline_backend() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = CreateProfileController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();
    record_until(&mut rx, "hide_progress").await;

    env.connectivity().set_offline();
    controller.create_profile("Bob", None).unwrap();

    // The call stalls silently.
    assert_eq!(drain(&mut rx).await, strings(&["show_progress"]));
    let snapshot = controller.snapshot().await.unwrap();
    assert!(snapshot.restart_requested);

    env.connectivity().set_online();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&[
            "get_space:General",
            "create_profile:Bob",
            "update_space:General:true",
            "hide_progress",
        ])
    );
}

#[tokio::test]
async fn create_profile_creates_every_queued_request() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = CreateProfileController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();
    record_until(&mut rx, "hide_progress").await;

    // Hold the pipeline so the second request lands while the first is pending.
    env.connectivity().set_offline();
    controller.create_profile("Alice", None).unwrap();
    controller.create_profile("Bob", Some("second")).unwrap();
    assert_eq!(drain(&mut rx).await, strings(&["show_progress", "show_progress"]));

    env.connectivity().set_online();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&[
            "get_space:General",
            "create_profile:Alice",
            "create_profile:Bob",
            "update_space:General:true",
            "hide_progress",
        ])
    );
    assert!(drain(&mut rx).await.is_empty());

    let space = env.backend.get_current_space().await.unwrap();
    let bound = env.backend.get_profile(&space.profile_id.unwrap()).await.unwrap();
    assert_eq!(bound.name, "Bob");
}

#[tokio::test]
async fn create_profile_reports_invalid_names() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = CreateProfileController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();
    record_until(&mut rx, "hide_progress").await;

    controller.create_profile("   ", None).unwrap();
    let seen = record_until(&mut rx, "error:CreateProfile:2").await;
    assert_eq!(
        seen,
        strings(&["show_progress", "get_space:General", "error:CreateProfile:2"])
    );
    // Aborted: no terminal action.
    assert!(drain(&mut rx).await.is_empty());
}

// ---- Create space ----

#[tokio::test]
async fn create_space_can_switch_to_the_new_space() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = CreateSpaceController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    controller.create_space("Side", None, false).unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(seen, strings(&["show_progress", "create_space:Side", "hide_progress"]));
    assert_eq!(env.backend.get_current_space().await.unwrap().name, "General");

    controller.create_space("Work", Some("office"), true).unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&[
            "show_progress",
            "create_space:Work",
            "set_current_space:Work:true",
            "hide_progress",
        ])
    );
    assert_eq!(env.backend.get_current_space().await.unwrap().name, "Work");
    assert_eq!(env.backend.list_spaces().await.unwrap().len(), 3);
}

// ---- Edit contact ----

#[tokio::test]
async fn edit_contact_renames_and_clears_description() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = EditContactController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    let contact_id = env.summary.contact_ids[0].clone();
    controller.load(&contact_id).unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&["show_progress", "get_contact:Ada Lovelace", "hide_progress"])
    );

    controller.update_name("Ada King").unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&[
            "show_progress",
            "update_contact:Ada King:analytical engine",
            "hide_progress",
        ])
    );

    controller.update_description("").unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&["show_progress", "update_contact:Ada King:", "hide_progress"])
    );

    let stored = env.backend.get_contact(&contact_id).await.unwrap();
    assert_eq!(stored.name, "Ada King");
    assert_eq!(stored.description, None);
}

#[tokio::test]
async fn edit_contact_sends_edits_made_during_an_update() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = EditContactController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    let contact_id = env.summary.contact_ids[1].clone();
    controller.load(&contact_id).unwrap();
    record_until(&mut rx, "hide_progress").await;

    controller.update_name("Grace B. Hopper").unwrap();
    controller.update_name("Rear Admiral Hopper").unwrap();
    record_until(&mut rx, "update_contact:Rear Admiral Hopper:").await;
    record_until(&mut rx, "hide_progress").await;

    let stored = env.backend.get_contact(&contact_id).await.unwrap();
    assert_eq!(stored.name, "Rear Admiral Hopper");
    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.status_of(EditContactStep::UpdateContact), Some(StepStatus::Completed));
}

#[tokio::test]
async fn edit_contact_deletes_the_loaded_contact() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = EditContactController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    let contact_id = env.summary.contact_ids[2].clone();
    controller.load(&contact_id).unwrap();
    record_until(&mut rx, "hide_progress").await;

    controller.delete().unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        vec![
            "show_progress".to_string(),
            format!("delete_contact:{contact_id}"),
            "hide_progress".to_string(),
        ]
    );
    assert!(env.backend.get_contact(&contact_id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn edit_contact_reports_unknown_contacts() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = EditContactController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    controller.load("no-such-contact").unwrap();
    let seen = record_until(&mut rx, "contact_not_found").await;
    assert_eq!(seen, strings(&["show_progress", "contact_not_found"]));
    assert!(drain(&mut rx).await.is_empty());

    // Edits without a loaded contact never reach the backend.
    controller.update_name("Nobody").unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(seen, strings(&["show_progress", "hide_progress"]));
}

#[tokio::test]
async fn edit_contact_rejects_triggers_before_load() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = EditContactController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    controller.delete().unwrap();
    assert_eq!(drain(&mut rx).await, strings(&["error:DeleteContact:14"]));

    controller.update_description("nobody to describe").unwrap();
    assert_eq!(drain(&mut rx).await, strings(&["error:UpdateContact:14"]));

    let snapshot = controller.snapshot().await.unwrap();
    assert!(snapshot.work.is_empty());
}

// ---- Migration scan ----

#[tokio::test]
async fn migration_scan_creates_the_migration() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = MigrationScanController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    let link = format!("twinflow://migration?id={}", env.summary.migration_twincode_id);
    controller.scan(&link).unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&[
            "show_progress",
            "get_twincode:migration",
            "migration_created:test-device",
            "hide_progress",
        ])
    );
}

#[tokio::test]
async fn migration_scan_rejects_other_codes() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = MigrationScanController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    // Not a link at all: no backend call.
    controller.scan("hello").unwrap();
    assert_eq!(record_until(&mut rx, "invalid_code:hello").await, strings(&["invalid_code:hello"]));

    // A well-formed link to a code of another kind.
    let activation = env.summary.activation_twincode_id.clone();
    controller
        .scan(&format!("https://migration.twin.me/?id={activation}"))
        .unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        vec![
            "show_progress".to_string(),
            "get_twincode:activation".to_string(),
            format!("invalid_code:{activation}"),
            "hide_progress".to_string(),
        ]
    );

    // A migration link to a code that does not exist.
    controller
        .scan("twinflow://migration?id=00000000-0000-4000-8000-000000000000")
        .unwrap();
    let seen = record_until(&mut rx, "twincode_not_found").await;
    assert_eq!(seen, strings(&["show_progress", "twincode_not_found"]));
}

// ---- Notifications ----

#[tokio::test]
async fn notifications_acknowledge_and_delete() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = NotificationsController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(seen, strings(&["notifications:4:4", "hide_progress"]));

    let ids = env.summary.notification_ids.clone();
    controller.acknowledge(vec![ids[0].clone()]).unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&["show_progress", "acknowledged:1", "notifications:4:3", "hide_progress"])
    );

    controller.acknowledge_all().unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&["show_progress", "acknowledged:3", "notifications:4:0", "hide_progress"])
    );

    controller.delete(vec![ids[1].clone(), ids[2].clone()]).unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&["show_progress", "deleted:2", "notifications:2:0", "hide_progress"])
    );

    controller.refresh().unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(seen, strings(&["show_progress", "notifications:2:0", "hide_progress"]));
}

// ---- Subscription ----

#[tokio::test]
async fn subscription_activate_then_cancel() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = SubscriptionController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    controller.load("premium").unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&["show_progress", "get_subscription:inactive", "hide_progress"])
    );

    controller.activate(&env.summary.activation_twincode_id).unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&["show_progress", "subscription_updated:active", "hide_progress"])
    );

    controller.cancel().unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&["show_progress", "subscription_updated:cancelled", "hide_progress"])
    );
}

#[tokio::test]
async fn subscription_reports_unknown_codes_and_products() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = SubscriptionController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    controller.load("premium").unwrap();
    record_until(&mut rx, "hide_progress").await;

    controller.activate("unknown-code").unwrap();
    let seen = record_until(&mut rx, "activation_code_not_found").await;
    assert_eq!(seen, strings(&["show_progress", "activation_code_not_found"]));

    controller.load("platinum").unwrap();
    let seen = record_until(&mut rx, "error:GetSubscription:2").await;
    assert_eq!(seen, strings(&["show_progress", "error:GetSubscription:2"]));
}

#[tokio::test]
async fn subscription_rejects_impossible_changes() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = SubscriptionController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    // Nothing loaded yet.
    controller.activate(&env.summary.activation_twincode_id).unwrap();
    assert_eq!(drain(&mut rx).await, strings(&["error:ActivateSubscription:14"]));

    controller.load("premium").unwrap();
    record_until(&mut rx, "hide_progress").await;
    controller.cancel().unwrap();
    assert_eq!(drain(&mut rx).await, strings(&["error:CancelSubscription:14"]));

    controller.activate(&env.summary.activation_twincode_id).unwrap();
    record_until(&mut rx, "hide_progress").await;
    controller.activate(&env.summary.activation_twincode_id).unwrap();
    assert_eq!(drain(&mut rx).await, strings(&["error:ActivateSubscription:14"]));
}

// ---- Room configuration ----

#[tokio::test]
async fn room_config_loads_and_updates() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = RoomConfigController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    let room_id = env.summary.room_id.clone();
    controller.load(&room_id).unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&["show_progress", "get_room:Book club", "get_room_config:public", "hide_progress"])
    );

    controller.set_chat_mode(ChatMode::ChannelOnly).unwrap();
    let seen = record_until(&mut rx, "hide_progress").await;
    assert_eq!(
        seen,
        strings(&[
            "show_progress",
            "update_room_config:channel_only:admin_only:Welcome to the book club",
            "hide_progress",
        ])
    );

    controller.set_welcome_message("").unwrap();
    controller.set_invitation_mode(InvitationMode::Public).unwrap();
    record_until(&mut rx, "update_room_config:channel_only:public:").await;

    let config = env.backend.get_room_config(&room_id).await.unwrap();
    assert_eq!(config.chat_mode, ChatMode::ChannelOnly);
    assert_eq!(config.invitation_mode, InvitationMode::Public);
    assert_eq!(config.welcome_message, None);
}

#[tokio::test]
async fn room_config_rejects_edits_before_load() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = RoomConfigController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    controller.set_chat_mode(ChatMode::ChannelOnly).unwrap();
    assert_eq!(drain(&mut rx).await, strings(&["error:UpdateRoomConfig:14"]));

    let config = env.backend.get_room_config(&env.summary.room_id).await.unwrap();
    assert_ne!(config.chat_mode, ChatMode::ChannelOnly);
}

#[tokio::test]
async fn room_config_rejects_plain_contacts() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = RoomConfigController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    controller.load(&env.summary.contact_ids[0]).unwrap();
    let seen = record_until(&mut rx, "room_not_found").await;
    assert_eq!(seen, strings(&["show_progress", "room_not_found"]));
}

// ---- Lifecycle ----

#[tokio::test]
async fn triggers_require_a_running_controller() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, _rx) = Recorder::new();
    let mut controller = EditContactController::new(&env.ctx, recorder.clone());

    assert!(matches!(controller.load("x"), Err(TwError::ServiceNotInitialized(_))));

    controller.init().unwrap();
    controller.dispose();
    assert!(matches!(controller.load("x"), Err(TwError::Disposed(_))));
    assert!(matches!(controller.snapshot().await, Err(TwError::Disposed(_))));
    assert!(controller.init().is_err());
}

#[tokio::test]
async fn no_callback_after_dispose() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    let mut controller = EditContactController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    controller.load(&env.summary.contact_ids[0]).unwrap();
    controller.dispose();

    env.ui.flush().await.unwrap();
    assert!(drain(&mut rx).await.is_empty());
    // The controller released the observer.
    assert_eq!(Arc::strong_count(&recorder), 1);
}

#[tokio::test]
async fn dropping_a_controller_detaches_its_observer() {
    let env = create_test_env(BackendStatus::Online);
    let (recorder, mut rx) = Recorder::new();
    {
        let mut controller = NotificationsController::new(&env.ctx, recorder.clone());
        controller.init().unwrap();
    }

    env.ui.flush().await.unwrap();
    assert!(drain(&mut rx).await.is_empty());
}

#[tokio::test]
async fn step_events_are_published_when_tracing() {
    let env = create_test_env(BackendStatus::Online);
    let mut events = env.bus.subscribe();
    let (recorder, mut rx) = Recorder::new();
    let mut controller = CreateSpaceController::new(&env.ctx, recorder.clone());
    controller.init().unwrap();

    controller.create_space("Traced", None, false).unwrap();
    record_until(&mut rx, "hide_progress").await;
    controller.dispose();

    let mut seen = Vec::new();
    while let Ok(event) =
        tokio::time::timeout(common::WAIT, events.recv()).await.expect("event bus timed out")
    {
        let disposed = matches!(event, AppEvent::WorkflowDisposed { .. });
        seen.push(event);
        if disposed {
            break;
        }
    }

    let workflow = "create_space".to_string();
    assert_eq!(
        seen,
        vec![
            AppEvent::StepStarted {
                workflow: workflow.clone(),
                step: "CreateSpace".into(),
            },
            AppEvent::StepCompleted {
                workflow: workflow.clone(),
                step: "CreateSpace".into(),
            },
            AppEvent::WorkflowFinished {
                workflow: workflow.clone(),
            },
            AppEvent::WorkflowDisposed { workflow },
        ]
    );
}

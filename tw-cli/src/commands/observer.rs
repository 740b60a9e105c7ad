//! Terminal observer shared by every workflow command.
//!
//! Renders observer callbacks as text lines or JSON objects, runs a spinner
//! between `show_progress` and `hide_progress`, and lets the command wait
//! for the workflow to finish.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::Notify;

use tw_core::error::{BackendError, TwError, TwResult};
use tw_models::{
    AccountMigration, Contact, Notification, Profile, RoomConfig, Space, Subscription, Twincode,
};
use tw_services::controllers::{
    CreateProfileObserver, CreateSpaceObserver, EditContactObserver, MigrationScanObserver,
    NotificationsObserver, RoomConfigObserver, SubscriptionObserver,
};
use tw_services::ProgressObserver;

use crate::OutputFormat;

enum Outcome {
    Done,
    Failed(String),
}

#[derive(Default)]
struct WaitState {
    /// Set by `show_progress`; a `hide_progress` before it belongs to an
    /// earlier run and is ignored.
    armed: bool,
    outcome: Option<Outcome>,
}

/// Observer printing to the terminal.
pub struct CliObserver {
    label: String,
    format: OutputFormat,
    spinner: Mutex<Option<ProgressBar>>,
    state: Mutex<WaitState>,
    done: Notify,
}

impl CliObserver {
    pub fn new(label: &str, format: OutputFormat) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            format,
            spinner: Mutex::new(None),
            state: Mutex::new(WaitState::default()),
            done: Notify::new(),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, WaitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_spinner(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.spinner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_spinner(&self) {
        if let Some(spinner) = self.lock_spinner().take() {
            spinner.finish_and_clear();
        }
    }

    fn finish(&self, outcome: Outcome) {
        self.stop_spinner();
        let mut state = self.lock_state();
        if state.outcome.is_none() {
            state.outcome = Some(outcome);
        }
        drop(state);
        self.done.notify_one();
    }

    /// End the wait with an error.
    pub fn fail(&self, message: impl Into<String>) {
        self.finish(Outcome::Failed(message.into()));
    }

    /// Print one line of text output, above the spinner if one is running.
    pub fn say(&self, line: impl AsRef<str>) {
        if self.format != OutputFormat::Text {
            return;
        }
        match self.lock_spinner().as_ref() {
            Some(spinner) => spinner.println(line.as_ref()),
            None => println!("{}", line.as_ref()),
        }
    }

    /// Report a callback: a JSON object, or the text line from `text`.
    pub fn emit<T: Serialize + ?Sized>(&self, event: &str, data: &T, text: impl FnOnce() -> String) {
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({ "event": event, "data": data });
                println!("{value}");
            }
            OutputFormat::Text => self.say(text()),
        }
    }

    /// Wait until the current run finishes, fails, or `timeout` elapses.
    pub async fn wait(&self, timeout: Duration) -> TwResult<()> {
        let result = tokio::time::timeout(timeout, async {
            loop {
                let notified = self.done.notified();
                let outcome = {
                    let mut state = self.lock_state();
                    let outcome = state.outcome.take();
                    if outcome.is_some() {
                        state.armed = false;
                    }
                    outcome
                };
                if let Some(outcome) = outcome {
                    return outcome;
                }
                notified.await;
            }
        })
        .await;

        match result {
            Ok(Outcome::Done) => Ok(()),
            Ok(Outcome::Failed(message)) => Err(TwError::Service(message)),
            Err(_) => {
                self.stop_spinner();
                Err(TwError::Service(format!(
                    "{} did not finish within {}ms (is the backend offline?)",
                    self.label,
                    timeout.as_millis()
                )))
            }
        }
    }
}

fn bullet(text: String) -> String {
    format!("  {} {text}", style("-").dim())
}

fn ok(text: String) -> String {
    format!("  {} {text}", style("OK").green().bold())
}

impl ProgressObserver for CliObserver {
    fn show_progress(&self) {
        self.lock_state().armed = true;
        if self.format != OutputFormat::Text {
            return;
        }
        let mut spinner = self.lock_spinner();
        if spinner.is_none() {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.set_message(self.label.clone());
            bar.enable_steady_tick(Duration::from_millis(100));
            *spinner = Some(bar);
        }
    }

    fn hide_progress(&self) {
        if self.lock_state().armed {
            self.finish(Outcome::Done);
        }
    }

    fn on_error(&self, step: &str, error: &BackendError) {
        self.fail(format!("{step} failed: {error} (code {})", error.code()));
    }
}

impl CreateProfileObserver for CliObserver {
    fn on_get_space(&self, space: &Space) {
        self.emit("get_space", space, || bullet(format!("Current space: {}", space.name)));
    }

    fn on_create_profile(&self, profile: &Profile) {
        self.emit("create_profile", profile, || {
            ok(format!("Created profile {} ({})", style(&profile.name).bold(), profile.id))
        });
    }

    fn on_update_space(&self, space: &Space) {
        self.emit("update_space", space, || ok(format!("Space {} now uses the profile", space.name)));
    }
}

impl CreateSpaceObserver for CliObserver {
    fn on_create_space(&self, space: &Space) {
        self.emit("create_space", space, || {
            ok(format!("Created space {} ({})", style(&space.name).bold(), space.id))
        });
    }

    fn on_set_current_space(&self, space: &Space) {
        self.emit("set_current_space", space, || {
            ok(format!("{} is now the current space", space.name))
        });
    }
}

impl EditContactObserver for CliObserver {
    fn on_get_contact(&self, contact: &Contact) {
        self.emit("get_contact", contact, || {
            let mut lines = vec![
                format!("{}", style(&contact.name).bold().underlined()),
                format!("  Id:          {}", contact.id),
                format!("  Space:       {}", contact.space_id),
            ];
            if let Some(description) = &contact.description {
                lines.push(format!("  Description: {description}"));
            }
            if contact.is_room {
                lines.push("  Kind:        room".to_string());
            }
            lines.join("\n")
        });
    }

    fn on_contact_not_found(&self) {
        self.fail("contact not found");
    }

    fn on_update_contact(&self, contact: &Contact) {
        self.emit("update_contact", contact, || ok(format!("Updated contact {}", contact.name)));
    }

    fn on_delete_contact(&self, contact_id: &str) {
        self.emit("delete_contact", contact_id, || ok(format!("Deleted contact {contact_id}")));
    }
}

impl MigrationScanObserver for CliObserver {
    fn on_invalid_code(&self, code: &str) {
        self.fail(format!("not a migration code: {code}"));
    }

    fn on_get_twincode(&self, twincode: &Twincode) {
        self.emit("get_twincode", twincode, || {
            bullet(format!(
                "Scanned {} code {}",
                twincode.kind,
                twincode.name.as_deref().unwrap_or(&twincode.id)
            ))
        });
    }

    fn on_twincode_not_found(&self) {
        self.fail("migration code not found");
    }

    fn on_migration_created(&self, migration: &AccountMigration) {
        self.emit("migration_created", migration, || {
            ok(format!(
                "Migration {} started for device {}",
                migration.id, migration.device_name
            ))
        });
    }
}

impl NotificationsObserver for CliObserver {
    fn on_get_notifications(&self, notifications: &[Notification], unacknowledged: usize) {
        self.emit("get_notifications", notifications, || {
            let mut lines = vec![format!(
                "{} ({} unacknowledged)",
                style(format!("{} notifications", notifications.len())).bold(),
                unacknowledged
            )];
            for notification in notifications {
                let marker = if notification.acknowledged {
                    style(" ").dim()
                } else {
                    style("*").yellow().bold()
                };
                lines.push(format!(
                    "  {marker} {}  {:<16} {}",
                    notification.id,
                    notification.kind.as_str(),
                    notification.created_at
                ));
            }
            lines.join("\n")
        });
    }

    fn on_acknowledged(&self, count: usize) {
        self.emit("acknowledged", &count, || ok(format!("Acknowledged {count} notification(s)")));
    }

    fn on_deleted(&self, count: usize) {
        self.emit("deleted", &count, || ok(format!("Deleted {count} notification(s)")));
    }
}

impl SubscriptionObserver for CliObserver {
    fn on_get_subscription(&self, subscription: &Subscription) {
        self.emit("get_subscription", subscription, || {
            let status = match subscription.status.as_str() {
                "active" => style("active").green().to_string(),
                other => style(other).yellow().to_string(),
            };
            format!("  {}: {status}", style(&subscription.product_id).bold())
        });
    }

    fn on_activation_code_not_found(&self) {
        self.fail("activation code not found");
    }

    fn on_subscription_updated(&self, subscription: &Subscription) {
        self.emit("subscription_updated", subscription, || {
            ok(format!(
                "{} is now {}",
                subscription.product_id,
                subscription.status.as_str()
            ))
        });
    }
}

impl RoomConfigObserver for CliObserver {
    fn on_get_room(&self, room: &Contact) {
        self.emit("get_room", room, || {
            format!("{} ({})", style(&room.name).bold().underlined(), room.id)
        });
    }

    fn on_room_not_found(&self) {
        self.fail("room not found");
    }

    fn on_get_room_config(&self, config: &RoomConfig) {
        self.emit("get_room_config", config, || describe_room_config(config));
    }

    fn on_update_room_config(&self, config: &RoomConfig) {
        self.emit("update_room_config", config, || {
            format!("{}\n{}", ok("Room configuration saved".into()), describe_room_config(config))
        });
    }
}

fn describe_room_config(config: &RoomConfig) -> String {
    [
        format!(
            "  Welcome message: {}",
            config.welcome_message.as_deref().unwrap_or("(none)")
        ),
        format!("  Chat mode:       {}", config.chat_mode.as_str()),
        format!("  Invitations:     {}", config.invitation_mode.as_str()),
    ]
    .join("\n")
}

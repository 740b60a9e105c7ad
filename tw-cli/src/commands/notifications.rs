//! Notification commands.

use clap::Subcommand;

use tw_core::config::ConfigHandle;
use tw_core::error::{TwError, TwResult};
use tw_services::controllers::NotificationsController;
use tw_services::Service;

use super::observer::CliObserver;
use super::App;
use crate::RunOptions;

#[derive(Subcommand)]
pub enum NotificationsAction {
    /// List notifications of the current space.
    List,
    /// Acknowledge notifications.
    Ack {
        /// Notification ids.
        ids: Vec<String>,
        /// Acknowledge every unacknowledged notification.
        #[arg(long, conflicts_with = "ids")]
        all: bool,
    },
    /// Delete notifications.
    Delete {
        /// Notification ids.
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

pub async fn run(
    config: ConfigHandle,
    action: NotificationsAction,
    options: RunOptions,
) -> TwResult<()> {
    if let NotificationsAction::Ack { ids, all: false } = &action {
        if ids.is_empty() {
            return Err(TwError::InvalidInput("pass notification ids or --all".into()));
        }
    }

    let app = App::start(&config, options).await?;
    let observer = CliObserver::new("Loading notifications", options.format);
    let mut controller = NotificationsController::new(&app.ctx, observer.clone());
    controller.init()?;

    let result = drive(&controller, &observer, &app, action).await;

    controller.shutdown()?;
    result
}

async fn drive(
    controller: &NotificationsController,
    observer: &CliObserver,
    app: &App,
    action: NotificationsAction,
) -> TwResult<()> {
    controller.refresh()?;
    observer.wait(app.wait).await?;

    match action {
        NotificationsAction::List => return Ok(()),
        NotificationsAction::Ack { all: true, .. } => controller.acknowledge_all()?,
        NotificationsAction::Ack { ids, .. } => controller.acknowledge(ids)?,
        NotificationsAction::Delete { ids } => controller.delete(ids)?,
    }
    observer.wait(app.wait).await
}

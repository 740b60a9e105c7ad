//! Profile commands.

use clap::Subcommand;

use tw_core::config::ConfigHandle;
use tw_core::error::TwResult;
use tw_services::controllers::CreateProfileController;
use tw_services::Service;

use super::observer::CliObserver;
use super::App;
use crate::RunOptions;

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Create a profile and bind it to the current space.
    Create {
        /// Profile name.
        name: String,
        /// Optional description.
        #[arg(short, long)]
        description: Option<String>,
    },
}

pub async fn run(config: ConfigHandle, action: ProfileAction, options: RunOptions) -> TwResult<()> {
    let app = App::start(&config, options).await?;

    match action {
        ProfileAction::Create { name, description } => {
            let observer = CliObserver::new("Creating profile", options.format);
            let mut controller = CreateProfileController::new(&app.ctx, observer.clone());
            controller.init()?;

            controller.create_profile(&name, description.as_deref())?;
            let result = observer.wait(app.wait).await;

            controller.shutdown()?;
            result
        }
    }
}

//! Account migration commands.

use clap::Subcommand;

use tw_core::config::ConfigHandle;
use tw_core::error::TwResult;
use tw_services::controllers::MigrationScanController;
use tw_services::Service;

use super::observer::CliObserver;
use super::App;
use crate::RunOptions;

#[derive(Subcommand)]
pub enum MigrationAction {
    /// Scan a migration link shown by the old device and start migrating.
    Scan {
        /// `twinflow://migration?id=...` or `https://migration.twin.me/?id=...`
        link: String,
    },
}

pub async fn run(config: ConfigHandle, action: MigrationAction, options: RunOptions) -> TwResult<()> {
    let app = App::start(&config, options).await?;

    match action {
        MigrationAction::Scan { link } => {
            let observer = CliObserver::new("Starting migration", options.format);
            let mut controller = MigrationScanController::new(&app.ctx, observer.clone());
            controller.init()?;

            controller.scan(&link)?;
            let result = observer.wait(app.wait).await;

            controller.shutdown()?;
            result
        }
    }
}

//! Space commands.

use clap::Subcommand;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use console::style;

use tw_backend::SpaceRepository;
use tw_core::config::ConfigHandle;
use tw_core::error::TwResult;
use tw_services::controllers::CreateSpaceController;
use tw_services::Service;

use super::observer::CliObserver;
use super::App;
use crate::{OutputFormat, RunOptions};

#[derive(Subcommand)]
pub enum SpaceAction {
    /// List spaces with their profile and contact count.
    List,
    /// Create a new space.
    Create {
        /// Space name.
        name: String,
        /// Optional description.
        #[arg(short, long)]
        description: Option<String>,
        /// Make the new space the current one.
        #[arg(long)]
        current: bool,
    },
}

pub async fn run(config: ConfigHandle, action: SpaceAction, options: RunOptions) -> TwResult<()> {
    let app = App::start(&config, options).await?;

    match action {
        SpaceAction::List => {
            let spaces = app.backend.list_spaces().await?;

            match options.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&spaces)?),
                OutputFormat::Text => {
                    if spaces.is_empty() {
                        println!("No spaces.");
                        return Ok(());
                    }

                    let mut table = Table::new();
                    table
                        .load_preset(UTF8_FULL)
                        .apply_modifier(UTF8_ROUND_CORNERS)
                        .set_content_arrangement(ContentArrangement::Dynamic);
                    table.set_header(vec!["", "Name", "Profile", "Contacts", "Id"]);

                    for entry in &spaces {
                        let marker = if entry.space.is_current { "*" } else { "" };
                        table.add_row(vec![
                            marker.to_string(),
                            super::truncate(&entry.space.name, 32),
                            entry.profile_name.clone().unwrap_or_else(|| "-".into()),
                            entry.contact_count.to_string(),
                            entry.space.id.clone(),
                        ]);
                    }

                    println!("{table}");
                    println!("{}", style("* current space").dim());
                }
            }
            Ok(())
        }
        SpaceAction::Create { name, description, current } => {
            let observer = CliObserver::new("Creating space", options.format);
            let mut controller = CreateSpaceController::new(&app.ctx, observer.clone());
            controller.init()?;

            controller.create_space(&name, description.as_deref(), current)?;
            let result = observer.wait(app.wait).await;

            controller.shutdown()?;
            result
        }
    }
}

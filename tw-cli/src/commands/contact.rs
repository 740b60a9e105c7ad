//! Contact commands.

use clap::Subcommand;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};

use tw_backend::{ContactRepository, SpaceRepository};
use tw_core::config::ConfigHandle;
use tw_core::error::TwResult;
use tw_services::controllers::EditContactController;
use tw_services::Service;

use super::observer::CliObserver;
use super::App;
use crate::{OutputFormat, RunOptions};

#[derive(Subcommand)]
pub enum ContactAction {
    /// List contacts and rooms of the current space.
    List,
    /// Show one contact.
    Show {
        /// Contact id.
        id: String,
    },
    /// Rename a contact.
    Rename {
        /// Contact id.
        id: String,
        /// New name.
        name: String,
    },
    /// Change a contact's description.
    Describe {
        /// Contact id.
        id: String,
        /// New description. An empty string clears it.
        description: String,
    },
    /// Delete a contact.
    Delete {
        /// Contact id.
        id: String,
    },
}

pub async fn run(config: ConfigHandle, action: ContactAction, options: RunOptions) -> TwResult<()> {
    let app = App::start(&config, options).await?;

    let (id, edit) = match action {
        ContactAction::List => return list(&app, options).await,
        ContactAction::Show { id } => (id, Edit::None),
        ContactAction::Rename { id, name } => (id, Edit::Name(name)),
        ContactAction::Describe { id, description } => (id, Edit::Description(description)),
        ContactAction::Delete { id } => (id, Edit::Delete),
    };

    let observer = CliObserver::new("Loading contact", options.format);
    let mut controller = EditContactController::new(&app.ctx, observer.clone());
    controller.init()?;

    let result = edit_contact(&controller, &observer, &app, &id, edit).await;

    controller.shutdown()?;
    result
}

/// Load the contact, then apply the edit once it is shown.
async fn edit_contact(
    controller: &EditContactController,
    observer: &CliObserver,
    app: &App,
    id: &str,
    edit: Edit,
) -> TwResult<()> {
    controller.load(id)?;
    observer.wait(app.wait).await?;

    match edit {
        Edit::None => return Ok(()),
        Edit::Name(name) => controller.update_name(&name)?,
        Edit::Description(description) => controller.update_description(&description)?,
        Edit::Delete => controller.delete()?,
    }
    observer.wait(app.wait).await
}

enum Edit {
    None,
    Name(String),
    Description(String),
    Delete,
}

async fn list(app: &App, options: RunOptions) -> TwResult<()> {
    let space = app.backend.get_current_space().await?;
    let contacts = app.backend.list_contacts(&space.id).await?;

    match options.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&contacts)?),
        OutputFormat::Text => {
            if contacts.is_empty() {
                println!("No contacts in {}.", space.name);
                return Ok(());
            }

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Name", "Kind", "Description", "Id"]);

            for contact in &contacts {
                table.add_row(vec![
                    super::truncate(&contact.name, 32),
                    if contact.is_room { "room" } else { "contact" }.to_string(),
                    contact
                        .description
                        .as_deref()
                        .map(|d| super::truncate(d, 40))
                        .unwrap_or_default(),
                    contact.id.clone(),
                ]);
            }

            println!("{table}");
        }
    }

    Ok(())
}

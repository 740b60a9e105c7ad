//! Database management commands.

use clap::Subcommand;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use console::style;
use dialoguer::Confirm;

use tw_backend::seed_demo_data;
use tw_core::config::ConfigHandle;
use tw_core::error::TwResult;

use crate::{OutputFormat, RunOptions};

#[derive(Subcommand)]
pub enum DbAction {
    /// Show database statistics.
    Stats,
    /// Populate the current space with demo contacts, a room,
    /// notifications and scannable codes.
    Seed,
    /// Reset the database (WARNING: destroys all data).
    Reset {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Show the database file path.
    Path,
}

pub async fn run(config: ConfigHandle, action: DbAction, options: RunOptions) -> TwResult<()> {
    let cfg = config.snapshot().await;
    let db_path = cfg.effective_db_path()?;

    match action {
        DbAction::Stats => {
            let db = super::init_database(&cfg)?;
            let stats = db.stats()?;

            match options.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::json!({
                            "path": db_path.display().to_string(),
                            "tables": stats,
                        })
                    );
                }
                OutputFormat::Text => {
                    println!("{}", style("Database Statistics").bold().underlined());
                    println!("  Path:          {}", db_path.display());
                    println!();

                    let mut table = Table::new();
                    table
                        .load_preset(UTF8_FULL)
                        .apply_modifier(UTF8_ROUND_CORNERS)
                        .set_content_arrangement(ContentArrangement::Dynamic);

                    table.set_header(vec!["Table", "Row Count"]);
                    let rows = [
                        ("spaces", stats.spaces),
                        ("profiles", stats.profiles),
                        ("contacts", stats.contacts),
                        ("notifications", stats.notifications),
                        ("twincodes", stats.twincodes),
                        ("account_migrations", stats.migrations),
                        ("subscriptions", stats.subscriptions),
                        ("room_configs", stats.room_configs),
                    ];
                    for (name, count) in rows {
                        table.add_row(vec![name.to_string(), count.to_string()]);
                    }

                    println!("{table}");
                }
            }
        }
        DbAction::Seed => {
            let db = super::init_database(&cfg)?;
            let summary = seed_demo_data(&db)?;

            match options.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Text => {
                    println!("  {} Demo data created.", style("OK").green().bold());
                    println!();
                    println!("  Space:            {}", summary.space_id);
                    println!("  Contacts:         {}", summary.contact_ids.join(", "));
                    println!("  Room:             {}", summary.room_id);
                    println!("  Notifications:    {}", summary.notification_ids.len());
                    println!();
                    println!("  Try:");
                    println!(
                        "    twinflow migration scan 'twinflow://migration?id={}'",
                        summary.migration_twincode_id
                    );
                    println!(
                        "    twinflow subscription activate premium {}",
                        summary.activation_twincode_id
                    );
                    println!("    twinflow room show {}", summary.room_id);
                }
            }
        }
        DbAction::Reset { yes } => {
            if !yes {
                println!(
                    "  {} This will delete ALL local data.",
                    style("WARNING").red().bold()
                );
                println!("  Database: {}", db_path.display());

                let confirmed = Confirm::new()
                    .with_prompt("  Are you sure you want to reset the database?")
                    .default(false)
                    .interact()
                    .unwrap_or(false);

                if !confirmed {
                    println!("  Reset cancelled.");
                    return Ok(());
                }
            }

            let db = super::init_database(&cfg)?;
            db.reset()?;
            println!("  {} Database reset complete.", style("OK").green().bold());
        }
        DbAction::Path => match options.format {
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "path": db_path.display().to_string() }));
            }
            OutputFormat::Text => println!("{}", db_path.display()),
        },
    }

    Ok(())
}

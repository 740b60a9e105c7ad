//! Status command - show backend settings and local database status.

use console::style;

use tw_core::config::ConfigHandle;
use tw_core::constants::APP_VERSION;
use tw_core::error::TwResult;
use tw_core::platform::Platform;

use crate::{OutputFormat, RunOptions};

/// Run the status command.
pub async fn run(config: ConfigHandle, options: RunOptions) -> TwResult<()> {
    let cfg = config.snapshot().await;
    let db_path = cfg.effective_db_path()?;

    let db_stats = if db_path.exists() {
        let stats = super::init_database(&cfg).ok().and_then(|db| db.stats().ok());
        let file_size = std::fs::metadata(&db_path).ok().map(|m| m.len());
        Some((stats, file_size))
    } else {
        None
    };

    let starts_online = cfg.backend.start_online && !options.offline;
    let backend_status = if starts_online { "online" } else { "offline" };

    match options.format {
        OutputFormat::Json => {
            let mut json = serde_json::json!({
                "version": APP_VERSION,
                "platform": Platform::current().name(),
                "device_name": Platform::hostname(),
                "backend": {
                    "status_at_start": backend_status,
                    "simulated_latency_ms": cfg.backend.simulated_latency_ms,
                    "online_after_ms": cfg.backend.online_after_ms,
                },
                "sequencer": {
                    "trace_steps": cfg.sequencer.trace_steps || options.trace,
                    "event_bus_capacity": cfg.sequencer.event_bus_capacity,
                },
            });

            if let Some((Some(stats), file_size)) = &db_stats {
                json["local_database"] = serde_json::json!({
                    "path": db_path.display().to_string(),
                    "file_size_bytes": file_size,
                    "stats": stats,
                });
            }

            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("{}", style("Twinflow Status").bold().underlined());
            println!("  Version:       {APP_VERSION}");
            println!("  Platform:      {}", Platform::current().name());
            println!("  Device name:   {}", Platform::hostname());
            println!();

            println!("{}", style("Backend").bold().underlined());
            let status = if starts_online {
                style(backend_status).green().to_string()
            } else {
                style(backend_status).yellow().to_string()
            };
            println!("  At start:      {status}");
            if !starts_online {
                if cfg.backend.online_after_ms > 0 {
                    println!("  Goes online:   after {}ms", cfg.backend.online_after_ms);
                } else {
                    println!("  Goes online:   never (workflows will wait)");
                }
            }
            println!("  Latency:       {}ms", cfg.backend.simulated_latency_ms);
            println!(
                "  Step tracing:  {}",
                if cfg.sequencer.trace_steps || options.trace { "on" } else { "off" }
            );
            println!();

            println!("{}", style("Local Database").bold().underlined());
            println!("  Path:          {}", db_path.display());
            match &db_stats {
                Some((Some(stats), file_size)) => {
                    if let Some(size) = file_size {
                        println!("  Size:          {size} bytes");
                    }
                    println!("  Spaces:        {}", stats.spaces);
                    println!("  Profiles:      {}", stats.profiles);
                    println!("  Contacts:      {}", stats.contacts);
                    println!("  Notifications: {}", stats.notifications);
                }
                Some((None, _)) => {
                    println!("  {} could not read database", style("WARN").yellow().bold());
                }
                None => {
                    println!("  Not created yet. Run `twinflow db seed` to create demo data.");
                }
            }
        }
    }

    Ok(())
}

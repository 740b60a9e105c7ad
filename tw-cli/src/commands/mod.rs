//! CLI command implementations.

pub mod observer;
pub mod status;
pub mod db;
pub mod space;
pub mod profile;
pub mod contact;
pub mod migration;
pub mod notifications;
pub mod subscription;
pub mod room;

use std::sync::Arc;
use std::time::Duration;

use console::style;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use tw_backend::{BackendStatus, Connectivity, LocalBackend};
use tw_core::config::{AppConfig, ConfigHandle};
use tw_core::error::TwResult;
use tw_models::Database;
use tw_services::{AppEvent, EventBus, ServiceContext, UiThread};

use crate::{OutputFormat, RunOptions};

/// Helper to initialize the database from config.
pub fn init_database(config: &AppConfig) -> TwResult<Database> {
    let db_path = config.effective_db_path()?;
    Database::init(&db_path, &config.database)
}

/// Backend, UI thread and service context wired up for one command.
pub struct App {
    pub backend: Arc<LocalBackend>,
    pub ctx: ServiceContext,
    /// How long a workflow may run before the command gives up.
    pub wait: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl App {
    pub async fn start(config: &ConfigHandle, options: RunOptions) -> TwResult<Self> {
        let cfg = config.snapshot().await;
        let db = init_database(&cfg)?;

        let online = cfg.backend.start_online && !options.offline;
        let connectivity = Connectivity::new(if online {
            BackendStatus::Online
        } else {
            BackendStatus::Offline
        });
        let backend = Arc::new(LocalBackend::from_config(db, connectivity.clone(), &cfg.backend));

        // The thread exits on its own once the context is dropped.
        let (ui, _ui_thread) = UiThread::spawn()?;
        let bus = EventBus::new(cfg.sequencer.event_bus_capacity);
        let trace = options.trace || cfg.sequencer.trace_steps;

        let mut tasks = Vec::new();
        if trace {
            tasks.push(spawn_trace_printer(bus.subscribe(), options.format));
            tasks.push(bus.forward_backend_status(connectivity.subscribe()));
        }
        if !online && cfg.backend.online_after_ms > 0 {
            debug!("backend goes online in {}ms", cfg.backend.online_after_ms);
            tasks.push(
                connectivity.schedule_online(Duration::from_millis(cfg.backend.online_after_ms)),
            );
        }

        let ctx = ServiceContext::from_backend(backend.clone(), ui, bus, connectivity.subscribe())
            .with_trace_steps(trace);

        Ok(Self {
            backend,
            ctx,
            wait: Duration::from_millis(cfg.cli.wait_timeout_ms),
            tasks,
        })
    }
}

impl Drop for App {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Print sequencer events to stderr as they arrive.
fn spawn_trace_printer(mut rx: broadcast::Receiver<AppEvent>, format: OutputFormat) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match format {
                    OutputFormat::Json => match serde_json::to_string(&event) {
                        Ok(line) => eprintln!("{line}"),
                        Err(e) => debug!("unprintable event: {e}"),
                    },
                    OutputFormat::Text => eprintln!("{} {}", style("trace").dim(), describe_event(&event)),
                },
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    eprintln!("{} {missed} event(s) dropped", style("trace").dim());
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn describe_event(event: &AppEvent) -> String {
    match event {
        AppEvent::StepStarted { workflow, step } => format!("{workflow}: {step} started"),
        AppEvent::StepCompleted { workflow, step } => format!("{workflow}: {step} completed"),
        AppEvent::StepStalled { workflow, step } => {
            format!("{workflow}: {step} waiting for the backend")
        }
        AppEvent::StepFailed { workflow, step, code, error } => {
            format!("{workflow}: {step} failed with code {code} ({error})")
        }
        AppEvent::WorkflowFinished { workflow } => format!("{workflow}: finished"),
        AppEvent::WorkflowDisposed { workflow } => format!("{workflow}: disposed"),
        AppEvent::BackendStatusChanged { status } => format!("backend is {status}"),
    }
}

/// Truncate a string to a maximum number of characters, appending an
/// ellipsis if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

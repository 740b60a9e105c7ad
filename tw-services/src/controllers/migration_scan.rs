//! Scan a migration code shown by another device and start the account
//! migration from it.

use std::sync::Arc;

use tracing::debug;

use tw_backend::{MigrationRepository, TwincodeLink, TwincodeRepository};
use tw_core::error::{BackendError, TwResult};
use tw_models::{AccountMigration, Twincode, TwincodeKind};

use crate::context::ServiceContext;
use crate::observer::{ObserverSlot, ProgressObserver};
use crate::sequencer::{apply, ErrorDisposition, SequencerSnapshot, Step, Workflow};
use crate::service::{Service, ServiceState};

use super::{step_label, ControllerCore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MigrationScanStep {
    GetTwincode,
    CreateMigration,
}

pub trait MigrationScanObserver: ProgressObserver {
    /// The scanned text is not a migration code.
    fn on_invalid_code(&self, _code: &str) {}
    fn on_get_twincode(&self, _twincode: &Twincode) {}
    fn on_twincode_not_found(&self) {}
    fn on_migration_created(&self, _migration: &AccountMigration) {}
}

pub(crate) struct MigrationScanFlow {
    twincodes: Arc<dyn TwincodeRepository>,
    migrations: Arc<dyn MigrationRepository>,
    observer: ObserverSlot<dyn MigrationScanObserver>,
    device_name: String,
    twincode_id: Option<String>,
    twincode: Option<Twincode>,
    migration: Option<AccountMigration>,
}

impl MigrationScanFlow {
    fn is_migration_code(&self) -> bool {
        self.twincode
            .as_ref()
            .map_or(false, |t| t.kind == TwincodeKind::Migration)
    }
}

impl Workflow for MigrationScanFlow {
    type Step = MigrationScanStep;

    fn name(&self) -> &'static str {
        "migration_scan"
    }

    fn on_step_error(&mut self, step: MigrationScanStep, error: &BackendError) -> ErrorDisposition {
        match (step, error) {
            (MigrationScanStep::GetTwincode, BackendError::ItemNotFound(_)) => {
                self.observer.notify(|o| o.on_twincode_not_found());
            }
            _ => {
                let label = step_label(step);
                let error = error.clone();
                self.observer.notify(move |o| o.on_error(&label, &error));
            }
        }
        ErrorDisposition::Abort
    }

    fn on_finished(&mut self) {
        self.observer.notify(|o| o.hide_progress());
    }
}

fn steps() -> Vec<Step<MigrationScanFlow>> {
    vec![
        Step::new(MigrationScanStep::GetTwincode, |flow: &MigrationScanFlow| {
            let twincodes = flow.twincodes.clone();
            let twincode_id = flow.twincode_id.clone().unwrap_or_default();
            async move {
                let twincode = twincodes.get_twincode(&twincode_id).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut MigrationScanFlow| {
                    let notified = twincode.clone();
                    flow.observer.notify(move |o| {
                        o.on_get_twincode(&notified);
                        if notified.kind != TwincodeKind::Migration {
                            o.on_invalid_code(&notified.id);
                        }
                    });
                    flow.twincode = Some(twincode);
                }))
            }
        })
        .guarded(|flow| flow.twincode_id.is_some()),
        Step::new(MigrationScanStep::CreateMigration, |flow: &MigrationScanFlow| {
            let migrations = flow.migrations.clone();
            let peer = flow.twincode.as_ref().map(|t| t.id.clone()).unwrap_or_default();
            let device_name = flow.device_name.clone();
            async move {
                let migration = migrations.create_account_migration(&peer, &device_name).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut MigrationScanFlow| {
                    let notified = migration.clone();
                    flow.observer.notify(move |o| o.on_migration_created(&notified));
                    flow.migration = Some(migration);
                }))
            }
        })
        .guarded(|flow| flow.is_migration_code() && flow.migration.is_none()),
    ]
}

/// Controller of the migration code scanner.
pub struct MigrationScanController {
    core: ControllerCore<MigrationScanFlow>,
    observer: ObserverSlot<dyn MigrationScanObserver>,
}

impl MigrationScanController {
    pub fn new(ctx: &ServiceContext, observer: Arc<dyn MigrationScanObserver>) -> Self {
        let observer = ObserverSlot::new(observer, ctx.ui.clone());
        let slot = observer.clone();
        let flow = MigrationScanFlow {
            twincodes: ctx.twincodes.clone(),
            migrations: ctx.migrations.clone(),
            observer: observer.clone(),
            device_name: ctx.device_name.clone(),
            twincode_id: None,
            twincode: None,
            migration: None,
        };
        Self {
            core: ControllerCore::new(ctx, flow, steps(), move || slot.detach()),
            observer,
        }
    }

    /// Handle a scanned or pasted link. A malformed link is reported
    /// without calling the backend.
    pub fn scan(&self, link: &str) -> TwResult<()> {
        let handle = self.core.handle()?;
        let parsed = match TwincodeLink::parse_migration(link) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("rejecting scanned code: {e}");
                let code = link.to_string();
                self.observer.notify(move |o| o.on_invalid_code(&code));
                return Ok(());
            }
        };

        handle.update(move |flow| {
            flow.observer.notify(|o| o.show_progress());
            flow.twincode_id = Some(parsed.twincode_id);
            flow.twincode = None;
            flow.migration = None;
            vec![MigrationScanStep::GetTwincode, MigrationScanStep::CreateMigration]
        });
        Ok(())
    }

    pub async fn snapshot(&self) -> TwResult<SequencerSnapshot<MigrationScanStep>> {
        self.core.snapshot().await
    }

    pub fn dispose(&mut self) {
        self.core.dispose();
    }
}

impl Service for MigrationScanController {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn state(&self) -> ServiceState {
        self.core.state()
    }

    fn init(&mut self) -> TwResult<()> {
        self.core.init(Vec::new())
    }

    fn shutdown(&mut self) -> TwResult<()> {
        self.dispose();
        Ok(())
    }
}

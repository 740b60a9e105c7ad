//! Edit or delete a contact.
//!
//! Edits accumulate in a pending update. The update step sends a copy of
//! it; edits made while that call is in flight are sent by a follow-up run.

use std::sync::Arc;

use tw_backend::ContactRepository;
use tw_core::error::{BackendError, TwResult};
use tw_models::{Contact, ContactUpdate};

use crate::context::ServiceContext;
use crate::observer::{ObserverSlot, ProgressObserver};
use crate::sequencer::{apply, ErrorDisposition, SequencerSnapshot, Step, Workflow};
use crate::service::{Service, ServiceState};

use super::{reject, step_label, ControllerCore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EditContactStep {
    GetContact,
    UpdateContact,
    DeleteContact,
}

pub trait EditContactObserver: ProgressObserver {
    fn on_get_contact(&self, _contact: &Contact) {}
    fn on_contact_not_found(&self) {}
    fn on_update_contact(&self, _contact: &Contact) {}
    fn on_delete_contact(&self, _contact_id: &str) {}
}

pub(crate) struct EditContactFlow {
    contacts: Arc<dyn ContactRepository>,
    observer: ObserverSlot<dyn EditContactObserver>,
    contact_id: Option<String>,
    contact: Option<Contact>,
    pending: ContactUpdate,
    delete_requested: bool,
}

impl EditContactFlow {
    fn loaded_id(&self) -> String {
        self.contact.as_ref().map(|c| c.id.clone()).unwrap_or_default()
    }
}

impl Workflow for EditContactFlow {
    type Step = EditContactStep;

    fn name(&self) -> &'static str {
        "edit_contact"
    }

    fn on_step_error(&mut self, step: EditContactStep, error: &BackendError) -> ErrorDisposition {
        if error.is_not_found() {
            self.contact = None;
            self.observer.notify(|o| o.on_contact_not_found());
        } else {
            let label = step_label(step);
            let error = error.clone();
            self.observer.notify(move |o| o.on_error(&label, &error));
        }
        ErrorDisposition::Abort
    }

    fn on_finished(&mut self) {
        self.observer.notify(|o| o.hide_progress());
    }

    fn after_step(&mut self, step: EditContactStep) -> Vec<EditContactStep> {
        match step {
            EditContactStep::GetContact if self.contact.is_none() => vec![EditContactStep::GetContact],
            EditContactStep::UpdateContact if !self.pending.is_empty() => {
                vec![EditContactStep::UpdateContact]
            }
            _ => Vec::new(),
        }
    }
}

fn steps() -> Vec<Step<EditContactFlow>> {
    vec![
        Step::new(EditContactStep::GetContact, |flow: &EditContactFlow| {
            let contacts = flow.contacts.clone();
            let contact_id = flow.contact_id.clone().unwrap_or_default();
            async move {
                let contact = contacts.get_contact(&contact_id).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut EditContactFlow| {
                    // Another contact was loaded while this call was in flight.
                    if flow.contact_id.as_deref() != Some(contact.id.as_str()) {
                        return;
                    }
                    let notified = contact.clone();
                    flow.observer.notify(move |o| o.on_get_contact(&notified));
                    flow.contact = Some(contact);
                }))
            }
        })
        .guarded(|flow| flow.contact_id.is_some()),
        Step::new(EditContactStep::UpdateContact, |flow: &EditContactFlow| {
            let contacts = flow.contacts.clone();
            let contact_id = flow.loaded_id();
            let sent = flow.pending.clone();
            async move {
                let contact = contacts.update_contact(&contact_id, &sent).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut EditContactFlow| {
                    if flow.pending == sent {
                        flow.pending = ContactUpdate::default();
                    }
                    let notified = contact.clone();
                    flow.observer.notify(move |o| o.on_update_contact(&notified));
                    flow.contact = Some(contact);
                }))
            }
        })
        .guarded(|flow| flow.contact.is_some() && !flow.pending.is_empty()),
        Step::new(EditContactStep::DeleteContact, |flow: &EditContactFlow| {
            let contacts = flow.contacts.clone();
            let contact_id = flow.loaded_id();
            async move {
                contacts.delete_contact(&contact_id).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut EditContactFlow| {
                    flow.contact = None;
                    flow.delete_requested = false;
                    flow.pending = ContactUpdate::default();
                    flow.observer.notify(move |o| o.on_delete_contact(&contact_id));
                }))
            }
        })
        .guarded(|flow| flow.contact.is_some() && flow.delete_requested),
    ]
}

/// Controller of the contact edit screen.
pub struct EditContactController {
    core: ControllerCore<EditContactFlow>,
}

impl EditContactController {
    pub fn new(ctx: &ServiceContext, observer: Arc<dyn EditContactObserver>) -> Self {
        let observer = ObserverSlot::new(observer, ctx.ui.clone());
        let slot = observer.clone();
        let flow = EditContactFlow {
            contacts: ctx.contacts.clone(),
            observer,
            contact_id: None,
            contact: None,
            pending: ContactUpdate::default(),
            delete_requested: false,
        };
        Self {
            core: ControllerCore::new(ctx, flow, steps(), move || slot.detach()),
        }
    }

    /// Load the contact to edit, discarding edits made to another one.
    pub fn load(&self, contact_id: &str) -> TwResult<()> {
        let handle = self.core.handle()?;
        let contact_id = contact_id.to_string();
        handle.update(move |flow| {
            flow.observer.notify(|o| o.show_progress());
            flow.contact_id = Some(contact_id);
            flow.contact = None;
            flow.pending = ContactUpdate::default();
            flow.delete_requested = false;
            vec![EditContactStep::GetContact]
        });
        Ok(())
    }

    pub fn update_name(&self, name: &str) -> TwResult<()> {
        let name = name.to_string();
        self.edit(move |pending| pending.name = Some(name))
    }

    /// An empty description clears it.
    pub fn update_description(&self, description: &str) -> TwResult<()> {
        let description = description.to_string();
        self.edit(move |pending| pending.description = Some(description))
    }

    pub fn delete(&self) -> TwResult<()> {
        let handle = self.core.handle()?;
        handle.update(|flow| {
            if flow.contact_id.is_none() {
                reject(&flow.observer, EditContactStep::DeleteContact, "no contact loaded");
                return Vec::new();
            }
            flow.observer.notify(|o| o.show_progress());
            flow.delete_requested = true;
            vec![EditContactStep::DeleteContact]
        });
        Ok(())
    }

    fn edit<F>(&self, edit: F) -> TwResult<()>
    where
        F: FnOnce(&mut ContactUpdate) + Send + 'static,
    {
        let handle = self.core.handle()?;
        handle.update(move |flow| {
            if flow.contact_id.is_none() {
                reject(&flow.observer, EditContactStep::UpdateContact, "no contact loaded");
                return Vec::new();
            }
            flow.observer.notify(|o| o.show_progress());
            edit(&mut flow.pending);
            vec![EditContactStep::UpdateContact]
        });
        Ok(())
    }

    pub async fn snapshot(&self) -> TwResult<SequencerSnapshot<EditContactStep>> {
        self.core.snapshot().await
    }

    pub fn dispose(&mut self) {
        self.core.dispose();
    }
}

impl Service for EditContactController {
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

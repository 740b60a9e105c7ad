//! Show, activate and cancel a subscription product.

use std::sync::Arc;

use tw_backend::{SubscriptionRepository, TwincodeRepository};
use tw_core::error::{BackendError, TwResult};
use tw_models::{Subscription, Twincode};

use crate::context::ServiceContext;
use crate::observer::{ObserverSlot, ProgressObserver};
use crate::sequencer::{apply, ErrorDisposition, SequencerSnapshot, Step, Workflow};
use crate::service::{Service, ServiceState};

use super::{reject, step_label, ControllerCore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriptionStep {
    GetSubscription,
    GetActivationCode,
    ActivateSubscription,
    CancelSubscription,
}

pub trait SubscriptionObserver: ProgressObserver {
    /// Also called with an inactive subscription for a product never activated.
    fn on_get_subscription(&self, _subscription: &Subscription) {}
    fn on_activation_code_not_found(&self) {}
    fn on_subscription_updated(&self, _subscription: &Subscription) {}
}

pub(crate) struct SubscriptionFlow {
    subscriptions: Arc<dyn SubscriptionRepository>,
    twincodes: Arc<dyn TwincodeRepository>,
    observer: ObserverSlot<dyn SubscriptionObserver>,
    product_id: Option<String>,
    subscription: Option<Subscription>,
    activation_code_id: Option<String>,
    activation_code: Option<Twincode>,
    cancel_requested: bool,
}

impl SubscriptionFlow {
    fn is_active(&self) -> bool {
        self.subscription.as_ref().map_or(false, Subscription::is_active)
    }

    fn product(&self) -> String {
        self.product_id.clone().unwrap_or_default()
    }

    fn store(&mut self, subscription: Subscription, loaded: bool) {
        let notified = subscription.clone();
        if loaded {
            self.observer.notify(move |o| o.on_get_subscription(&notified));
        } else {
            self.observer.notify(move |o| o.on_subscription_updated(&notified));
        }
        self.subscription = Some(subscription);
    }
}

impl Workflow for SubscriptionFlow {
    type Step = SubscriptionStep;

    fn name(&self) -> &'static str {
        "subscription"
    }

    fn on_step_error(&mut self, step: SubscriptionStep, error: &BackendError) -> ErrorDisposition {
        match (step, error) {
            (SubscriptionStep::GetSubscription, BackendError::ItemNotFound(_)) => {
                let product_id = self.product();
                self.store(Subscription::inactive(&product_id), true);
                ErrorDisposition::Skip
            }
            (SubscriptionStep::GetActivationCode, BackendError::ItemNotFound(_)) => {
                self.activation_code_id = None;
                self.observer.notify(|o| o.on_activation_code_not_found());
                ErrorDisposition::Abort
            }
            _ => {
                let label = step_label(step);
                let error = error.clone();
                self.observer.notify(move |o| o.on_error(&label, &error));
                ErrorDisposition::Abort
            }
        }
    }

    fn on_finished(&mut self) {
        self.observer.notify(|o| o.hide_progress());
    }
}

fn steps() -> Vec<Step<SubscriptionFlow>> {
    vec![
        Step::new(SubscriptionStep::GetSubscription, |flow: &SubscriptionFlow| {
            let subscriptions = flow.subscriptions.clone();
            let product_id = flow.product();
            async move {
                let subscription = subscriptions.get_subscription(&product_id).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut SubscriptionFlow| {
                    flow.store(subscription, true)
                }))
            }
        })
        .guarded(|flow| flow.product_id.is_some()),
        Step::new(SubscriptionStep::GetActivationCode, |flow: &SubscriptionFlow| {
            let twincodes = flow.twincodes.clone();
            let code_id = flow.activation_code_id.clone().unwrap_or_default();
            async move {
                let twincode = twincodes.get_twincode(&code_id).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut SubscriptionFlow| {
                    flow.activation_code = Some(twincode);
                }))
            }
        })
        .guarded(|flow| flow.activation_code_id.is_some() && flow.activation_code.is_none()),
        Step::new(SubscriptionStep::ActivateSubscription, |flow: &SubscriptionFlow| {
            let subscriptions = flow.subscriptions.clone();
            let product_id = flow.product();
            let code_id = flow.activation_code.as_ref().map(|t| t.id.clone()).unwrap_or_default();
            async move {
                let subscription = subscriptions.activate_subscription(&product_id, &code_id).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut SubscriptionFlow| {
                    flow.activation_code_id = None;
                    flow.activation_code = None;
                    flow.store(subscription, false);
                }))
            }
        })
        .guarded(|flow| {
            flow.activation_code.is_some() && flow.subscription.is_some() && !flow.is_active()
        }),
        Step::new(SubscriptionStep::CancelSubscription, |flow: &SubscriptionFlow| {
            let subscriptions = flow.subscriptions.clone();
            let product_id = flow.product();
            async move {
                let subscription = subscriptions.cancel_subscription(&product_id).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut SubscriptionFlow| {
                    flow.cancel_requested = false;
                    flow.store(subscription, false);
                }))
            }
        })
        .guarded(|flow| flow.cancel_requested && flow.is_active()),
    ]
}

/// Controller of the subscription screen.
pub struct SubscriptionController {
    core: ControllerCore<SubscriptionFlow>,
}

impl SubscriptionController {
    pub fn new(ctx: &ServiceContext, observer: Arc<dyn SubscriptionObserver>) -> Self {
        let observer = ObserverSlot::new(observer, ctx.ui.clone());
        let slot = observer.clone();
        let flow = SubscriptionFlow {
            subscriptions: ctx.subscriptions.clone(),
            twincodes: ctx.twincodes.clone(),
            observer,
            product_id: None,
            subscription: None,
            activation_code_id: None,
            activation_code: None,
            cancel_requested: false,
        };
        Self {
            core: ControllerCore::new(ctx, flow, steps(), move || slot.detach()),
        }
    }

    pub fn load(&self, product_id: &str) -> TwResult<()> {
        let handle = self.core.handle()?;
        let product_id = product_id.to_string();
        handle.update(move |flow| {
            flow.observer.notify(|o| o.show_progress());
            flow.product_id = Some(product_id);
            flow.subscription = None;
            flow.cancel_requested = false;
            vec![SubscriptionStep::GetSubscription]
        });
        Ok(())
    }

    /// Activate the loaded product with an activation twincode.
    pub fn activate(&self, activation_code_id: &str) -> TwResult<()> {
        let handle = self.core.handle()?;
        let code_id = activation_code_id.trim().to_string();
        handle.update(move |flow| {
            let step = SubscriptionStep::ActivateSubscription;
            if flow.product_id.is_none() {
                reject(&flow.observer, step, "no product loaded");
                return Vec::new();
            }
            if flow.is_active() {
                reject(&flow.observer, step, "subscription already active");
                return Vec::new();
            }
            flow.observer.notify(|o| o.show_progress());
            flow.activation_code_id = Some(code_id);
            flow.activation_code = None;
            vec![
                SubscriptionStep::GetActivationCode,
                SubscriptionStep::ActivateSubscription,
            ]
        });
        Ok(())
    }

    pub fn cancel(&self) -> TwResult<()> {
        let handle = self.core.handle()?;
        handle.update(|flow| {
            let step = SubscriptionStep::CancelSubscription;
            if flow.product_id.is_none() {
                reject(&flow.observer, step, "no product loaded");
                return Vec::new();
            }
            if flow.subscription.is_some() && !flow.is_active() {
                reject(&flow.observer, step, "subscription not active");
                return Vec::new();
            }
            flow.observer.notify(|o| o.show_progress());
            flow.cancel_requested = true;
            vec![SubscriptionStep::CancelSubscription]
        });
        Ok(())
    }

    pub async fn snapshot(&self) -> TwResult<SequencerSnapshot<SubscriptionStep>> {
        self.core.snapshot().await
    }

    pub fn dispose(&mut self) {
        self.core.dispose();
    }
}

impl Service for SubscriptionController {
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

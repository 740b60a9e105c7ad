//! Subscription commands.

use clap::Subcommand;

use tw_core::config::ConfigHandle;
use tw_core::constants::products;
use tw_core::error::{TwError, TwResult};
use tw_services::controllers::SubscriptionController;
use tw_services::Service;

use super::observer::CliObserver;
use super::App;
use crate::RunOptions;

#[derive(Subcommand)]
pub enum SubscriptionAction {
    /// Show the subscription state of a product.
    Show {
        /// Product id (premium, group-calls).
        product: String,
    },
    /// Activate a product with an activation code.
    Activate {
        /// Product id (premium, group-calls).
        product: String,
        /// Activation twincode id.
        code: String,
    },
    /// Cancel a product subscription.
    Cancel {
        /// Product id (premium, group-calls).
        product: String,
    },
}

enum Change {
    None,
    Activate(String),
    Cancel,
}

pub async fn run(
    config: ConfigHandle,
    action: SubscriptionAction,
    options: RunOptions,
) -> TwResult<()> {
    let (product, change) = match action {
        SubscriptionAction::Show { product } => (product, Change::None),
        SubscriptionAction::Activate { product, code } => (product, Change::Activate(code)),
        SubscriptionAction::Cancel { product } => (product, Change::Cancel),
    };
    if !products::is_known(&product) {
        return Err(TwError::InvalidInput(format!(
            "unknown product {product}, expected one of: {}",
            products::ALL.join(", ")
        )));
    }

    let app = App::start(&config, options).await?;
    let observer = CliObserver::new("Loading subscription", options.format);
    let mut controller = SubscriptionController::new(&app.ctx, observer.clone());
    controller.init()?;

    let result = drive(&controller, &observer, &app, &product, change).await;

    controller.shutdown()?;
    result
}

async fn drive(
    controller: &SubscriptionController,
    observer: &CliObserver,
    app: &App,
    product: &str,
    change: Change,
) -> TwResult<()> {
    controller.load(product)?;
    observer.wait(app.wait).await?;

    match change {
        Change::None => return Ok(()),
        Change::Activate(code) => controller.activate(&code)?,
        Change::Cancel => controller.cancel()?,
    }
    observer.wait(app.wait).await
}

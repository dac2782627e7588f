use std::sync::Arc;

use clap::Args;
use storefront_checkout::{
    config::StorefrontConfig,
    ids::AddressId,
    money::WireAmount,
    orders::{HttpOrdersService, OrderPipeline, OrdersService},
};
use tracing::warn;

use super::{open_session, say};

#[derive(Debug, Args)]
pub(crate) struct CheckoutArgs {
    /// Delivery address identifier
    #[arg(long)]
    address: String,

    /// Tax to add to the order
    #[arg(long)]
    tax: Option<WireAmount>,
}

pub(crate) async fn run(args: CheckoutArgs, config: &StorefrontConfig) -> Result<(), String> {
    let session = open_session(config).await?;
    let currency = session.snapshot().currency();

    let mut request = session
        .checkout_request(Some(AddressId::new(args.address)))
        .map_err(|error| error.to_string())?;

    if let Some(tax) = args.tax {
        request = request
            .with_tax(tax.to_money(currency))
            .map_err(|error| error.to_string())?;
    }

    let api = config.api.client().map_err(|error| error.to_string())?;
    let orders: Arc<dyn OrdersService> = Arc::new(HttpOrdersService::new(api));

    let confirmation = OrderPipeline::new(orders, currency)
        .submit(&request)
        .await
        .map_err(|rejection| {
            warn!(stage = %rejection.stage(), "checkout failed");

            rejection.to_string()
        })?;

    say(format!(
        "Order {} placed, total {}",
        confirmation.order_id, confirmation.request.total_amount
    ))?;

    if let Some(message) = confirmation.message {
        say(message)?;
    }

    Ok(())
}

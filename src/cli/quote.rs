use std::{io, path::PathBuf};

use clap::Args;
use jiff::Timestamp;
use storefront_checkout::{config::StorefrontConfig, fixtures};

use super::say;

#[derive(Debug, Args)]
pub(crate) struct QuoteArgs {
    /// Cart fixture (YAML)
    #[arg(long)]
    cart: PathBuf,

    /// Offers fixture (YAML)
    #[arg(long)]
    offers: PathBuf,

    /// Coupon catalogue fixture (YAML)
    #[arg(long, requires = "coupon")]
    coupons: Option<PathBuf>,

    /// Coupon code to apply
    #[arg(long, requires = "coupons")]
    coupon: Option<String>,
}

pub(crate) fn run(args: &QuoteArgs, config: &StorefrontConfig) -> Result<(), String> {
    let cart = fixtures::load_cart(&args.cart)
        .map_err(|error| format!("failed to load {}: {error}", args.cart.display()))?;

    let currency = cart.currency();

    let offers = fixtures::load_offers(&args.offers, currency)
        .map_err(|error| format!("failed to load {}: {error}", args.offers.display()))?;

    let coupons = match &args.coupons {
        Some(path) => fixtures::load_coupons(path, currency)
            .map_err(|error| format!("failed to load {}: {error}", path.display()))?,
        None => Vec::new(),
    };

    let rules = config.pricing.rules_in(currency);

    let quote = fixtures::quote(
        &cart,
        &offers,
        &coupons,
        args.coupon.as_deref(),
        &rules,
        Timestamp::now(),
    )
    .map_err(|error| error.to_string())?;

    quote
        .totals()
        .write_to(io::stdout().lock(), &cart)
        .map_err(|error| error.to_string())?;

    if let Some(applied) = quote.coupon() {
        say(applied.message())?;
    }

    if let Some(rejection) = quote.rejection() {
        say(rejection)?;
    }

    Ok(())
}

use std::{
    io::{self, Write},
    sync::Arc,
};

use clap::{Parser, Subcommand};
use storefront_checkout::{
    cart::{CartsService, HttpCartsService},
    config::{CouponValidation, StorefrontConfig},
    coupons::{CatalogueCouponValidator, CouponValidator, HttpCouponValidator},
    fixtures,
    observability,
    session::CartSession,
};

mod cart;
mod checkout;
mod coupon;
mod quote;

#[derive(Debug, Parser)]
#[command(name = "storefront", about = "Storefront checkout client", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    config: StorefrontConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Price fixture files offline
    Quote(quote::QuoteArgs),
    /// Show or change the cart
    Cart(cart::CartCommand),
    /// Apply or remove a coupon
    Coupon(coupon::CouponCommand),
    /// Submit the cart as an order
    Checkout(checkout::CheckoutArgs),
}

impl Cli {
    /// Parse the command line, reading `.env` first when present.
    pub(crate) fn load() -> Result<Self, clap::Error> {
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    pub(crate) async fn run(self) -> Result<(), String> {
        observability::init(&self.config.logging).map_err(|error| error.to_string())?;

        match self.command {
            Commands::Quote(args) => quote::run(&args, &self.config),
            Commands::Cart(command) => cart::run(command, &self.config).await,
            Commands::Coupon(command) => coupon::run(command, &self.config).await,
            Commands::Checkout(args) => checkout::run(args, &self.config).await,
        }
    }
}

/// Build a session against the configured backend and load the cart.
async fn open_session(config: &StorefrontConfig) -> Result<CartSession, String> {
    let api = config.api.client().map_err(|error| error.to_string())?;
    let currency = config.pricing.currency().map_err(|error| error.to_string())?;

    let offers = match &config.pricing.offers_file {
        Some(path) => fixtures::load_offers(path, currency)
            .map_err(|error| format!("failed to load offers from {}: {error}", path.display()))?,
        None => Vec::new(),
    };

    let carts: Arc<dyn CartsService> = Arc::new(HttpCartsService::new(api.clone(), currency));

    let coupons: Arc<dyn CouponValidator> = match config.pricing.coupon_validation {
        CouponValidation::Server => Arc::new(HttpCouponValidator::new(api, currency)),
        CouponValidation::Catalogue => Arc::new(CatalogueCouponValidator::new(api, currency)),
    };

    let store = config.store.open().map_err(|error| error.to_string())?;

    let mut session = CartSession::new(
        carts,
        coupons,
        Box::new(store),
        offers,
        config.pricing.rules_in(currency),
        currency,
    );

    session.load().await.map_err(|error| error.to_string())?;

    Ok(session)
}

/// Render the session's cart and totals to stdout.
fn print_session(session: &CartSession) -> Result<(), String> {
    let totals = session.totals().map_err(|error| error.to_string())?;

    let mut out = io::stdout().lock();

    totals
        .write_to(&mut out, session.snapshot())
        .map_err(|error| error.to_string())?;

    if let Some(applied) = session.applied_coupon() {
        writeln!(out, "{}", applied.message()).map_err(|error| error.to_string())?;
    }

    Ok(())
}

/// Write a line to stdout.
fn say(line: impl std::fmt::Display) -> Result<(), String> {
    writeln!(io::stdout().lock(), "{line}").map_err(|error| error.to_string())
}

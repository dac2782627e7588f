//! Pricing Config

use std::path::PathBuf;

use clap::Args;
use rusty_money::iso::Currency;

use crate::{
    config::ConfigError,
    money::{WireAmount, currency_from_code},
    totals::PricingRules,
};

/// Where coupons are validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum CouponValidation {
    /// Ask the backend's validation endpoint.
    Server,

    /// Fetch the active coupons and evaluate them locally.
    Catalogue,
}

/// Pricing settings.
#[derive(Debug, Args)]
pub struct PricingConfig {
    /// Store currency (GBP, USD, EUR, INR)
    #[arg(long, env = "STOREFRONT_CURRENCY", default_value = "GBP")]
    pub currency: String,

    /// Orders above this amount ship free
    #[arg(long, env = "STOREFRONT_FREE_SHIPPING_THRESHOLD", default_value = "500.00")]
    pub free_shipping_threshold: WireAmount,

    /// Flat delivery fee below the threshold
    #[arg(long, env = "STOREFRONT_DELIVERY_FEE", default_value = "40.00", allow_hyphen_values = true)]
    pub delivery_fee: WireAmount,

    /// YAML file with the automatic offers applied to the cart
    #[arg(long, env = "STOREFRONT_OFFERS_FILE")]
    pub offers_file: Option<PathBuf>,

    /// Coupon validation strategy
    #[arg(long, env = "STOREFRONT_COUPON_VALIDATION", value_enum, default_value_t = CouponValidation::Server)]
    pub coupon_validation: CouponValidation,
}

impl PricingConfig {
    /// The configured currency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Amount`] for an unsupported currency code.
    pub fn currency(&self) -> Result<&'static Currency, ConfigError> {
        Ok(currency_from_code(&self.currency)?)
    }

    /// Delivery rules in the configured currency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Amount`] for an unsupported currency code.
    pub fn rules(&self) -> Result<PricingRules<'static>, ConfigError> {
        Ok(self.rules_in(self.currency()?))
    }

    /// Delivery rules in the given currency.
    pub fn rules_in(&self, currency: &'static Currency) -> PricingRules<'static> {
        PricingRules::new(
            self.free_shipping_threshold.to_money(currency),
            self.delivery_fee.to_money(currency),
        )
    }
}

//! Storefront configuration
//!
//! Every setting can be given as a flag or an environment variable. The
//! binary reads a `.env` file from the working directory first when present.

use clap::Args;
use thiserror::Error;

use crate::{http::ApiError, money::AmountError};

pub use api::ApiConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use pricing::{CouponValidation, PricingConfig};
pub use store::StoreConfig;

mod api;
mod logging;
mod pricing;
mod store;

/// Errors raised while turning configuration into runtime values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A command needs the backend but no URL was configured.
    #[error("no API URL configured, set --api-url or STOREFRONT_API_URL")]
    MissingApiUrl,

    /// The API client could not be built.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The currency or an amount is invalid.
    #[error(transparent)]
    Amount(#[from] AmountError),
}

/// Storefront checkout configuration
#[derive(Debug, Args)]
pub struct StorefrontConfig {
    /// Backend settings.
    #[command(flatten)]
    pub api: ApiConfig,

    /// Pricing settings.
    #[command(flatten)]
    pub pricing: PricingConfig,

    /// Local state settings.
    #[command(flatten)]
    pub store: StoreConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}

//! Fixtures
//!
//! YAML files describing a cart, its offers and a coupon catalogue. They feed
//! the offline `quote` command and the integration tests.

use std::{fs, path::Path};

use jiff::Timestamp;
use rusty_money::iso::Currency;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    cart::{
        CartError, CartSnapshot,
        records::{CartLineRecord, CartRecord},
    },
    coupons::{AppliedCoupon, Coupon, CouponError, CouponRejection, evaluate_coupon, records::CouponRecord},
    discounts::DiscountError,
    money::{AmountError, currency_from_code},
    offers::{Offer, OfferRecord},
    totals::{CartTotals, PricingRules, TotalsError, calculate_totals, coupon_request},
};

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Unknown currency code
    #[error(transparent)]
    Currency(#[from] AmountError),

    /// A cart line breaks the cart invariants
    #[error("Invalid cart: {0}")]
    Cart(#[from] CartError),

    /// An offer or coupon discount is out of range
    #[error("Invalid discount: {0}")]
    Discount(#[from] DiscountError),

    /// Totals could not be computed
    #[error(transparent)]
    Totals(#[from] TotalsError),

    /// The coupon evaluation failed for a reason other than a rejection
    #[error(transparent)]
    Coupon(CouponError),
}

#[derive(Debug, Deserialize)]
struct CartFixture {
    #[serde(default = "default_currency")]
    currency: String,

    #[serde(default)]
    items: Vec<CartLineRecord>,
}

fn default_currency() -> String {
    "GBP".to_string()
}

#[derive(Debug, Deserialize)]
struct OffersFixture {
    #[serde(default)]
    offers: Vec<OfferRecord>,
}

#[derive(Debug, Deserialize)]
struct CouponsFixture {
    #[serde(default)]
    coupons: Vec<CouponRecord>,
}

/// Parse a cart fixture. The file names its currency (GBP when omitted).
///
/// # Errors
///
/// Returns a [`FixtureError`] if the YAML is malformed, the currency is not
/// supported, or a line breaks the cart invariants.
pub fn parse_cart(yaml: &str) -> Result<CartSnapshot<'static>, FixtureError> {
    let fixture: CartFixture = serde_norway::from_str(yaml)?;

    let currency = currency_from_code(&fixture.currency)?;

    Ok(CartRecord {
        items: fixture.items,
    }
    .into_snapshot(currency)?)
}

/// Parse an offers fixture.
///
/// # Errors
///
/// Returns a [`FixtureError`] if the YAML is malformed or an offer is out of
/// range.
pub fn parse_offers(yaml: &str, currency: &'static Currency) -> Result<Vec<Offer<'static>>, FixtureError> {
    let fixture: OffersFixture = serde_norway::from_str(yaml)?;

    fixture
        .offers
        .into_iter()
        .map(|record| record.into_offer(currency).map_err(FixtureError::from))
        .collect()
}

/// Parse a coupons fixture.
///
/// # Errors
///
/// Returns a [`FixtureError`] if the YAML is malformed or a coupon is out of
/// range.
pub fn parse_coupons(yaml: &str, currency: &'static Currency) -> Result<Vec<Coupon<'static>>, FixtureError> {
    let fixture: CouponsFixture = serde_norway::from_str(yaml)?;

    fixture
        .coupons
        .into_iter()
        .map(|record| record.into_coupon(currency).map_err(FixtureError::from))
        .collect()
}

/// Load a cart fixture from a file.
///
/// # Errors
///
/// Returns a [`FixtureError`] if the file cannot be read or parsed.
pub fn load_cart(path: impl AsRef<Path>) -> Result<CartSnapshot<'static>, FixtureError> {
    let path = path.as_ref();

    debug!(path = %path.display(), "loading cart fixture");

    parse_cart(&fs::read_to_string(path)?)
}

/// Load an offers fixture from a file.
///
/// # Errors
///
/// Returns a [`FixtureError`] if the file cannot be read or parsed.
pub fn load_offers(
    path: impl AsRef<Path>,
    currency: &'static Currency,
) -> Result<Vec<Offer<'static>>, FixtureError> {
    parse_offers(&fs::read_to_string(path)?, currency)
}

/// Load a coupons fixture from a file.
///
/// # Errors
///
/// Returns a [`FixtureError`] if the file cannot be read or parsed.
pub fn load_coupons(
    path: impl AsRef<Path>,
    currency: &'static Currency,
) -> Result<Vec<Coupon<'static>>, FixtureError> {
    parse_coupons(&fs::read_to_string(path)?, currency)
}

/// An offline price quote.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote<'a> {
    totals: CartTotals<'a>,
    coupon: Option<AppliedCoupon<'a>>,
    rejection: Option<CouponRejection>,
}

impl<'a> Quote<'a> {
    /// Totals with the coupon applied when it was accepted.
    pub fn totals(&self) -> &CartTotals<'a> {
        &self.totals
    }

    /// The accepted coupon.
    pub fn coupon(&self) -> Option<&AppliedCoupon<'a>> {
        self.coupon.as_ref()
    }

    /// Why the requested coupon was refused.
    pub fn rejection(&self) -> Option<&CouponRejection> {
        self.rejection.as_ref()
    }
}

/// Price a cart against offers and, optionally, a coupon code from a local
/// catalogue. A refused code is reported on the quote and leaves the totals
/// without a coupon.
///
/// # Errors
///
/// Returns a [`FixtureError`] if any amount cannot be represented.
pub fn quote<'a>(
    cart: &CartSnapshot<'a>,
    offers: &[Offer<'_>],
    coupons: &[Coupon<'a>],
    code: Option<&str>,
    rules: &PricingRules<'_>,
    now: Timestamp,
) -> Result<Quote<'a>, FixtureError> {
    let (coupon, rejection) = match code {
        Some(code) => {
            let request = coupon_request(code, cart, offers, rules)?;

            match evaluate_coupon(coupons, &request, now) {
                Ok(applied) => (Some(applied), None),
                Err(CouponError::Rejected(rejection)) => (None, Some(rejection)),
                Err(error) => return Err(FixtureError::Coupon(error)),
            }
        }
        None => (None, None),
    };

    let totals = calculate_totals(cart, offers, coupon.as_ref(), rules)?;

    Ok(Quote {
        totals,
        coupon,
        rejection,
    })
}

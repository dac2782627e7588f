//! Coupons
//!
//! Customer-entered codes granting a single cart-level discount. Coupons are
//! owned by the backend; the client only ever holds a validated snapshot.

use std::fmt;

use jiff::Timestamp;
use rustc_hash::FxHashSet;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    discounts::{Discount, DiscountError},
    http::ApiError,
    ids::VariantId,
    money::clamp_discount,
};

pub mod records;
pub mod service;

pub use service::{
    CatalogueCouponValidator, CouponValidator, HttpCouponValidator, MockCouponValidator,
};

/// Normalise a customer-entered code for comparison.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Why a coupon was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    /// No coupon matches the code.
    NotFound,

    /// The coupon is disabled or outside its active window.
    OutOfWindow,

    /// The order total is below the coupon's minimum.
    BelowMinimum,

    /// None of the cart's variants are eligible.
    NotApplicable,
}

impl RejectionReason {
    /// Wire code of this reason.
    pub const fn reason_code(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::OutOfWindow => "OUT_OF_WINDOW",
            Self::BelowMinimum => "BELOW_MINIMUM",
            Self::NotApplicable => "NOT_APPLICABLE",
        }
    }

    /// Parse a wire code. Unknown codes are treated as [`Self::NotApplicable`].
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "NOT_FOUND" => Self::NotFound,
            "OUT_OF_WINDOW" | "EXPIRED" | "INACTIVE" => Self::OutOfWindow,
            "BELOW_MINIMUM" => Self::BelowMinimum,
            _ => Self::NotApplicable,
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason_code())
    }
}

/// A coupon refusal the customer can recover from by choosing another code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CouponRejection {
    reason: RejectionReason,
    message: String,
}

impl CouponRejection {
    /// Create a rejection with a human-readable message.
    pub fn new(reason: RejectionReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    /// Why the coupon was refused.
    pub fn reason(&self) -> RejectionReason {
        self.reason
    }

    /// Message for the customer.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors returned by coupon validation.
#[derive(Debug, Error)]
pub enum CouponError {
    /// The coupon does not apply.
    #[error(transparent)]
    Rejected(#[from] CouponRejection),

    /// The discount could not be calculated.
    #[error(transparent)]
    Arithmetic(#[from] DiscountError),

    /// The backend could not be asked.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CouponError {
    /// The rejection, if the coupon itself was refused.
    pub fn rejection(&self) -> Option<&CouponRejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}

/// A validated coupon snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Coupon<'a> {
    code: String,
    discount: Discount<'a>,
    min_order_amount: Option<Money<'a, Currency>>,
    max_discount_amount: Option<Money<'a, Currency>>,
    usage_limit_per_user: Option<u32>,
    applicable_variants: FxHashSet<VariantId>,
    active_from: Option<Timestamp>,
    active_to: Option<Timestamp>,
    is_active: bool,
}

impl<'a> Coupon<'a> {
    /// Create an active, unrestricted coupon.
    pub fn new(code: &str, discount: Discount<'a>) -> Self {
        Self {
            code: normalize_code(code),
            discount,
            min_order_amount: None,
            max_discount_amount: None,
            usage_limit_per_user: None,
            applicable_variants: FxHashSet::default(),
            active_from: None,
            active_to: None,
            is_active: true,
        }
    }

    /// Require a minimum pre-coupon order total.
    #[must_use]
    pub fn with_minimum(mut self, minimum: Money<'a, Currency>) -> Self {
        self.min_order_amount = Some(minimum);
        self
    }

    /// Cap a percentage discount.
    #[must_use]
    pub fn with_max_discount(mut self, max: Money<'a, Currency>) -> Self {
        self.max_discount_amount = Some(max);
        self
    }

    /// Restrict the coupon to carts containing at least one of these variants.
    #[must_use]
    pub fn with_variants(mut self, variants: impl IntoIterator<Item = VariantId>) -> Self {
        self.applicable_variants = variants.into_iter().collect();
        self
    }

    /// Limit per-customer redemptions.
    #[must_use]
    pub fn with_usage_limit(mut self, limit: u32) -> Self {
        self.usage_limit_per_user = Some(limit);
        self
    }

    /// Restrict the coupon to a time window. Either end may be open.
    #[must_use]
    pub fn with_window(mut self, from: Option<Timestamp>, to: Option<Timestamp>) -> Self {
        self.active_from = from;
        self.active_to = to;
        self
    }

    /// Disable the coupon.
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Normalised code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Whether a customer-entered code refers to this coupon.
    pub fn matches_code(&self, code: &str) -> bool {
        self.code == normalize_code(code)
    }

    /// The discount this coupon grants.
    pub fn discount(&self) -> &Discount<'a> {
        &self.discount
    }

    /// Minimum pre-coupon order total, if any.
    pub fn min_order_amount(&self) -> Option<&Money<'a, Currency>> {
        self.min_order_amount.as_ref()
    }

    /// Cap on a percentage discount, if any.
    pub fn max_discount_amount(&self) -> Option<&Money<'a, Currency>> {
        self.max_discount_amount.as_ref()
    }

    /// Per-customer redemption limit. Enforced by the backend only.
    pub fn usage_limit_per_user(&self) -> Option<u32> {
        self.usage_limit_per_user
    }

    /// Eligible variants; empty means all.
    pub fn applicable_variants(&self) -> &FxHashSet<VariantId> {
        &self.applicable_variants
    }

    /// Start of the active window.
    pub fn active_from(&self) -> Option<Timestamp> {
        self.active_from
    }

    /// End of the active window.
    pub fn active_to(&self) -> Option<Timestamp> {
        self.active_to
    }

    /// Whether the coupon is enabled.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Whether the coupon is enabled and `now` falls inside its window.
    pub fn is_live_at(&self, now: Timestamp) -> bool {
        self.is_active
            && self.active_from.is_none_or(|from| now >= from)
            && self.active_to.is_none_or(|to| now <= to)
    }

    /// Whether any of the given variants is eligible.
    ///
    /// Note that one eligible variant makes the whole order eligible: the
    /// discount is computed on the full pre-coupon total, not on the matching
    /// lines only.
    pub fn applies_to_any<'v>(&self, mut variant_ids: impl Iterator<Item = &'v VariantId>) -> bool {
        self.applicable_variants.is_empty()
            || variant_ids.any(|id| self.applicable_variants.contains(id))
    }
}

/// Calculate a coupon's discount on a pre-coupon order total, in minor units.
///
/// Percentages apply to the order total and are capped by the maximum discount
/// when one is set; fixed amounts are taken once. The result never exceeds the
/// order total.
///
/// # Errors
///
/// Returns a [`DiscountError`] if the discount cannot be represented.
pub fn coupon_discount(coupon: &Coupon<'_>, order_total: i64) -> Result<i64, DiscountError> {
    let raw = coupon.discount().amount_off(order_total, 1)?;

    let capped = match (coupon.discount(), coupon.max_discount_amount()) {
        (Discount::PercentageOff(_), Some(max)) => raw.min(max.to_minor_units()),
        _ => raw,
    };

    Ok(clamp_discount(capped, order_total))
}

/// What the customer asks a coupon to be checked against.
#[derive(Debug, Clone, PartialEq)]
pub struct CouponRequest<'a> {
    /// Code as entered.
    pub code: String,
    /// Variants currently in the cart.
    pub variant_ids: Vec<VariantId>,
    /// Subtotal minus item discounts.
    pub order_total: Money<'a, Currency>,
}

/// A coupon that passed validation, with the discount it grants.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedCoupon<'a> {
    coupon: Coupon<'a>,
    discount_amount: Money<'a, Currency>,
    message: String,
}

impl<'a> AppliedCoupon<'a> {
    /// Create an applied coupon.
    pub fn new(coupon: Coupon<'a>, discount_amount: Money<'a, Currency>, message: impl Into<String>) -> Self {
        Self {
            coupon,
            discount_amount,
            message: message.into(),
        }
    }

    /// The validated coupon.
    pub fn coupon(&self) -> &Coupon<'a> {
        &self.coupon
    }

    /// Normalised coupon code.
    pub fn code(&self) -> &str {
        self.coupon.code()
    }

    /// Discount granted at validation time.
    pub fn discount_amount(&self) -> &Money<'a, Currency> {
        &self.discount_amount
    }

    /// Message for the customer.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Decide whether a coupon applies and compute its discount.
///
/// Checks run in order: the code must match a coupon, the coupon must be live
/// at `now`, the order total must reach the minimum, and at least one cart
/// variant must be eligible. The outcome depends only on the inputs.
///
/// # Errors
///
/// Returns [`CouponError::Rejected`] with the first failing check, or
/// [`CouponError::Arithmetic`] if the discount cannot be represented.
pub fn evaluate_coupon<'a>(
    coupons: &[Coupon<'a>],
    request: &CouponRequest<'a>,
    now: Timestamp,
) -> Result<AppliedCoupon<'a>, CouponError> {
    let code = normalize_code(&request.code);

    let mut matching = coupons.iter().filter(|coupon| coupon.matches_code(&code)).peekable();

    if matching.peek().is_none() {
        return Err(CouponRejection::new(
            RejectionReason::NotFound,
            format!("Coupon {code} was not found"),
        )
        .into());
    }

    // A live coupon wins over a disabled or expired one with the same code.
    let Some(coupon) = matching.find(|coupon| coupon.is_live_at(now)) else {
        return Err(CouponRejection::new(
            RejectionReason::OutOfWindow,
            format!("Coupon {code} is not currently active"),
        )
        .into());
    };

    let order_total = request.order_total.to_minor_units();

    if let Some(minimum) = coupon.min_order_amount() {
        if order_total < minimum.to_minor_units() {
            return Err(CouponRejection::new(
                RejectionReason::BelowMinimum,
                format!("Coupon {code} requires a minimum order of {minimum}"),
            )
            .into());
        }
    }

    if !coupon.applies_to_any(request.variant_ids.iter()) {
        return Err(CouponRejection::new(
            RejectionReason::NotApplicable,
            format!("Coupon {code} does not apply to any item in your cart"),
        )
        .into());
    }

    let discount = coupon_discount(coupon, order_total)?;

    Ok(AppliedCoupon {
        coupon: coupon.clone(),
        discount_amount: Money::from_minor(discount, request.order_total.currency()),
        message: format!("Coupon {code} applied: {}", coupon.discount().describe()),
    })
}

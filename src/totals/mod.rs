//! Totals
//!
//! The cart total breakdown shown to the customer and reused at checkout.

use std::io;

use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    cart::CartSnapshot,
    coupons::{AppliedCoupon, CouponRequest},
    discounts::DiscountError,
    money::clamp_discount,
    offers::{LineDiscount, Offer, resolve_line_discount},
};

mod render;

/// Errors that can occur when calculating or rendering totals.
#[derive(Debug, Error)]
pub enum TotalsError {
    /// A discount or sum could not be represented.
    #[error(transparent)]
    Arithmetic(#[from] DiscountError),

    /// Writing the breakdown failed.
    #[error("failed to write totals")]
    IO(#[source] io::Error),
}

/// Delivery pricing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingRules<'a> {
    free_shipping_threshold: Money<'a, Currency>,
    delivery_fee: Money<'a, Currency>,
}

impl<'a> PricingRules<'a> {
    /// Create delivery rules: orders above `free_shipping_threshold` ship free,
    /// everything else pays `delivery_fee`.
    pub fn new(free_shipping_threshold: Money<'a, Currency>, delivery_fee: Money<'a, Currency>) -> Self {
        Self {
            free_shipping_threshold,
            delivery_fee,
        }
    }

    /// Orders strictly above this amount ship free.
    pub fn free_shipping_threshold(&self) -> &Money<'a, Currency> {
        &self.free_shipping_threshold
    }

    /// Flat delivery fee.
    pub fn delivery_fee(&self) -> &Money<'a, Currency> {
        &self.delivery_fee
    }

    /// Delivery fee for a discounted order total, in minor units.
    pub fn delivery_fee_for(&self, after_coupon_discount: i64) -> i64 {
        if after_coupon_discount > self.free_shipping_threshold.to_minor_units() {
            0
        } else {
            self.delivery_fee.to_minor_units().max(0)
        }
    }
}

/// The authoritative breakdown of a cart's total.
#[derive(Debug, Clone, PartialEq)]
pub struct CartTotals<'a> {
    subtotal: Money<'a, Currency>,
    line_discounts: Vec<LineDiscount<'a>>,
    item_discount: Money<'a, Currency>,
    after_item_discount: Money<'a, Currency>,
    coupon_discount: Money<'a, Currency>,
    after_coupon_discount: Money<'a, Currency>,
    delivery_fee: Money<'a, Currency>,
    total: Money<'a, Currency>,
    coupon_code: Option<String>,
}

impl<'a> CartTotals<'a> {
    /// Sum of final unit price times quantity over active lines.
    pub fn subtotal(&self) -> &Money<'a, Currency> {
        &self.subtotal
    }

    /// Offer discount per active line, in cart order.
    pub fn line_discounts(&self) -> &[LineDiscount<'a>] {
        &self.line_discounts
    }

    /// Sum of offer discounts.
    pub fn item_discount(&self) -> &Money<'a, Currency> {
        &self.item_discount
    }

    /// Subtotal minus offer discounts, never negative.
    pub fn after_item_discount(&self) -> &Money<'a, Currency> {
        &self.after_item_discount
    }

    /// Coupon discount, never above [`Self::after_item_discount`].
    pub fn coupon_discount(&self) -> &Money<'a, Currency> {
        &self.coupon_discount
    }

    /// Total after both discounts, never negative.
    pub fn after_coupon_discount(&self) -> &Money<'a, Currency> {
        &self.after_coupon_discount
    }

    /// Delivery fee.
    pub fn delivery_fee(&self) -> &Money<'a, Currency> {
        &self.delivery_fee
    }

    /// Amount payable.
    pub fn total(&self) -> &Money<'a, Currency> {
        &self.total
    }

    /// Code of the coupon that was counted, if any.
    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    /// Offer discount plus coupon discount.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::Overflow`] if the sum does not fit.
    pub fn total_discount(&self) -> Result<Money<'a, Currency>, DiscountError> {
        let minor = self
            .item_discount
            .to_minor_units()
            .checked_add(self.coupon_discount.to_minor_units())
            .ok_or(DiscountError::Overflow)?;

        Ok(Money::from_minor(minor, self.subtotal.currency()))
    }

    /// Render the breakdown as a table followed by summary lines.
    ///
    /// # Errors
    ///
    /// Returns [`TotalsError::IO`] if writing fails.
    pub fn write_to(&self, out: impl io::Write, cart: &CartSnapshot<'_>) -> Result<(), TotalsError> {
        render::write_totals(out, self, cart)
    }
}

/// Calculate the cart total breakdown.
///
/// The stages run in a fixed order and each uses the previous clamped
/// result: subtotal, offer discounts, coupon discount (re-clamped against the
/// current cart), then delivery. Only active lines count. The result depends
/// only on the inputs.
///
/// Delivery departs from the flat threshold rule in one case: a cart with no
/// active lines (empty, or only inactive lines) ships nothing and pays no fee,
/// even though its zero total is below the free-shipping threshold.
///
/// # Errors
///
/// Returns [`TotalsError::Arithmetic`] if any amount cannot be represented.
pub fn calculate_totals<'a>(
    cart: &CartSnapshot<'a>,
    offers: &[Offer<'_>],
    coupon: Option<&AppliedCoupon<'_>>,
    rules: &PricingRules<'_>,
) -> Result<CartTotals<'a>, TotalsError> {
    let currency = cart.currency();

    let subtotal = cart.subtotal_minor()?;

    let line_discounts = cart
        .active_lines()
        .map(|line| resolve_line_discount(line, offers))
        .collect::<Result<Vec<_>, _>>()?;

    let item_discount = line_discounts.iter().try_fold(0_i64, |acc, line| {
        acc.checked_add(line.amount().to_minor_units())
            .ok_or(DiscountError::Overflow)
    })?;

    let after_item_discount = subtotal.saturating_sub(item_discount).max(0);

    let coupon_discount = coupon.map_or(0, |applied| {
        clamp_discount(applied.discount_amount().to_minor_units(), after_item_discount)
    });

    let after_coupon_discount = after_item_discount.saturating_sub(coupon_discount).max(0);

    let delivery_fee = if cart.active_lines().next().is_none() {
        0
    } else {
        rules.delivery_fee_for(after_coupon_discount)
    };

    let total = after_coupon_discount
        .checked_add(delivery_fee)
        .ok_or(DiscountError::Overflow)?;

    Ok(CartTotals {
        subtotal: Money::from_minor(subtotal, currency),
        line_discounts,
        item_discount: Money::from_minor(item_discount, currency),
        after_item_discount: Money::from_minor(after_item_discount, currency),
        coupon_discount: Money::from_minor(coupon_discount, currency),
        after_coupon_discount: Money::from_minor(after_coupon_discount, currency),
        delivery_fee: Money::from_minor(delivery_fee, currency),
        total: Money::from_minor(total, currency),
        coupon_code: coupon.map(|applied| applied.code().to_string()),
    })
}

/// Build the request a coupon code is checked against: the variants on active
/// lines and the total after item discounts.
///
/// # Errors
///
/// Returns [`TotalsError::Arithmetic`] if any amount cannot be represented.
pub fn coupon_request<'a>(
    code: impl Into<String>,
    cart: &CartSnapshot<'a>,
    offers: &[Offer<'_>],
    rules: &PricingRules<'_>,
) -> Result<CouponRequest<'a>, TotalsError> {
    let totals = calculate_totals(cart, offers, None, rules)?;

    Ok(CouponRequest {
        code: code.into(),
        variant_ids: cart
            .active_lines()
            .map(|line| line.variant_id().clone())
            .collect(),
        order_total: *totals.after_item_discount(),
    })
}

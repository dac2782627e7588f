//! Orders
//!
//! Turns a checkout request into the canonical order sent to the backend.
//! Totals are recomputed here rather than taken from the client, so a stale
//! cart can never change what the customer is charged.

use rusty_money::{Money, iso::Currency};

use crate::{
    cart::CartSnapshot,
    discounts::DiscountError,
    ids::{AddressId, VariantId},
    totals::CartTotals,
};

mod pipeline;
pub mod records;
pub mod service;
mod validation;

pub use pipeline::{
    OrderConfirmation, OrderPipeline, OrderRejection, OrderState, PreparedOrder, Reconciliation,
    transform,
};
pub use service::{HttpOrdersService, MockOrdersService, OrdersService};
pub use validation::{LineProblem, OrderValidationError, ValidationErrors, validate};

/// A line to be ordered.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutLine<'a> {
    /// Variant ordered.
    pub variant_id: VariantId,
    /// Units ordered. Signed so invalid input can be reported.
    pub quantity: i64,
    /// Price per unit.
    pub price: Money<'a, Currency>,
}

/// Everything the customer submits at checkout.
///
/// Monetary fields left as `None` default to zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckoutRequest<'a> {
    /// Delivery address.
    pub address_id: Option<AddressId>,
    /// Lines in cart order.
    pub lines: Vec<CheckoutLine<'a>>,
    /// Delivery fee.
    pub delivery_fee: Option<Money<'a, Currency>>,
    /// Tax.
    pub tax_amount: Option<Money<'a, Currency>>,
    /// Offer and coupon discounts combined.
    pub discount_amount: Option<Money<'a, Currency>>,
    /// Applied coupon.
    pub coupon_code: Option<String>,
    /// Total the client displayed, checked against the recomputed total.
    pub client_total: Option<Money<'a, Currency>>,
}

impl<'a> CheckoutRequest<'a> {
    /// Build a request from a cart and its totals breakdown.
    ///
    /// Active lines are ordered at their final unit price. The discount is the
    /// offer discount plus the coupon discount, and tax starts at zero.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::Overflow`] if the combined discount does not fit.
    pub fn from_totals(
        address_id: Option<AddressId>,
        cart: &CartSnapshot<'a>,
        totals: &CartTotals<'a>,
    ) -> Result<Self, DiscountError> {
        let lines = cart
            .active_lines()
            .map(|line| CheckoutLine {
                variant_id: line.variant_id().clone(),
                quantity: i64::from(line.quantity()),
                price: *line.final_unit_price(),
            })
            .collect();

        Ok(Self {
            address_id,
            lines,
            delivery_fee: Some(*totals.delivery_fee()),
            tax_amount: Some(Money::from_minor(0, cart.currency())),
            discount_amount: Some(totals.total_discount()?),
            coupon_code: totals.coupon_code().map(str::to_string),
            client_total: Some(*totals.total()),
        })
    }

    /// Add tax, carrying it into the client total.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::Overflow`] if the client total does not fit.
    pub fn with_tax(mut self, tax: Money<'a, Currency>) -> Result<Self, DiscountError> {
        let previous = self.tax_amount.map_or(0, |amount| amount.to_minor_units());
        let delta = tax.to_minor_units().max(0) - previous.max(0);

        if let Some(total) = self.client_total {
            let minor = total
                .to_minor_units()
                .checked_add(delta)
                .ok_or(DiscountError::Overflow)?;

            self.client_total = Some(Money::from_minor(minor, total.currency()));
        }

        self.tax_amount = Some(tax);

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use decimal_percentage::Percentage;
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use crate::{
        cart::{CartLine, LineStatus},
        discounts::Discount,
        offers::Offer,
        totals::{PricingRules, calculate_totals},
    };

    use super::*;

    fn gbp(minor: i64) -> Money<'static, Currency> {
        Money::from_minor(minor, GBP)
    }

    #[test]
    fn from_totals_carries_breakdown() -> TestResult {
        let cart = CartSnapshot::with_lines(
            [
                CartLine::new(VariantId::new("tee"), 2, gbp(100_00), gbp(80_00), 5, LineStatus::Active)?,
                CartLine::new(VariantId::new("hat"), 1, gbp(9_00), gbp(9_00), 5, LineStatus::Inactive)?,
            ],
            GBP,
        )?;
        let offers = [Offer::store_wide(Discount::PercentageOff(Percentage::from(0.1)))];
        let totals = calculate_totals(&cart, &offers, None, &PricingRules::new(gbp(500_00), gbp(40_00)))?;

        let request = CheckoutRequest::from_totals(Some(AddressId::new("home")), &cart, &totals)?;

        assert_eq!(request.lines.len(), 1);
        assert_eq!(request.lines.first().map(|line| line.price), Some(gbp(80_00)));
        assert_eq!(request.discount_amount, Some(gbp(16_00)));
        assert_eq!(request.delivery_fee, Some(gbp(40_00)));
        assert_eq!(request.client_total, Some(gbp(184_00)));

        Ok(())
    }

    #[test]
    fn with_tax_updates_client_total() -> TestResult {
        let request = CheckoutRequest {
            tax_amount: Some(gbp(0)),
            client_total: Some(gbp(100_00)),
            ..CheckoutRequest::default()
        }
        .with_tax(gbp(20_00))?;

        assert_eq!(request.tax_amount, Some(gbp(20_00)));
        assert_eq!(request.client_total, Some(gbp(120_00)));

        Ok(())
    }
}

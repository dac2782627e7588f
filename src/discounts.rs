//! Discounts
//!
//! Offers and coupons share one discount type and one evaluation function.

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::{
    AmountError, decimal_to_minor, money, percent_of_minor, percentage_from_points,
    percentage_points,
};

/// Errors specific to discount calculations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// Minor unit arithmetic overflowed.
    #[error("monetary arithmetic overflowed")]
    Overflow,

    /// A percentage discount outside 0 to 100.
    #[error("percentage discount {0} is outside 0 to 100")]
    PercentageOutOfRange(Decimal),

    /// Invalid fixed amount.
    #[error(transparent)]
    Amount(#[from] AmountError),
}

/// Wire name of a discount kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// `discountValue` is a percentage between 0 and 100.
    Percent,

    /// `discountValue` is a fixed amount.
    Flat,
}

/// Discount configuration shared by offers and coupons.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Discount<'a> {
    /// Take a percentage off (e.g., "10% off").
    PercentageOff(Percentage),

    /// Take a fixed amount off (e.g., "£2 off"), once per unit it applies to.
    AmountOff(Money<'a, Currency>),
}

impl Discount<'static> {
    /// Build a discount from its wire representation.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::PercentageOutOfRange`] for a percentage outside
    /// 0 to 100, or [`DiscountError::Amount`] for a negative or oversized fixed
    /// amount.
    pub fn from_wire(
        kind: DiscountType,
        value: Decimal,
        currency: &'static Currency,
    ) -> Result<Self, DiscountError> {
        match kind {
            DiscountType::Percent => percentage_from_points(value)
                .map(Discount::PercentageOff)
                .ok_or(DiscountError::PercentageOutOfRange(value)),
            DiscountType::Flat => {
                if value.is_sign_negative() && !value.is_zero() {
                    return Err(AmountError::Negative(value.to_string()).into());
                }

                Ok(Discount::AmountOff(money(decimal_to_minor(value)?, currency)))
            }
        }
    }
}

impl Discount<'_> {
    /// Calculate the amount this discount takes off, in minor units.
    ///
    /// Percentages apply to `base`; fixed amounts are taken once for each of
    /// `units`. The result is not clamped, callers clamp against whatever the
    /// discount may not exceed.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::PercentConversion`] or
    /// [`DiscountError::Overflow`] if the result cannot be represented.
    pub fn amount_off(&self, base: i64, units: i64) -> Result<i64, DiscountError> {
        match self {
            Discount::PercentageOff(percent) => {
                percent_of_minor(*percent, base).ok_or(DiscountError::PercentConversion)
            }
            Discount::AmountOff(amount) => amount
                .to_minor_units()
                .checked_mul(units)
                .ok_or(DiscountError::Overflow),
        }
    }

    /// Wire kind of this discount.
    pub fn kind(&self) -> DiscountType {
        match self {
            Discount::PercentageOff(_) => DiscountType::Percent,
            Discount::AmountOff(_) => DiscountType::Flat,
        }
    }

    /// Short human-readable description, e.g. `10% off` or `£2.00 off`.
    pub fn describe(&self) -> String {
        match self {
            Discount::PercentageOff(percent) => {
                format!("{}% off", percentage_points(*percent).normalize())
            }
            Discount::AmountOff(amount) => format!("{amount} off"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn percentage_takes_share_of_base() -> TestResult {
        let discount = Discount::from_wire(DiscountType::Percent, Decimal::from(10), GBP)?;

        assert_eq!(discount.amount_off(16_000, 2)?, 1_600);

        Ok(())
    }

    #[test]
    fn fixed_amount_is_taken_per_unit() -> TestResult {
        let discount = Discount::from_wire(DiscountType::Flat, Decimal::from(5), GBP)?;

        assert_eq!(discount.amount_off(16_000, 3)?, 1_500);

        Ok(())
    }

    #[test]
    fn percentage_above_hundred_is_rejected() {
        let result = Discount::from_wire(DiscountType::Percent, Decimal::from(150), GBP);

        assert!(matches!(result, Err(DiscountError::PercentageOutOfRange(_))));
    }

    #[test]
    fn negative_fixed_amount_is_rejected() {
        let result = Discount::from_wire(DiscountType::Flat, Decimal::from(-5), GBP);

        assert!(matches!(
            result,
            Err(DiscountError::Amount(AmountError::Negative(_)))
        ));
    }

    #[test]
    fn fixed_amount_overflow_is_reported() {
        let discount = Discount::AmountOff(Money::from_minor(i64::MAX, GBP));

        assert_eq!(discount.amount_off(0, 2), Err(DiscountError::Overflow));
    }

    #[test]
    fn describe_names_the_discount() -> TestResult {
        let percent = Discount::from_wire(DiscountType::Percent, Decimal::from(15), GBP)?;

        assert_eq!(percent.describe(), "15% off");
        assert_eq!(percent.kind(), DiscountType::Percent);

        Ok(())
    }

    #[test]
    fn wire_kind_names() -> TestResult {
        let kind: DiscountType = serde_json::from_str("\"PERCENT\"")?;

        assert_eq!(kind, DiscountType::Percent);
        assert_eq!(serde_json::to_string(&DiscountType::Flat)?, "\"FLAT\"");

        Ok(())
    }
}

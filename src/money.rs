//! Money
//!
//! All storefront arithmetic happens in integer minor units with two decimal
//! places. Amounts cross the HTTP boundary as decimal strings fixed to two
//! places (`"12.30"`) and are exposed to callers as [`Money`].

use std::{fmt, str::FromStr};

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{
    Money,
    iso::{self, Currency},
};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Visitor},
};
use thiserror::Error;

/// Number of decimal places carried by every monetary value.
pub const MINOR_UNIT_SCALE: u32 = 2;

/// Errors raised while parsing or converting amounts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// The value could not be parsed as a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),

    /// The value was negative where only non-negative amounts are allowed.
    #[error("amount {0} must not be negative")]
    Negative(String),

    /// The value does not fit into minor units.
    #[error("amount {0} is out of range")]
    OutOfRange(String),

    /// The currency code is not one the storefront trades in.
    #[error("unsupported currency: {0}")]
    UnknownCurrency(String),
}

/// Look up a supported currency by its ISO code.
///
/// # Errors
///
/// Returns [`AmountError::UnknownCurrency`] for any code other than GBP, USD,
/// EUR or INR.
pub fn currency_from_code(code: &str) -> Result<&'static Currency, AmountError> {
    match code.trim().to_ascii_uppercase().as_str() {
        "GBP" => Ok(iso::GBP),
        "USD" => Ok(iso::USD),
        "EUR" => Ok(iso::EUR),
        "INR" => Ok(iso::INR),
        other => Err(AmountError::UnknownCurrency(other.to_string())),
    }
}

/// Build a [`Money`] value from minor units.
pub fn money(minor: i64, currency: &'static Currency) -> Money<'static, Currency> {
    Money::from_minor(minor, currency)
}

/// Convert a decimal amount into minor units, rounding half away from zero.
///
/// # Errors
///
/// Returns [`AmountError::OutOfRange`] if the amount does not fit in an `i64`
/// count of minor units.
pub fn decimal_to_minor(amount: Decimal) -> Result<i64, AmountError> {
    amount
        .round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|value| value.to_i64())
        .ok_or_else(|| AmountError::OutOfRange(amount.to_string()))
}

/// Convert minor units into a decimal with exactly two places.
pub fn minor_to_decimal(minor: i64) -> Decimal {
    Decimal::new(minor, MINOR_UNIT_SCALE)
}

/// Format minor units as a fixed two place decimal string.
pub fn format_minor(minor: i64) -> String {
    minor_to_decimal(minor).to_string()
}

/// Parse a decimal string into non-negative minor units.
///
/// # Errors
///
/// Returns an [`AmountError`] if the string is not a number, is negative, or
/// is out of range.
pub fn parse_minor(s: &str) -> Result<i64, AmountError> {
    let amount = Decimal::from_str(s.trim()).map_err(|_err| AmountError::Invalid(s.to_string()))?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmountError::Negative(s.to_string()));
    }

    decimal_to_minor(amount)
}

/// Clamp a discount into `0..=ceiling`.
///
/// A negative ceiling yields zero, so the result never makes a total negative.
pub fn clamp_discount(discount: i64, ceiling: i64) -> i64 {
    discount.min(ceiling).max(0)
}

/// Build a percentage from points on a 0 to 100 scale.
///
/// Returns `None` when the value falls outside that range.
pub fn percentage_from_points(points: Decimal) -> Option<Percentage> {
    if (points.is_sign_negative() && !points.is_zero()) || points > Decimal::ONE_HUNDRED {
        return None;
    }

    Some(Percentage::from(points / Decimal::ONE_HUNDRED))
}

/// Express a percentage as points on a 0 to 100 scale.
pub fn percentage_points(percent: Percentage) -> Decimal {
    (percent * Decimal::ONE) * Decimal::ONE_HUNDRED
}

/// Calculate a percentage of a minor unit amount, rounded half away from zero.
///
/// Returns `None` if the calculation overflows.
pub fn percent_of_minor(percent: Percentage, minor: i64) -> Option<i64> {
    let minor = Decimal::from_i64(minor)?;

    (percent * Decimal::ONE)
        .checked_mul(minor)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// A decimal number as it appears on the wire.
///
/// Deserialises from either a JSON string (`"12.5"`) or a JSON number and
/// serialises back to a string, so values never travel as binary floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireDecimal(pub Decimal);

impl Serialize for WireDecimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for WireDecimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(WireDecimalVisitor).map(WireDecimal)
    }
}

struct WireDecimalVisitor;

impl Visitor<'_> for WireDecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number or decimal string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
        Decimal::from_str(v.trim()).map_err(|_err| E::custom(format!("invalid decimal: {v}")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
        // Go through the shortest round-trip representation rather than the
        // binary value, so 0.1 arrives as 0.1.
        Decimal::from_str(&v.to_string())
            .ok()
            .or_else(|| Decimal::from_f64(v))
            .ok_or_else(|| E::custom(format!("invalid decimal: {v}")))
    }
}

/// A non-negative monetary amount as it appears on the wire, held in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub struct WireAmount(i64);

impl WireAmount {
    /// Wrap minor units. Negative input is clamped to zero.
    pub fn from_minor(minor: i64) -> Self {
        Self(minor.max(0))
    }

    /// Wrap a [`Money`] value, clamping negative values to zero.
    pub fn from_money(money: &Money<'_, Currency>) -> Self {
        Self::from_minor(money.to_minor_units())
    }

    /// Minor units.
    pub fn minor(self) -> i64 {
        self.0
    }

    /// Convert into [`Money`] in the given currency.
    pub fn to_money(self, currency: &'static Currency) -> Money<'static, Currency> {
        money(self.0, currency)
    }
}

impl fmt::Display for WireAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_minor(self.0))
    }
}

impl FromStr for WireAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_minor(s).map(Self)
    }
}

impl Serialize for WireAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_minor(self.0))
    }
}

impl<'de> Deserialize<'de> for WireAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let WireDecimal(amount) = WireDecimal::deserialize(deserializer)?;

        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(de::Error::custom(AmountError::Negative(amount.to_string())));
        }

        decimal_to_minor(amount)
            .map(Self)
            .map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn decimal_to_minor_rounds_half_away_from_zero() -> TestResult {
        assert_eq!(decimal_to_minor(Decimal::from_str("12.345")?)?, 1235);
        assert_eq!(decimal_to_minor(Decimal::from_str("12.344")?)?, 1234);
        assert_eq!(decimal_to_minor(Decimal::from_str("7")?)?, 700);

        Ok(())
    }

    #[test]
    fn format_minor_always_has_two_places() {
        assert_eq!(format_minor(1230), "12.30");
        assert_eq!(format_minor(5), "0.05");
        assert_eq!(format_minor(0), "0.00");
    }

    #[test]
    fn parse_minor_rejects_negative_and_garbage() {
        assert!(matches!(parse_minor("-1.00"), Err(AmountError::Negative(_))));
        assert!(matches!(parse_minor("ten"), Err(AmountError::Invalid(_))));
    }

    #[test]
    fn clamp_discount_bounds_both_ends() {
        assert_eq!(clamp_discount(1500, 1000), 1000);
        assert_eq!(clamp_discount(-5, 1000), 0);
        assert_eq!(clamp_discount(200, -10), 0);
        assert_eq!(clamp_discount(200, 1000), 200);
    }

    #[test]
    fn percentage_from_points_rejects_out_of_range() {
        assert!(percentage_from_points(Decimal::from(101)).is_none());
        assert!(percentage_from_points(Decimal::from(-1)).is_none());
        assert!(percentage_from_points(Decimal::from(100)).is_some());
    }

    #[test]
    fn percent_of_minor_calculates_correctly() -> TestResult {
        let percent = percentage_from_points(Decimal::from(10)).ok_or("percentage")?;

        assert_eq!(percent_of_minor(percent, 16_000), Some(1_600));
        assert_eq!(percentage_points(percent), Decimal::from(10));

        Ok(())
    }

    #[test]
    fn percent_of_minor_overflow_returns_none() {
        let percent = Percentage::from(2.0);

        assert_eq!(percent_of_minor(percent, i64::MAX), None);
    }

    #[test]
    fn wire_amount_accepts_strings_and_numbers() -> TestResult {
        let from_string: WireAmount = serde_json::from_str("\"12.5\"")?;
        let from_number: WireAmount = serde_json::from_str("12.5")?;
        let from_integer: WireAmount = serde_json::from_str("3")?;

        assert_eq!(from_string.minor(), 1250);
        assert_eq!(from_number.minor(), 1250);
        assert_eq!(from_integer.minor(), 300);

        Ok(())
    }

    #[test]
    fn wire_amount_serialises_as_fixed_string() -> TestResult {
        let json = serde_json::to_string(&WireAmount::from_minor(1250))?;

        assert_eq!(json, "\"12.50\"");

        Ok(())
    }

    #[test]
    fn wire_amount_rejects_negative() {
        let result = serde_json::from_str::<WireAmount>("\"-0.01\"");

        assert!(result.is_err(), "negative amounts must not parse");
    }

    #[test]
    fn wire_amount_converts_to_money() {
        assert_eq!(
            WireAmount::from_minor(999).to_money(GBP),
            Money::from_minor(999, GBP)
        );
    }

    #[test]
    fn currency_lookup_is_case_insensitive() -> TestResult {
        assert_eq!(currency_from_code("gbp")?, GBP);
        assert!(matches!(
            currency_from_code("XYZ"),
            Err(AmountError::UnknownCurrency(code)) if code == "XYZ"
        ));

        Ok(())
    }
}

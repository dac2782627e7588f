//! Cart
//!
//! A [`CartSnapshot`] is an immutable read of the session's cart, rebuilt from
//! the backend on every load. Local changes are only ever optimistic
//! previews of a [`CartMutation`] until the server confirms them.

use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{discounts::DiscountError, ids::VariantId, money::AmountError};

pub mod records;
pub mod service;

pub use service::{CartsService, HttpCartsService, MockCartsService};

/// Errors related to cart lines and local cart changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// A line without a variant identifier.
    #[error("cart line is missing a variant identifier")]
    MissingVariant,

    /// A line with a zero quantity.
    #[error("quantity for {0} must be at least 1")]
    ZeroQuantity(VariantId),

    /// A line whose post-discount price is above its list price.
    #[error("final price for {0} is above its unit price")]
    FinalPriceAboveUnitPrice(VariantId),

    /// A line with a negative price.
    #[error("price for {0} must not be negative")]
    NegativePrice(VariantId),

    /// The requested quantity exceeds available stock.
    #[error("only {available} of {variant_id} left in stock, {requested} requested")]
    InsufficientStock {
        /// Variant being changed.
        variant_id: VariantId,
        /// Requested quantity.
        requested: u32,
        /// Units in stock.
        available: u32,
    },

    /// The same variant appears on two lines.
    #[error("{0} appears more than once in the cart")]
    DuplicateVariant(VariantId),

    /// The variant is not in the cart.
    #[error("{0} is not in the cart")]
    UnknownVariant(VariantId),

    /// The variant is no longer sold.
    #[error("{0} is no longer available")]
    Inactive(VariantId),

    /// A monetary field could not be parsed.
    #[error(transparent)]
    Amount(#[from] AmountError),
}

/// Availability of a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    /// The variant can be bought.
    #[default]
    Active,

    /// The variant is no longer sold; the line is excluded from totals.
    Inactive,
}

/// A single product variant entry in a cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine<'a> {
    variant_id: VariantId,
    quantity: u32,
    unit_price: Money<'a, Currency>,
    final_unit_price: Money<'a, Currency>,
    stock_available: u32,
    status: LineStatus,
}

impl<'a> CartLine<'a> {
    /// Create a new cart line.
    ///
    /// Lines may be built with more units than are in stock (the backend
    /// reports what the customer asked for), but such lines are not
    /// [sellable](Self::is_sellable).
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the variant id is blank, the quantity is zero,
    /// a price is negative, or the final price is above the unit price.
    pub fn new(
        variant_id: VariantId,
        quantity: u32,
        unit_price: Money<'a, Currency>,
        final_unit_price: Money<'a, Currency>,
        stock_available: u32,
        status: LineStatus,
    ) -> Result<Self, CartError> {
        if variant_id.is_blank() {
            return Err(CartError::MissingVariant);
        }

        if quantity == 0 {
            return Err(CartError::ZeroQuantity(variant_id));
        }

        if unit_price.to_minor_units() < 0 || final_unit_price.to_minor_units() < 0 {
            return Err(CartError::NegativePrice(variant_id));
        }

        if final_unit_price.to_minor_units() > unit_price.to_minor_units() {
            return Err(CartError::FinalPriceAboveUnitPrice(variant_id));
        }

        Ok(Self {
            variant_id,
            quantity,
            unit_price,
            final_unit_price,
            stock_available,
            status,
        })
    }

    /// Variant identifier.
    pub fn variant_id(&self) -> &VariantId {
        &self.variant_id
    }

    /// Number of units.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// List price per unit, before item-level discounts.
    pub fn unit_price(&self) -> &Money<'a, Currency> {
        &self.unit_price
    }

    /// Price per unit after catalogue discounts.
    pub fn final_unit_price(&self) -> &Money<'a, Currency> {
        &self.final_unit_price
    }

    /// Units in stock.
    pub fn stock_available(&self) -> u32 {
        self.stock_available
    }

    /// Line availability.
    pub fn status(&self) -> LineStatus {
        self.status
    }

    /// Whether the line counts towards totals.
    pub fn is_active(&self) -> bool {
        self.status == LineStatus::Active
    }

    /// Whether the line may proceed to checkout.
    pub fn is_sellable(&self) -> bool {
        self.is_active() && self.quantity <= self.stock_available
    }

    /// Line value in minor units: final unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::Overflow`] if the product does not fit.
    pub fn value_minor(&self) -> Result<i64, DiscountError> {
        self.final_unit_price
            .to_minor_units()
            .checked_mul(i64::from(self.quantity))
            .ok_or(DiscountError::Overflow)
    }

    /// The reason this line may not proceed to checkout, if any.
    pub fn checkout_blocker(&self) -> Option<CartError> {
        if !self.is_active() {
            return Some(CartError::Inactive(self.variant_id.clone()));
        }

        if self.quantity > self.stock_available {
            return Some(CartError::InsufficientStock {
                variant_id: self.variant_id.clone(),
                requested: self.quantity,
                available: self.stock_available,
            });
        }

        None
    }

    fn ensure_stock_for(&self, requested: u32) -> Result<(), CartError> {
        if requested > self.stock_available {
            return Err(CartError::InsufficientStock {
                variant_id: self.variant_id.clone(),
                requested,
                available: self.stock_available,
            });
        }

        Ok(())
    }
}

/// A change requested by the customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartMutation {
    /// Add units of a variant.
    Add {
        /// Variant to add.
        variant_id: VariantId,
        /// Units to add.
        quantity: u32,
    },

    /// Set the quantity of a variant. Zero removes the line.
    Update {
        /// Variant to change.
        variant_id: VariantId,
        /// New quantity.
        quantity: u32,
    },

    /// Remove a variant's line.
    Remove {
        /// Variant to remove.
        variant_id: VariantId,
    },

    /// Remove every line.
    Clear,
}

impl CartMutation {
    /// Short name used in logs.
    pub const fn to_str(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Update { .. } => "update",
            Self::Remove { .. } => "remove",
            Self::Clear => "clear",
        }
    }
}

/// An immutable read of a cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSnapshot<'a> {
    lines: Vec<CartLine<'a>>,
    currency: &'static Currency,
}

impl<'a> CartSnapshot<'a> {
    /// Create an empty cart.
    pub fn new(currency: &'static Currency) -> Self {
        Self {
            lines: Vec::new(),
            currency,
        }
    }

    /// Create a cart with the given lines, in order.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::DuplicateVariant`] if two lines share a variant id.
    pub fn with_lines(
        lines: impl Into<Vec<CartLine<'a>>>,
        currency: &'static Currency,
    ) -> Result<Self, CartError> {
        let lines = lines.into();

        for (idx, line) in lines.iter().enumerate() {
            let duplicated = lines
                .iter()
                .skip(idx + 1)
                .any(|other| other.variant_id == line.variant_id);

            if duplicated {
                return Err(CartError::DuplicateVariant(line.variant_id.clone()));
            }
        }

        Ok(Self { lines, currency })
    }

    /// Lines in cart order.
    pub fn lines(&self) -> &[CartLine<'a>] {
        &self.lines
    }

    /// Lines that count towards totals.
    pub fn active_lines(&self) -> impl Iterator<Item = &CartLine<'a>> {
        self.lines.iter().filter(|line| line.is_active())
    }

    /// Look up a line by variant.
    pub fn line(&self, variant_id: &VariantId) -> Option<&CartLine<'a>> {
        self.lines.iter().find(|line| &line.variant_id == variant_id)
    }

    /// Variant identifiers of every line, in cart order.
    pub fn variant_ids(&self) -> Vec<VariantId> {
        self.lines.iter().map(|line| line.variant_id.clone()).collect()
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Cart currency.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Sum of final unit price times quantity over active lines, in minor units.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::Overflow`] if the sum does not fit.
    pub fn subtotal_minor(&self) -> Result<i64, DiscountError> {
        self.active_lines().try_fold(0_i64, |acc, line| {
            acc.checked_add(line.value_minor()?)
                .ok_or(DiscountError::Overflow)
        })
    }

    /// Every reason the cart may not proceed to checkout.
    pub fn checkout_blockers(&self) -> Vec<CartError> {
        self.lines
            .iter()
            .filter_map(CartLine::checkout_blocker)
            .collect()
    }

    /// Apply a mutation locally, as an optimistic preview of the server's answer.
    ///
    /// Adding a variant that is not already in the cart fails with
    /// [`CartError::UnknownVariant`]: its prices are only known once the server
    /// responds. Removing an absent variant is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the change would exceed stock, targets an
    /// unknown or inactive variant, or adds zero units.
    pub fn apply(&mut self, mutation: &CartMutation) -> Result<(), CartError> {
        match mutation {
            CartMutation::Add {
                variant_id,
                quantity,
            } => {
                if *quantity == 0 {
                    return Err(CartError::ZeroQuantity(variant_id.clone()));
                }

                let line = self.line_mut(variant_id)?;

                if !line.is_active() {
                    return Err(CartError::Inactive(variant_id.clone()));
                }

                let requested = line.quantity.saturating_add(*quantity);

                line.ensure_stock_for(requested)?;
                line.quantity = requested;
            }
            CartMutation::Update {
                variant_id,
                quantity: 0,
            } => {
                self.line_mut(variant_id)?;
                self.lines.retain(|line| &line.variant_id != variant_id);
            }
            CartMutation::Update {
                variant_id,
                quantity,
            } => {
                let line = self.line_mut(variant_id)?;

                if *quantity > line.quantity && !line.is_active() {
                    return Err(CartError::Inactive(variant_id.clone()));
                }

                line.ensure_stock_for(*quantity)?;
                line.quantity = *quantity;
            }
            CartMutation::Remove { variant_id } => {
                self.lines.retain(|line| &line.variant_id != variant_id);
            }
            CartMutation::Clear => self.lines.clear(),
        }

        Ok(())
    }

    fn line_mut(&mut self, variant_id: &VariantId) -> Result<&mut CartLine<'a>, CartError> {
        self.lines
            .iter_mut()
            .find(|line| &line.variant_id == variant_id)
            .ok_or_else(|| CartError::UnknownVariant(variant_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use super::*;

    fn line(id: &str, quantity: u32, price: i64, stock: u32) -> Result<CartLine<'static>, CartError> {
        CartLine::new(
            VariantId::new(id),
            quantity,
            Money::from_minor(price, GBP),
            Money::from_minor(price, GBP),
            stock,
            LineStatus::Active,
        )
    }

    fn test_cart() -> Result<CartSnapshot<'static>, CartError> {
        CartSnapshot::with_lines(
            [line("tee", 2, 10_00, 5)?, line("mug", 1, 6_50, 3)?],
            GBP,
        )
    }

    #[test]
    fn new_line_rejects_final_price_above_unit_price() {
        let result = CartLine::new(
            VariantId::new("tee"),
            1,
            Money::from_minor(100, GBP),
            Money::from_minor(120, GBP),
            5,
            LineStatus::Active,
        );

        assert!(matches!(result, Err(CartError::FinalPriceAboveUnitPrice(_))));
    }

    #[test]
    fn new_line_rejects_blank_variant_and_zero_quantity() {
        assert!(matches!(line(" ", 1, 100, 1), Err(CartError::MissingVariant)));
        assert!(matches!(line("tee", 0, 100, 1), Err(CartError::ZeroQuantity(_))));
    }

    #[test]
    fn with_lines_rejects_duplicates() -> TestResult {
        let result = CartSnapshot::with_lines([line("tee", 1, 100, 5)?, line("tee", 2, 100, 5)?], GBP);

        assert!(matches!(result, Err(CartError::DuplicateVariant(id)) if id.as_str() == "tee"));

        Ok(())
    }

    #[test]
    fn subtotal_skips_inactive_lines() -> TestResult {
        let inactive = CartLine::new(
            VariantId::new("old"),
            4,
            Money::from_minor(1_000, GBP),
            Money::from_minor(1_000, GBP),
            10,
            LineStatus::Inactive,
        )?;

        let cart = CartSnapshot::with_lines([line("tee", 2, 10_00, 5)?, inactive], GBP)?;

        assert_eq!(cart.subtotal_minor()?, 20_00);

        Ok(())
    }

    #[test]
    fn add_increases_existing_line() -> TestResult {
        let mut cart = test_cart()?;

        cart.apply(&CartMutation::Add {
            variant_id: VariantId::new("tee"),
            quantity: 2,
        })?;

        assert_eq!(cart.line(&VariantId::new("tee")).map(CartLine::quantity), Some(4));

        Ok(())
    }

    #[test]
    fn add_beyond_stock_is_rejected_and_leaves_cart_untouched() -> TestResult {
        let mut cart = test_cart()?;
        let before = cart.clone();

        let result = cart.apply(&CartMutation::Add {
            variant_id: VariantId::new("mug"),
            quantity: 3,
        });

        assert!(matches!(
            result,
            Err(CartError::InsufficientStock { requested: 4, available: 3, .. })
        ));
        assert_eq!(cart, before);

        Ok(())
    }

    #[test]
    fn add_unknown_variant_needs_the_server() -> TestResult {
        let mut cart = test_cart()?;

        let result = cart.apply(&CartMutation::Add {
            variant_id: VariantId::new("hat"),
            quantity: 1,
        });

        assert!(matches!(result, Err(CartError::UnknownVariant(_))));

        Ok(())
    }

    #[test]
    fn update_to_zero_removes_line() -> TestResult {
        let mut cart = test_cart()?;

        cart.apply(&CartMutation::Update {
            variant_id: VariantId::new("tee"),
            quantity: 0,
        })?;

        assert_eq!(cart.len(), 1);
        assert!(cart.line(&VariantId::new("tee")).is_none());

        Ok(())
    }

    #[test]
    fn remove_absent_variant_is_a_no_op() -> TestResult {
        let mut cart = test_cart()?;

        cart.apply(&CartMutation::Remove {
            variant_id: VariantId::new("hat"),
        })?;

        assert_eq!(cart.len(), 2);

        Ok(())
    }

    #[test]
    fn clear_empties_the_cart() -> TestResult {
        let mut cart = test_cart()?;

        cart.apply(&CartMutation::Clear)?;

        assert!(cart.is_empty());

        Ok(())
    }

    #[test]
    fn checkout_blockers_report_over_stock_and_inactive_lines() -> TestResult {
        let inactive = CartLine::new(
            VariantId::new("old"),
            1,
            Money::from_minor(1_000, GBP),
            Money::from_minor(1_000, GBP),
            10,
            LineStatus::Inactive,
        )?;

        let cart = CartSnapshot::with_lines([line("tee", 6, 10_00, 5)?, inactive, line("mug", 1, 100, 1)?], GBP)?;

        let blockers = cart.checkout_blockers();

        assert_eq!(blockers.len(), 2);
        assert!(matches!(blockers.first(), Some(CartError::InsufficientStock { .. })));
        assert!(matches!(blockers.get(1), Some(CartError::Inactive(_))));

        Ok(())
    }
}

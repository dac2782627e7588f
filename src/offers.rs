//! Offers
//!
//! Automatic store-wide or variant-scoped discounts. Each cart line gets at
//! most one offer: whichever takes the most off.

use rustc_hash::FxHashSet;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};

use crate::{
    cart::CartLine,
    discounts::{Discount, DiscountError, DiscountType},
    ids::VariantId,
    money::{WireDecimal, clamp_discount},
};

/// A promotional offer.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer<'a> {
    discount: Discount<'a>,
    applicable_variants: FxHashSet<VariantId>,
}

impl<'a> Offer<'a> {
    /// Create an offer scoped to the given variants. An empty set applies to
    /// every line.
    pub fn new(discount: Discount<'a>, applicable_variants: impl IntoIterator<Item = VariantId>) -> Self {
        Self {
            discount,
            applicable_variants: applicable_variants.into_iter().collect(),
        }
    }

    /// Create an offer that applies to every line.
    pub fn store_wide(discount: Discount<'a>) -> Self {
        Self::new(discount, [])
    }

    /// The discount this offer grants.
    pub fn discount(&self) -> &Discount<'a> {
        &self.discount
    }

    /// Variants the offer is limited to; empty means all.
    pub fn applicable_variants(&self) -> &FxHashSet<VariantId> {
        &self.applicable_variants
    }

    /// Whether the offer applies to the given variant.
    pub fn applies_to(&self, variant_id: &VariantId) -> bool {
        self.applicable_variants.is_empty() || self.applicable_variants.contains(variant_id)
    }
}

/// The discount a single line receives from offers.
#[derive(Debug, Clone, PartialEq)]
pub struct LineDiscount<'a> {
    variant_id: VariantId,
    amount: Money<'a, Currency>,
    offer: Option<usize>,
}

impl<'a> LineDiscount<'a> {
    /// The discounted line's variant.
    pub fn variant_id(&self) -> &VariantId {
        &self.variant_id
    }

    /// Amount taken off the line.
    pub fn amount(&self) -> &Money<'a, Currency> {
        &self.amount
    }

    /// Index into the offer slice of the offer that was applied, if any.
    pub fn offer(&self) -> Option<usize> {
        self.offer
    }
}

/// Pick the best applicable offer for a line and compute its discount.
///
/// Percentages apply to the line value (final unit price times quantity);
/// fixed amounts are taken once per unit. The largest discount wins, with the
/// earliest offer kept on ties, and the result is clamped to the line value so
/// a line can never go negative.
///
/// # Errors
///
/// Returns a [`DiscountError`] if the line value or a candidate discount
/// cannot be represented.
pub fn resolve_line_discount<'a>(
    line: &CartLine<'a>,
    offers: &[Offer<'_>],
) -> Result<LineDiscount<'a>, DiscountError> {
    let line_value = line.value_minor()?;
    let units = i64::from(line.quantity());

    let mut best: Option<(usize, i64)> = None;

    for (idx, offer) in offers.iter().enumerate() {
        if !offer.applies_to(line.variant_id()) {
            continue;
        }

        let amount = offer.discount().amount_off(line_value, units)?;

        if best.is_none_or(|(_, best_amount)| amount > best_amount) {
            best = Some((idx, amount));
        }
    }

    let (offer, amount) = match best {
        Some((idx, amount)) => (Some(idx), clamp_discount(amount, line_value)),
        None => (None, 0),
    };

    Ok(LineDiscount {
        variant_id: line.variant_id().clone(),
        amount: Money::from_minor(amount, line.final_unit_price().currency()),
        offer,
    })
}

/// An offer on the wire and in fixture files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferRecord {
    /// Percentage or fixed amount.
    pub discount_type: DiscountType,
    /// Percentage points (0 to 100) or amount, depending on the type.
    pub discount_value: WireDecimal,
    /// Variants the offer is limited to; empty means all.
    #[serde(default)]
    pub applicable_variants: Vec<VariantId>,
}

impl OfferRecord {
    /// Validate the record and build an offer.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscountError`] for an out of range percentage or a negative
    /// amount.
    pub fn into_offer(self, currency: &'static Currency) -> Result<Offer<'static>, DiscountError> {
        let discount = Discount::from_wire(self.discount_type, self.discount_value.0, currency)?;

        Ok(Offer::new(discount, self.applicable_variants))
    }
}

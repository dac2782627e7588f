//! Cart Records
//!
//! Wire schemas for the `/cart` endpoints.

use rusty_money::iso::Currency;
use serde::{Deserialize, Serialize};

use crate::{
    cart::{CartError, CartLine, CartSnapshot, LineStatus},
    ids::VariantId,
    money::WireAmount,
};

/// Cart as returned by `GET /cart`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRecord {
    /// Lines in cart order.
    pub items: Vec<CartLineRecord>,
}

/// A single cart line on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRecord {
    /// Variant identifier.
    pub variant_id: VariantId,
    /// Number of units.
    pub quantity: u32,
    /// Price before item-level discounts.
    pub unit_price: WireAmount,
    /// Price after item-level discounts.
    pub final_unit_price: WireAmount,
    /// Units in stock.
    pub stock_available: u32,
    /// Availability.
    #[serde(default)]
    pub status: LineStatus,
}

impl CartRecord {
    /// Validate the record and build a snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] for the first line that violates the cart
    /// invariants.
    pub fn into_snapshot(self, currency: &'static Currency) -> Result<CartSnapshot<'static>, CartError> {
        let lines = self
            .items
            .into_iter()
            .map(|record| record.into_line(currency))
            .collect::<Result<Vec<_>, _>>()?;

        CartSnapshot::with_lines(lines, currency)
    }
}

impl CartLineRecord {
    /// Validate the record and build a cart line.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the line violates the cart invariants.
    pub fn into_line(self, currency: &'static Currency) -> Result<CartLine<'static>, CartError> {
        CartLine::new(
            self.variant_id,
            self.quantity,
            self.unit_price.to_money(currency),
            self.final_unit_price.to_money(currency),
            self.stock_available,
            self.status,
        )
    }
}

impl From<&CartLine<'_>> for CartLineRecord {
    fn from(line: &CartLine<'_>) -> Self {
        Self {
            variant_id: line.variant_id().clone(),
            quantity: line.quantity(),
            unit_price: WireAmount::from_money(line.unit_price()),
            final_unit_price: WireAmount::from_money(line.final_unit_price()),
            stock_available: line.stock_available(),
            status: line.status(),
        }
    }
}

/// Response to a cart mutation: either the updated cart or a bare message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CartMutationResponse {
    /// The updated cart.
    Cart(CartRecord),

    /// A confirmation message without the cart.
    Message {
        /// Server message.
        message: String,
    },
}

/// Body of `POST /cart/add` and `PUT /cart/update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    /// Variant identifier.
    pub variant_id: VariantId,
    /// Requested quantity.
    pub quantity: u32,
}

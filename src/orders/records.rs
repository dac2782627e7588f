//! Order Records
//!
//! Wire schemas for `POST /orders`.

use serde::{Deserialize, Serialize};

use crate::{
    ids::{AddressId, OrderId, VariantId},
    money::WireAmount,
};

/// The canonical order sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    /// Delivery address.
    pub address_id: AddressId,
    /// Ordered lines.
    pub items: Vec<OrderItemRecord>,
    /// Sum of line prices times quantities.
    pub subtotal: WireAmount,
    /// Delivery fee.
    pub delivery_fee: WireAmount,
    /// Tax.
    pub tax_amount: WireAmount,
    /// Offer and coupon discounts combined.
    pub discount_amount: WireAmount,
    /// Amount payable.
    pub total_amount: WireAmount,
    /// Applied coupon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

/// One ordered line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRecord {
    /// Variant ordered.
    pub variant_id: VariantId,
    /// Units ordered.
    pub quantity: i64,
    /// Price per unit.
    pub price: WireAmount,
}

/// Response of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedRecord {
    /// Server-assigned identifier.
    #[serde(default)]
    pub order_id: Option<OrderId>,
    /// Message for the customer.
    #[serde(default)]
    pub message: Option<String>,
}

/// An order accepted by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCreated {
    /// Server-assigned identifier.
    pub order_id: OrderId,
    /// Message for the customer.
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn order_request_serialises_two_place_strings() -> TestResult {
        let request = OrderRequest {
            address_id: AddressId::new("addr-1"),
            items: vec![OrderItemRecord {
                variant_id: VariantId::new("tee"),
                quantity: 2,
                price: WireAmount::from_minor(80_00),
            }],
            subtotal: WireAmount::from_minor(160_00),
            delivery_fee: WireAmount::from_minor(40_00),
            tax_amount: WireAmount::from_minor(0),
            discount_amount: WireAmount::from_minor(16_00),
            total_amount: WireAmount::from_minor(184_00),
            coupon_code: None,
        };

        assert_eq!(
            serde_json::to_value(&request)?,
            serde_json::json!({
                "addressId": "addr-1",
                "items": [{ "variantId": "tee", "quantity": 2, "price": "80.00" }],
                "subtotal": "160.00",
                "deliveryFee": "40.00",
                "taxAmount": "0.00",
                "discountAmount": "16.00",
                "totalAmount": "184.00"
            })
        );

        Ok(())
    }

    #[test]
    fn created_record_tolerates_missing_fields() -> TestResult {
        let record: OrderCreatedRecord = serde_json::from_str(r#"{"message":"Order placed"}"#)?;

        assert_eq!(record.order_id, None);
        assert_eq!(record.message.as_deref(), Some("Order placed"));

        Ok(())
    }
}

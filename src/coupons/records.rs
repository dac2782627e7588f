//! Coupon Records
//!
//! Wire schemas for the `/coupons` endpoints.

use jiff::Timestamp;
use rusty_money::iso::Currency;
use serde::{Deserialize, Serialize};

use crate::{
    coupons::{Coupon, RejectionReason},
    discounts::{Discount, DiscountError, DiscountType},
    ids::VariantId,
    money::{WireAmount, WireDecimal},
};

/// A coupon as returned by `GET /coupons/active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponRecord {
    /// Coupon code.
    pub code: String,
    /// Percentage or fixed amount.
    pub discount_type: DiscountType,
    /// Percentage points (0 to 100) or amount.
    pub discount_value: WireDecimal,
    /// Minimum pre-coupon order total.
    #[serde(default)]
    pub min_order_amount: Option<WireAmount>,
    /// Cap on a percentage discount.
    #[serde(default)]
    pub max_discount_amount: Option<WireAmount>,
    /// Per-customer redemption limit.
    #[serde(default)]
    pub usage_limit_per_user: Option<u32>,
    /// Eligible variants; empty means all.
    #[serde(default)]
    pub applicable_variants: Vec<VariantId>,
    /// Start of the active window.
    #[serde(default)]
    pub active_from: Option<Timestamp>,
    /// End of the active window.
    #[serde(default)]
    pub active_to: Option<Timestamp>,
    /// Whether the coupon is enabled. Missing means enabled.
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl CouponRecord {
    /// Validate the record and build a coupon.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscountError`] for an out of range percentage or a negative
    /// amount.
    pub fn into_coupon(self, currency: &'static Currency) -> Result<Coupon<'static>, DiscountError> {
        let discount = Discount::from_wire(self.discount_type, self.discount_value.0, currency)?;

        let mut coupon = Coupon::new(&self.code, discount)
            .with_variants(self.applicable_variants)
            .with_window(self.active_from, self.active_to);

        if let Some(minimum) = self.min_order_amount {
            coupon = coupon.with_minimum(minimum.to_money(currency));
        }

        if let Some(max) = self.max_discount_amount {
            coupon = coupon.with_max_discount(max.to_money(currency));
        }

        if let Some(limit) = self.usage_limit_per_user {
            coupon = coupon.with_usage_limit(limit);
        }

        if self.is_active == Some(false) {
            coupon = coupon.inactive();
        }

        Ok(coupon)
    }
}

/// Body of `POST /coupons/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    /// Normalised code.
    pub code: String,
    /// Variants currently in the cart.
    pub variant_ids: Vec<VariantId>,
    /// Pre-coupon order total.
    pub order_total: WireAmount,
}

/// Response of `POST /coupons/validate`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidationRecord {
    /// Whether the coupon applies.
    pub valid: bool,
    /// The validated coupon, present when valid.
    #[serde(default)]
    pub coupon: Option<CouponRecord>,
    /// Discount granted, present when valid.
    #[serde(default)]
    pub discount_amount: Option<WireAmount>,
    /// Rejection code, present when invalid.
    #[serde(default)]
    pub reason: Option<String>,
    /// Message for the customer.
    #[serde(default)]
    pub message: Option<String>,
}

impl CouponValidationRecord {
    /// Typed rejection reason. Missing or unknown codes map to
    /// [`RejectionReason::NotApplicable`].
    pub fn rejection_reason(&self) -> RejectionReason {
        self.reason
            .as_deref()
            .map_or(RejectionReason::NotApplicable, RejectionReason::from_code)
    }
}

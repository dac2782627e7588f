//! Storefront checkout prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{CartError, CartLine, CartMutation, CartSnapshot, CartsService, HttpCartsService, LineStatus},
    coupons::{
        AppliedCoupon, CatalogueCouponValidator, Coupon, CouponError, CouponRejection, CouponRequest,
        CouponValidator, HttpCouponValidator, RejectionReason, evaluate_coupon,
    },
    discounts::{Discount, DiscountError, DiscountType},
    http::{ApiClient, ApiError},
    ids::{AddressId, OrderId, VariantId},
    offers::{LineDiscount, Offer, resolve_line_discount},
    orders::{
        CheckoutLine, CheckoutRequest, HttpOrdersService, OrderConfirmation, OrderPipeline, OrderRejection,
        OrdersService, ValidationErrors,
    },
    session::{CartSession, SessionError, SyncState},
    store::{FileStore, KeyValueStore, MemoryStore},
    totals::{CartTotals, PricingRules, calculate_totals},
};

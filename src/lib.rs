//! Storefront Checkout
//!
//! Cart pricing, coupon resolution and order submission for a retail
//! storefront. Amounts are computed in integer minor units; the backend stays
//! authoritative for prices, stock and the accepted order.

pub mod cart;
pub mod config;
pub mod coupons;
pub mod discounts;
pub mod fixtures;
pub mod http;
pub mod ids;
pub mod money;
pub mod observability;
pub mod offers;
pub mod orders;
pub mod prelude;
pub mod session;
pub mod store;
pub mod totals;

//! Order submission pipeline.

use std::{fmt, sync::Arc};

use rusty_money::{Money, iso::Currency};
use thiserror::Error;
use tracing::{Span, debug, info, warn};

use crate::{
    discounts::DiscountError,
    http::ApiError,
    ids::OrderId,
    orders::{
        CheckoutRequest, OrderValidationError, OrdersService, ValidationErrors,
        records::{OrderItemRecord, OrderRequest},
        validate,
    },
    money::WireAmount,
};

/// Where a checkout attempt is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    /// Received, not yet checked.
    Draft,

    /// Being validated.
    Validating,

    /// Validated and recomputed.
    Transformed,

    /// Sent to the backend.
    Submitted,

    /// Accepted by the backend.
    Accepted,

    /// Refused, either locally or by the backend.
    Rejected,
}

impl OrderState {
    /// Name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Validating => "validating",
            Self::Transformed => "transformed",
            Self::Submitted => "submitted",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a checkout attempt was refused.
#[derive(Debug, Error)]
pub enum OrderRejection {
    /// The request failed validation; nothing was sent.
    #[error("order cannot be placed:\n{0}")]
    Validation(ValidationErrors),

    /// An amount could not be represented; nothing was sent.
    #[error(transparent)]
    Arithmetic(#[from] DiscountError),

    /// The backend refused the order or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl OrderRejection {
    /// The stage the attempt failed in.
    pub fn stage(&self) -> OrderState {
        match self {
            Self::Validation(_) => OrderState::Validating,
            Self::Arithmetic(_) => OrderState::Transformed,
            Self::Api(_) => OrderState::Submitted,
        }
    }
}

impl From<ValidationErrors> for OrderRejection {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// The client's total compared with the recomputed one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciliation<'a> {
    client_total: Option<Money<'a, Currency>>,
    recomputed_total: Money<'a, Currency>,
}

impl<'a> Reconciliation<'a> {
    /// Total the client displayed, if it sent one.
    pub fn client_total(&self) -> Option<&Money<'a, Currency>> {
        self.client_total.as_ref()
    }

    /// Total that will be charged.
    pub fn recomputed_total(&self) -> &Money<'a, Currency> {
        &self.recomputed_total
    }

    /// Whether the client's total disagreed and was discarded.
    pub fn is_stale(&self) -> bool {
        self.client_total
            .is_some_and(|client| client.to_minor_units() != self.recomputed_total.to_minor_units())
    }
}

/// A validated order ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedOrder<'a> {
    request: OrderRequest,
    reconciliation: Reconciliation<'a>,
}

impl<'a> PreparedOrder<'a> {
    /// The canonical order.
    pub fn request(&self) -> &OrderRequest {
        &self.request
    }

    /// How the recomputed total compares with the client's.
    pub fn reconciliation(&self) -> &Reconciliation<'a> {
        &self.reconciliation
    }

    /// Take the canonical order.
    pub fn into_request(self) -> OrderRequest {
        self.request
    }
}

/// An order accepted by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    /// Server-assigned identifier.
    pub order_id: OrderId,
    /// Message for the customer.
    pub message: Option<String>,
    /// The order as sent.
    pub request: OrderRequest,
}

/// Recompute every monetary field of a checkout request.
///
/// The subtotal is rebuilt from the lines. Fees, tax and discount default to
/// zero and are clamped to be non-negative, and the total is
/// `subtotal + delivery fee + tax - discount`, never below zero. A client total
/// that disagrees is discarded in favour of the recomputed one.
///
/// # Errors
///
/// Returns [`OrderRejection::Validation`] if no address is set, or
/// [`OrderRejection::Arithmetic`] if an amount does not fit.
pub fn transform<'a>(
    request: &CheckoutRequest<'_>,
    currency: &'a Currency,
) -> Result<PreparedOrder<'a>, OrderRejection> {
    let address_id = request
        .address_id
        .clone()
        .filter(|id| !id.is_blank())
        .ok_or_else(|| ValidationErrors(vec![OrderValidationError::MissingAddress]))?;

    let subtotal = request.lines.iter().try_fold(0_i64, |acc, line| {
        line.price
            .to_minor_units()
            .max(0)
            .checked_mul(line.quantity.max(0))
            .and_then(|value| acc.checked_add(value))
            .ok_or(DiscountError::Overflow)
    })?;

    let delivery_fee = non_negative_minor(request.delivery_fee.as_ref());
    let tax_amount = non_negative_minor(request.tax_amount.as_ref());
    let discount_amount = non_negative_minor(request.discount_amount.as_ref());

    let total_amount = subtotal
        .checked_add(delivery_fee)
        .and_then(|total| total.checked_add(tax_amount))
        .map(|total| total.saturating_sub(discount_amount).max(0))
        .ok_or(DiscountError::Overflow)?;

    let reconciliation = Reconciliation {
        client_total: request.client_total.map(|total| Money::from_minor(total.to_minor_units(), currency)),
        recomputed_total: Money::from_minor(total_amount, currency),
    };

    if reconciliation.is_stale() {
        warn!(
            client_total = ?reconciliation.client_total().map(Money::to_minor_units),
            recomputed_total = total_amount,
            "discarding stale client total"
        );
    }

    let items = request
        .lines
        .iter()
        .map(|line| OrderItemRecord {
            variant_id: line.variant_id.clone(),
            quantity: line.quantity,
            price: WireAmount::from_money(&line.price),
        })
        .collect();

    Ok(PreparedOrder {
        request: OrderRequest {
            address_id,
            items,
            subtotal: WireAmount::from_minor(subtotal),
            delivery_fee: WireAmount::from_minor(delivery_fee),
            tax_amount: WireAmount::from_minor(tax_amount),
            discount_amount: WireAmount::from_minor(discount_amount),
            total_amount: WireAmount::from_minor(total_amount),
            coupon_code: request.coupon_code.clone(),
        },
        reconciliation,
    })
}

fn non_negative_minor(amount: Option<&Money<'_, Currency>>) -> i64 {
    amount.map_or(0, |amount| amount.to_minor_units().max(0))
}

/// Validates, recomputes and submits orders.
///
/// Each call makes at most one network attempt; a refused order must be
/// resubmitted by the caller.
#[derive(Clone)]
pub struct OrderPipeline {
    orders: Arc<dyn OrdersService>,
    currency: &'static Currency,
}

impl fmt::Debug for OrderPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderPipeline")
            .field("currency", &self.currency.iso_alpha_code)
            .finish_non_exhaustive()
    }
}

impl OrderPipeline {
    /// Create a pipeline over the given order service.
    pub fn new(orders: Arc<dyn OrdersService>, currency: &'static Currency) -> Self {
        Self { orders, currency }
    }

    /// Validate and recompute a request without sending it.
    ///
    /// # Errors
    ///
    /// Returns [`OrderRejection::Validation`] listing every problem, or
    /// [`OrderRejection::Arithmetic`] if an amount does not fit.
    pub fn prepare(&self, request: &CheckoutRequest<'_>) -> Result<PreparedOrder<'static>, OrderRejection> {
        let span = Span::current();

        enter(&span, OrderState::Validating);
        validate(request)?;

        let prepared = transform(request, self.currency)?;
        enter(&span, OrderState::Transformed);

        Ok(prepared)
    }

    /// Validate, recompute and submit a request.
    ///
    /// # Errors
    ///
    /// Returns an [`OrderRejection`] if the request is invalid or the backend
    /// refuses it. Invalid requests never reach the network.
    #[tracing::instrument(
        name = "orders.pipeline.submit",
        skip(self, request),
        fields(state = tracing::field::Empty, order_id = tracing::field::Empty),
        err
    )]
    pub async fn submit(&self, request: &CheckoutRequest<'_>) -> Result<OrderConfirmation, OrderRejection> {
        let span = Span::current();

        enter(&span, OrderState::Draft);

        let prepared = self.prepare(request).inspect_err(|_error| enter(&span, OrderState::Rejected))?;
        let request = prepared.into_request();

        enter(&span, OrderState::Submitted);

        match self.orders.create_order(request.clone()).await {
            Ok(created) => {
                enter(&span, OrderState::Accepted);
                span.record("order_id", tracing::field::display(&created.order_id));

                info!(order_id = %created.order_id, total = %request.total_amount, "order accepted");

                Ok(OrderConfirmation {
                    order_id: created.order_id,
                    message: created.message,
                    request,
                })
            }
            Err(error) => {
                enter(&span, OrderState::Rejected);

                Err(error.into())
            }
        }
    }
}

fn enter(span: &Span, state: OrderState) {
    span.record("state", state.as_str());

    debug!(state = state.as_str(), "order state changed");
}

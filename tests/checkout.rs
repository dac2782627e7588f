//! Checkout from a synced cart session through the order pipeline.

use std::sync::Arc;

use decimal_percentage::Percentage;
use jiff::Timestamp;
use reqwest::StatusCode;
use rusty_money::{
    Money,
    iso::{Currency, GBP},
};
use testresult::TestResult;

use storefront_checkout::{
    cart::{CartLine, CartSnapshot, LineStatus, MockCartsService},
    coupons::{Coupon, MockCouponValidator, evaluate_coupon},
    discounts::Discount,
    http::ApiError,
    ids::{AddressId, OrderId, VariantId},
    money::WireAmount,
    offers::Offer,
    orders::{
        CheckoutRequest, LineProblem, MockOrdersService, OrderPipeline, OrderRejection, OrderState,
        OrderValidationError, records::OrderCreated,
    },
    session::CartSession,
    store::MemoryStore,
    totals::PricingRules,
};

fn gbp(minor: i64) -> Money<'static, Currency> {
    Money::from_minor(minor, GBP)
}

async fn loaded_session() -> TestResult<CartSession> {
    let lines = vec![
        CartLine::new(VariantId::new("tee"), 2, gbp(100_00), gbp(80_00), 10, LineStatus::Active)?,
        CartLine::new(VariantId::new("hoodie"), 1, gbp(240_00), gbp(240_00), 3, LineStatus::Active)?,
    ];
    let server_cart = CartSnapshot::with_lines(lines, GBP)?;

    let mut carts = MockCartsService::new();
    carts.expect_get_cart().once().return_once(move || Ok(server_cart));

    let catalogue = vec![Coupon::new("HOODIE10", Discount::AmountOff(gbp(10_00))).with_variants([VariantId::new("hoodie")])];

    let mut coupons = MockCouponValidator::new();
    coupons
        .expect_validate_coupon()
        .once()
        .returning(move |request| evaluate_coupon(&catalogue, &request, Timestamp::now()));

    let offers = vec![Offer::new(
        Discount::PercentageOff(Percentage::from(0.10)),
        [VariantId::new("tee")],
    )];

    let mut session = CartSession::new(
        Arc::new(carts),
        Arc::new(coupons),
        Box::new(MemoryStore::new()),
        offers,
        PricingRules::new(gbp(500_00), gbp(40_00)),
        GBP,
    );

    session.load().await?;
    session.apply_coupon("HOODIE10").await?;

    Ok(session)
}

#[tokio::test]
async fn session_totals_become_the_submitted_order() -> TestResult {
    let session = loaded_session().await?;

    let request = session
        .checkout_request(Some(AddressId::new("home")))?
        .with_tax(gbp(20_00))?;

    assert_eq!(request.client_total, Some(gbp(434_00)));

    let mut orders = MockOrdersService::new();
    orders
        .expect_create_order()
        .once()
        .withf(|order| {
            order.subtotal == WireAmount::from_minor(400_00)
                && order.discount_amount == WireAmount::from_minor(26_00)
                && order.delivery_fee == WireAmount::from_minor(40_00)
                && order.tax_amount == WireAmount::from_minor(20_00)
                && order.total_amount == WireAmount::from_minor(434_00)
                && order.coupon_code.as_deref() == Some("HOODIE10")
                && order.items.len() == 2
        })
        .return_once(|_| {
            Ok(OrderCreated {
                order_id: OrderId::new("ord-7"),
                message: Some("Thanks for your order".to_string()),
            })
        });

    let confirmation = OrderPipeline::new(Arc::new(orders), GBP).submit(&request).await?;

    assert_eq!(confirmation.order_id, OrderId::new("ord-7"));
    assert_eq!(confirmation.message.as_deref(), Some("Thanks for your order"));

    Ok(())
}

#[tokio::test]
async fn invalid_request_is_rejected_before_the_network() -> TestResult {
    let session = loaded_session().await?;

    let mut request = session.checkout_request(None)?;
    if let Some(line) = request.lines.first_mut() {
        line.quantity = 0;
    }

    let mut orders = MockOrdersService::new();
    orders.expect_create_order().never();

    let errors = match OrderPipeline::new(Arc::new(orders), GBP).submit(&request).await {
        Err(OrderRejection::Validation(errors)) => errors,
        other => return Err(format!("expected a validation rejection, got {other:?}").into()),
    };

    assert_eq!(errors.len(), 2);
    assert!(errors.contains(&OrderValidationError::MissingAddress));
    assert!(errors.contains(&OrderValidationError::InvalidLine {
        index: 0,
        variant_id: VariantId::new("tee"),
        problem: LineProblem::NonPositiveQuantity(0),
    }));

    Ok(())
}

#[tokio::test]
async fn stale_cart_is_reported_at_submission() -> TestResult {
    let session = loaded_session().await?;
    let request = session.checkout_request(Some(AddressId::new("home")))?;

    let mut orders = MockOrdersService::new();
    orders.expect_create_order().once().return_once(|_| {
        Err(ApiError::StaleCart {
            message: "prices changed".to_string(),
        })
    });

    let rejection = match OrderPipeline::new(Arc::new(orders), GBP).submit(&request).await {
        Err(rejection) => rejection,
        Ok(confirmation) => return Err(format!("unexpected confirmation {confirmation:?}").into()),
    };

    assert_eq!(rejection.stage(), OrderState::Submitted);
    assert!(matches!(rejection, OrderRejection::Api(ApiError::StaleCart { .. })));

    Ok(())
}

#[test]
fn empty_checkout_lists_every_problem() {
    let result = storefront_checkout::orders::validate(&CheckoutRequest::default());

    assert_eq!(result.map_err(|errors| errors.len()), Err(2));
}

#[test]
fn server_errors_keep_their_status() {
    let error = storefront_checkout::http::classify(StatusCode::INTERNAL_SERVER_ERROR, "boom");

    assert!(matches!(error, ApiError::Server { message, .. } if message == "boom"));
}

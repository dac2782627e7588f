//! Coupon validators.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use reqwest::Method;
use rusty_money::{Money, iso::Currency};
use tracing::debug;

use crate::{
    coupons::{
        AppliedCoupon, Coupon, CouponError, CouponRejection, CouponRequest, RejectionReason,
        evaluate_coupon, normalize_code,
        records::{CouponRecord, CouponValidationRecord, ValidateCouponRequest},
    },
    http::{ApiClient, ApiError},
    money::{WireAmount, clamp_discount},
};

/// Validates coupons through `POST /coupons/validate`.
#[derive(Debug, Clone)]
pub struct HttpCouponValidator {
    api: ApiClient,
    currency: &'static Currency,
}

impl HttpCouponValidator {
    /// Create a new validator over the given client.
    #[must_use]
    pub fn new(api: ApiClient, currency: &'static Currency) -> Self {
        Self { api, currency }
    }

    fn outcome_from(
        &self,
        request: &CouponRequest<'_>,
        record: CouponValidationRecord,
    ) -> Result<AppliedCoupon<'static>, CouponError> {
        let code = normalize_code(&request.code);

        if !record.valid {
            let reason = record.rejection_reason();
            let message = record
                .message
                .unwrap_or_else(|| format!("Coupon {code} cannot be applied ({reason})"));

            return Err(CouponRejection::new(reason, message).into());
        }

        let coupon = record
            .coupon
            .ok_or_else(|| ApiError::UnexpectedResponse("valid coupon without details".to_string()))?
            .into_coupon(self.currency)?;

        let discount = record
            .discount_amount
            .ok_or_else(|| ApiError::UnexpectedResponse("valid coupon without discount".to_string()))?;

        let order_total = request.order_total.to_minor_units();
        let discount = clamp_discount(discount.minor(), order_total);

        let message = record
            .message
            .unwrap_or_else(|| format!("Coupon {} applied: {}", coupon.code(), coupon.discount().describe()));

        Ok(AppliedCoupon::new(
            coupon,
            Money::from_minor(discount, self.currency),
            message,
        ))
    }
}

#[async_trait]
impl CouponValidator for HttpCouponValidator {
    #[tracing::instrument(
        name = "coupons.service.validate_coupon",
        skip(self, request),
        fields(code = %request.code, validator = "server"),
        err
    )]
    async fn validate_coupon(
        &self,
        request: CouponRequest<'static>,
    ) -> Result<AppliedCoupon<'static>, CouponError> {
        let body = ValidateCouponRequest {
            code: normalize_code(&request.code),
            variant_ids: request.variant_ids.clone(),
            order_total: WireAmount::from_money(&request.order_total),
        };

        let record: CouponValidationRecord = self
            .api
            .send(Method::POST, &["coupons", "validate"], &body)
            .await
            .map_err(rejection_from)?;

        self.outcome_from(&request, record)
    }
}

/// Map a validate endpoint failure onto the coupon taxonomy.
///
/// A 404 means the code is unknown. Any other 4xx is a refusal carrying the
/// server message. Everything else stays an API error.
fn rejection_from(error: ApiError) -> CouponError {
    match error {
        ApiError::NotFound { message } => CouponRejection::new(RejectionReason::NotFound, message).into(),
        ApiError::Rejected { message, .. } => {
            CouponRejection::new(RejectionReason::NotApplicable, message).into()
        }
        error => error.into(),
    }
}

/// Validates coupons locally against the active coupon catalogue.
#[derive(Debug, Clone)]
pub struct CatalogueCouponValidator {
    api: ApiClient,
    currency: &'static Currency,
}

impl CatalogueCouponValidator {
    /// Create a new validator over the given client.
    #[must_use]
    pub fn new(api: ApiClient, currency: &'static Currency) -> Self {
        Self { api, currency }
    }

    async fn active_coupons(&self) -> Result<Vec<Coupon<'static>>, CouponError> {
        let records: Vec<CouponRecord> = self.api.get(&["coupons", "active"]).await?;

        let coupons = records
            .into_iter()
            .map(|record| record.into_coupon(self.currency))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = coupons.len(), "loaded active coupons");

        Ok(coupons)
    }
}

#[async_trait]
impl CouponValidator for CatalogueCouponValidator {
    #[tracing::instrument(
        name = "coupons.service.validate_coupon",
        skip(self, request),
        fields(code = %request.code, validator = "catalogue"),
        err
    )]
    async fn validate_coupon(
        &self,
        request: CouponRequest<'static>,
    ) -> Result<AppliedCoupon<'static>, CouponError> {
        let coupons = self.active_coupons().await?;

        evaluate_coupon(&coupons, &request, Timestamp::now())
    }
}

#[automock]
#[async_trait]
pub trait CouponValidator: Send + Sync {
    /// Check a coupon against the cart's variants and pre-coupon total.
    ///
    /// Calling this twice with the same inputs yields the same outcome.
    async fn validate_coupon(
        &self,
        request: CouponRequest<'static>,
    ) -> Result<AppliedCoupon<'static>, CouponError>;
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use crate::{http::classify, ids::VariantId};

    use super::*;

    fn validator() -> Result<HttpCouponValidator, ApiError> {
        Ok(HttpCouponValidator::new(
            ApiClient::new("https://shop.example.com", None)?,
            GBP,
        ))
    }

    fn request(total: i64) -> CouponRequest<'static> {
        CouponRequest {
            code: "save10".to_string(),
            variant_ids: vec![VariantId::new("tee")],
            order_total: Money::from_minor(total, GBP),
        }
    }

    #[test]
    fn valid_response_is_clamped_to_order_total() -> TestResult {
        let record: CouponValidationRecord = serde_json::from_str(
            r#"{
                "valid": true,
                "coupon": {"code": "SAVE10", "discountType": "FLAT", "discountValue": "10.00"},
                "discountAmount": "10.00",
                "message": "Coupon applied"
            }"#,
        )?;

        let applied = validator()?.outcome_from(&request(6_00), record)?;

        assert_eq!(applied.discount_amount(), &Money::from_minor(6_00, GBP));
        assert_eq!(applied.message(), "Coupon applied");

        Ok(())
    }

    #[test]
    fn invalid_response_is_a_rejection() -> TestResult {
        let record: CouponValidationRecord =
            serde_json::from_str(r#"{"valid":false,"reason":"OUT_OF_WINDOW"}"#)?;

        let result = validator()?.outcome_from(&request(50_00), record);

        let rejection = match result {
            Err(CouponError::Rejected(rejection)) => rejection,
            other => return Err(format!("expected rejection, got {other:?}").into()),
        };

        assert_eq!(rejection.reason(), RejectionReason::OutOfWindow);
        assert!(rejection.message().contains("SAVE10"));

        Ok(())
    }

    #[test]
    fn valid_response_without_coupon_is_unexpected() -> TestResult {
        let record: CouponValidationRecord =
            serde_json::from_str(r#"{"valid":true,"discountAmount":"1.00"}"#)?;

        let result = validator()?.outcome_from(&request(50_00), record);

        assert!(matches!(
            result,
            Err(CouponError::Api(ApiError::UnexpectedResponse(_)))
        ));

        Ok(())
    }

    #[test]
    fn unknown_code_response_is_not_found() -> TestResult {
        let error = rejection_from(classify(StatusCode::NOT_FOUND, r#"{"message":"No such coupon"}"#));

        let rejection = error.rejection().ok_or("expected a rejection")?;

        assert_eq!(rejection.reason(), RejectionReason::NotFound);
        assert_eq!(rejection.message(), "No such coupon");

        Ok(())
    }

    #[test]
    fn other_client_errors_are_not_applicable() -> TestResult {
        let error = rejection_from(classify(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"error":"Coupon already used"}"#,
        ));

        let rejection = error.rejection().ok_or("expected a rejection")?;

        assert_eq!(rejection.reason(), RejectionReason::NotApplicable);
        assert_eq!(rejection.message(), "Coupon already used");

        Ok(())
    }

    #[test]
    fn server_and_auth_failures_stay_api_errors() {
        let server = rejection_from(classify(StatusCode::BAD_GATEWAY, ""));
        let unauthorized = rejection_from(classify(StatusCode::UNAUTHORIZED, ""));

        assert!(matches!(server, CouponError::Api(ApiError::Server { .. })));
        assert!(matches!(unauthorized, CouponError::Api(ApiError::Unauthorized)));
    }
}

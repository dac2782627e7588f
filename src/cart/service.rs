//! Carts service.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Method;
use rusty_money::iso::Currency;

use crate::{
    cart::{
        CartMutation, CartSnapshot,
        records::{CartItemRequest, CartMutationResponse, CartRecord},
    },
    http::{ApiClient, ApiError},
};

/// HTTP-backed cart endpoints.
#[derive(Debug, Clone)]
pub struct HttpCartsService {
    api: ApiClient,
    currency: &'static Currency,
}

impl HttpCartsService {
    /// Create a new service over the given client.
    #[must_use]
    pub fn new(api: ApiClient, currency: &'static Currency) -> Self {
        Self { api, currency }
    }

    fn snapshot_from(&self, record: CartRecord) -> Result<CartSnapshot<'static>, ApiError> {
        record
            .into_snapshot(self.currency)
            .map_err(|error| ApiError::UnexpectedResponse(format!("invalid cart: {error}")))
    }

    fn parse_mutation_response(
        &self,
        response: CartMutationResponse,
    ) -> Result<Option<CartSnapshot<'static>>, ApiError> {
        match response {
            CartMutationResponse::Cart(record) => self.snapshot_from(record).map(Some),
            CartMutationResponse::Message { .. } => Ok(None),
        }
    }
}

#[async_trait]
impl CartsService for HttpCartsService {
    #[tracing::instrument(name = "carts.service.get_cart", skip(self), err)]
    async fn get_cart(&self) -> Result<CartSnapshot<'static>, ApiError> {
        let record: CartRecord = self.api.get(&["cart"]).await?;

        self.snapshot_from(record)
    }

    #[tracing::instrument(
        name = "carts.service.apply",
        skip(self, mutation),
        fields(mutation = mutation.to_str()),
        err
    )]
    async fn apply(
        &self,
        mutation: CartMutation,
    ) -> Result<Option<CartSnapshot<'static>>, ApiError> {
        let response: CartMutationResponse = match mutation {
            CartMutation::Add {
                variant_id,
                quantity,
            } => {
                let body = CartItemRequest {
                    variant_id,
                    quantity,
                };

                self.api.send(Method::POST, &["cart", "add"], &body).await?
            }
            CartMutation::Update {
                variant_id,
                quantity,
            } => {
                let body = CartItemRequest {
                    variant_id,
                    quantity,
                };

                self.api.send(Method::PUT, &["cart", "update"], &body).await?
            }
            CartMutation::Remove { variant_id } => {
                let result = self
                    .api
                    .delete(&["cart", "remove", variant_id.as_str()])
                    .await;

                match removal_response(result)? {
                    Some(response) => response,
                    None => return Ok(None),
                }
            }
            CartMutation::Clear => self.api.delete(&["cart", "clear"]).await?,
        };

        self.parse_mutation_response(response)
    }
}

/// Treat a 404 on removal as success. The line is already gone server-side,
/// so `None` asks the caller to refetch.
fn removal_response(
    result: Result<CartMutationResponse, ApiError>,
) -> Result<Option<CartMutationResponse>, ApiError> {
    match result {
        Ok(response) => Ok(Some(response)),
        Err(ApiError::NotFound { .. }) => Ok(None),
        Err(error) => Err(error),
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Fetch the authoritative cart.
    async fn get_cart(&self) -> Result<CartSnapshot<'static>, ApiError>;

    /// Send a mutation to the backend.
    ///
    /// Returns the updated cart when the server includes it, or `None` when
    /// the caller must refetch. A 404 on removal counts as success.
    async fn apply(
        &self,
        mutation: CartMutation,
    ) -> Result<Option<CartSnapshot<'static>>, ApiError>;
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use crate::{cart::records::CartLineRecord, http::classify, ids::VariantId, money::WireAmount};

    use super::*;

    fn service() -> Result<HttpCartsService, ApiError> {
        Ok(HttpCartsService::new(
            ApiClient::new("https://shop.example.com", None)?,
            GBP,
        ))
    }

    #[test]
    fn message_response_requests_refetch() -> TestResult {
        let snapshot = service()?.parse_mutation_response(CartMutationResponse::Message {
            message: "Item removed".to_string(),
        })?;

        assert!(snapshot.is_none());

        Ok(())
    }

    #[test]
    fn cart_response_is_validated() -> TestResult {
        let response = CartMutationResponse::Cart(CartRecord {
            items: vec![CartLineRecord {
                variant_id: VariantId::new("tee"),
                quantity: 0,
                unit_price: WireAmount::from_minor(100),
                final_unit_price: WireAmount::from_minor(100),
                stock_available: 1,
                status: crate::cart::LineStatus::Active,
            }],
        });

        let result = service()?.parse_mutation_response(response);

        assert!(matches!(result, Err(ApiError::UnexpectedResponse(_))));

        Ok(())
    }

    #[test]
    fn removing_a_missing_line_counts_as_success() -> TestResult {
        let result = removal_response(Err(classify(StatusCode::NOT_FOUND, "")))?;

        assert!(result.is_none());

        Ok(())
    }

    #[test]
    fn removal_server_error_is_propagated() {
        let result = removal_response(Err(classify(StatusCode::INTERNAL_SERVER_ERROR, "boom")));

        assert!(matches!(result, Err(ApiError::Server { .. })));
    }

    #[test]
    fn removal_conflict_is_stale_cart() {
        let result = removal_response(Err(classify(StatusCode::CONFLICT, "")));

        assert!(matches!(result, Err(ApiError::StaleCart { .. })));
    }

    #[test]
    fn removal_response_body_is_kept() -> TestResult {
        let result = removal_response(Ok(CartMutationResponse::Message {
            message: "Item removed".to_string(),
        }))?;

        assert!(matches!(result, Some(CartMutationResponse::Message { .. })));

        Ok(())
    }
}

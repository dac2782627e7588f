//! Orders service.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Method;

use crate::{
    http::{ApiClient, ApiError},
    orders::records::{OrderCreated, OrderCreatedRecord, OrderRequest},
};

/// HTTP-backed order endpoint.
#[derive(Debug, Clone)]
pub struct HttpOrdersService {
    api: ApiClient,
}

impl HttpOrdersService {
    /// Create a new service over the given client.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

/// Interpret a success response. A response without an order id did not
/// create an order.
fn order_created(record: OrderCreatedRecord) -> Result<OrderCreated, ApiError> {
    let order_id = record
        .order_id
        .filter(|id| !id.is_blank())
        .ok_or_else(|| ApiError::UnexpectedResponse("order response without orderId".to_string()))?;

    Ok(OrderCreated {
        order_id,
        message: record.message,
    })
}

#[async_trait]
impl OrdersService for HttpOrdersService {
    #[tracing::instrument(
        name = "orders.service.create_order",
        skip(self, request),
        fields(address_id = %request.address_id, items = request.items.len()),
        err
    )]
    async fn create_order(&self, request: OrderRequest) -> Result<OrderCreated, ApiError> {
        let record: OrderCreatedRecord = self.api.send(Method::POST, &["orders"], &request).await?;

        order_created(record)
    }
}

#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// Submit an order. Called at most once per checkout attempt.
    async fn create_order(&self, request: OrderRequest) -> Result<OrderCreated, ApiError>;
}

//! Storefront backend HTTP client.

use reqwest::{Client, Method, RequestBuilder, Url};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use uuid::Uuid;

mod errors;

pub use errors::{ApiError, classify};

/// Header carrying a per-request identifier for correlating logs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// JSON client for the storefront REST backend.
///
/// Every request carries the bearer credential (when one is configured) and a
/// fresh request id. Non-success responses are classified into [`ApiError`];
/// nothing is retried here.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    token: Option<String>,
    http: Client,
}

impl ApiClient {
    /// Create a new client for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] if the URL does not parse or cannot
    /// be used as a base for paths.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|_err| ApiError::InvalidBaseUrl(base_url.to_string()))?;

        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self {
            base_url,
            token: token.filter(|token| !token.trim().is_empty()),
            http: Client::new(),
        })
    }

    /// Resolve path segments against the base URL, percent-encoding each one.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] if the base URL cannot take path
    /// segments.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();

        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    /// `GET` a JSON resource.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure, non-success status, or a
    /// body that does not match `T`.
    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;

        self.execute(self.http.get(url)).await
    }

    /// Send a JSON body with the given method and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure, non-success status, or a
    /// body that does not match `T`.
    pub async fn send<B, T>(&self, method: Method, segments: &[&str], body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;

        self.execute(self.http.request(method, url).json(body)).await
    }

    /// `DELETE` a resource and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure, non-success status, or a
    /// body that does not match `T`.
    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;

        self.execute(self.http.delete(url)).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let request_id = Uuid::now_v7().to_string();

        let request = request.header(REQUEST_ID_HEADER, &request_id);

        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(ApiError::Network)?;
        let status = response.status();
        let body = response.text().await.map_err(ApiError::Network)?;

        debug!(%request_id, %status, "storefront response received");

        if !status.is_success() {
            return Err(classify(status, &body));
        }

        decode(&body)
    }
}

/// Decode a JSON response body.
///
/// An empty body decodes as JSON `null`, so `Option` and unit targets accept it.
///
/// # Errors
///
/// Returns [`ApiError::Decode`] if the body does not match `T`.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let body = if body.trim().is_empty() { "null" } else { body };

    serde_json::from_str(body).map_err(ApiError::Decode)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Message {
        message: String,
    }

    #[test]
    fn endpoint_appends_encoded_segments() -> TestResult {
        let client = ApiClient::new("https://shop.example.com/api/", None)?;

        let url = client.endpoint(&["cart", "remove", "sku 1/red"])?;

        assert_eq!(
            url.as_str(),
            "https://shop.example.com/api/cart/remove/sku%201%2Fred"
        );

        Ok(())
    }

    #[test]
    fn endpoint_without_trailing_slash() -> TestResult {
        let client = ApiClient::new("https://shop.example.com/api", None)?;

        assert_eq!(
            client.endpoint(&["orders"])?.as_str(),
            "https://shop.example.com/api/orders"
        );

        Ok(())
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            ApiClient::new("not a url", None),
            Err(ApiError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            ApiClient::new("mailto:shop@example.com", None),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn blank_token_is_dropped() -> TestResult {
        let client = ApiClient::new("https://shop.example.com", Some("  ".to_string()))?;

        assert!(client.token.is_none());

        Ok(())
    }

    #[test]
    fn decode_reports_schema_mismatch() {
        let result = decode::<Message>(r#"{"msg":"hi"}"#);

        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[test]
    fn decode_empty_body_as_none() -> TestResult {
        let decoded: Option<Message> = decode("")?;

        assert_eq!(decoded, None);

        Ok(())
    }
}

//! API errors.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Failures talking to the storefront backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The bearer credential was missing, expired or revoked (HTTP 401).
    #[error("your session has expired, please sign in again")]
    Unauthorized,

    /// Server-side prices or stock changed since the client computed its
    /// totals (HTTP 409). The cart must be refetched and recomputed.
    #[error("your cart is out of date: {message}")]
    StaleCart {
        /// Server explanation.
        message: String,
    },

    /// The requested resource does not exist (HTTP 404).
    #[error("not found: {message}")]
    NotFound {
        /// Server explanation.
        message: String,
    },

    /// The server refused the request (any other HTTP 4xx).
    #[error("request rejected ({status}): {message}")]
    Rejected {
        /// Response status.
        status: StatusCode,
        /// Server explanation.
        message: String,
    },

    /// The server failed (HTTP 5xx). The message is surfaced verbatim.
    #[error("server error ({status}): {message}")]
    Server {
        /// Response status.
        status: StatusCode,
        /// Server explanation, verbatim.
        message: String,
    },

    /// No response was received.
    #[error("could not reach the storefront, check your connection")]
    Network(#[source] reqwest::Error),

    /// The response body did not match the expected schema.
    #[error("unexpected response body")]
    Decode(#[source] serde_json::Error),

    /// The response was well-formed JSON but structurally unusable.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The configured base URL cannot have path segments appended.
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// Whether this error means the local session must be invalidated.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Extract a human-readable message from an error response body.
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message.or(parsed.error));

    if let Some(message) = parsed {
        return message;
    }

    let trimmed = body.trim();

    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no message")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

/// Classify a non-success response into the error taxonomy.
pub fn classify(status: StatusCode, body: &str) -> ApiError {
    let message = error_message(status, body);

    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::CONFLICT => ApiError::StaleCart { message },
        StatusCode::NOT_FOUND => ApiError::NotFound { message },
        status if status.is_server_error() => ApiError::Server { status, message },
        status if status.is_client_error() => ApiError::Rejected { status, message },
        status => ApiError::UnexpectedResponse(format!("status {status}: {message}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_classified() {
        let error = classify(StatusCode::UNAUTHORIZED, "");

        assert!(error.is_unauthorized());
    }

    #[test]
    fn conflict_means_stale_cart() {
        let error = classify(StatusCode::CONFLICT, r#"{"message":"price changed"}"#);

        assert!(
            matches!(&error, ApiError::StaleCart { message } if message == "price changed"),
            "expected StaleCart, got {error:?}"
        );
    }

    #[test]
    fn server_errors_keep_body_verbatim() {
        let error = classify(StatusCode::BAD_GATEWAY, "upstream timed out");

        assert!(
            matches!(&error, ApiError::Server { status, message }
                if *status == StatusCode::BAD_GATEWAY && message == "upstream timed out"),
            "expected Server, got {error:?}"
        );
    }

    #[test]
    fn other_client_errors_are_rejections() {
        let error = classify(StatusCode::UNPROCESSABLE_ENTITY, r#"{"error":"bad address"}"#);

        assert!(
            matches!(&error, ApiError::Rejected { message, .. } if message == "bad address"),
            "expected Rejected, got {error:?}"
        );
    }

    #[test]
    fn empty_body_falls_back_to_reason_phrase() {
        let error = classify(StatusCode::NOT_FOUND, "  ");

        assert!(
            matches!(&error, ApiError::NotFound { message } if message == "Not Found"),
            "expected NotFound, got {error:?}"
        );
    }
}

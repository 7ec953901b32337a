//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Checkout errors answer with JSON the checkout pages render directly:
//!
//! - validation: `422 { "error": "validation", "fields": {..}, "form": [..] }`
//! - rejection: `409 { "error": "rejected", "message": ".." }` (toast)
//! - contract violation: `500 { "error": "contract_violation", "message": "..contact support..", "support_url": "mailto:.." }`

use std::sync::OnceLock;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::checkout::CheckoutError;
use crate::commerce::CommerceError;
use crate::graphql::TransportError;
use crate::shopify::ShopifyError;

/// Support address used when none has been configured.
const DEFAULT_SUPPORT_EMAIL: &str = "support@wagwell.com";

static SUPPORT_EMAIL: OnceLock<String> = OnceLock::new();

/// Set the address shown in "contact support" responses. First call wins.
pub fn set_support_email(email: impl Into<String>) {
    let _ = SUPPORT_EMAIL.set(email.into());
}

fn support_email() -> &'static str {
    SUPPORT_EMAIL
        .get()
        .map_or(DEFAULT_SUPPORT_EMAIL, String::as_str)
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Checkout flow failed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ShopifyError> for AppError {
    fn from(err: ShopifyError) -> Self {
        Self::Checkout(err.into())
    }
}

impl From<CommerceError> for AppError {
    fn from(err: CommerceError) -> Self {
        Self::Checkout(err.into())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Checkout(err.into())
    }
}

impl AppError {
    /// Whether this error should be captured to Sentry.
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Checkout(err) => err.is_reportable() && !is_not_found(err),
            Self::Internal(_) => true,
            Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Checkout(err) => checkout_status(err),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

const fn is_not_found(err: &CheckoutError) -> bool {
    matches!(
        err,
        CheckoutError::Commerce(CommerceError::NotFound(_))
            | CheckoutError::Shopify(ShopifyError::NotFound(_))
    )
}

const fn is_rate_limited(err: &CheckoutError) -> bool {
    matches!(
        err,
        CheckoutError::Commerce(CommerceError::Transport(TransportError::RateLimited(_)))
            | CheckoutError::Shopify(ShopifyError::Transport(TransportError::RateLimited(_)))
    )
}

fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CheckoutError::Rejected { .. } => StatusCode::CONFLICT,
        CheckoutError::ContractViolation(_) | CheckoutError::Session(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ if is_not_found(err) => StatusCode::NOT_FOUND,
        _ if is_rate_limited(err) => StatusCode::SERVICE_UNAVAILABLE,
        CheckoutError::Commerce(_) | CheckoutError::Shopify(_) | CheckoutError::Payment(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn contact_support_body() -> serde_json::Value {
    let email = support_email();
    json!({
        "error": "contract_violation",
        "message": format!(
            "Something went wrong with your order. Please contact support at {email} and we'll sort it out."
        ),
        "support_url": format!(
            "mailto:{email}?subject={}",
            urlencoding::encode("Checkout problem")
        ),
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let body = match self {
            Self::Checkout(CheckoutError::Validation(fields)) => json!({
                "error": "validation",
                "fields": fields.fields,
                "form": fields.form,
            }),
            Self::Checkout(CheckoutError::Rejected { message }) => json!({
                "error": "rejected",
                "message": message,
            }),
            Self::Checkout(CheckoutError::ContractViolation(_)) => contact_support_body(),
            Self::Checkout(ref err) if is_not_found(err) => json!({
                "error": "not_found",
                "message": "Not found",
            }),
            Self::Checkout(CheckoutError::Session(_)) | Self::Internal(_) => json!({
                "error": "internal",
                "message": "Internal server error",
            }),
            Self::Checkout(_) => json!({
                "error": "upstream",
                "message": "We're having trouble reaching our store right now. Please try again.",
            }),
            Self::NotFound(what) => json!({
                "error": "not_found",
                "message": format!("Not found: {what}"),
            }),
            Self::BadRequest(message) => json!({
                "error": "bad_request",
                "message": message,
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Submitted payment", Some(&[("checkout_id", "chk_1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::checkout::FieldErrors;
    use crate::payments::PaymentError;

    fn status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    async fn body(err: AppError) -> serde_json::Value {
        let bytes = axum::body::to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status(CheckoutError::Validation(FieldErrors::single("zip", "Required"))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status(CheckoutError::rejected("Paid")), StatusCode::CONFLICT);
        assert_eq!(
            status(CheckoutError::contract("not ready")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(ShopifyError::NotFound("product".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(CommerceError::Transport(TransportError::RateLimited(2))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(CheckoutError::Payment(PaymentError::Api {
                status: 500,
                message: "boom".to_string()
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(AppError::BadRequest("x".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_validation_body() {
        let body = body(CheckoutError::Validation(FieldErrors::single("zip", "Required")).into())
            .await;
        assert_eq!(body["error"], "validation");
        assert_eq!(body["fields"]["zip"], "Required");
    }

    #[tokio::test]
    async fn test_contract_violation_hides_details() {
        let body = body(CheckoutError::contract("checkout chk_1 not ready").into()).await;
        assert_eq!(body["error"], "contract_violation");
        let message = body["message"].as_str().unwrap();
        assert!(message.contains("contact support"));
        assert!(!message.contains("chk_1"));
        assert!(body["support_url"].as_str().unwrap().starts_with("mailto:"));
    }
}

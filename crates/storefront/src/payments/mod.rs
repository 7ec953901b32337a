//! Card payments.
//!
//! The storefront never charges cards directly: it turns a browser card
//! token into a payment method, hands the id to the commerce API's
//! `CHECKOUT_CHARGE`. A step-up (SCA) request spans two requests: the
//! client secret goes back to the browser, which runs the card challenge,
//! and the continuation checks the intent with
//! [`PaymentGateway::confirm_card_action`] before charging it by id.

mod stripe;

use std::future::Future;

use thiserror::Error;

use wagwell_core::{Address, PaymentIntentId, PaymentMethodId};

pub use stripe::StripeClient;

/// Errors that can occur when talking to the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The card was rejected; the message is safe to show the shopper.
    #[error("{message}")]
    Card { message: String },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered with an unexpected status or body.
    #[error("Payment gateway error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The step-up token is not a payment intent client secret.
    #[error("Malformed authorization token")]
    MalformedAuthorizationToken,
}

impl PaymentError {
    /// Message to attach to the card field.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Card { message } => message,
            Self::Http(_) | Self::Api { .. } | Self::MalformedAuthorizationToken => {
                "We couldn't reach our payment processor. Please try again."
            }
        }
    }
}

/// What the gateway needs to create a payment method.
#[derive(Debug, Clone)]
pub struct PaymentMethodRequest {
    /// Single-use card token produced by the browser card element.
    pub card_token: String,
    pub billing_address: Address,
    pub email: Option<String>,
}

/// Payment gateway operations used by the payment step.
pub trait PaymentGateway: Send + Sync {
    /// Create a payment method from a card token.
    fn create_payment_method(
        &self,
        request: &PaymentMethodRequest,
    ) -> impl Future<Output = Result<PaymentMethodId, PaymentError>> + Send;

    /// Check a payment intent after the browser finished its card challenge.
    ///
    /// Succeeds only when the intent can now be charged by id.
    fn confirm_card_action(
        &self,
        payment_intent_id: &PaymentIntentId,
    ) -> impl Future<Output = Result<PaymentIntentId, PaymentError>> + Send;
}

/// Payment intent id embedded in a client secret (`pi_123_secret_abc`).
///
/// # Errors
///
/// `MalformedAuthorizationToken` when the secret does not name an intent.
pub fn intent_id_from_client_secret(secret: &str) -> Result<PaymentIntentId, PaymentError> {
    secret
        .split_once("_secret_")
        .map(|(id, _)| id)
        .filter(|id| id.starts_with("pi_") && id.len() > 3)
        .map(PaymentIntentId::new)
        .ok_or(PaymentError::MalformedAuthorizationToken)
}

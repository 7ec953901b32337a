//! Stripe REST client.
//!
//! Stripe takes form-encoded requests with bracketed keys
//! (`billing_details[address][city]`) and answers JSON.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use wagwell_core::{PaymentIntentId, PaymentMethodId};

use super::{PaymentError, PaymentGateway, PaymentMethodRequest};
use crate::config::StripeConfig;

/// Intent statuses that can be charged after a step-up. `requires_action`
/// means the browser never finished the challenge.
const CHARGEABLE_INTENT_STATUSES: &[&str] = &[
    "requires_confirmation",
    "requires_capture",
    "processing",
    "succeeded",
];

const AUTHENTICATION_FAILED: &str =
    "We were unable to authenticate your payment method. Please choose a different payment method and try again.";

/// Client for the Stripe API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct PaymentMethodResponse {
    id: PaymentMethodId,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    id: PaymentIntentId,
    status: String,
    #[serde(default)]
    last_payment_error: Option<StripeErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StripeConfig, timeout: Duration) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: config.api_base.trim_end_matches('/').to_string(),
                secret_key: config.secret_key.clone(),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.api_base)
    }

    /// Decode a Stripe response, turning error envelopes into `PaymentError`.
    async fn decode<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| PaymentError::Api {
                status: status.as_u16(),
                message: format!("unreadable response: {e}"),
            });
        }

        let error = serde_json::from_str::<StripeErrorEnvelope>(&body).ok().map(|e| e.error);
        match error {
            Some(StripeErrorBody {
                kind: Some(kind),
                message: Some(message),
            }) if kind == "card_error" => Err(PaymentError::Card { message }),
            other => {
                let message = other
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| body.chars().take(200).collect());
                tracing::error!(status = %status, message = %message, "Stripe request failed");
                Err(PaymentError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

/// Stripe form fields for a card payment method.
fn payment_method_form(request: &PaymentMethodRequest) -> Vec<(String, String)> {
    let address = &request.billing_address;
    let mut form = vec![
        ("type".to_string(), "card".to_string()),
        ("card[token]".to_string(), request.card_token.clone()),
        (
            "billing_details[name]".to_string(),
            format!("{} {}", address.first_name, address.last_name)
                .trim()
                .to_string(),
        ),
        ("billing_details[address][line1]".to_string(), address.address1.clone()),
        ("billing_details[address][city]".to_string(), address.city.clone()),
        ("billing_details[address][state]".to_string(), address.province.clone()),
        ("billing_details[address][postal_code]".to_string(), address.zip.clone()),
        ("billing_details[address][country]".to_string(), address.country_code.clone()),
    ];
    if let Some(line2) = &address.address2 {
        form.push(("billing_details[address][line2]".to_string(), line2.clone()));
    }
    if let Some(phone) = &address.phone {
        form.push(("billing_details[phone]".to_string(), phone.clone()));
    }
    if let Some(email) = &request.email {
        form.push(("billing_details[email]".to_string(), email.clone()));
    }
    form
}

impl PaymentGateway for StripeClient {
    #[instrument(skip(self, request))]
    async fn create_payment_method(
        &self,
        request: &PaymentMethodRequest,
    ) -> Result<PaymentMethodId, PaymentError> {
        let response = self
            .inner
            .client
            .post(self.url("/v1/payment_methods"))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .form(&payment_method_form(request))
            .send()
            .await?;

        let method: PaymentMethodResponse = Self::decode(response).await?;
        Ok(method.id)
    }

    #[instrument(skip(self), fields(payment_intent_id = %payment_intent_id))]
    async fn confirm_card_action(
        &self,
        payment_intent_id: &PaymentIntentId,
    ) -> Result<PaymentIntentId, PaymentError> {
        let response = self
            .inner
            .client
            .get(self.url(&format!("/v1/payment_intents/{payment_intent_id}")))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .send()
            .await?;

        let intent: PaymentIntentResponse = Self::decode(response).await?;

        if CHARGEABLE_INTENT_STATUSES.contains(&intent.status.as_str()) {
            return Ok(intent.id);
        }

        tracing::warn!(status = %intent.status, "Payment intent not chargeable after step-up");
        let message = intent
            .last_payment_error
            .and_then(|e| e.message)
            .unwrap_or_else(|| AUTHENTICATION_FAILED.to_string());
        Err(PaymentError::Card { message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wagwell_core::Address;

    #[test]
    fn test_payment_method_form_fields() {
        let request = PaymentMethodRequest {
            card_token: "tok_visa".to_string(),
            billing_address: Address {
                first_name: "Rex".into(),
                last_name: "Dog".into(),
                address1: "1 Bone St".into(),
                address2: None,
                city: "Austin".into(),
                province: "TX".into(),
                zip: "78701".into(),
                country_code: "US".into(),
                phone: Some("+15125550100".into()),
            },
            email: Some("rex@example.com".into()),
        };
        let form = payment_method_form(&request);
        let get = |k: &str| {
            form.iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("card[token]"), Some("tok_visa"));
        assert_eq!(get("billing_details[name]"), Some("Rex Dog"));
        assert_eq!(get("billing_details[address][postal_code]"), Some("78701"));
        assert_eq!(get("billing_details[phone]"), Some("+15125550100"));
        assert_eq!(get("billing_details[address][line2]"), None);
    }
}

//! Payment step: billing address, card, charge and step-up authentication.

use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use wagwell_core::{Address, CheckoutId, CheckoutStep, PaymentIntentId};

use super::error::{CheckoutError, FieldErrors, report};
use super::field_map::BILLING_PREFIX;
use super::information::{collect_address_errors, require_checkout, updated_checkout};
use crate::commerce::{ChargeInput, ChargePayload, Checkout, CheckoutApi, CheckoutUpdateInput};
use crate::models::{Cart, PendingAuthentication};
use crate::models::session::first_access_key;
use crate::payments::{
    PaymentError, PaymentGateway, PaymentMethodRequest, intent_id_from_client_secret,
};

const fn default_true() -> bool {
    true
}

/// Payment step submission.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentForm {
    /// Single-use token from the browser card element.
    #[serde(default)]
    pub card_token: String,
    #[serde(default = "default_true")]
    pub billing_same_as_shipping: bool,
    /// Only read when `billing_same_as_shipping` is off.
    #[serde(default)]
    pub billing_address: Address,
    /// Handle of the chosen shipping rate. Defaults to the checkout's
    /// selected or first available rate.
    #[serde(default)]
    pub shipping_rate: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Result of a payment request.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    /// The checkout is paid; send the browser to `redirect`.
    Paid {
        checkout: Box<Checkout>,
        redirect: String,
    },
    /// The card needs a challenge. The browser runs it with `client_secret`
    /// and posts the intent id to the continuation.
    RequiresAction { client_secret: String },
}

/// Thank-you page URL for a completed checkout.
#[must_use]
pub fn thank_you_url(id: &CheckoutId) -> String {
    format!(
        "{}?checkout_id={}",
        CheckoutStep::ThankYou.path(),
        urlencoding::encode(id.as_str())
    )
}

/// Billing address for the charge.
///
/// Same-as-shipping copies the shipping address the information step stored
/// on the checkout. Otherwise the distinct billing fields are validated under
/// their `billing_` names.
///
/// # Errors
///
/// `Validation` for blank billing fields, `ContractViolation` when the
/// checkout has no shipping address to copy.
pub fn resolve_billing(form: &PaymentForm, checkout: &Checkout) -> Result<Address, CheckoutError> {
    if form.billing_same_as_shipping {
        return checkout
            .shipping_address
            .clone()
            .map(Address::from)
            .ok_or_else(|| {
                CheckoutError::contract(format!(
                    "checkout {} reached payment without a shipping address",
                    checkout.id
                ))
            });
    }

    let billing = form.billing_address.normalized();
    let mut errors = FieldErrors::new();
    collect_address_errors(&mut errors, &billing, BILLING_PREFIX);
    errors.into_result()?;
    Ok(billing)
}

/// Card field error for a gateway failure. Anything but a card decline is
/// also reported.
fn card_error(error: PaymentError, context: &'static str) -> CheckoutError {
    let message = error.user_message().to_string();
    if !matches!(error, PaymentError::Card { .. }) {
        report(&error.into(), context);
    }
    CheckoutError::Validation(FieldErrors::single("card", message))
}

const NOTHING_TO_AUTHENTICATE: &str = "There is no payment waiting for authentication.";

fn charge_user_errors(payload: ChargePayload) -> Result<ChargePayload, CheckoutError> {
    if payload.user_errors.is_empty() {
        Ok(payload)
    } else {
        Err(CheckoutError::Validation(FieldErrors::from_user_errors(
            &payload.user_errors,
        )))
    }
}

/// Payment step service.
pub struct PaymentStep<'a, C, G> {
    commerce: &'a C,
    gateway: &'a G,
}

impl<'a, C, G> PaymentStep<'a, C, G>
where
    C: CheckoutApi,
    G: PaymentGateway,
{
    pub const fn new(commerce: &'a C, gateway: &'a G) -> Self {
        Self { commerce, gateway }
    }

    /// Pay for the cart's checkout.
    ///
    /// Nothing is charged unless the payment method was created and the
    /// checkout update was accepted. When the charge asks for step-up, the
    /// intent is stored on the cart and `RequiresAction` hands the client
    /// secret back to the browser; [`Self::authenticate`] finishes the
    /// payment. On success the checkout is latched as completed on the cart
    /// and its first-access flag is written to the session.
    ///
    /// # Errors
    ///
    /// - `Rejected` when the checkout was already paid
    /// - `Validation` for form errors, card errors and user-errors
    /// - `ContractViolation` when the backend breaks the checkout contract
    #[instrument(skip(self, cart, session, form))]
    pub async fn submit(
        &self,
        cart: &mut Cart,
        session: &Session,
        form: PaymentForm,
    ) -> Result<PaymentOutcome, CheckoutError> {
        let id = require_checkout(cart)?;
        if cart.completed_checkout_id.as_ref() == Some(&id) {
            return Err(CheckoutError::rejected("This order has already been placed."));
        }
        if form.card_token.trim().is_empty() {
            return Err(CheckoutError::Validation(FieldErrors::single(
                "card",
                "Please enter your card details",
            )));
        }
        cart.pending_authentication = None;

        let checkout = self.commerce.checkout(&id).await?;
        if checkout.is_completed() {
            cart.completed_checkout_id = Some(id);
            return Err(CheckoutError::rejected("This order has already been placed."));
        }

        let billing = resolve_billing(&form, &checkout)?;
        let shipping_rate_handle = form
            .shipping_rate
            .filter(|h| !h.trim().is_empty())
            .or_else(|| checkout.default_shipping_rate().map(|r| r.handle.clone()))
            .ok_or_else(|| {
                CheckoutError::Validation(FieldErrors::single(
                    "shipping_rate",
                    "Please choose a shipping method",
                ))
            })?;

        let request = PaymentMethodRequest {
            card_token: form.card_token,
            billing_address: billing.clone(),
            email: checkout.email.clone(),
        };
        let update = CheckoutUpdateInput {
            billing_address: Some(billing.into()),
            shipping_rate_handle: Some(shipping_rate_handle),
            note: form.note.filter(|n| !n.trim().is_empty()),
            ..CheckoutUpdateInput::default()
        };

        let (payment_method, updated) = tokio::join!(
            self.gateway.create_payment_method(&request),
            self.commerce.update_checkout(&id, update)
        );

        let payment_method_id = payment_method.map_err(|e| card_error(e, "payment method"))?;
        let updated = updated_checkout(updated?, "checkoutUpdate")?;
        if !updated.ready {
            return Err(CheckoutError::contract(format!(
                "checkout {id} not ready after billing update"
            )));
        }

        let payload = self
            .commerce
            .charge(&id, ChargeInput::PaymentMethodId(payment_method_id))
            .await?;
        let payload = charge_user_errors(payload)?;

        if let Some(client_secret) = payload.authorization_token {
            let payment_intent_id = intent_id_from_client_secret(&client_secret).map_err(|_| {
                CheckoutError::contract(format!(
                    "checkout {id} asked for authentication without a payment intent"
                ))
            })?;
            info!(checkout_id = %id, %payment_intent_id, "Card requires authentication");
            cart.pending_authentication = Some(PendingAuthentication {
                checkout_id: id,
                payment_intent_id,
            });
            return Ok(PaymentOutcome::RequiresAction { client_secret });
        }

        let paid = payload
            .checkout
            .ok_or_else(|| CheckoutError::contract("checkoutCharge returned no checkout"))?;
        finish(cart, session, id, paid).await
    }

    /// Finish a payment after the browser's card challenge.
    ///
    /// `payment_intent_id` must be the intent the pending step-up named for
    /// the cart's checkout. The intent is charged once; a second step-up
    /// request is a contract violation.
    ///
    /// # Errors
    ///
    /// - `Rejected` when nothing is pending or the intent is not the cart's
    /// - `Validation` when authentication failed or the charge has user-errors
    /// - `ContractViolation` when the charge asks for step-up again
    #[instrument(skip(self, cart, session))]
    pub async fn authenticate(
        &self,
        cart: &mut Cart,
        session: &Session,
        payment_intent_id: &PaymentIntentId,
    ) -> Result<PaymentOutcome, CheckoutError> {
        let id = match cart.pending_authentication.take() {
            Some(pending)
                if &pending.payment_intent_id == payment_intent_id
                    && cart.custom_checkout_id() == Some(&pending.checkout_id) =>
            {
                pending.checkout_id
            }
            other => {
                cart.pending_authentication = other;
                return Err(CheckoutError::rejected(NOTHING_TO_AUTHENTICATE));
            }
        };

        let intent_id = self
            .gateway
            .confirm_card_action(payment_intent_id)
            .await
            .map_err(|e| card_error(e, "card authentication"))?;

        let retry = self
            .commerce
            .charge(&id, ChargeInput::PaymentIntentId(intent_id))
            .await?;
        let retry = charge_user_errors(retry)?;

        if retry.authorization_token.is_some() {
            return Err(CheckoutError::contract(format!(
                "checkout {id} requested authentication twice"
            )));
        }
        let paid = retry
            .checkout
            .ok_or_else(|| CheckoutError::contract("checkoutCharge returned no checkout"))?;
        finish(cart, session, id, paid).await
    }
}

/// Latch a charged checkout as paid and flag its thank-you page.
async fn finish(
    cart: &mut Cart,
    session: &Session,
    id: CheckoutId,
    paid: Checkout,
) -> Result<PaymentOutcome, CheckoutError> {
    if !paid.is_completed() {
        return Err(CheckoutError::contract(format!(
            "checkout {id} charged but not completed"
        )));
    }

    cart.completed_checkout_id = Some(id.clone());
    session.insert(&first_access_key(&id), true).await?;

    info!(checkout_id = %id, order = ?paid.order_name, "Checkout paid");
    Ok(PaymentOutcome::Paid {
        redirect: thank_you_url(&id),
        checkout: Box::new(paid),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commerce::MailingAddress;

    fn checkout(shipping: Option<MailingAddress>) -> Checkout {
        serde_json::from_value(serde_json::json!({
            "id": "chk_1",
            "subtotalPrice": "39.00",
            "totalPrice": "45.00",
        }))
        .map(|c: Checkout| Checkout {
            shipping_address: shipping,
            ..c
        })
        .unwrap()
    }

    fn form(same: bool) -> PaymentForm {
        serde_json::from_value(serde_json::json!({
            "card_token": "tok_visa",
            "billing_same_as_shipping": same,
        }))
        .unwrap()
    }

    #[test]
    fn test_same_as_shipping_copies_checkout_address() {
        let shipping = MailingAddress {
            first_name: "Rex".to_string(),
            zip: "97201".to_string(),
            ..MailingAddress::default()
        };
        let billing = resolve_billing(&form(true), &checkout(Some(shipping.clone()))).unwrap();
        assert_eq!(billing, Address::from(shipping));
    }

    #[test]
    fn test_same_as_shipping_without_address_is_contract_violation() {
        let err = resolve_billing(&form(true), &checkout(None)).unwrap_err();
        assert!(matches!(err, CheckoutError::ContractViolation(_)));
    }

    #[test]
    fn test_distinct_billing_errors_are_prefixed() {
        let err = resolve_billing(&form(false), &checkout(None)).unwrap_err();
        let CheckoutError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.get("billing_zip"), Some("ZIP code is required"));
        assert!(fields.get("zip").is_none());
    }

    #[test]
    fn test_billing_defaults_to_same_as_shipping() {
        let form: PaymentForm =
            serde_json::from_value(serde_json::json!({ "card_token": "tok" })).unwrap();
        assert!(form.billing_same_as_shipping);
    }

    #[test]
    fn test_thank_you_url() {
        assert_eq!(
            thank_you_url(&CheckoutId::new("chk_1")),
            "/checkout/thank_you?checkout_id=chk_1"
        );
    }
}

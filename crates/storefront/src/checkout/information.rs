//! Information step: contact email and shipping address.

use serde::Deserialize;
use tracing::{info, instrument, warn};

use wagwell_core::{Address, CheckoutId, Email};

use super::error::{CheckoutError, FieldErrors};
use crate::commerce::{
    Checkout, CheckoutApi, CheckoutPayload, CheckoutUpdateInput, SubscriptionApi,
};
use crate::models::Cart;
use crate::services::MarketingSubscriptions;
use crate::services::subscriptions::CHECKOUT_SOURCE;

/// Information step submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InformationForm {
    pub email: String,
    pub shipping_address: Address,
    /// Text updates to `shipping_address.phone`.
    pub sms_opt_in: bool,
    pub email_opt_in: bool,
    /// Submitted from the browser payment sheet (Apple Pay, Google Pay)
    /// with an address it already validated.
    pub express: bool,
}

/// Record a "required" error for every blank required field.
pub(super) fn collect_address_errors(errors: &mut FieldErrors, address: &Address, prefix: &str) {
    for field in address.missing_fields() {
        errors.add(
            format!("{prefix}{}", field.name()),
            format!("{} is required", field.label()),
        );
    }
}

/// Validate the form. All problems are reported together.
///
/// Express submissions still need a valid email and a complete address; only
/// the opt-in checks, which the payment sheet never shows, are skipped.
///
/// # Errors
///
/// Returns the field errors when anything is missing or malformed.
pub fn validate(form: &InformationForm) -> Result<(Email, Address), FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = Email::parse(&form.email)
        .map_err(|e| errors.add("email", e.to_string()))
        .ok();

    let address = form.shipping_address.normalized();
    collect_address_errors(&mut errors, &address, "");

    if !form.express && form.sms_opt_in && address.phone.is_none() {
        errors.add("phone", "Enter a phone number to get text updates");
    }

    match email {
        Some(email) if errors.is_empty() => Ok((email, address)),
        _ => Err(errors),
    }
}

/// Turn a checkout mutation result into the updated checkout, mapping
/// user-errors onto form fields.
pub(super) fn updated_checkout(
    payload: CheckoutPayload,
    operation: &str,
) -> Result<Checkout, CheckoutError> {
    if !payload.user_errors.is_empty() {
        return Err(CheckoutError::Validation(FieldErrors::from_user_errors(
            &payload.user_errors,
        )));
    }
    payload
        .checkout
        .ok_or_else(|| CheckoutError::contract(format!("{operation} returned no checkout")))
}

/// The custom checkout the cart is on, or a rejection sending the shopper
/// back to the cart.
pub(super) fn require_checkout(cart: &Cart) -> Result<CheckoutId, CheckoutError> {
    cart.custom_checkout_id().cloned().ok_or_else(|| {
        CheckoutError::rejected("Your checkout has expired. Please return to your cart.")
    })
}

/// Information step service.
pub struct InformationStep<'a, C> {
    commerce: &'a C,
}

impl<'a, C> InformationStep<'a, C>
where
    C: CheckoutApi + SubscriptionApi,
{
    pub const fn new(commerce: &'a C) -> Self {
        Self { commerce }
    }

    /// Submit email and shipping address.
    ///
    /// Marketing opt-ins run alongside the checkout update; their failure is
    /// logged and never fails the step.
    ///
    /// # Errors
    ///
    /// - `Validation` for form errors or mutation user-errors
    /// - `ContractViolation` when the updated checkout has no email or no
    ///   shipping rates
    #[instrument(skip(self, cart, form), fields(express = form.express))]
    pub async fn submit(
        &self,
        cart: &mut Cart,
        form: InformationForm,
    ) -> Result<Checkout, CheckoutError> {
        let id = require_checkout(cart)?;

        let (email, address) = validate(&form).map_err(CheckoutError::Validation)?;
        let email = email.into_inner();

        let input = CheckoutUpdateInput {
            email: Some(email.clone()),
            shipping_address: Some(address.clone().into()),
            ..CheckoutUpdateInput::default()
        };

        let subscriptions = MarketingSubscriptions::new(self.commerce);
        let sms = async {
            match address.phone.as_deref() {
                Some(phone) if form.sms_opt_in => Some(subscriptions.sms(phone, Some(&id)).await),
                _ => None,
            }
        };
        let newsletter = async {
            if form.email_opt_in {
                Some(subscriptions.email(&email, CHECKOUT_SOURCE).await)
            } else {
                None
            }
        };

        let (updated, sms, newsletter) =
            tokio::join!(self.commerce.update_checkout(&id, input), sms, newsletter);

        log_opt_in("sms", sms);
        log_opt_in("email", newsletter);

        let checkout = updated_checkout(updated?, "checkoutUpdate")?;
        if !checkout.is_ready_for_payment() {
            return Err(CheckoutError::contract(format!(
                "checkout {} has no email or shipping rates after the information step",
                checkout.id
            )));
        }

        cart.last_synced_email = Some(email);
        info!(checkout_id = %checkout.id, "Information step submitted");
        Ok(checkout)
    }

    /// Push just the email, skipping the call when it has not changed.
    ///
    /// Returns whether an update was sent.
    ///
    /// # Errors
    ///
    /// `Validation` on `email` for a malformed address or a rejected update.
    #[instrument(skip(self, cart, email))]
    pub async fn update_email(&self, cart: &mut Cart, email: &str) -> Result<bool, CheckoutError> {
        let email = Email::parse(email)
            .map_err(|e| CheckoutError::Validation(FieldErrors::single("email", e.to_string())))?;

        if cart.last_synced_email.as_deref() == Some(email.as_str()) {
            return Ok(false);
        }

        let id = require_checkout(cart)?;
        let input = CheckoutUpdateInput {
            email: Some(email.as_str().to_string()),
            ..CheckoutUpdateInput::default()
        };
        let payload = self.commerce.update_checkout(&id, input).await?;
        updated_checkout(payload, "checkoutUpdate")?;

        cart.last_synced_email = Some(email.into_inner());
        Ok(true)
    }
}

fn log_opt_in(channel: &'static str, result: Option<Result<(), CheckoutError>>) {
    match result {
        Some(Ok(())) => info!(channel, "Marketing opt-in recorded"),
        Some(Err(e)) => warn!(channel, error = %e, "Marketing opt-in failed"),
        None => {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> InformationForm {
        InformationForm {
            email: "Rex@Example.com".to_string(),
            shipping_address: Address {
                first_name: "Rex".to_string(),
                last_name: "Dog".to_string(),
                address1: "1 Bone St".to_string(),
                address2: Some(" ".to_string()),
                city: "Portland".to_string(),
                province: "OR".to_string(),
                zip: "97201".to_string(),
                country_code: "us".to_string(),
                phone: None,
            },
            ..InformationForm::default()
        }
    }

    #[test]
    fn test_validate_normalizes() {
        let (email, address) = validate(&form()).unwrap();
        assert_eq!(email.as_str(), "rex@example.com");
        assert_eq!(address.country_code, "US");
        assert_eq!(address.address2, None);
    }

    #[test]
    fn test_validate_reports_everything_at_once() {
        let form = InformationForm {
            email: "not-an-email".to_string(),
            sms_opt_in: true,
            ..InformationForm::default()
        };
        let errors = validate(&form).unwrap_err();
        assert_eq!(errors.get("email"), Some("Please enter a valid email address"));
        assert_eq!(errors.get("first_name"), Some("First name is required"));
        assert_eq!(errors.get("zip"), Some("ZIP code is required"));
        assert!(errors.get("phone").is_some());
        assert_eq!(errors.fields.len(), 9);
    }

    #[test]
    fn test_express_still_needs_email_and_address() {
        let form = InformationForm {
            email: "not-an-email".to_string(),
            sms_opt_in: true,
            express: true,
            ..InformationForm::default()
        };
        let errors = validate(&form).unwrap_err();
        assert!(errors.get("email").is_some());
        assert!(errors.get("address1").is_some());
        assert!(errors.get("phone").is_none());
        assert_eq!(errors.fields.len(), 8);
    }

    #[test]
    fn test_form_deserializes_with_missing_fields() {
        let form: InformationForm = serde_json::from_value(serde_json::json!({
            "email": "rex@example.com",
            "shipping_address": { "first_name": "Rex" }
        }))
        .unwrap();
        assert_eq!(form.shipping_address.first_name, "Rex");
        assert!(form.shipping_address.city.is_empty());
        assert!(!form.express);
    }
}

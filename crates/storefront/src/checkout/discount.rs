//! Discount codes on the custom checkout.

use tracing::{info, instrument};

use wagwell_core::DiscountRejection;

use super::error::{CheckoutError, FieldErrors, report};
use super::information::{require_checkout, updated_checkout};
use crate::commerce::{Checkout, CheckoutApi, CheckoutUpdateInput, DiscountInput};
use crate::models::Cart;

const FIELD: &str = "discount_code";

/// Toast shown when a stored code could not be re-applied for a non-user reason.
const SYNC_FAILED: &str = "We couldn't apply your discount code. Please try again.";

/// Discount service.
pub struct DiscountService<'a, C> {
    commerce: &'a C,
}

impl<'a, C: CheckoutApi> DiscountService<'a, C> {
    pub const fn new(commerce: &'a C) -> Self {
        Self { commerce }
    }

    /// Apply a code to the cart's checkout and keep it as the cart's code.
    ///
    /// # Errors
    ///
    /// `Validation` on `discount_code` when the code is blank, rejected by
    /// the backend or not applicable.
    #[instrument(skip(self, cart))]
    pub async fn apply(&self, cart: &mut Cart, code: &str) -> Result<Checkout, CheckoutError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CheckoutError::Validation(FieldErrors::single(
                FIELD,
                "Please enter a discount code",
            )));
        }

        let id = require_checkout(cart)?;
        let input = CheckoutUpdateInput {
            discount: Some(DiscountInput {
                code: Some(code.to_string()),
            }),
            ..CheckoutUpdateInput::default()
        };
        let payload = self.commerce.update_checkout(&id, input).await?;
        let checkout = updated_checkout(payload, "checkoutUpdate").map_err(onto_discount_field)?;

        match &checkout.discount {
            Some(discount) if discount.applicable => {
                info!(checkout_id = %id, code = %discount.code, "Discount applied");
                cart.discount_code = Some(discount.code.clone());
                cart.discount_synced = true;
                Ok(checkout)
            }
            Some(discount) => {
                let reason = discount
                    .reason
                    .clone()
                    .unwrap_or_else(|| DiscountRejection::Other(String::new()));
                Err(CheckoutError::Validation(FieldErrors::single(
                    FIELD,
                    reason.message(),
                )))
            }
            None => Err(CheckoutError::Validation(FieldErrors::single(
                FIELD,
                DiscountRejection::NotFound.message(),
            ))),
        }
    }

    /// Remove the code from the checkout, then forget it locally.
    ///
    /// A cart without a custom checkout only has the local code to clear.
    ///
    /// # Errors
    ///
    /// `Validation` when the backend refuses the removal; the local code is
    /// kept in that case.
    #[instrument(skip(self, cart))]
    pub async fn remove(&self, cart: &mut Cart) -> Result<Option<Checkout>, CheckoutError> {
        let Some(id) = cart.custom_checkout_id().cloned() else {
            cart.discount_code = None;
            return Ok(None);
        };

        let input = CheckoutUpdateInput {
            discount: Some(DiscountInput { code: None }),
            ..CheckoutUpdateInput::default()
        };
        let payload = self.commerce.update_checkout(&id, input).await?;
        let checkout = updated_checkout(payload, "checkoutUpdate").map_err(onto_discount_field)?;

        cart.discount_code = None;
        Ok(Some(checkout))
    }

    /// Re-submit the cart's stored code once per checkout.
    ///
    /// Returns a toast message when the code could not be applied. A code
    /// the backend rejects is dropped from the cart; one that never reached
    /// the backend is tried again on the next load.
    pub async fn sync_once(&self, cart: &mut Cart) -> Option<String> {
        if cart.discount_synced || cart.custom_checkout_id().is_none() {
            return None;
        }
        let code = cart.discount_code.clone()?;
        cart.discount_synced = true;

        match self.apply(cart, &code).await {
            Ok(_) => None,
            Err(CheckoutError::Validation(errors)) => {
                cart.discount_code = None;
                Some(
                    errors
                        .get(FIELD)
                        .or_else(|| errors.form.first().map(String::as_str))
                        .unwrap_or(SYNC_FAILED)
                        .to_string(),
                )
            }
            Err(e) => {
                report(&e, "discount sync");
                cart.discount_synced = false;
                Some(SYNC_FAILED.to_string())
            }
        }
    }
}

/// Form-level user-errors of a discount update belong to the code input.
fn onto_discount_field(error: CheckoutError) -> CheckoutError {
    match error {
        CheckoutError::Validation(mut errors) => {
            for message in std::mem::take(&mut errors.form) {
                errors.add(FIELD, message);
            }
            CheckoutError::Validation(errors)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_errors_move_onto_discount_field() {
        let mut errors = FieldErrors::new();
        errors.add_form("Code is not valid");
        let CheckoutError::Validation(errors) = onto_discount_field(CheckoutError::Validation(errors))
        else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get(FIELD), Some("Code is not valid"));
        assert!(errors.form.is_empty());
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err = onto_discount_field(CheckoutError::rejected("expired"));
        assert!(matches!(err, CheckoutError::Rejected { .. }));
    }
}

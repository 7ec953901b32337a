//! Checkout error taxonomy.
//!
//! - [`CheckoutError::Validation`]: shown inline next to form fields.
//! - [`CheckoutError::Rejected`]: expected business rejection, shown as a toast.
//! - [`CheckoutError::ContractViolation`]: the backend broke a promise; reported
//!   and answered with a "contact support" message.
//! - Client errors: reported and translated at the call site.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use super::field_map::form_field;
use crate::commerce::{CommerceError, UserError};
use crate::payments::PaymentError;
use crate::shopify::ShopifyError;

/// Field-level validation errors keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    /// First error per field.
    pub fields: BTreeMap<String, String>,
    /// Errors that belong to no particular field.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub form: Vec<String>,
}

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single error on one field.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record an error on a field. The first message for a field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_insert_with(|| message.into());
    }

    pub fn add_form(&mut self, message: impl Into<String>) {
        self.form.push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.form.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Map mutation user-errors onto form fields.
    #[must_use]
    pub fn from_user_errors(errors: &[UserError]) -> Self {
        let mut mapped = Self::new();
        for error in errors {
            match error.field.as_deref().and_then(form_field) {
                Some(field) => mapped.add(field, error.message.clone()),
                None => mapped.add_form(error.message.clone()),
            }
        }
        mapped
    }

    /// `Err(Validation)` if any error was recorded.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` when not empty.
    pub fn into_result(self) -> Result<(), CheckoutError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::Validation(self))
        }
    }
}

/// Errors produced by the checkout flow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// User input was rejected.
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// Expected business rejection (empty cart, already paid, bad code).
    #[error("{message}")]
    Rejected { message: String },

    /// A backend returned something it promised never to return.
    #[error("Checkout contract violation: {0}")]
    ContractViolation(String),

    /// Commerce API call failed.
    #[error("Commerce error: {0}")]
    Commerce(#[from] CommerceError),

    /// Shopify API call failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// Payment gateway call failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl CheckoutError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn contract(message: impl Into<String>) -> Self {
        Self::ContractViolation(message.into())
    }

    /// Whether this error is a server-side fault worth reporting.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        !matches!(self, Self::Validation(_) | Self::Rejected { .. })
    }
}

/// Report an error that is handled without failing the request.
///
/// Used where the flow recovers (e.g. redirecting to the cart) but the
/// failure still needs to reach Sentry.
pub fn report(error: &CheckoutError, context: &'static str) {
    let event_id = sentry::capture_error(error);
    tracing::warn!(
        error = %error,
        context,
        sentry_event_id = %event_id,
        "Checkout failure handled"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_per_field_wins() {
        let mut errors = FieldErrors::new();
        errors.add("zip", "ZIP code is required");
        errors.add("zip", "ZIP code is invalid");
        assert_eq!(errors.get("zip"), Some("ZIP code is required"));
    }

    #[test]
    fn test_from_user_errors() {
        let errors = FieldErrors::from_user_errors(&[
            UserError::new(&["shippingAddress", "zip"], "Enter a valid ZIP code"),
            UserError::new(&["lineItems", "0"], "Out of stock"),
            UserError {
                field: None,
                message: "Something went wrong".to_string(),
                code: None,
            },
        ]);
        assert_eq!(errors.get("zip"), Some("Enter a valid ZIP code"));
        assert_eq!(errors.form, vec!["Out of stock", "Something went wrong"]);
    }

    #[test]
    fn test_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());
        let err = FieldErrors::single("email", "Email is required")
            .into_result()
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
        assert!(!err.is_reportable());
    }

    #[test]
    fn test_serializes_without_empty_form() {
        let json = serde_json::to_value(FieldErrors::single("card", "Declined")).unwrap();
        assert_eq!(json, serde_json::json!({ "fields": { "card": "Declined" } }));
    }

    #[test]
    fn test_reportable() {
        assert!(CheckoutError::contract("not ready").is_reportable());
        assert!(!CheckoutError::rejected("empty cart").is_reportable());
    }
}

//! Marketing opt-ins through the commerce API.
//!
//! Backs the `/subscribe/*` routes and the opt-in checkboxes on the
//! information step.

use tracing::instrument;

use wagwell_core::{CheckoutId, Email};

use crate::checkout::{CheckoutError, FieldErrors};
use crate::commerce::{SubscriptionApi, SubscriptionPayload};

/// Source recorded for newsletter sign-ups from the site footer.
pub const WEBSITE_SOURCE: &str = "Wagwell Website";

/// Source recorded for newsletter sign-ups ticked during checkout.
pub const CHECKOUT_SOURCE: &str = "Wagwell Checkout";

/// Fewest digits accepted for an SMS number.
const MIN_PHONE_DIGITS: usize = 10;

/// Marketing subscription service.
pub struct MarketingSubscriptions<'a, S> {
    api: &'a S,
}

impl<'a, S: SubscriptionApi> MarketingSubscriptions<'a, S> {
    pub const fn new(api: &'a S) -> Self {
        Self { api }
    }

    /// Subscribe a phone number to SMS updates.
    ///
    /// # Errors
    ///
    /// Returns a validation error on `phone` for a malformed number or a
    /// rejected subscription, and commerce errors as-is.
    #[instrument(skip(self, phone), fields(checkout_id = ?checkout_id.map(CheckoutId::as_str)))]
    pub async fn sms(
        &self,
        phone: &str,
        checkout_id: Option<&CheckoutId>,
    ) -> Result<(), CheckoutError> {
        let phone = normalize_phone(phone).ok_or_else(|| {
            CheckoutError::Validation(FieldErrors::single(
                "phone",
                "Please enter a valid phone number",
            ))
        })?;
        let payload = self.api.subscribe_to_sms(&phone, checkout_id).await?;
        accept(payload, "phone")
    }

    /// Subscribe an email to the newsletter.
    ///
    /// # Errors
    ///
    /// Returns a validation error on `email` for a malformed address or a
    /// rejected subscription, and commerce errors as-is.
    #[instrument(skip(self, email))]
    pub async fn email(&self, email: &str, source: &str) -> Result<(), CheckoutError> {
        let email = parse_email(email)?;
        let payload = self.api.subscribe_to_email(email.as_str(), source).await?;
        accept(payload, "email")
    }

    /// Enroll an email in the referral program.
    ///
    /// # Errors
    ///
    /// Same as [`Self::email`].
    #[instrument(skip(self, email))]
    pub async fn referral(
        &self,
        email: &str,
        referrer_code: Option<&str>,
    ) -> Result<(), CheckoutError> {
        let email = parse_email(email)?;
        let referrer_code = referrer_code.map(str::trim).filter(|c| !c.is_empty());
        let payload = self
            .api
            .subscribe_to_referral(email.as_str(), referrer_code)
            .await?;
        accept(payload, "email")
    }
}

fn parse_email(email: &str) -> Result<Email, CheckoutError> {
    Email::parse(email)
        .map_err(|e| CheckoutError::Validation(FieldErrors::single("email", e.to_string())))
}

/// Turn user-errors into field errors. Errors without a known field belong
/// to the one input the form submitted.
fn accept(payload: SubscriptionPayload, field: &str) -> Result<(), CheckoutError> {
    let mut errors = FieldErrors::from_user_errors(&payload.user_errors);
    for message in std::mem::take(&mut errors.form) {
        errors.add(field, message);
    }
    errors.into_result()
}

/// Keep digits and a leading `+`.
fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    let allowed = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' ' | '.'));
    if !allowed || digits.len() < MIN_PHONE_DIGITS {
        return None;
    }
    Some(if trimmed.starts_with('+') {
        format!("+{digits}")
    } else {
        digits
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::commerce::{CommerceError, UserError};

    #[derive(Default)]
    struct RecordingApi {
        calls: Mutex<Vec<String>>,
        reject: bool,
    }

    impl RecordingApi {
        fn payload(&self) -> SubscriptionPayload {
            SubscriptionPayload {
                user_errors: if self.reject {
                    vec![UserError {
                        field: None,
                        message: "Already subscribed".to_string(),
                        code: None,
                    }]
                } else {
                    vec![]
                },
            }
        }
    }

    impl SubscriptionApi for RecordingApi {
        async fn subscribe_to_sms(
            &self,
            phone: &str,
            _checkout_id: Option<&CheckoutId>,
        ) -> Result<SubscriptionPayload, CommerceError> {
            self.calls.lock().unwrap().push(format!("sms:{phone}"));
            Ok(self.payload())
        }

        async fn subscribe_to_email(
            &self,
            email: &str,
            source: &str,
        ) -> Result<SubscriptionPayload, CommerceError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("email:{email}:{source}"));
            Ok(self.payload())
        }

        async fn subscribe_to_referral(
            &self,
            email: &str,
            referrer_code: Option<&str>,
        ) -> Result<SubscriptionPayload, CommerceError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("referral:{email}:{}", referrer_code.unwrap_or("-")));
            Ok(self.payload())
        }
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(555) 123-4567").as_deref(), Some("5551234567"));
        assert_eq!(normalize_phone("+1 555 123 4567").as_deref(), Some("+15551234567"));
        assert_eq!(normalize_phone("555-1234"), None);
        assert_eq!(normalize_phone("call me 5551234567"), None);
    }

    #[tokio::test]
    async fn test_email_is_normalized_before_sending() {
        let api = RecordingApi::default();
        MarketingSubscriptions::new(&api)
            .email(" Rex@Example.com", WEBSITE_SOURCE)
            .await
            .unwrap();
        assert_eq!(
            *api.calls.lock().unwrap(),
            vec!["email:rex@example.com:Wagwell Website"]
        );
    }

    #[tokio::test]
    async fn test_invalid_input_is_not_sent() {
        let api = RecordingApi::default();
        let service = MarketingSubscriptions::new(&api);
        let err = service.sms("12", None).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(ref f) if f.get("phone").is_some()));
        let err = service.referral("nope", None).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(ref f) if f.get("email").is_some()));
        assert!(api.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_lands_on_submitted_field() {
        let api = RecordingApi {
            reject: true,
            ..RecordingApi::default()
        };
        let err = MarketingSubscriptions::new(&api)
            .referral("rex@example.com", Some("  "))
            .await
            .unwrap_err();
        let CheckoutError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.get("email"), Some("Already subscribed"));
        assert_eq!(
            *api.calls.lock().unwrap(),
            vec!["referral:rex@example.com:-"]
        );
    }
}

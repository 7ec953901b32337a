//! Status enums for the cart and checkout flow.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of the session cart.
///
/// A cart is `Initializing` until its lines have been loaded and validated
/// against the catalog. Checkout sync never runs against an initializing cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartStatus {
    #[default]
    Initializing,
    Ready,
}

/// A step of the checkout flow, as it appears in `/checkout/{step}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    Information,
    Payment,
    ThankYou,
}

impl CheckoutStep {
    /// Route segment for this step.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Information => "information",
            Self::Payment => "payment",
            Self::ThankYou => "thank_you",
        }
    }

    /// Absolute path of the step page.
    #[must_use]
    pub fn path(self) -> String {
        format!("/checkout/{}", self.as_str())
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unknown checkout step segment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown checkout step: {0}")]
pub struct UnknownStep(pub String);

impl FromStr for CheckoutStep {
    type Err = UnknownStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "information" => Ok(Self::Information),
            "payment" => Ok(Self::Payment),
            "thank_you" => Ok(Self::ThankYou),
            other => Err(UnknownStep(other.to_owned())),
        }
    }
}

/// Why a discount code was not applied to a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountRejection {
    NotFound,
    Expired,
    NotApplicable,
    MinimumNotMet,
    UsageLimitReached,
    /// A reason this storefront does not know yet; kept verbatim.
    #[serde(untagged)]
    Other(String),
}

impl DiscountRejection {
    /// Message shown next to the discount input or in a toast.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound => "That discount code doesn't exist.",
            Self::Expired => "That discount code has expired.",
            Self::NotApplicable => "That discount code can't be used with these items.",
            Self::MinimumNotMet => "Your order doesn't meet the minimum for this code.",
            Self::UsageLimitReached => "That discount code has already been used.",
            Self::Other(_) => "That discount code can't be applied.",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_step_round_trips_through_path_segment() {
        for step in [
            CheckoutStep::Information,
            CheckoutStep::Payment,
            CheckoutStep::ThankYou,
        ] {
            assert_eq!(step.as_str().parse::<CheckoutStep>().unwrap(), step);
        }
        assert_eq!(CheckoutStep::ThankYou.path(), "/checkout/thank_you");
    }

    #[test]
    fn test_unknown_step() {
        let err = "shipping".parse::<CheckoutStep>().unwrap_err();
        assert_eq!(err.to_string(), "unknown checkout step: shipping");
    }

    #[test]
    fn test_cart_status_default_is_initializing() {
        assert_eq!(CartStatus::default(), CartStatus::Initializing);
    }

    #[test]
    fn test_discount_rejection_deserializes_unknown_reason() {
        let known: DiscountRejection = serde_json::from_str("\"EXPIRED\"").unwrap();
        assert_eq!(known, DiscountRejection::Expired);

        let unknown: DiscountRejection = serde_json::from_str("\"REGION_LOCKED\"").unwrap();
        assert_eq!(unknown, DiscountRejection::Other("REGION_LOCKED".to_string()));
    }
}

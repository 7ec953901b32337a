//! Wire and domain types for the custom checkout API.
//!
//! The commerce API speaks camelCase GraphQL; these types deserialize its
//! responses directly and serialize mutation inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wagwell_core::{
    Address, CheckoutId, CurrencyCode, DiscountRejection, Frequency, IntervalUnit, Price,
    VariantId,
};

// =============================================================================
// Shared
// =============================================================================

/// A key/value pair attached to a checkout or a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Postal address as the commerce API spells it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailingAddress {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    pub province: String,
    pub zip: String,
    pub country_code: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl From<Address> for MailingAddress {
    fn from(a: Address) -> Self {
        Self {
            first_name: a.first_name,
            last_name: a.last_name,
            address1: a.address1,
            address2: a.address2,
            city: a.city,
            province: a.province,
            zip: a.zip,
            country_code: a.country_code,
            phone: a.phone,
        }
    }
}

impl From<MailingAddress> for Address {
    fn from(a: MailingAddress) -> Self {
        Self {
            first_name: a.first_name,
            last_name: a.last_name,
            address1: a.address1,
            address2: a.address2,
            city: a.city,
            province: a.province,
            zip: a.zip,
            country_code: a.country_code,
            phone: a.phone,
        }
    }
}

/// A structured error returned by a mutation.
///
/// `field` is the path of the offending input, e.g.
/// `["input", "shippingAddress", "zip"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl UserError {
    pub fn new(field: &[&str], message: impl Into<String>) -> Self {
        Self {
            field: Some(field.iter().map(|s| (*s).to_owned()).collect()),
            message: message.into(),
            code: None,
        }
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// A line item on the remote checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLineItem {
    pub variant_id: VariantId,
    pub title: String,
    pub quantity: u32,
    pub price: String,
    #[serde(default)]
    pub order_interval_frequency: Option<u16>,
    #[serde(default)]
    pub order_interval_unit: Option<IntervalUnit>,
    #[serde(default)]
    pub properties: Vec<Attribute>,
}

impl CheckoutLineItem {
    /// Delivery frequency, if this line is a subscription.
    #[must_use]
    pub fn frequency(&self) -> Option<Frequency> {
        match (self.order_interval_frequency, self.order_interval_unit) {
            (Some(interval), Some(unit)) => Some(Frequency::new(interval, unit)),
            _ => None,
        }
    }
}

/// A shipping option computed for the checkout's address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRate {
    pub handle: String,
    pub title: String,
    pub price: String,
}

/// The discount currently attached to a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDiscount {
    pub code: String,
    pub applicable: bool,
    #[serde(default)]
    pub reason: Option<DiscountRejection>,
    #[serde(default)]
    pub amount: Option<String>,
}

/// The custom checkout resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkout {
    pub id: CheckoutId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<MailingAddress>,
    #[serde(default)]
    pub billing_address: Option<MailingAddress>,
    #[serde(default)]
    pub line_items: Vec<CheckoutLineItem>,
    #[serde(default)]
    pub discount: Option<CheckoutDiscount>,
    /// `None` until rates have been computed for the shipping address.
    #[serde(default)]
    pub available_shipping_rates: Option<Vec<ShippingRate>>,
    #[serde(default)]
    pub shipping_line: Option<ShippingRate>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub note_attributes: Vec<Attribute>,
    pub subtotal_price: String,
    #[serde(default)]
    pub total_tax: Option<String>,
    pub total_price: String,
    #[serde(default)]
    pub currency_code: CurrencyCode,
    /// Set by the backend once billing, shipping and rate are all present.
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub order_name: Option<String>,
}

impl Checkout {
    /// Whether the payment step can be shown: an email is set and
    /// shipping rates have been computed.
    #[must_use]
    pub fn is_ready_for_payment(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.is_empty())
            && self.available_shipping_rates.is_some()
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn total(&self) -> Option<Price> {
        Price::parse(&self.total_price, self.currency_code)
    }

    #[must_use]
    pub fn subtotal(&self) -> Option<Price> {
        Price::parse(&self.subtotal_price, self.currency_code)
    }

    /// The selected shipping rate, or the first available one.
    #[must_use]
    pub fn default_shipping_rate(&self) -> Option<&ShippingRate> {
        self.shipping_line.as_ref().or_else(|| {
            self.available_shipping_rates
                .as_ref()
                .and_then(|rates| rates.first())
        })
    }
}

/// Result of a checkout create/update mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    #[serde(default)]
    pub checkout: Option<Checkout>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

/// Result of a charge attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargePayload {
    #[serde(default)]
    pub checkout: Option<Checkout>,
    /// Present when the card issuer requires step-up authentication.
    #[serde(default)]
    pub authorization_token: Option<String>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

/// Result of a marketing subscription mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPayload {
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

// =============================================================================
// Inputs
// =============================================================================

/// A line item sent to the custom checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    pub variant_id: VariantId,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_interval_frequency: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_interval_unit: Option<IntervalUnit>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Attribute>,
}

/// Input for `checkoutCreate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCreateInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub line_items: Vec<LineItemInput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub note_attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
}

/// Discount portion of `checkoutUpdate`. `code: null` removes the discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscountInput {
    pub code: Option<String>,
}

/// Input for `checkoutUpdate`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutUpdateInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<MailingAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<MailingAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_rate_handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<DiscountInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<LineItemInput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_attributes: Option<Vec<Attribute>>,
}

/// Input for `checkoutCharge`: exactly one of the two ids is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChargeInput {
    PaymentMethodId(wagwell_core::PaymentMethodId),
    PaymentIntentId(wagwell_core::PaymentIntentId),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn checkout_json() -> serde_json::Value {
        json!({
            "id": "chk_1",
            "email": "rex@example.com",
            "shippingAddress": {
                "firstName": "Rex", "lastName": "Dog", "address1": "1 Bone St",
                "city": "Austin", "province": "TX", "zip": "78701", "countryCode": "US"
            },
            "lineItems": [{
                "variantId": "v1", "title": "Hip & Joint", "quantity": 1, "price": "39.00",
                "orderIntervalFrequency": 4, "orderIntervalUnit": "week"
            }],
            "availableShippingRates": [{"handle": "std", "title": "Standard", "price": "0.00"}],
            "subtotalPrice": "39.00",
            "totalPrice": "39.00",
            "currencyCode": "USD",
            "ready": false
        })
    }

    #[test]
    fn test_checkout_deserializes_from_wire() {
        let checkout: Checkout = serde_json::from_value(checkout_json()).unwrap();
        assert!(checkout.is_ready_for_payment());
        assert!(!checkout.is_completed());
        assert_eq!(
            checkout.line_items.first().unwrap().frequency(),
            Some(Frequency::new(4, IntervalUnit::Week))
        );
        assert_eq!(checkout.default_shipping_rate().unwrap().handle, "std");
        assert_eq!(checkout.total().unwrap().to_string(), "$39.00");
    }

    #[test]
    fn test_not_ready_without_rates() {
        let mut value = checkout_json();
        value["availableShippingRates"] = serde_json::Value::Null;
        let checkout: Checkout = serde_json::from_value(value).unwrap();
        assert!(!checkout.is_ready_for_payment());
    }

    #[test]
    fn test_discount_removal_serializes_null_code() {
        let input = CheckoutUpdateInput {
            discount: Some(DiscountInput { code: None }),
            ..CheckoutUpdateInput::default()
        };
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({ "discount": { "code": null } })
        );
    }

    #[test]
    fn test_charge_input_is_single_keyed() {
        let input = ChargeInput::PaymentIntentId("pi_1".into());
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({ "paymentIntentId": "pi_1" })
        );
    }

    #[test]
    fn test_address_field_parity() {
        let address = Address {
            first_name: "Rex".into(),
            last_name: "Dog".into(),
            address1: "1 Bone St".into(),
            address2: Some("Unit 2".into()),
            city: "Austin".into(),
            province: "TX".into(),
            zip: "78701".into(),
            country_code: "US".into(),
            phone: Some("5125550100".into()),
        };
        let round_tripped = Address::from(MailingAddress::from(address.clone()));
        assert_eq!(round_tripped, address);
    }
}

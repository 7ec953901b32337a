//! GraphQL operation definitions for the custom checkout API.

use serde::{Deserialize, Serialize};

use wagwell_core::CheckoutId;

use super::types::{
    ChargeInput, ChargePayload, Checkout, CheckoutCreateInput, CheckoutPayload,
    CheckoutUpdateInput, SubscriptionPayload,
};
use crate::graphql_operation;

/// Append the shared checkout selection fragments to an operation.
macro_rules! with_checkout_fields {
    ($body:literal) => {
        concat!(
            $body,
            r"
fragment CheckoutFields on Checkout {
  id
  email
  shippingAddress { ...AddressFields }
  billingAddress { ...AddressFields }
  lineItems {
    variantId
    title
    quantity
    price
    orderIntervalFrequency
    orderIntervalUnit
    properties { key value }
  }
  discount { code applicable reason amount }
  availableShippingRates { handle title price }
  shippingLine { handle title price }
  note
  noteAttributes { key value }
  subtotalPrice
  totalTax
  totalPrice
  currencyCode
  ready
  completedAt
  orderName
}

fragment AddressFields on MailingAddress {
  firstName
  lastName
  address1
  address2
  city
  province
  zip
  countryCode
  phone
}
"
        )
    };
}

// =============================================================================
// Checkout queries
// =============================================================================

pub const CHECKOUT: &str = with_checkout_fields!(
    r"query Checkout($id: ID!) {
  checkout(id: $id) { ...CheckoutFields }
}
"
);

pub const CHECKOUT_COMPLETED: &str = with_checkout_fields!(
    r"query CheckoutCompleted($id: ID!) {
  checkout: completedCheckout(id: $id) { ...CheckoutFields }
}
"
);

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutVariables {
    pub id: CheckoutId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutData {
    pub checkout: Option<Checkout>,
}

graphql_operation!(
    /// `CHECKOUT`: fetch an in-progress checkout.
    CheckoutQuery, "Checkout", CHECKOUT,
    CheckoutVariables => CheckoutData
);

graphql_operation!(
    /// `CHECKOUT_COMPLETED`: fetch a checkout after payment.
    CheckoutCompletedQuery, "CheckoutCompleted", CHECKOUT_COMPLETED,
    CheckoutVariables => CheckoutData
);

// =============================================================================
// Checkout mutations
// =============================================================================

pub const CHECKOUT_CREATE: &str = with_checkout_fields!(
    r"mutation CheckoutCreate($input: CheckoutCreateInput!) {
  checkoutCreate(input: $input) {
    checkout { ...CheckoutFields }
    userErrors { field message code }
  }
}
"
);

pub const CHECKOUT_UPDATE: &str = with_checkout_fields!(
    r"mutation CheckoutUpdate($id: ID!, $input: CheckoutUpdateInput!) {
  checkoutUpdate(id: $id, input: $input) {
    checkout { ...CheckoutFields }
    userErrors { field message code }
  }
}
"
);

pub const CHECKOUT_CHARGE: &str = with_checkout_fields!(
    r"mutation CheckoutCharge($id: ID!, $input: CheckoutChargeInput!) {
  checkoutCharge(id: $id, input: $input) {
    checkout { ...CheckoutFields }
    authorizationToken
    userErrors { field message code }
  }
}
"
);

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutCreateVariables {
    pub input: CheckoutCreateInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCreateData {
    pub checkout_create: Option<CheckoutPayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutUpdateVariables {
    pub id: CheckoutId,
    pub input: CheckoutUpdateInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutUpdateData {
    pub checkout_update: Option<CheckoutPayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutChargeVariables {
    pub id: CheckoutId,
    pub input: ChargeInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutChargeData {
    pub checkout_charge: Option<ChargePayload>,
}

graphql_operation!(
    /// `CHECKOUT_CREATE`: open a custom checkout for the cart.
    CheckoutCreateMutation, "CheckoutCreate", CHECKOUT_CREATE,
    CheckoutCreateVariables => CheckoutCreateData
);

graphql_operation!(
    /// `CHECKOUT_UPDATE`: patch email, addresses, rate, note, discount or lines.
    CheckoutUpdateMutation, "CheckoutUpdate", CHECKOUT_UPDATE,
    CheckoutUpdateVariables => CheckoutUpdateData
);

graphql_operation!(
    /// `CHECKOUT_CHARGE`: charge a payment method or a confirmed intent.
    CheckoutChargeMutation, "CheckoutCharge", CHECKOUT_CHARGE,
    CheckoutChargeVariables => CheckoutChargeData
);

// =============================================================================
// Marketing subscriptions
// =============================================================================

pub const SUBSCRIBE_TO_SMS: &str = r"mutation SubscribeToSms($phone: String!, $checkoutId: ID) {
  subscribeToSms(phone: $phone, checkoutId: $checkoutId) {
    userErrors { field message code }
  }
}
";

pub const SUBSCRIBE_TO_EMAIL: &str = r"mutation SubscribeToEmail($email: String!, $source: String!) {
  subscribeToEmail(email: $email, source: $source) {
    userErrors { field message code }
  }
}
";

pub const SUBSCRIBE_TO_REFERRAL: &str = r"mutation SubscribeToReferral($email: String!, $referrerCode: String) {
  subscribeToReferral(email: $email, referrerCode: $referrerCode) {
    userErrors { field message code }
  }
}
";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeToSmsVariables {
    pub phone: String,
    pub checkout_id: Option<CheckoutId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeToSmsData {
    pub subscribe_to_sms: Option<SubscriptionPayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeToEmailVariables {
    pub email: String,
    pub source: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeToEmailData {
    pub subscribe_to_email: Option<SubscriptionPayload>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeToReferralVariables {
    pub email: String,
    pub referrer_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeToReferralData {
    pub subscribe_to_referral: Option<SubscriptionPayload>,
}

graphql_operation!(
    /// `SUBSCRIBE_TO_SMS`
    SubscribeToSmsMutation, "SubscribeToSms", SUBSCRIBE_TO_SMS,
    SubscribeToSmsVariables => SubscribeToSmsData
);

graphql_operation!(
    /// `SUBSCRIBE_TO_EMAIL`
    SubscribeToEmailMutation, "SubscribeToEmail", SUBSCRIBE_TO_EMAIL,
    SubscribeToEmailVariables => SubscribeToEmailData
);

graphql_operation!(
    /// `SUBSCRIBE_TO_REFERRAL`
    SubscribeToReferralMutation, "SubscribeToReferral", SUBSCRIBE_TO_REFERRAL,
    SubscribeToReferralVariables => SubscribeToReferralData
);

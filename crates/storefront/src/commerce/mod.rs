//! Custom checkout (commerce) API client.
//!
//! The brand's own checkout backend: ReCharge-style subscriptions, Stripe
//! charges and marketing opt-ins, exposed over GraphQL.
//!
//! Services talk to it through the [`CheckoutApi`] and [`SubscriptionApi`]
//! traits so the checkout flow can be exercised against in-memory fakes.

mod client;
pub mod queries;
pub mod types;

use std::future::Future;

use thiserror::Error;

use wagwell_core::CheckoutId;

use crate::graphql::TransportError;

pub use client::CommerceClient;
pub use types::*;

/// Errors that can occur when interacting with the commerce API.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// Transport, GraphQL or parse failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Mutation returned no payload at all.
    #[error("{0} returned no payload")]
    MissingPayload(&'static str),
}

/// Checkout operations of the commerce API.
pub trait CheckoutApi: Send + Sync {
    /// `CHECKOUT`
    fn checkout(
        &self,
        id: &CheckoutId,
    ) -> impl Future<Output = Result<Checkout, CommerceError>> + Send;

    /// `CHECKOUT_CREATE`
    fn create_checkout(
        &self,
        input: CheckoutCreateInput,
    ) -> impl Future<Output = Result<CheckoutPayload, CommerceError>> + Send;

    /// `CHECKOUT_UPDATE`
    fn update_checkout(
        &self,
        id: &CheckoutId,
        input: CheckoutUpdateInput,
    ) -> impl Future<Output = Result<CheckoutPayload, CommerceError>> + Send;

    /// `CHECKOUT_COMPLETED`
    fn completed_checkout(
        &self,
        id: &CheckoutId,
    ) -> impl Future<Output = Result<Checkout, CommerceError>> + Send;

    /// `CHECKOUT_CHARGE`
    fn charge(
        &self,
        id: &CheckoutId,
        input: ChargeInput,
    ) -> impl Future<Output = Result<ChargePayload, CommerceError>> + Send;
}

/// Marketing opt-in operations of the commerce API.
pub trait SubscriptionApi: Send + Sync {
    /// `SUBSCRIBE_TO_SMS`
    fn subscribe_to_sms(
        &self,
        phone: &str,
        checkout_id: Option<&CheckoutId>,
    ) -> impl Future<Output = Result<SubscriptionPayload, CommerceError>> + Send;

    /// `SUBSCRIBE_TO_EMAIL`
    fn subscribe_to_email(
        &self,
        email: &str,
        source: &str,
    ) -> impl Future<Output = Result<SubscriptionPayload, CommerceError>> + Send;

    /// `SUBSCRIBE_TO_REFERRAL`
    fn subscribe_to_referral(
        &self,
        email: &str,
        referrer_code: Option<&str>,
    ) -> impl Future<Output = Result<SubscriptionPayload, CommerceError>> + Send;
}

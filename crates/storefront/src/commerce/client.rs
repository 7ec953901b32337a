//! Commerce API client implementation.
//!
//! Nothing here is cached: every call reads or mutates live checkout state.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderName;
use tracing::instrument;

use wagwell_core::CheckoutId;

use super::queries::{
    CheckoutChargeMutation, CheckoutChargeVariables, CheckoutCompletedQuery,
    CheckoutCreateMutation, CheckoutCreateVariables, CheckoutQuery, CheckoutUpdateMutation,
    CheckoutUpdateVariables, CheckoutVariables, SubscribeToEmailMutation,
    SubscribeToEmailVariables, SubscribeToReferralMutation, SubscribeToReferralVariables,
    SubscribeToSmsMutation, SubscribeToSmsVariables,
};
use super::types::{
    ChargeInput, ChargePayload, Checkout, CheckoutCreateInput, CheckoutPayload,
    CheckoutUpdateInput, SubscriptionPayload,
};
use super::{CheckoutApi, CommerceError, SubscriptionApi};
use crate::config::CommerceConfig;
use crate::graphql::{AuthHeader, GraphQLTransport};

/// Header carrying the commerce API access token.
const ACCESS_TOKEN_HEADER: &str = "x-commerce-access-token";

/// Client for the custom checkout API.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<GraphQLTransport>,
}

impl CommerceClient {
    /// Create a new commerce API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &CommerceConfig, timeout: Duration) -> Result<Self, CommerceError> {
        let transport = GraphQLTransport::new(
            config.api_url.clone(),
            AuthHeader {
                name: HeaderName::from_static(ACCESS_TOKEN_HEADER),
                value: config.api_token.clone(),
            },
            timeout,
        )?;

        Ok(Self {
            inner: Arc::new(transport),
        })
    }
}

impl CheckoutApi for CommerceClient {
    #[instrument(skip(self), fields(checkout_id = %id))]
    async fn checkout(&self, id: &CheckoutId) -> Result<Checkout, CommerceError> {
        let data = self
            .inner
            .execute::<CheckoutQuery>(CheckoutVariables { id: id.clone() })
            .await?;

        data.checkout
            .ok_or_else(|| CommerceError::NotFound(format!("Checkout not found: {id}")))
    }

    #[instrument(skip(self, input), fields(lines = input.line_items.len()))]
    async fn create_checkout(
        &self,
        input: CheckoutCreateInput,
    ) -> Result<CheckoutPayload, CommerceError> {
        let data = self
            .inner
            .execute::<CheckoutCreateMutation>(CheckoutCreateVariables { input })
            .await?;

        data.checkout_create
            .ok_or(CommerceError::MissingPayload("checkoutCreate"))
    }

    #[instrument(skip(self, input), fields(checkout_id = %id))]
    async fn update_checkout(
        &self,
        id: &CheckoutId,
        input: CheckoutUpdateInput,
    ) -> Result<CheckoutPayload, CommerceError> {
        let data = self
            .inner
            .execute::<CheckoutUpdateMutation>(CheckoutUpdateVariables {
                id: id.clone(),
                input,
            })
            .await?;

        data.checkout_update
            .ok_or(CommerceError::MissingPayload("checkoutUpdate"))
    }

    #[instrument(skip(self), fields(checkout_id = %id))]
    async fn completed_checkout(&self, id: &CheckoutId) -> Result<Checkout, CommerceError> {
        let data = self
            .inner
            .execute::<CheckoutCompletedQuery>(CheckoutVariables { id: id.clone() })
            .await?;

        data.checkout
            .ok_or_else(|| CommerceError::NotFound(format!("Completed checkout not found: {id}")))
    }

    #[instrument(skip(self, input), fields(checkout_id = %id))]
    async fn charge(
        &self,
        id: &CheckoutId,
        input: ChargeInput,
    ) -> Result<ChargePayload, CommerceError> {
        let data = self
            .inner
            .execute::<CheckoutChargeMutation>(CheckoutChargeVariables {
                id: id.clone(),
                input,
            })
            .await?;

        data.checkout_charge
            .ok_or(CommerceError::MissingPayload("checkoutCharge"))
    }
}

impl SubscriptionApi for CommerceClient {
    #[instrument(skip(self, phone))]
    async fn subscribe_to_sms(
        &self,
        phone: &str,
        checkout_id: Option<&CheckoutId>,
    ) -> Result<SubscriptionPayload, CommerceError> {
        let data = self
            .inner
            .execute::<SubscribeToSmsMutation>(SubscribeToSmsVariables {
                phone: phone.to_owned(),
                checkout_id: checkout_id.cloned(),
            })
            .await?;

        data.subscribe_to_sms
            .ok_or(CommerceError::MissingPayload("subscribeToSms"))
    }

    #[instrument(skip(self, email))]
    async fn subscribe_to_email(
        &self,
        email: &str,
        source: &str,
    ) -> Result<SubscriptionPayload, CommerceError> {
        let data = self
            .inner
            .execute::<SubscribeToEmailMutation>(SubscribeToEmailVariables {
                email: email.to_owned(),
                source: source.to_owned(),
            })
            .await?;

        data.subscribe_to_email
            .ok_or(CommerceError::MissingPayload("subscribeToEmail"))
    }

    #[instrument(skip(self, email))]
    async fn subscribe_to_referral(
        &self,
        email: &str,
        referrer_code: Option<&str>,
    ) -> Result<SubscriptionPayload, CommerceError> {
        let data = self
            .inner
            .execute::<SubscribeToReferralMutation>(SubscribeToReferralVariables {
                email: email.to_owned(),
                referrer_code: referrer_code.map(str::to_owned),
            })
            .await?;

        data.subscribe_to_referral
            .ok_or(CommerceError::MissingPayload("subscribeToReferral"))
    }
}

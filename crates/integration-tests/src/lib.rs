//! Checkout flow integration tests for Wagwell.
//!
//! The checkout services are generic over the client traits, so the flow
//! runs here end to end against in-memory fakes: no database, no network.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p wagwell-integration-tests
//! ```
//!
//! # Fakes
//!
//! - [`FakeCommerce`] - custom checkout API; keeps checkouts in memory and
//!   records every call
//! - [`FakeHosted`] - Shopify hosted checkout with a configurable failure mode
//! - [`FakeGateway`] - payment gateway recording payment methods and step-ups

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rust_decimal::Decimal;
use tower_sessions::{MemoryStore, Session};
use uuid::Uuid;

use wagwell_core::{
    Address, CheckoutId, CurrencyCode, DiscountRejection, Frequency, IntervalUnit,
    PaymentIntentId, PaymentMethodId, Price, VariantId,
};
use wagwell_storefront::checkout::{InformationForm, PaymentForm};
use wagwell_storefront::commerce::{
    ChargeInput, ChargePayload, Checkout, CheckoutApi, CheckoutCreateInput, CheckoutDiscount,
    CheckoutLineItem, CheckoutPayload, CheckoutUpdateInput, CommerceError, LineItemInput,
    ShippingRate, SubscriptionApi, SubscriptionPayload, UserError,
};
use wagwell_storefront::graphql::TransportError;
use wagwell_storefront::models::{Cart, CartLine};
use wagwell_storefront::payments::{PaymentError, PaymentGateway, PaymentMethodRequest};
use wagwell_storefront::shopify::{
    HostedCheckout, HostedCheckoutApi, HostedCheckoutPayload, HostedLineItemInput, ShopifyError,
};

// =============================================================================
// Fixtures
// =============================================================================

/// A one-time purchase line.
#[must_use]
pub fn one_time_line(variant: &str) -> CartLine {
    CartLine {
        key: Uuid::new_v4(),
        variant_id: VariantId::new(variant),
        product_handle: "hip-joint".to_string(),
        sku: Some("HJ-30".to_string()),
        title: "Hip & Joint".to_string(),
        quantity: 1,
        frequency: None,
        unit_price: Price::new(Decimal::new(3900, 2), CurrencyCode::USD),
        properties: vec![],
    }
}

/// A subscription line delivered every four weeks.
#[must_use]
pub fn subscription_line(variant: &str) -> CartLine {
    CartLine {
        frequency: Some(Frequency::new(4, IntervalUnit::Week)),
        ..one_time_line(variant)
    }
}

/// A cart that finished loading from the session.
#[must_use]
pub fn ready_cart(lines: Vec<CartLine>) -> Cart {
    let mut cart = Cart::default();
    cart.mark_ready();
    for line in lines {
        cart.add(line);
    }
    cart
}

/// A fresh in-memory session.
#[must_use]
pub fn session() -> Session {
    Session::new(None, Arc::new(MemoryStore::default()), None)
}

/// A complete US shipping address.
#[must_use]
pub fn shipping_address() -> Address {
    Address {
        first_name: "Rex".to_string(),
        last_name: "Dog".to_string(),
        address1: "1 Bone St".to_string(),
        address2: Some("Unit 4".to_string()),
        city: "Portland".to_string(),
        province: "OR".to_string(),
        zip: "97201".to_string(),
        country_code: "US".to_string(),
        phone: Some("+15035550100".to_string()),
    }
}

/// A valid information step submission without opt-ins.
#[must_use]
pub fn information_form() -> InformationForm {
    InformationForm {
        email: "Rex@Example.com".to_string(),
        shipping_address: shipping_address(),
        ..InformationForm::default()
    }
}

/// A payment submission billing to the shipping address.
#[must_use]
pub fn payment_form() -> PaymentForm {
    PaymentForm {
        card_token: "tok_visa".to_string(),
        billing_same_as_shipping: true,
        billing_address: Address::default(),
        shipping_rate: None,
        note: None,
    }
}

/// An empty in-progress checkout.
#[must_use]
pub fn empty_checkout(id: &str) -> Checkout {
    Checkout {
        id: CheckoutId::new(id),
        email: None,
        shipping_address: None,
        billing_address: None,
        line_items: vec![],
        discount: None,
        available_shipping_rates: None,
        shipping_line: None,
        note: None,
        note_attributes: vec![],
        subtotal_price: "0.00".to_string(),
        total_tax: None,
        total_price: "0.00".to_string(),
        currency_code: CurrencyCode::USD,
        ready: false,
        completed_at: None,
        order_name: None,
    }
}

fn standard_rate() -> ShippingRate {
    ShippingRate {
        handle: "standard".to_string(),
        title: "Standard".to_string(),
        price: "0.00".to_string(),
    }
}

fn checkout_line(input: &LineItemInput) -> CheckoutLineItem {
    CheckoutLineItem {
        variant_id: input.variant_id.clone(),
        title: input.variant_id.to_string(),
        quantity: input.quantity,
        price: "39.00".to_string(),
        order_interval_frequency: input.order_interval_frequency,
        order_interval_unit: input.order_interval_unit,
        properties: input.properties.clone(),
    }
}

fn discount_for(code: String, valid: &[String]) -> CheckoutDiscount {
    let applicable = valid.contains(&code);
    CheckoutDiscount {
        code,
        applicable,
        reason: (!applicable).then_some(DiscountRejection::NotFound),
        amount: None,
    }
}

// =============================================================================
// Commerce API
// =============================================================================

/// A call made against [`FakeCommerce`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommerceCall {
    Checkout(CheckoutId),
    Create(CheckoutCreateInput),
    Update(CheckoutId, CheckoutUpdateInput),
    Completed(CheckoutId),
    Charge(CheckoutId, ChargeInput),
    Sms(String),
    Email(String),
    Referral(String),
}

impl CommerceCall {
    /// Whether this call changes remote state.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(self, Self::Create(_) | Self::Update(..) | Self::Charge(..))
    }
}

/// What the next `checkoutCharge` answers.
#[derive(Debug, Clone)]
pub enum ChargeStep {
    /// Payment goes through and the checkout completes.
    Complete,
    /// The issuer wants step-up authentication with this client secret.
    RequireAction(String),
    /// The charge is refused with a user-error.
    UserError(String),
}

/// How the next `checkoutUpdate` fails.
enum UpdateFailure {
    UserErrors(Vec<UserError>),
    Unavailable,
}

#[derive(Default)]
struct CommerceState {
    checkouts: Vec<Checkout>,
    calls: Vec<CommerceCall>,
    update_failures: VecDeque<UpdateFailure>,
    create_errors: VecDeque<Vec<UserError>>,
    charge_script: VecDeque<ChargeStep>,
    valid_discounts: Vec<String>,
    next_id: u32,
}

/// In-memory custom checkout API.
#[derive(Clone, Default)]
pub struct FakeCommerce {
    state: Arc<Mutex<CommerceState>>,
}

impl FakeCommerce {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `code` as an applicable discount.
    #[must_use]
    pub fn with_discount(self, code: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .valid_discounts
            .push(code.to_string());
        self
    }

    /// Store a checkout as if it had been created earlier.
    pub fn insert_checkout(&self, checkout: Checkout) {
        self.state.lock().unwrap().checkouts.push(checkout);
    }

    /// Answer the next `checkoutUpdate` with these user-errors.
    pub fn fail_next_update(&self, errors: Vec<UserError>) {
        self.state
            .lock()
            .unwrap()
            .update_failures
            .push_back(UpdateFailure::UserErrors(errors));
    }

    /// Fail the next `checkoutUpdate` in transport, as a rate-limited API
    /// would.
    pub fn fail_next_update_unavailable(&self) {
        self.state
            .lock()
            .unwrap()
            .update_failures
            .push_back(UpdateFailure::Unavailable);
    }

    /// Answer the next `checkoutCreate` with these user-errors.
    pub fn fail_next_create(&self, errors: Vec<UserError>) {
        self.state.lock().unwrap().create_errors.push_back(errors);
    }

    /// Script the answers of the next charges. Unscripted charges complete.
    pub fn script_charges(&self, steps: impl IntoIterator<Item = ChargeStep>) {
        self.state.lock().unwrap().charge_script.extend(steps);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<CommerceCall> {
        self.state.lock().unwrap().calls.clone()
    }

    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.calls().iter().filter(|c| c.is_mutation()).count()
    }

    #[must_use]
    pub fn charges(&self) -> Vec<ChargeInput> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                CommerceCall::Charge(_, input) => Some(input),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn updates(&self) -> Vec<CheckoutUpdateInput> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                CommerceCall::Update(_, input) => Some(input),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn stored(&self, id: &CheckoutId) -> Option<Checkout> {
        self.state
            .lock()
            .unwrap()
            .checkouts
            .iter()
            .find(|c| &c.id == id)
            .cloned()
    }

    fn record(&self, call: CommerceCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn not_found(id: &CheckoutId) -> CommerceError {
    CommerceError::NotFound(format!("Checkout not found: {id}"))
}

fn apply_update(checkout: &mut Checkout, input: CheckoutUpdateInput, valid_discounts: &[String]) {
    if let Some(email) = input.email {
        checkout.email = Some(email);
    }
    if let Some(address) = input.shipping_address {
        checkout.shipping_address = Some(address);
        checkout.available_shipping_rates = Some(vec![standard_rate()]);
    }
    if let Some(address) = input.billing_address {
        checkout.billing_address = Some(address);
    }
    if let Some(handle) = input.shipping_rate_handle {
        checkout.shipping_line = checkout
            .available_shipping_rates
            .as_ref()
            .and_then(|rates| rates.iter().find(|r| r.handle == handle).cloned());
    }
    if let Some(note) = input.note {
        checkout.note = Some(note);
    }
    if let Some(discount) = input.discount {
        checkout.discount = discount.code.map(|code| discount_for(code, valid_discounts));
    }
    if let Some(lines) = input.line_items {
        checkout.line_items = lines.iter().map(checkout_line).collect();
    }
    if let Some(attributes) = input.note_attributes {
        checkout.note_attributes = attributes;
    }
    checkout.ready = checkout.email.is_some()
        && checkout.billing_address.is_some()
        && checkout.shipping_line.is_some();
}

impl CheckoutApi for FakeCommerce {
    async fn checkout(&self, id: &CheckoutId) -> Result<Checkout, CommerceError> {
        self.record(CommerceCall::Checkout(id.clone()));
        self.stored(id).ok_or_else(|| not_found(id))
    }

    async fn create_checkout(
        &self,
        input: CheckoutCreateInput,
    ) -> Result<CheckoutPayload, CommerceError> {
        self.record(CommerceCall::Create(input.clone()));
        let mut state = self.state.lock().unwrap();
        if let Some(user_errors) = state.create_errors.pop_front() {
            return Ok(CheckoutPayload {
                checkout: None,
                user_errors,
            });
        }

        state.next_id += 1;
        let mut checkout = empty_checkout(&format!("chk_{}", state.next_id));
        checkout.email = input.email;
        checkout.line_items = input.line_items.iter().map(checkout_line).collect();
        checkout.note_attributes = input.note_attributes;
        checkout.discount = input
            .discount_code
            .map(|code| discount_for(code, &state.valid_discounts));
        state.checkouts.push(checkout.clone());

        Ok(CheckoutPayload {
            checkout: Some(checkout),
            user_errors: vec![],
        })
    }

    async fn update_checkout(
        &self,
        id: &CheckoutId,
        input: CheckoutUpdateInput,
    ) -> Result<CheckoutPayload, CommerceError> {
        self.record(CommerceCall::Update(id.clone(), input.clone()));
        let mut state = self.state.lock().unwrap();
        match state.update_failures.pop_front() {
            Some(UpdateFailure::UserErrors(user_errors)) => {
                return Ok(CheckoutPayload {
                    checkout: None,
                    user_errors,
                });
            }
            Some(UpdateFailure::Unavailable) => {
                return Err(CommerceError::Transport(TransportError::RateLimited(1)));
            }
            None => {}
        }

        let valid_discounts = state.valid_discounts.clone();
        let checkout = state
            .checkouts
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| not_found(id))?;
        apply_update(checkout, input, &valid_discounts);

        Ok(CheckoutPayload {
            checkout: Some(checkout.clone()),
            user_errors: vec![],
        })
    }

    async fn completed_checkout(&self, id: &CheckoutId) -> Result<Checkout, CommerceError> {
        self.record(CommerceCall::Completed(id.clone()));
        self.stored(id).ok_or_else(|| not_found(id))
    }

    async fn charge(&self, id: &CheckoutId, input: ChargeInput) -> Result<ChargePayload, CommerceError> {
        self.record(CommerceCall::Charge(id.clone(), input));
        let mut state = self.state.lock().unwrap();
        let step = state.charge_script.pop_front().unwrap_or(ChargeStep::Complete);
        let checkout = state
            .checkouts
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| not_found(id))?;

        Ok(match step {
            ChargeStep::Complete => {
                checkout.completed_at = Some(Utc::now());
                checkout.order_name = Some("#1001".to_string());
                ChargePayload {
                    checkout: Some(checkout.clone()),
                    ..ChargePayload::default()
                }
            }
            ChargeStep::RequireAction(token) => ChargePayload {
                checkout: Some(checkout.clone()),
                authorization_token: Some(token),
                user_errors: vec![],
            },
            ChargeStep::UserError(message) => ChargePayload {
                user_errors: vec![UserError::new(&["payment"], message)],
                ..ChargePayload::default()
            },
        })
    }
}

impl SubscriptionApi for FakeCommerce {
    async fn subscribe_to_sms(
        &self,
        phone: &str,
        _checkout_id: Option<&CheckoutId>,
    ) -> Result<SubscriptionPayload, CommerceError> {
        self.record(CommerceCall::Sms(phone.to_string()));
        Ok(SubscriptionPayload::default())
    }

    async fn subscribe_to_email(
        &self,
        email: &str,
        _source: &str,
    ) -> Result<SubscriptionPayload, CommerceError> {
        self.record(CommerceCall::Email(email.to_string()));
        Ok(SubscriptionPayload::default())
    }

    async fn subscribe_to_referral(
        &self,
        email: &str,
        _referrer_code: Option<&str>,
    ) -> Result<SubscriptionPayload, CommerceError> {
        self.record(CommerceCall::Referral(email.to_string()));
        Ok(SubscriptionPayload::default())
    }
}

// =============================================================================
// Hosted checkout
// =============================================================================

/// How [`FakeHosted`] answers checkout mutations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostedBehavior {
    #[default]
    Succeed,
    /// Payload without a checkout and without user-errors.
    EmptyPayload,
    /// "Invalid cart" user-errors.
    UserErrors,
    /// The request itself fails.
    Fail,
}

/// A call made against [`FakeHosted`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostedCall {
    Create(Vec<HostedLineItemInput>),
    Replace(CheckoutId, Vec<HostedLineItemInput>),
}

/// In-memory Shopify hosted checkout.
#[derive(Clone, Default)]
pub struct FakeHosted {
    behavior: HostedBehavior,
    calls: Arc<Mutex<Vec<HostedCall>>>,
}

impl FakeHosted {
    #[must_use]
    pub fn new(behavior: HostedBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::default(),
        }
    }

    #[must_use]
    pub fn calls(&self) -> Vec<HostedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, id: &str) -> Result<HostedCheckoutPayload, ShopifyError> {
        match self.behavior {
            HostedBehavior::Succeed => Ok(HostedCheckoutPayload {
                checkout: Some(HostedCheckout {
                    id: CheckoutId::new(id),
                    web_url: "https://shop.wagwell.test/checkouts/abc".to_string(),
                }),
                user_errors: vec![],
            }),
            HostedBehavior::EmptyPayload => Ok(HostedCheckoutPayload::default()),
            HostedBehavior::UserErrors => Ok(HostedCheckoutPayload {
                checkout: None,
                user_errors: vec![UserError::new(&["lineItems"], "invalid cart")],
            }),
            HostedBehavior::Fail => Err(ShopifyError::MissingPayload("checkoutCreate")),
        }
    }
}

impl HostedCheckoutApi for FakeHosted {
    async fn create_checkout(
        &self,
        line_items: Vec<HostedLineItemInput>,
    ) -> Result<HostedCheckoutPayload, ShopifyError> {
        self.calls.lock().unwrap().push(HostedCall::Create(line_items));
        self.answer("gid://shopify/Checkout/abc")
    }

    async fn replace_line_items(
        &self,
        id: &CheckoutId,
        line_items: Vec<HostedLineItemInput>,
    ) -> Result<HostedCheckoutPayload, ShopifyError> {
        self.calls
            .lock()
            .unwrap()
            .push(HostedCall::Replace(id.clone(), line_items));
        self.answer(id.as_str())
    }
}

// =============================================================================
// Payment gateway
// =============================================================================

#[derive(Default)]
struct GatewayState {
    payment_methods: Vec<PaymentMethodRequest>,
    card_actions: Vec<PaymentIntentId>,
    decline: Option<String>,
    challenge_failure: Option<String>,
}

/// In-memory payment gateway.
#[derive(Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl FakeGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decline every card with `message`.
    #[must_use]
    pub fn declining(message: &str) -> Self {
        let gateway = Self::default();
        gateway.state.lock().unwrap().decline = Some(message.to_string());
        gateway
    }

    /// Report every card challenge as failed with `message`.
    #[must_use]
    pub fn failing_challenges(message: &str) -> Self {
        let gateway = Self::default();
        gateway.state.lock().unwrap().challenge_failure = Some(message.to_string());
        gateway
    }

    #[must_use]
    pub fn payment_methods(&self) -> Vec<PaymentMethodRequest> {
        self.state.lock().unwrap().payment_methods.clone()
    }

    /// Payment intents checked after a card challenge.
    #[must_use]
    pub fn card_actions(&self) -> Vec<PaymentIntentId> {
        self.state.lock().unwrap().card_actions.clone()
    }
}

impl PaymentGateway for FakeGateway {
    async fn create_payment_method(
        &self,
        request: &PaymentMethodRequest,
    ) -> Result<PaymentMethodId, PaymentError> {
        let mut state = self.state.lock().unwrap();
        state.payment_methods.push(request.clone());
        match &state.decline {
            Some(message) => Err(PaymentError::Card {
                message: message.clone(),
            }),
            None => Ok(PaymentMethodId::new("pm_1")),
        }
    }

    async fn confirm_card_action(
        &self,
        payment_intent_id: &PaymentIntentId,
    ) -> Result<PaymentIntentId, PaymentError> {
        let mut state = self.state.lock().unwrap();
        state.card_actions.push(payment_intent_id.clone());
        match &state.challenge_failure {
            Some(message) => Err(PaymentError::Card {
                message: message.clone(),
            }),
            None => Ok(payment_intent_id.clone()),
        }
    }
}

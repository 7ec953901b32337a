//! Checkout route handlers.
//!
//! Step loads run the checkout sync (or the thank-you confirmation) and
//! answer with the checkout, a redirect, or `202 Accepted` while the cart is
//! still initializing. Step submissions share the `/{step}` path with the
//! loads and are dispatched on the parsed step.
//!
//! Every handler writes the cart back before surfacing a service error so
//! latches set during a failed call survive.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::instrument;

use wagwell_core::{CheckoutId, CheckoutStep, PaymentIntentId};

use crate::checkout::{
    CheckoutSync, DiscountService, InformationForm, InformationStep, PaymentForm, PaymentOutcome,
    PaymentStep, SyncOutcome, thank_you,
};
use crate::commerce::{Checkout, CheckoutApi};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::SessionCart;
use crate::state::AppState;

const CART_PATH: &str = "/cart";

/// Query string of the thank-you page.
#[derive(Debug, Default, Deserialize)]
pub struct ThankYouQuery {
    pub checkout_id: Option<String>,
}

/// Step load response.
#[derive(Debug, Serialize)]
pub struct StepView {
    pub step: CheckoutStep,
    pub checkout: Option<Checkout>,
    /// One-off message for the page (discount sync problems).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toast: Option<String>,
}

/// Thank-you page response.
#[derive(Debug, Serialize)]
pub struct ThankYouView {
    pub checkout: Checkout,
    /// Fire purchase analytics only when this is set.
    pub first_time_accessed: bool,
}

/// Email-only update request.
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

/// Continuation after the browser's card challenge.
#[derive(Debug, Deserialize)]
pub struct AuthenticationRequest {
    pub payment_intent_id: PaymentIntentId,
}

/// Discount code request.
#[derive(Debug, Deserialize)]
pub struct DiscountRequest {
    pub code: String,
}

fn parse_step(step: &str) -> Result<CheckoutStep> {
    step.parse()
        .map_err(|_| AppError::NotFound(format!("checkout step {step}")))
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Paid checkouts redirect to the thank-you page. A step-up answers with
/// the client secret for the browser's card challenge.
fn payment_response(outcome: PaymentOutcome) -> Response {
    match outcome {
        PaymentOutcome::Paid { checkout, redirect } => {
            add_breadcrumb(
                "checkout",
                "Payment completed",
                Some(&[("checkout_id", checkout.id.as_str())]),
            );
            Redirect::to(&redirect).into_response()
        }
        PaymentOutcome::RequiresAction { client_secret } => Json(json!({
            "status": "requires_action",
            "client_secret": client_secret,
        }))
        .into_response(),
    }
}

/// Load a checkout step.
#[instrument(skip(state, cart, query))]
pub async fn load(
    State(state): State<AppState>,
    Path(step): Path<String>,
    Query(query): Query<ThankYouQuery>,
    mut cart: SessionCart,
) -> Result<Response> {
    let step = parse_step(&step)?;
    if step == CheckoutStep::ThankYou {
        return load_thank_you(&state, cart, query).await;
    }

    let commerce = state.commerce();
    let sync = CheckoutSync::new(
        commerce,
        state.shopify(),
        state.config().checkout.shopify_checkout_enabled,
    );

    let checkout = match sync.load(&mut cart.cart, step).await {
        SyncOutcome::Pending => {
            return Ok((StatusCode::ACCEPTED, Json(json!({ "status": "pending" }))).into_response());
        }
        SyncOutcome::Redirect(path) => {
            cart.save().await?;
            return Ok(Redirect::to(&path).into_response());
        }
        SyncOutcome::ExternalRedirect(url) => {
            cart.save().await?;
            add_breadcrumb("checkout", "Sent to hosted checkout", None);
            return Ok(Redirect::to(&url).into_response());
        }
        SyncOutcome::Synced(checkout) => Some(*checkout),
        SyncOutcome::Skipped => match cart.cart.custom_checkout_id().cloned() {
            Some(id) => Some(commerce.checkout(&id).await?),
            None => None,
        },
    };

    let (checkout, toast) = if step == CheckoutStep::Information && checkout.is_some() {
        sync_discount(commerce, &mut cart, checkout).await
    } else {
        (checkout, None)
    };

    cart.save().await?;
    Ok(Json(StepView {
        step,
        checkout,
        toast,
    })
    .into_response())
}

/// Re-submit the stored discount code once. When it goes through, the
/// checkout is re-read so the page shows the discounted totals.
async fn sync_discount<C: CheckoutApi>(
    commerce: &C,
    cart: &mut SessionCart,
    checkout: Option<Checkout>,
) -> (Option<Checkout>, Option<String>) {
    let already_synced = cart.cart.discount_synced;
    let toast = DiscountService::new(commerce).sync_once(&mut cart.cart).await;
    if already_synced || toast.is_some() || cart.cart.discount_code.is_none() {
        return (checkout, toast);
    }

    let Some(id) = cart.cart.custom_checkout_id().cloned() else {
        return (checkout, toast);
    };
    match commerce.checkout(&id).await {
        Ok(refreshed) => (Some(refreshed), toast),
        Err(e) => {
            tracing::warn!(error = %e, checkout_id = %id, "Failed to re-read checkout after discount sync");
            (checkout, toast)
        }
    }
}

async fn load_thank_you(
    state: &AppState,
    mut cart: SessionCart,
    query: ThankYouQuery,
) -> Result<Response> {
    let checkout_id = query
        .checkout_id
        .filter(|id| !id.trim().is_empty())
        .map(CheckoutId::new)
        .or_else(|| cart.cart.completed_checkout_id.clone());
    let Some(checkout_id) = checkout_id else {
        return Ok(Redirect::to(CART_PATH).into_response());
    };

    let session = cart.session().clone();
    let result = thank_you(state.commerce(), &mut cart.cart, &session, &checkout_id).await;
    cart.save().await?;
    let confirmed = result?;

    Ok(Json(ThankYouView {
        checkout: confirmed.checkout,
        first_time_accessed: confirmed.first_time_accessed,
    })
    .into_response())
}

/// Submit a checkout step.
#[instrument(skip(state, cart, body))]
pub async fn submit(
    State(state): State<AppState>,
    Path(step): Path<String>,
    mut cart: SessionCart,
    body: Bytes,
) -> Result<Response> {
    match parse_step(&step)? {
        CheckoutStep::Information => {
            let form: InformationForm = parse_body(&body)?;
            let result = InformationStep::new(state.commerce())
                .submit(&mut cart.cart, form)
                .await;
            cart.save().await?;
            let checkout = result?;
            Ok(Json(json!({
                "checkout": checkout,
                "next": CheckoutStep::Payment.path(),
            }))
            .into_response())
        }
        CheckoutStep::Payment => {
            let form: PaymentForm = parse_body(&body)?;
            let session = cart.session().clone();
            let result = PaymentStep::new(state.commerce(), state.stripe())
                .submit(&mut cart.cart, &session, form)
                .await;
            cart.save().await?;
            Ok(payment_response(result?))
        }
        CheckoutStep::ThankYou => Err(AppError::BadRequest(
            "the thank-you step takes no submission".to_string(),
        )),
    }
}

/// Finish a payment once the browser's card challenge is done.
#[instrument(skip(state, cart))]
pub async fn authenticate_payment(
    State(state): State<AppState>,
    mut cart: SessionCart,
    Json(request): Json<AuthenticationRequest>,
) -> Result<Response> {
    let session = cart.session().clone();
    let result = PaymentStep::new(state.commerce(), state.stripe())
        .authenticate(&mut cart.cart, &session, &request.payment_intent_id)
        .await;
    cart.save().await?;
    Ok(payment_response(result?))
}

/// Push just the email to the checkout.
#[instrument(skip(state, cart, request))]
pub async fn update_email(
    State(state): State<AppState>,
    mut cart: SessionCart,
    Json(request): Json<EmailRequest>,
) -> Result<Json<serde_json::Value>> {
    let result = InformationStep::new(state.commerce())
        .update_email(&mut cart.cart, &request.email)
        .await;
    cart.save().await?;
    Ok(Json(json!({ "updated": result? })))
}

/// Apply a discount code.
#[instrument(skip(state, cart))]
pub async fn apply_discount(
    State(state): State<AppState>,
    mut cart: SessionCart,
    Json(request): Json<DiscountRequest>,
) -> Result<Json<Checkout>> {
    let result = DiscountService::new(state.commerce())
        .apply(&mut cart.cart, &request.code)
        .await;
    cart.save().await?;
    Ok(Json(result?))
}

/// Remove the discount code.
#[instrument(skip(state, cart))]
pub async fn remove_discount(
    State(state): State<AppState>,
    mut cart: SessionCart,
) -> Result<Json<Option<Checkout>>> {
    let result = DiscountService::new(state.commerce())
        .remove(&mut cart.cart)
        .await;
    cart.save().await?;
    Ok(Json(result?))
}

//! Marketing subscription route handlers.
//!
//! Footer newsletter, SMS signup and the referral form all post here. The
//! same service backs the opt-ins on the checkout information step.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::error::{AppError, Result};
use crate::services::MarketingSubscriptions;
use crate::services::subscriptions::WEBSITE_SOURCE;
use crate::state::AppState;

/// Subscription channel from the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionKind {
    Sms,
    Email,
    Referral,
}

/// Subscription form data. Which fields are required depends on the kind.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubscribeRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub referrer_code: Option<String>,
    /// Where the form lives (e.g. "Wagwell Website Footer").
    pub source: Option<String>,
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{field} is required")))
}

/// Subscribe to SMS, the newsletter or the referral program.
#[instrument(skip(state, request))]
pub async fn subscribe(
    State(state): State<AppState>,
    Path(kind): Path<SubscriptionKind>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<Value>> {
    let subscriptions = MarketingSubscriptions::new(state.commerce());

    match kind {
        SubscriptionKind::Sms => {
            let phone = required(request.phone.as_deref(), "phone")?;
            subscriptions.sms(phone, None).await?;
        }
        SubscriptionKind::Email => {
            let email = required(request.email.as_deref(), "email")?;
            let source = request
                .source
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(WEBSITE_SOURCE);
            subscriptions.email(email, source).await?;
        }
        SubscriptionKind::Referral => {
            let email = required(request.email.as_deref(), "email")?;
            subscriptions
                .referral(email, request.referrer_code.as_deref())
                .await?;
        }
    }

    info!(?kind, "Marketing subscription accepted");
    Ok(Json(json!({ "subscribed": true })))
}

//! Checkout sync: custom vs hosted decision, remote sync, step guards.
//!
//! Every checkout step load goes through [`CheckoutSync::load`]. It decides
//! which checkout the cart belongs on, pushes the cart there at most once per
//! cart change, and tells the handler where the browser should go next.

use tower_sessions::Session;
use tracing::{instrument, warn};
use url::Url;

use wagwell_core::{CheckoutId, CheckoutStep};

use super::error::{CheckoutError, report};
use super::line_items::{custom_line_items, hosted_line_items, note_attributes};
use crate::commerce::{
    Checkout, CheckoutApi, CheckoutCreateInput, CheckoutPayload, CheckoutUpdateInput,
    CommerceError,
};
use crate::models::session::first_access_key;
use crate::models::{Cart, CheckoutKind};
use crate::shopify::{HostedCheckoutApi, HostedCheckoutPayload};

/// Storefront cart page, where failed syncs land.
pub const CART_PATH: &str = "/cart";

/// Whether the cart goes through the custom checkout.
///
/// The hosted checkout is only used when it is enabled, the shopper is not
/// on the thank-you page, and nothing in the cart is a subscription.
#[must_use]
pub fn should_use_custom_checkout(
    shopify_checkout_enabled: bool,
    step: CheckoutStep,
    cart: &Cart,
) -> bool {
    !(shopify_checkout_enabled && step != CheckoutStep::ThankYou && !cart.has_subscription())
}

/// What a checkout step load should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The cart is still loading; nothing was sent.
    Pending,
    /// No sync was needed for this load.
    Skipped,
    /// The custom checkout now mirrors the cart.
    Synced(Box<Checkout>),
    /// Send the browser to an external URL (the hosted checkout).
    ExternalRedirect(String),
    /// Send the browser to a storefront route.
    Redirect(String),
}

/// Hosted checkout URL, carrying the pending discount code if any.
#[must_use]
pub fn hosted_checkout_url(web_url: &str, discount_code: Option<&str>) -> String {
    let Some(code) = discount_code else {
        return web_url.to_string();
    };
    match Url::parse(web_url) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("discount", code);
            url.into()
        }
        Err(_) => {
            let separator = if web_url.contains('?') { '&' } else { '?' };
            format!("{web_url}{separator}discount={}", urlencoding::encode(code))
        }
    }
}

/// Redirect required before a step can render, if any.
#[must_use]
pub fn step_guard(cart: &Cart, step: CheckoutStep) -> Option<String> {
    match step {
        CheckoutStep::Payment if cart.custom_checkout_id().is_none() => {
            Some(CheckoutStep::Information.path())
        }
        _ => None,
    }
}

/// Syncs the session cart to the remote checkout.
pub struct CheckoutSync<'a, C, H> {
    commerce: &'a C,
    hosted: &'a H,
    shopify_checkout_enabled: bool,
}

impl<'a, C, H> CheckoutSync<'a, C, H>
where
    C: CheckoutApi,
    H: HostedCheckoutApi,
{
    pub const fn new(commerce: &'a C, hosted: &'a H, shopify_checkout_enabled: bool) -> Self {
        Self {
            commerce,
            hosted,
            shopify_checkout_enabled,
        }
    }

    /// Handle a checkout step load.
    #[instrument(skip(self, cart), fields(step = %step, lines = cart.lines.len()))]
    pub async fn load(&self, cart: &mut Cart, step: CheckoutStep) -> SyncOutcome {
        if !cart.is_ready() {
            return SyncOutcome::Pending;
        }
        if let Some(path) = step_guard(cart, step) {
            return SyncOutcome::Redirect(path);
        }
        self.sync(cart, step).await
    }

    /// Push the cart to the checkout it belongs on.
    ///
    /// Never issues a mutation while the cart is initializing. Runs at most
    /// once per cart change: later loads reuse the associated checkout.
    pub async fn sync(&self, cart: &mut Cart, step: CheckoutStep) -> SyncOutcome {
        if !cart.is_ready() {
            return SyncOutcome::Pending;
        }
        if step == CheckoutStep::ThankYou {
            return SyncOutcome::Skipped;
        }
        if cart.is_empty() {
            return SyncOutcome::Redirect(CART_PATH.to_string());
        }

        let use_custom = should_use_custom_checkout(self.shopify_checkout_enabled, step, cart);

        if cart.sync_attempted {
            match cart.checkout.as_ref().map(|c| &c.kind) {
                Some(CheckoutKind::Custom) if use_custom => return SyncOutcome::Skipped,
                Some(CheckoutKind::Hosted { web_url }) if !use_custom => {
                    return SyncOutcome::ExternalRedirect(hosted_checkout_url(
                        web_url,
                        cart.discount_code.as_deref(),
                    ));
                }
                _ => {}
            }
        }

        if use_custom {
            self.sync_custom(cart).await
        } else {
            self.sync_hosted(cart).await
        }
    }

    async fn sync_hosted(&self, cart: &mut Cart) -> SyncOutcome {
        let line_items = hosted_line_items(cart);
        let existing = cart
            .checkout
            .as_ref()
            .filter(|c| !c.is_custom())
            .map(|c| c.id.clone());

        let result = match existing {
            Some(id) => self.hosted.replace_line_items(&id, line_items).await,
            None => self.hosted.create_checkout(line_items).await,
        };

        match result {
            Err(e) => fail(cart, &e.into(), false),
            Ok(HostedCheckoutPayload { user_errors, .. }) if !user_errors.is_empty() => {
                let messages: Vec<&str> = user_errors.iter().map(|e| e.message.as_str()).collect();
                let err = CheckoutError::rejected(format!(
                    "Hosted checkout rejected the cart: {}",
                    messages.join("; ")
                ));
                fail(cart, &err, true)
            }
            Ok(HostedCheckoutPayload { checkout: None, .. }) => fail(
                cart,
                &CheckoutError::contract("hosted checkout mutation returned no checkout"),
                false,
            ),
            Ok(HostedCheckoutPayload {
                checkout: Some(checkout),
                ..
            }) => {
                let url = hosted_checkout_url(&checkout.web_url, cart.discount_code.as_deref());
                cart.associate_checkout(
                    checkout.id,
                    CheckoutKind::Hosted {
                        web_url: checkout.web_url,
                    },
                );
                cart.sync_attempted = true;
                SyncOutcome::ExternalRedirect(url)
            }
        }
    }

    async fn sync_custom(&self, cart: &mut Cart) -> SyncOutcome {
        let existing = match cart.custom_checkout_id().cloned() {
            Some(id) => match self.commerce.checkout(&id).await {
                Ok(checkout) if !checkout.is_completed() => Some(checkout),
                // Paid or expired: start a fresh checkout.
                Ok(_) | Err(CommerceError::NotFound(_)) => None,
                Err(e) => return fail(cart, &e.into(), false),
            },
            None => None,
        };

        let line_items = custom_line_items(cart);
        let result = match existing {
            Some(checkout) => {
                let input = CheckoutUpdateInput {
                    email: cart.last_synced_email.clone(),
                    line_items: Some(line_items),
                    note_attributes: Some(note_attributes(
                        &checkout.note_attributes,
                        &cart.tracking,
                    )),
                    ..CheckoutUpdateInput::default()
                };
                self.commerce.update_checkout(&checkout.id, input).await
            }
            None => {
                let input = CheckoutCreateInput {
                    email: cart.last_synced_email.clone(),
                    line_items,
                    note_attributes: note_attributes(&[], &cart.tracking),
                    discount_code: cart.discount_code.clone(),
                };
                self.commerce.create_checkout(input).await
            }
        };

        match result {
            Err(e) => fail(cart, &e.into(), false),
            Ok(CheckoutPayload { user_errors, .. }) if !user_errors.is_empty() => {
                let messages: Vec<&str> = user_errors.iter().map(|e| e.message.as_str()).collect();
                let err = CheckoutError::rejected(format!(
                    "Checkout rejected the cart: {}",
                    messages.join("; ")
                ));
                fail(cart, &err, true)
            }
            Ok(CheckoutPayload { checkout: None, .. }) => fail(
                cart,
                &CheckoutError::contract("checkout mutation returned no checkout"),
                false,
            ),
            Ok(CheckoutPayload {
                checkout: Some(checkout),
                ..
            }) => {
                cart.associate_checkout(checkout.id.clone(), CheckoutKind::Custom);
                cart.sync_attempted = true;
                SyncOutcome::Synced(Box::new(checkout))
            }
        }
    }
}

/// Report a failed sync and send the shopper back to the cart. The checkout
/// association is left untouched unless the cart itself was rejected.
fn fail(cart: &mut Cart, error: &CheckoutError, clear_cart: bool) -> SyncOutcome {
    report(error, "checkout sync");
    if clear_cart {
        cart.clear();
    }
    SyncOutcome::Redirect(CART_PATH.to_string())
}

/// Thank-you page data.
#[derive(Debug, Clone)]
pub struct ThankYou {
    pub checkout: Checkout,
    /// True exactly once per completed checkout.
    pub first_time_accessed: bool,
}

/// Load the thank-you step.
///
/// Only the cart's own checkout (the one it paid, or the one it still
/// mirrors) can be confirmed. Clears the cart once the checkout is confirmed
/// complete, keeping the paid id so the page can be reloaded, and consumes
/// the first-access flag written when payment succeeded.
///
/// # Errors
///
/// Returns `Rejected` when the checkout is not the cart's or is not
/// complete, and client or session errors as-is.
#[instrument(skip(commerce, cart, session), fields(checkout_id = %checkout_id))]
pub async fn thank_you<C: CheckoutApi>(
    commerce: &C,
    cart: &mut Cart,
    session: &Session,
    checkout_id: &CheckoutId,
) -> Result<ThankYou, CheckoutError> {
    let owned = cart.completed_checkout_id.as_ref() == Some(checkout_id)
        || cart.checkout_id() == Some(checkout_id);
    if !owned {
        warn!("Thank-you requested for a checkout this cart does not own");
        return Err(CheckoutError::rejected("We couldn't find that order."));
    }

    let checkout = commerce.completed_checkout(checkout_id).await?;
    if !checkout.is_completed() {
        return Err(CheckoutError::rejected(
            "This order hasn't been completed yet.",
        ));
    }

    if !cart.is_empty() {
        cart.clear();
        cart.completed_checkout_id = Some(checkout_id.clone());
    }

    let first_time_accessed = session
        .remove::<bool>(&first_access_key(checkout_id))
        .await?
        .unwrap_or(false);

    Ok(ThankYou {
        checkout,
        first_time_accessed,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commerce::Attribute;
    use rust_decimal::Decimal;
    use uuid::Uuid;
    use wagwell_core::{CurrencyCode, Frequency, IntervalUnit, Price, VariantId};

    fn cart(subscription: bool) -> Cart {
        let mut cart = Cart::default();
        cart.mark_ready();
        cart.add(crate::models::CartLine {
            key: Uuid::new_v4(),
            variant_id: VariantId::new("v1"),
            product_handle: "hip-joint".to_string(),
            sku: None,
            title: "Hip & Joint".to_string(),
            quantity: 1,
            frequency: subscription.then_some(Frequency::new(4, IntervalUnit::Week)),
            unit_price: Price::new(Decimal::new(3900, 2), CurrencyCode::USD),
            properties: vec![Attribute::new("container", "jar")],
        });
        cart
    }

    #[test]
    fn test_decision_rule() {
        use CheckoutStep::{Information, Payment, ThankYou};

        // Flag off: always custom.
        for step in [Information, Payment, ThankYou] {
            assert!(should_use_custom_checkout(false, step, &cart(false)));
            assert!(should_use_custom_checkout(false, step, &cart(true)));
        }
        // Flag on: hosted only for one-time carts outside thank-you.
        assert!(!should_use_custom_checkout(true, Information, &cart(false)));
        assert!(!should_use_custom_checkout(true, Payment, &cart(false)));
        assert!(should_use_custom_checkout(true, ThankYou, &cart(false)));
        assert!(should_use_custom_checkout(true, Information, &cart(true)));
    }

    #[test]
    fn test_hosted_checkout_url() {
        assert_eq!(
            hosted_checkout_url("https://shop.test/c/1", None),
            "https://shop.test/c/1"
        );
        assert_eq!(
            hosted_checkout_url("https://shop.test/c/1?key=abc", Some("SAVE 10")),
            "https://shop.test/c/1?key=abc&discount=SAVE+10"
        );
        assert_eq!(
            hosted_checkout_url("not a url", Some("SAVE10")),
            "not a url?discount=SAVE10"
        );
    }

    #[test]
    fn test_payment_guard() {
        let mut cart = cart(false);
        assert_eq!(
            step_guard(&cart, CheckoutStep::Payment).as_deref(),
            Some("/checkout/information")
        );
        assert_eq!(step_guard(&cart, CheckoutStep::Information), None);

        cart.associate_checkout(CheckoutId::new("chk_1"), CheckoutKind::Custom);
        assert_eq!(step_guard(&cart, CheckoutStep::Payment), None);
    }
}

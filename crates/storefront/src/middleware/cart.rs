//! Session cart extractor.
//!
//! Loads the [`Cart`] out of the session (set by `SessionManagerLayer`),
//! records marketing attribution from the landing URL and hands the cart to
//! the handler. Handlers call [`SessionCart::save`] after changing it.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use tracing::warn;

use crate::checkout::CheckoutError;
use crate::commerce::Attribute;
use crate::error::AppError;
use crate::models::{Cart, session_keys};

/// Query parameters recorded as note attributes on the custom checkout.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
];

/// Note attribute holding the first storefront path the shopper hit.
pub const LANDING_PAGE_ATTRIBUTE: &str = "landing_page";

/// Query parameter carrying a discount code from a marketing link.
const DISCOUNT_PARAM: &str = "discount";

/// Attribution and discount code from a request URL.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EntryParams {
    pub tracking: Vec<Attribute>,
    pub discount_code: Option<String>,
}

/// Parse attribution out of `path` and its query string.
///
/// Tracking is only produced when the URL carries at least one `utm_*`
/// parameter; the landing page is recorded alongside it.
#[must_use]
pub fn entry_params(path: &str, query: Option<&str>) -> EntryParams {
    let Some(query) = query else {
        return EntryParams::default();
    };

    let mut params = EntryParams::default();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if key == DISCOUNT_PARAM {
            params.discount_code = Some(value.to_string());
        } else if TRACKING_PARAMS.contains(&key.as_ref())
            && !params.tracking.iter().any(|a| a.key == key)
        {
            params.tracking.push(Attribute::new(key.as_ref(), value));
        }
    }

    if !params.tracking.is_empty() {
        params
            .tracking
            .push(Attribute::new(LANDING_PAGE_ATTRIBUTE, path));
    }
    params
}

/// Apply entry parameters to the cart.
pub fn record_entry(cart: &mut Cart, params: EntryParams) {
    if !params.tracking.is_empty() {
        cart.record_tracking(params.tracking);
    }
    if let Some(code) = params.discount_code
        && cart.discount_code.as_deref() != Some(code.as_str())
    {
        cart.discount_code = Some(code);
        cart.discount_synced = false;
    }
}

/// The session cart for this request.
///
/// The cart is `Ready` once it has been read from the session. When the
/// session store fails, the cart stays `Initializing`: checkout sync then
/// issues no mutation and [`SessionCart::save`] never overwrites the stored
/// cart with an empty one.
pub struct SessionCart {
    pub cart: Cart,
    session: Session,
}

impl SessionCart {
    /// Build from an already loaded session.
    pub async fn load(session: Session) -> Self {
        let cart = match session.get::<Cart>(session_keys::CART).await {
            Ok(stored) => {
                let mut cart = stored.unwrap_or_default();
                cart.mark_ready();
                cart
            }
            Err(e) => {
                warn!(error = %e, "Failed to load cart from session");
                Cart::default()
            }
        };
        Self { cart, session }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Write the cart back to the session.
    ///
    /// # Errors
    ///
    /// Returns the session store error.
    pub async fn save(&self) -> Result<(), CheckoutError> {
        if !self.cart.is_ready() {
            return Ok(());
        }
        self.session
            .insert(session_keys::CART, &self.cart)
            .await
            .map_err(CheckoutError::from)
    }
}

impl<S> FromRequestParts<S> for SessionCart
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let mut session_cart = Self::load(session).await;
        if session_cart.cart.is_ready() {
            let params = entry_params(parts.uri.path(), parts.uri.query());
            record_entry(&mut session_cart.cart, params);
        }
        Ok(session_cart)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    #[test]
    fn test_entry_params() {
        let params = entry_params(
            "/product/hip-joint",
            Some("utm_source=newsletter&utm_medium=email&utm_source=dup&discount=SAVE10&x=1"),
        );
        assert_eq!(
            params.tracking,
            vec![
                Attribute::new("utm_source", "newsletter"),
                Attribute::new("utm_medium", "email"),
                Attribute::new(LANDING_PAGE_ATTRIBUTE, "/product/hip-joint"),
            ]
        );
        assert_eq!(params.discount_code.as_deref(), Some("SAVE10"));
    }

    #[test]
    fn test_no_utm_no_tracking() {
        assert_eq!(entry_params("/cart", Some("ref=abc")), EntryParams::default());
        assert_eq!(entry_params("/cart", None), EntryParams::default());
    }

    #[test]
    fn test_new_discount_code_resets_latch() {
        let mut cart = Cart::default();
        cart.discount_code = Some("OLD".to_string());
        cart.discount_synced = true;
        record_entry(
            &mut cart,
            EntryParams {
                tracking: vec![],
                discount_code: Some("NEW".to_string()),
            },
        );
        assert_eq!(cart.discount_code.as_deref(), Some("NEW"));
        assert!(!cart.discount_synced);
    }

    #[tokio::test]
    async fn test_load_and_save_round_trip() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        let mut first = SessionCart::load(session.clone()).await;
        assert!(first.cart.is_ready());
        first.cart.discount_code = Some("SAVE10".to_string());
        first.save().await.unwrap();

        let second = SessionCart::load(session).await;
        assert_eq!(second.cart.discount_code.as_deref(), Some("SAVE10"));
    }

    #[tokio::test]
    async fn test_initializing_cart_is_not_saved() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        session
            .insert(session_keys::CART, Cart {
                discount_code: Some("KEEP".to_string()),
                ..Cart::default()
            })
            .await
            .unwrap();

        let pending = SessionCart {
            cart: Cart::default(),
            session: session.clone(),
        };
        pending.save().await.unwrap();

        let stored: Cart = session.get(session_keys::CART).await.unwrap().unwrap();
        assert_eq!(stored.discount_code.as_deref(), Some("KEEP"));
    }
}

//! Cart route handlers.
//!
//! The cart lives in the session (see [`SessionCart`]). Every handler
//! answers with the updated [`CartView`].

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use wagwell_core::Frequency;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::SessionCart;
use crate::models::{Cart, CartLine};
use crate::product::{ProductForm, ProductFormValues};
use crate::state::AppState;

/// Cart line display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub key: Uuid,
    pub handle: String,
    pub title: String,
    pub sku: Option<String>,
    pub quantity: u32,
    /// Delivery frequency (`4_week`) for subscription lines.
    pub frequency: Option<String>,
    pub price: String,
    pub line_price: String,
    pub properties: Vec<crate::commerce::Attribute>,
}

impl From<&CartLine> for CartItemView {
    fn from(line: &CartLine) -> Self {
        Self {
            key: line.key,
            handle: line.product_handle.clone(),
            title: line.title.clone(),
            sku: line.sku.clone(),
            quantity: line.quantity,
            frequency: line.frequency.map(|f| f.to_string()),
            price: line.unit_price.to_string(),
            line_price: line.line_price().to_string(),
            properties: line.properties.clone(),
        }
    }
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
    pub has_subscription: bool,
    pub discount_code: Option<String>,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.lines.iter().map(CartItemView::from).collect(),
            subtotal: cart.subtotal().to_string(),
            item_count: cart.item_count(),
            has_subscription: cart.has_subscription(),
            discount_code: cart.discount_code.clone(),
        }
    }
}

/// Add to cart request: the product page form plus its product handle.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub handle: String,
    #[serde(flatten)]
    pub values: ProductFormValues,
}

/// Remove from cart request.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub key: Uuid,
}

/// Switch a line between subscription and one-time purchase.
#[derive(Debug, Deserialize)]
pub struct SetSubscriptionRequest {
    pub key: Uuid,
    /// `None` makes the line a one-time purchase.
    #[serde(default)]
    pub frequency: Option<Frequency>,
}

/// Show the cart.
pub async fn show(cart: SessionCart) -> Json<CartView> {
    Json(CartView::from(&cart.cart))
}

/// Add a product form submission to the cart.
#[instrument(skip(state, cart, request), fields(handle = %request.handle))]
pub async fn add(
    State(state): State<AppState>,
    mut cart: SessionCart,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let config = &state.config().checkout;
    let form = ProductForm::new(
        state.shopify(),
        config.bump_offer_handle.as_deref(),
        config.bump_offer_variant_id.as_ref(),
    );
    form.add_to_cart(&mut cart.cart, &request.handle, &request.values)
        .await?;
    cart.save().await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("handle", request.handle.as_str()), ("sku", request.values.sku.as_str())]),
    );
    Ok(Json(CartView::from(&cart.cart)))
}

/// Remove a line from the cart.
#[instrument(skip(cart))]
pub async fn remove(
    mut cart: SessionCart,
    Json(request): Json<RemoveFromCartRequest>,
) -> Result<Json<CartView>> {
    if !cart.cart.remove(request.key) {
        return Err(AppError::NotFound(format!("cart line {}", request.key)));
    }
    cart.save().await?;
    Ok(Json(CartView::from(&cart.cart)))
}

/// Set or clear a line's subscription frequency.
#[instrument(skip(cart))]
pub async fn set_subscription(
    mut cart: SessionCart,
    Json(request): Json<SetSubscriptionRequest>,
) -> Result<Json<CartView>> {
    if !cart.cart.set_frequency(request.key, request.frequency) {
        return Err(AppError::NotFound(format!("cart line {}", request.key)));
    }
    cart.save().await?;
    Ok(Json(CartView::from(&cart.cart)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use wagwell_core::{CurrencyCode, IntervalUnit, Price, VariantId};

    #[test]
    fn test_cart_view() {
        let mut cart = Cart::default();
        cart.add(CartLine {
            key: Uuid::new_v4(),
            variant_id: VariantId::new("v1"),
            product_handle: "hip-joint".to_string(),
            sku: Some("HJ-30".to_string()),
            title: "Hip & Joint".to_string(),
            quantity: 2,
            frequency: Some(Frequency::new(4, IntervalUnit::Week)),
            unit_price: Price::new(Decimal::new(3900, 2), CurrencyCode::USD),
            properties: vec![],
        });

        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 2);
        assert_eq!(view.subtotal, "$78.00");
        assert!(view.has_subscription);
        assert_eq!(view.items[0].frequency.as_deref(), Some("4_week"));
        assert_eq!(view.items[0].line_price, "$78.00");
    }

    #[test]
    fn test_add_request_flattens_form_values() {
        let request: AddToCartRequest = serde_json::from_value(serde_json::json!({
            "handle": "hip-joint",
            "sku": "HJ-30",
            "subscription": true,
            "frequency": "4_week",
            "container": "jar"
        }))
        .unwrap();
        assert_eq!(request.handle, "hip-joint");
        assert_eq!(
            request.values.frequency,
            Some(Frequency::new(4, IntervalUnit::Week))
        );
        assert_eq!(request.values.quantity, 1);
    }
}

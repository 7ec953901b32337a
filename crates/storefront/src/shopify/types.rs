//! Domain types for the Shopify Storefront API.
//!
//! Catalog types are converted from the raw query responses in
//! `storefront::conversions`; hosted checkout types are deserialized
//! directly.

use serde::{Deserialize, Serialize};

use wagwell_core::{CheckoutId, CurrencyCode, Frequency, Price, ProductId, VariantId};

use crate::commerce::{Attribute, UserError};

// =============================================================================
// Money / Image
// =============================================================================

/// Monetary amount with currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// Decimal amount as string (preserves precision).
    pub amount: String,
    /// ISO 4217 currency code.
    pub currency_code: String,
}

impl Money {
    /// Convert to a typed price. `None` for unknown currencies or bad amounts.
    #[must_use]
    pub fn to_price(&self) -> Option<Price> {
        let currency = self.currency_code.parse::<CurrencyCode>().ok()?;
        Price::parse(&self.amount, currency)
    }
}

/// Product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
}

// =============================================================================
// Product Types
// =============================================================================

/// Selected option on a product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    /// Option name (e.g., "Size").
    pub name: String,
    /// Selected value (e.g., "90 chews").
    pub value: String,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub title: String,
    /// SKU code. The product form selects variants by SKU.
    pub sku: Option<String>,
    pub available_for_sale: bool,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub selected_options: Vec<SelectedOption>,
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub handle: String,
    pub title: String,
    pub description: String,
    pub product_type: String,
    pub tags: Vec<String>,
    pub featured_image: Option<Image>,
    pub variants: Vec<ProductVariant>,
    /// Product can only be bought as a subscription.
    pub requires_selling_plan: bool,
    /// Delivery frequencies offered for subscriptions. Empty when the
    /// product is one-time only.
    pub subscription_frequencies: Vec<Frequency>,
    /// Container choices offered on the product form (e.g. "pouch", "jar").
    pub container_options: Vec<String>,
}

impl Product {
    /// Find the variant with the given SKU.
    #[must_use]
    pub fn variant_by_sku(&self, sku: &str) -> Option<&ProductVariant> {
        self.variants
            .iter()
            .find(|v| v.sku.as_deref() == Some(sku))
    }

    /// Whether shoppers can subscribe to this product.
    #[must_use]
    pub fn supports_subscription(&self) -> bool {
        self.requires_selling_plan || !self.subscription_frequencies.is_empty()
    }
}

/// Product card data used in collection listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub handle: String,
    pub title: String,
    pub available_for_sale: bool,
    pub featured_image: Option<Image>,
    pub min_price: Money,
}

/// A collection of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub description: String,
    pub products: Vec<ProductSummary>,
}

// =============================================================================
// Hosted Checkout Types
// =============================================================================

/// Line item sent to `checkoutCreate` / `checkoutLineItemsReplace`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostedLineItemInput {
    pub variant_id: VariantId,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_attributes: Vec<Attribute>,
}

/// The hosted checkout, as far as the storefront needs to know it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostedCheckout {
    pub id: CheckoutId,
    /// Shopify-hosted checkout page the shopper is sent to.
    pub web_url: String,
}

/// Result of a hosted checkout mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostedCheckoutPayload {
    #[serde(default)]
    pub checkout: Option<HostedCheckout>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

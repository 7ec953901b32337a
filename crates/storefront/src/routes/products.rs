//! Product route handlers.
//!
//! The catalog is read straight from Shopify (cached in the client); these
//! handlers only shape it for the product pages.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::shopify::{CatalogApi, Image, Product, ProductSummary};
use crate::state::AppState;

/// Collection shown when no `collection` query parameter is given.
const DEFAULT_COLLECTION: &str = "all";

/// Variant display data.
#[derive(Debug, Clone, Serialize)]
pub struct VariantView {
    pub id: String,
    pub sku: Option<String>,
    pub title: String,
    pub price: String,
    pub compare_at_price: Option<String>,
    pub available: bool,
}

/// Product page data: everything the product form needs.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub handle: String,
    pub title: String,
    pub description: String,
    pub featured_image: Option<Image>,
    pub variants: Vec<VariantView>,
    pub subscription: bool,
    pub requires_subscription: bool,
    /// Wire form of each offered frequency (`4_week`).
    pub frequencies: Vec<String>,
    pub containers: Vec<String>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            handle: product.handle.clone(),
            title: product.title.clone(),
            description: product.description.clone(),
            featured_image: product.featured_image.clone(),
            variants: product
                .variants
                .iter()
                .map(|v| VariantView {
                    id: v.id.to_string(),
                    sku: v.sku.clone(),
                    title: v.title.clone(),
                    price: v
                        .price
                        .to_price()
                        .map_or_else(|| v.price.amount.clone(), |p| p.to_string()),
                    compare_at_price: v
                        .compare_at_price
                        .as_ref()
                        .and_then(crate::shopify::Money::to_price)
                        .map(|p| p.to_string()),
                    available: v.available_for_sale,
                })
                .collect(),
            subscription: product.supports_subscription(),
            requires_subscription: product.requires_selling_plan,
            frequencies: product
                .subscription_frequencies
                .iter()
                .map(ToString::to_string)
                .collect(),
            containers: product.container_options.clone(),
        }
    }
}

/// Listing data for a collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionView {
    pub handle: String,
    pub title: String,
    pub products: Vec<ProductSummary>,
}

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub collection: Option<String>,
}

/// List the products of a collection.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<CollectionView>> {
    let handle = query
        .collection
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .unwrap_or(DEFAULT_COLLECTION);
    let collection = state.shopify().collection_by_handle(handle).await?;
    Ok(Json(CollectionView {
        handle: collection.handle,
        title: collection.title,
        products: collection.products,
    }))
}

/// Show a product page.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<ProductView>> {
    let product = state.shopify().product_by_handle(&handle).await?;
    Ok(Json(ProductView::from(&product)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shopify::{Money, ProductVariant};
    use wagwell_core::{Frequency, IntervalUnit, ProductId, VariantId};

    #[test]
    fn test_product_view() {
        let product = Product {
            id: ProductId::new("p1"),
            handle: "calming-chews".to_string(),
            title: "Calming Chews".to_string(),
            description: String::new(),
            product_type: "Supplement".to_string(),
            tags: vec![],
            featured_image: None,
            variants: vec![ProductVariant {
                id: VariantId::new("v1"),
                title: "30 chews".to_string(),
                sku: Some("CC-30".to_string()),
                available_for_sale: true,
                price: Money {
                    amount: "32.5".to_string(),
                    currency_code: "USD".to_string(),
                },
                compare_at_price: None,
                selected_options: vec![],
            }],
            requires_selling_plan: false,
            subscription_frequencies: vec![Frequency::new(8, IntervalUnit::Week)],
            container_options: vec![],
        };

        let view = ProductView::from(&product);
        assert!(view.subscription);
        assert!(!view.requires_subscription);
        assert_eq!(view.frequencies, vec!["8_week".to_string()]);
        assert_eq!(view.variants.first().map(|v| v.price.as_str()), Some("$32.50"));
    }
}

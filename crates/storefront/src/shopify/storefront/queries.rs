//! GraphQL operation definitions for the Shopify Storefront API.
//!
//! Response types here mirror the raw JSON; `conversions` turns them into
//! the domain types in `shopify::types`.

use serde::{Deserialize, Serialize};

use wagwell_core::{CheckoutId, ProductId, VariantId};

use crate::graphql_operation;
use crate::shopify::types::{HostedCheckoutPayload, HostedLineItemInput, Image, Money, SelectedOption};

/// Number of products requested per collection page.
pub const COLLECTION_PAGE_SIZE: i64 = 50;

// =============================================================================
// Shared response shapes
// =============================================================================

/// A connection queried with `nodes { ... }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Nodes<T> {
    pub nodes: Vec<T>,
}

/// A metafield whose value is a JSON-encoded string.
#[derive(Debug, Clone, Deserialize)]
pub struct Metafield {
    pub value: String,
}

// =============================================================================
// Product queries
// =============================================================================

pub const PRODUCT_BY_HANDLE: &str = r#"query ProductByHandle($handle: String!) {
  product(handle: $handle) {
    id
    handle
    title
    description
    productType
    tags
    requiresSellingPlan
    featuredImage { url altText }
    variants(first: 50) {
      nodes {
        id
        title
        sku
        availableForSale
        price { amount currencyCode }
        compareAtPrice { amount currencyCode }
        selectedOptions { name value }
      }
    }
    frequencies: metafield(namespace: "subscriptions", key: "frequencies") { value }
    containers: metafield(namespace: "custom", key: "container_options") { value }
  }
}
"#;

#[derive(Debug, Clone, Serialize)]
pub struct ProductByHandleVariables {
    pub handle: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductByHandleData {
    pub product: Option<ProductNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductNode {
    pub id: ProductId,
    pub handle: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub requires_selling_plan: bool,
    pub featured_image: Option<Image>,
    pub variants: Nodes<VariantNode>,
    pub frequencies: Option<Metafield>,
    pub containers: Option<Metafield>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantNode {
    pub id: VariantId,
    pub title: String,
    pub sku: Option<String>,
    pub available_for_sale: bool,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
}

graphql_operation!(
    /// `PRODUCT_BY_HANDLE`
    ProductByHandle, "ProductByHandle", PRODUCT_BY_HANDLE,
    ProductByHandleVariables => ProductByHandleData
);

// =============================================================================
// Collection queries
// =============================================================================

pub const COLLECTION_BY_HANDLE: &str = r"query CollectionByHandle($handle: String!, $first: Int!) {
  collection(handle: $handle) {
    id
    handle
    title
    description
    products(first: $first) {
      nodes {
        id
        handle
        title
        availableForSale
        featuredImage { url altText }
        priceRange { minVariantPrice { amount currencyCode } }
      }
    }
  }
}
";

#[derive(Debug, Clone, Serialize)]
pub struct CollectionByHandleVariables {
    pub handle: String,
    pub first: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionByHandleData {
    pub collection: Option<CollectionNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionNode {
    pub id: String,
    pub handle: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub products: Nodes<ProductSummaryNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummaryNode {
    pub id: ProductId,
    pub handle: String,
    pub title: String,
    pub available_for_sale: bool,
    pub featured_image: Option<Image>,
    pub price_range: PriceRangeNode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRangeNode {
    pub min_variant_price: Money,
}

graphql_operation!(
    /// `COLLECTION_BY_HANDLE`
    CollectionByHandle, "CollectionByHandle", COLLECTION_BY_HANDLE,
    CollectionByHandleVariables => CollectionByHandleData
);

// =============================================================================
// Hosted checkout mutations
// =============================================================================

pub const SHOPIFY_CHECKOUT_CREATE: &str = r"mutation ShopifyCheckoutCreate($input: CheckoutCreateInput!) {
  checkoutCreate(input: $input) {
    checkout { id webUrl }
    userErrors: checkoutUserErrors { field message code }
  }
}
";

pub const SHOPIFY_CHECKOUT_LINE_ITEM_REPLACE: &str = r"mutation ShopifyCheckoutLineItemsReplace($checkoutId: ID!, $lineItems: [CheckoutLineItemInput!]!) {
  checkoutLineItemsReplace(checkoutId: $checkoutId, lineItems: $lineItems) {
    checkout { id webUrl }
    userErrors { field message code }
  }
}
";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostedCheckoutCreateInput {
    pub line_items: Vec<HostedLineItemInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShopifyCheckoutCreateVariables {
    pub input: HostedCheckoutCreateInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopifyCheckoutCreateData {
    pub checkout_create: Option<HostedCheckoutPayload>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopifyCheckoutLineItemsReplaceVariables {
    pub checkout_id: CheckoutId,
    pub line_items: Vec<HostedLineItemInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopifyCheckoutLineItemsReplaceData {
    pub checkout_line_items_replace: Option<HostedCheckoutPayload>,
}

graphql_operation!(
    /// `SHOPIFY_CHECKOUT_CREATE`
    ShopifyCheckoutCreate, "ShopifyCheckoutCreate", SHOPIFY_CHECKOUT_CREATE,
    ShopifyCheckoutCreateVariables => ShopifyCheckoutCreateData
);

graphql_operation!(
    /// `SHOPIFY_CHECKOUT_LINE_ITEM_REPLACE`
    ShopifyCheckoutLineItemsReplace, "ShopifyCheckoutLineItemsReplace",
    SHOPIFY_CHECKOUT_LINE_ITEM_REPLACE,
    ShopifyCheckoutLineItemsReplaceVariables => ShopifyCheckoutLineItemsReplaceData
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use graphql_client::GraphQLQuery;

    use super::*;

    #[test]
    fn test_line_items_replace_variables_shape() {
        let body = ShopifyCheckoutLineItemsReplace::build_query(
            ShopifyCheckoutLineItemsReplaceVariables {
                checkout_id: CheckoutId::new("gid://shopify/Checkout/1"),
                line_items: vec![HostedLineItemInput {
                    variant_id: VariantId::new("gid://shopify/ProductVariant/9"),
                    quantity: 2,
                    custom_attributes: vec![],
                }],
            },
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["operationName"], "ShopifyCheckoutLineItemsReplace");
        assert_eq!(json["variables"]["checkoutId"], "gid://shopify/Checkout/1");
        assert_eq!(json["variables"]["lineItems"][0]["quantity"], 2);
        assert!(json["variables"]["lineItems"][0].get("customAttributes").is_none());
    }

    #[test]
    fn test_product_node_deserializes() {
        let data: ProductByHandleData = serde_json::from_value(serde_json::json!({
            "product": {
                "id": "gid://shopify/Product/1",
                "handle": "hip-joint",
                "title": "Hip & Joint",
                "description": "Chews",
                "productType": "Supplement",
                "tags": ["mobility"],
                "requiresSellingPlan": false,
                "featuredImage": null,
                "variants": { "nodes": [{
                    "id": "gid://shopify/ProductVariant/9",
                    "title": "30 chews",
                    "sku": "HJ-30",
                    "availableForSale": true,
                    "price": { "amount": "39.0", "currencyCode": "USD" },
                    "compareAtPrice": null,
                    "selectedOptions": [{ "name": "Size", "value": "30 chews" }]
                }]},
                "frequencies": { "value": "[\"4_week\",\"8_week\"]" },
                "containers": null
            }
        }))
        .unwrap();
        let product = data.product.unwrap();
        assert_eq!(product.variants.nodes.len(), 1);
        assert_eq!(product.frequencies.unwrap().value, "[\"4_week\",\"8_week\"]");
    }
}

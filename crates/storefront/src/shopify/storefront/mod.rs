//! Shopify Storefront API client implementation.
//!
//! Catalog reads are cached using `moka` (5-minute TTL). Hosted checkout
//! mutations are never cached.

mod cache;
mod conversions;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::HeaderName;
use tracing::{debug, instrument};

use wagwell_core::CheckoutId;

use crate::config::ShopifyConfig;
use crate::graphql::{AuthHeader, GraphQLTransport};
use crate::shopify::types::{Collection, HostedCheckoutPayload, HostedLineItemInput, Product};
use crate::shopify::{CatalogApi, HostedCheckoutApi, ShopifyError};

use cache::{CacheKey, CacheValue};
use conversions::{convert_collection, convert_product};
use queries::{
    COLLECTION_PAGE_SIZE, CollectionByHandle, CollectionByHandleVariables,
    HostedCheckoutCreateInput, ProductByHandle, ProductByHandleVariables, ShopifyCheckoutCreate,
    ShopifyCheckoutCreateVariables, ShopifyCheckoutLineItemsReplace,
    ShopifyCheckoutLineItemsReplaceVariables,
};

/// Header for server-side Storefront API access tokens.
const ACCESS_TOKEN_HEADER: &str = "x-shopify-storefront-access-token";

// =============================================================================
// ShopifyClient
// =============================================================================

/// Client for the Shopify Storefront API.
///
/// Provides catalog reads and the hosted checkout mutations.
/// Products and collections are cached for 5 minutes.
#[derive(Clone)]
pub struct ShopifyClient {
    inner: Arc<ShopifyClientInner>,
}

struct ShopifyClientInner {
    transport: GraphQLTransport,
    cache: Cache<CacheKey, CacheValue>,
}

impl ShopifyClient {
    /// Create a new Storefront API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ShopifyConfig, timeout: Duration) -> Result<Self, ShopifyError> {
        Self::with_endpoint(config.endpoint(), config, timeout)
    }

    /// Create a client that posts to an explicit endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        config: &ShopifyConfig,
        timeout: Duration,
    ) -> Result<Self, ShopifyError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let transport = GraphQLTransport::new(
            endpoint,
            AuthHeader {
                name: HeaderName::from_static(ACCESS_TOKEN_HEADER),
                value: config.storefront_token.clone(),
            },
            timeout,
        )?;

        Ok(Self {
            inner: Arc::new(ShopifyClientInner { transport, cache }),
        })
    }
}

impl CatalogApi for ShopifyClient {
    #[instrument(skip(self), fields(handle = %handle))]
    async fn product_by_handle(&self, handle: &str) -> Result<Product, ShopifyError> {
        let cache_key = CacheKey::Product(handle.to_string());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let data = self
            .inner
            .transport
            .execute::<ProductByHandle>(ProductByHandleVariables {
                handle: handle.to_string(),
            })
            .await?;

        let product = data
            .product
            .map(convert_product)
            .ok_or_else(|| ShopifyError::NotFound(format!("Product not found: {handle}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    #[instrument(skip(self), fields(handle = %handle))]
    async fn collection_by_handle(&self, handle: &str) -> Result<Collection, ShopifyError> {
        let cache_key = CacheKey::Collection(handle.to_string());

        if let Some(CacheValue::Collection(collection)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for collection");
            return Ok(*collection);
        }

        let data = self
            .inner
            .transport
            .execute::<CollectionByHandle>(CollectionByHandleVariables {
                handle: handle.to_string(),
                first: COLLECTION_PAGE_SIZE,
            })
            .await?;

        let collection = data
            .collection
            .map(convert_collection)
            .ok_or_else(|| ShopifyError::NotFound(format!("Collection not found: {handle}")))?;

        self.inner
            .cache
            .insert(
                cache_key,
                CacheValue::Collection(Box::new(collection.clone())),
            )
            .await;

        Ok(collection)
    }
}

impl HostedCheckoutApi for ShopifyClient {
    #[instrument(skip(self, line_items), fields(lines = line_items.len()))]
    async fn create_checkout(
        &self,
        line_items: Vec<HostedLineItemInput>,
    ) -> Result<HostedCheckoutPayload, ShopifyError> {
        let data = self
            .inner
            .transport
            .execute::<ShopifyCheckoutCreate>(ShopifyCheckoutCreateVariables {
                input: HostedCheckoutCreateInput { line_items },
            })
            .await?;

        data.checkout_create
            .ok_or(ShopifyError::MissingPayload("checkoutCreate"))
    }

    #[instrument(skip(self, line_items), fields(checkout_id = %id, lines = line_items.len()))]
    async fn replace_line_items(
        &self,
        id: &CheckoutId,
        line_items: Vec<HostedLineItemInput>,
    ) -> Result<HostedCheckoutPayload, ShopifyError> {
        let data = self
            .inner
            .transport
            .execute::<ShopifyCheckoutLineItemsReplace>(ShopifyCheckoutLineItemsReplaceVariables {
                checkout_id: id.clone(),
                line_items,
            })
            .await?;

        data.checkout_line_items_replace
            .ok_or(ShopifyError::MissingPayload("checkoutLineItemsReplace"))
    }
}

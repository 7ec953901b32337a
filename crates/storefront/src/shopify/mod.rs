//! Shopify Storefront API client.
//!
//! # Architecture
//!
//! - Operations are declared with `graphql_operation!` over the shared
//!   [`GraphQLTransport`](crate::graphql::GraphQLTransport)
//! - Shopify is source of truth for the catalog - NO local sync, direct API calls
//! - In-memory caching via `moka` for catalog responses (5 minute TTL)
//!
//! # APIs
//!
//! - Catalog: `PRODUCT_BY_HANDLE`, `COLLECTION_BY_HANDLE`
//! - Hosted checkout: `SHOPIFY_CHECKOUT_CREATE`,
//!   `SHOPIFY_CHECKOUT_LINE_ITEM_REPLACE` (one-time orders only)
//!
//! # Example
//!
//! ```rust,ignore
//! use wagwell_storefront::shopify::{CatalogApi, ShopifyClient};
//!
//! let client = ShopifyClient::new(&config.shopify, config.http_timeout)?;
//! let product = client.product_by_handle("hip-joint-chews").await?;
//! ```

mod storefront;
pub mod types;

use std::future::Future;

use thiserror::Error;

use wagwell_core::CheckoutId;

use crate::graphql::TransportError;

pub use storefront::ShopifyClient;
pub use storefront::queries;
pub use types::*;

/// Errors that can occur when interacting with Shopify APIs.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// Transport, GraphQL or parse failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Mutation returned no payload at all.
    #[error("{0} returned no payload")]
    MissingPayload(&'static str),
}

/// Catalog reads.
pub trait CatalogApi: Send + Sync {
    /// `PRODUCT_BY_HANDLE`
    fn product_by_handle(
        &self,
        handle: &str,
    ) -> impl Future<Output = Result<Product, ShopifyError>> + Send;

    /// `COLLECTION_BY_HANDLE`
    fn collection_by_handle(
        &self,
        handle: &str,
    ) -> impl Future<Output = Result<Collection, ShopifyError>> + Send;
}

/// Hosted (Shopify) checkout mutations.
pub trait HostedCheckoutApi: Send + Sync {
    /// `SHOPIFY_CHECKOUT_CREATE`
    fn create_checkout(
        &self,
        line_items: Vec<HostedLineItemInput>,
    ) -> impl Future<Output = Result<HostedCheckoutPayload, ShopifyError>> + Send;

    /// `SHOPIFY_CHECKOUT_LINE_ITEM_REPLACE`
    fn replace_line_items(
        &self,
        id: &CheckoutId,
        line_items: Vec<HostedLineItemInput>,
    ) -> impl Future<Output = Result<HostedCheckoutPayload, ShopifyError>> + Send;
}

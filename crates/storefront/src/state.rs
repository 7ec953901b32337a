//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::commerce::{CommerceClient, CommerceError};
use crate::config::StorefrontConfig;
use crate::payments::{PaymentError, StripeClient};
use crate::shopify::{ShopifyClient, ShopifyError};

/// Error building the upstream API clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("commerce client: {0}")]
    Commerce(#[from] CommerceError),
    #[error("shopify client: {0}")]
    Shopify(#[from] ShopifyError),
    #[error("stripe client: {0}")]
    Stripe(#[from] PaymentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections, configuration and the
/// upstream API clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    commerce: CommerceClient,
    shopify: ShopifyClient,
    stripe: StripeClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if one of the HTTP clients cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let commerce = CommerceClient::new(&config.commerce, config.http_timeout)?;
        let shopify = ShopifyClient::new(&config.shopify, config.http_timeout)?;
        let stripe = StripeClient::new(&config.stripe, config.http_timeout)?;
        Ok(Self::from_parts(config, pool, commerce, shopify, stripe))
    }

    /// Assemble state from prebuilt clients (tests point them at mock servers).
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        pool: PgPool,
        commerce: CommerceClient,
        shopify: ShopifyClient,
        stripe: StripeClient,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                commerce,
                shopify,
                stripe,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Custom checkout API client.
    #[must_use]
    pub fn commerce(&self) -> &CommerceClient {
        &self.inner.commerce
    }

    /// Shopify Storefront API client (catalog and hosted checkout).
    #[must_use]
    pub fn shopify(&self) -> &ShopifyClient {
        &self.inner.shopify
    }

    /// Payment gateway client.
    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }
}

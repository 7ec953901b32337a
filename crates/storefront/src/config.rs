//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `COMMERCE_API_URL` - Custom checkout GraphQL endpoint
//! - `COMMERCE_API_TOKEN` - Custom checkout API access token
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., wagwell.myshopify.com)
//! - `SHOPIFY_STOREFRONT_TOKEN` - Storefront API access token
//! - `STRIPE_SECRET_KEY` - Stripe secret API key
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `SHOPIFY_API_VERSION` - API version (default: 2024-04)
//! - `ENABLE_SHOPIFY_CHECKOUT` - Send one-time orders to the hosted checkout (default: false)
//! - `BUMP_OFFER_HANDLE` - Product offered as the product-page bump offer
//! - `BUMP_OFFER_VARIANT_ID` - Variant of that product added when the offer is accepted
//! - `SUPPORT_EMAIL` - Address shown when checkout fails (default: support@wagwell.com)
//! - `HTTP_TIMEOUT_SECS` - Upstream request timeout (default: 30)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: <https://api.stripe.com>)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use wagwell_core::VariantId;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Custom checkout API configuration
    pub commerce: CommerceConfig,
    /// Shopify Storefront API configuration
    pub shopify: ShopifyConfig,
    /// Stripe configuration
    pub stripe: StripeConfig,
    /// Checkout behaviour flags
    pub checkout: CheckoutConfig,
    /// Timeout applied to every upstream HTTP request
    pub http_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (defaults to the build profile)
    pub sentry_environment: Option<String>,
}

/// Custom checkout API configuration.
#[derive(Clone)]
pub struct CommerceConfig {
    /// GraphQL endpoint
    pub api_url: String,
    /// Access token (server-side only)
    pub api_token: SecretString,
}

impl std::fmt::Debug for CommerceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

/// Shopify Storefront API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// Shopify store domain (e.g., wagwell.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2024-04)
    pub api_version: String,
    /// Storefront API access token
    pub storefront_token: SecretString,
}

impl ShopifyConfig {
    /// Storefront API GraphQL endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("https://{}/api/{}/graphql.json", self.store, self.api_version)
    }
}

impl std::fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("storefront_token", &"[REDACTED]")
            .finish()
    }
}

/// Stripe configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Base URL of the Stripe REST API
    pub api_base: String,
    /// Secret API key
    pub secret_key: SecretString,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Checkout behaviour flags.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Send carts without subscriptions to the Shopify hosted checkout
    pub shopify_checkout_enabled: bool,
    /// Product offered next to the add-to-cart button
    pub bump_offer_handle: Option<String>,
    /// Variant appended when a shopper accepts the bump offer
    pub bump_offer_variant_id: Option<VariantId>,
    /// Address shown in "contact support" messages
    pub support_email: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            shopify_checkout_enabled: false,
            bump_offer_handle: None,
            bump_offer_variant_id: None,
            support_email: "support@wagwell.com".to_string(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let commerce = CommerceConfig {
            api_url: get_required_env("COMMERCE_API_URL")?,
            api_token: get_validated_secret("COMMERCE_API_TOKEN")?,
        };
        let shopify = ShopifyConfig {
            store: get_required_env("SHOPIFY_STORE")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", "2024-04"),
            storefront_token: get_validated_secret("SHOPIFY_STOREFRONT_TOKEN")?,
        };
        let stripe = StripeConfig {
            api_base: get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com"),
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
        };
        let checkout = CheckoutConfig {
            shopify_checkout_enabled: parse_flag(
                "ENABLE_SHOPIFY_CHECKOUT",
                get_optional_env("ENABLE_SHOPIFY_CHECKOUT").as_deref(),
            )?,
            bump_offer_handle: get_optional_env("BUMP_OFFER_HANDLE")
                .filter(|v| !v.trim().is_empty()),
            bump_offer_variant_id: get_optional_env("BUMP_OFFER_VARIANT_ID")
                .filter(|v| !v.trim().is_empty())
                .map(VariantId::from),
            support_email: get_env_or_default("SUPPORT_EMAIL", "support@wagwell.com"),
        };
        let timeout_secs: u64 = parse_env("HTTP_TIMEOUT_SECS", "30")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            commerce,
            shopify,
            stripe,
            checkout,
            http_timeout: Duration::from_secs(timeout_secs),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Interpret a boolean feature flag. Unset means off.
fn parse_flag(key: &str, value: Option<&str>) -> Result<bool, ConfigError> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("" | "0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Complete configuration pointing at unreachable test hosts.
#[cfg(test)]
pub(crate) fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/test"),
        host: IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("x".repeat(32)),
        commerce: CommerceConfig {
            api_url: "https://commerce.test/graphql".to_string(),
            api_token: SecretString::from("commerce_token_value"),
        },
        shopify: ShopifyConfig {
            store: "wagwell.myshopify.com".to_string(),
            api_version: "2024-04".to_string(),
            storefront_token: SecretString::from("storefront_token_value"),
        },
        stripe: StripeConfig {
            api_base: "https://api.stripe.com".to_string(),
            secret_key: SecretString::from("sk_test_value"),
        },
        checkout: CheckoutConfig::default(),
        http_timeout: Duration::from_secs(30),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-api-key-here", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let err = validate_secret_strength(&"a".repeat(33), "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(!parse_flag("F", None).unwrap());
        assert!(!parse_flag("F", Some("false")).unwrap());
        assert!(!parse_flag("F", Some("0")).unwrap());
        assert!(parse_flag("F", Some("true")).unwrap());
        assert!(parse_flag("F", Some(" TRUE ")).unwrap());
        assert!(parse_flag("F", Some("1")).unwrap());
        assert!(matches!(
            parse_flag("F", Some("maybe")),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_shopify_endpoint() {
        assert_eq!(
            test_config().shopify.endpoint(),
            "https://wagwell.myshopify.com/api/2024-04/graphql.json"
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = test_config();
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("wagwell.myshopify.com"));
        assert!(debug_output.contains("https://commerce.test/graphql"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("commerce_token_value"));
        assert!(!debug_output.contains("storefront_token_value"));
        assert!(!debug_output.contains("sk_test_value"));
    }

    #[test]
    fn test_checkout_defaults() {
        let checkout = CheckoutConfig::default();
        assert!(!checkout.shopify_checkout_enabled);
        assert!(checkout.bump_offer_variant_id.is_none());
        assert_eq!(checkout.support_email, "support@wagwell.com");
    }
}

//! Domain models for the storefront.
//!
//! The cart lives in the session; everything else is mirrored from the
//! commerce and Shopify APIs.

pub mod cart;
pub mod session;

pub use cart::{Cart, CartLine, CheckoutAssociation, CheckoutKind, PendingAuthentication};
pub use session::keys as session_keys;

//! Business logic services for storefront.
//!
//! # Services
//!
//! - `subscriptions` - SMS, newsletter and referral opt-ins
//!
//! The checkout services live in [`crate::checkout`].

pub mod subscriptions;

pub use subscriptions::MarketingSubscriptions;

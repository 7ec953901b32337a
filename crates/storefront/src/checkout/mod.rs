//! Checkout flow.
//!
//! The storefront owns only the session [`Cart`](crate::models::Cart). The
//! checkout itself lives on the commerce API (custom checkout, used for
//! subscriptions) or on Shopify (hosted checkout). The services here keep
//! the two in step and drive the information and payment steps.
//!
//! # Services
//!
//! - [`CheckoutSync`] - custom vs hosted decision, sync, step guards
//! - [`InformationStep`] - email, shipping address, marketing opt-ins
//! - [`PaymentStep`] - billing, card, charge and step-up authentication
//! - [`DiscountService`] - apply, remove and re-sync discount codes
//!
//! Every service is generic over the client traits so tests can run the
//! flow against in-memory fakes.

pub mod discount;
mod error;
pub mod field_map;
pub mod information;
pub mod line_items;
pub mod payment;
pub mod sync;

pub use discount::DiscountService;
pub use error::{CheckoutError, FieldErrors, report};
pub use information::{InformationForm, InformationStep};
pub use payment::{PaymentForm, PaymentOutcome, PaymentStep};
pub use sync::{CheckoutSync, SyncOutcome, ThankYou, should_use_custom_checkout, thank_you};

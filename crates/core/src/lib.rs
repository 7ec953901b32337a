//! Wagwell Core - Shared types library.
//!
//! This crate provides the types shared by the Wagwell storefront components:
//! - `storefront` - Cart, product form and checkout service
//! - `cli` - Command-line tools for migrations
//! - `integration-tests` - Checkout flow tests against in-memory fakes
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, addresses, frequencies and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

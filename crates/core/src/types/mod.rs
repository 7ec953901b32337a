//! Core types for the Wagwell storefront.
//!
//! This module provides type-safe wrappers for common checkout concepts.

pub mod address;
pub mod email;
pub mod frequency;
pub mod id;
pub mod price;
pub mod status;

pub use address::{Address, AddressField};
pub use email::{Email, EmailError};
pub use frequency::{Frequency, FrequencyError, IntervalUnit};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use status::*;

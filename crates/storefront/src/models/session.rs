//! Session-related types.
//!
//! Keys for data stored in the session.

use wagwell_core::CheckoutId;

/// Session keys for storefront data.
pub mod keys {
    /// Key for the session cart.
    pub const CART: &str = "cart";

    /// Suffix of the per-checkout "first access" flag.
    pub const FIRST_ACCESS_SUFFIX: &str = "first_time_accessed";
}

/// Session key of the first-access flag for a completed checkout.
///
/// The flag is written when payment completes and consumed on the first
/// thank-you page load, so purchase analytics fire exactly once.
#[must_use]
pub fn first_access_key(checkout_id: &CheckoutId) -> String {
    format!("{checkout_id}:{}", keys::FIRST_ACCESS_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_access_key() {
        assert_eq!(
            first_access_key(&CheckoutId::new("chk_42")),
            "chk_42:first_time_accessed"
        );
    }
}

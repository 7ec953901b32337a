//! Newtype IDs for remote entity references.
//!
//! Every ID in the checkout flow is an opaque string handed out by a remote
//! API (Shopify GIDs, commerce tokens, Stripe object IDs). Use the
//! `define_id!` macro to create wrappers that keep them from being mixed up.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use wagwell_core::define_id;
/// define_id!(OrderToken);
/// define_id!(ShipmentToken);
///
/// let order = OrderToken::new("abc");
/// assert_eq!(order.as_str(), "abc");
///
/// // These are different types, so this won't compile:
/// // let _: ShipmentToken = order;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the owned string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Remote entity IDs
define_id!(CheckoutId);
define_id!(ProductId);
define_id!(VariantId);
define_id!(PaymentMethodId);
define_id!(PaymentIntentId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_matches_inner() {
        let id = CheckoutId::new("chk_123");
        assert_eq!(id.to_string(), "chk_123");
        assert_eq!(id.as_str(), "chk_123");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = VariantId::from("gid://shopify/ProductVariant/42");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"gid://shopify/ProductVariant/42\"");
    }
}

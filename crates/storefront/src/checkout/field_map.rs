//! Mapping of mutation error paths onto form fields.
//!
//! The commerce API reports `userErrors[].field` as an input path such as
//! `["input", "shippingAddress", "zip"]`. The forms use flat snake-case
//! names (`zip`, `billing_zip`, `discount_code`).

use wagwell_core::AddressField;

/// Address input keys as the commerce API spells them.
const ADDRESS_FIELDS: &[(&str, AddressField)] = &[
    ("firstName", AddressField::FirstName),
    ("lastName", AddressField::LastName),
    ("address1", AddressField::Address1),
    ("address2", AddressField::Address2),
    ("city", AddressField::City),
    ("province", AddressField::Province),
    ("provinceCode", AddressField::Province),
    ("zip", AddressField::Zip),
    ("country", AddressField::CountryCode),
    ("countryCode", AddressField::CountryCode),
    ("phone", AddressField::Phone),
];

/// Prefix of billing address form fields.
pub const BILLING_PREFIX: &str = "billing_";

fn address_field(key: &str) -> Option<AddressField> {
    ADDRESS_FIELDS
        .iter()
        .find(|(wire, _)| *wire == key)
        .map(|(_, field)| *field)
}

/// Form field for a user-error path, or `None` for form-level errors.
#[must_use]
pub fn form_field(path: &[String]) -> Option<String> {
    let path: Vec<&str> = path.iter().map(String::as_str).collect();
    let path = match path.as_slice() {
        ["input", rest @ ..] => rest,
        rest => rest,
    };

    match path {
        ["email"] => Some("email".to_string()),
        ["shippingAddress", key, ..] => address_field(key).map(|f| f.name().to_string()),
        ["billingAddress", key, ..] => {
            address_field(key).map(|f| format!("{BILLING_PREFIX}{}", f.name()))
        }
        ["shippingRateHandle" | "shippingLine", ..] => Some("shipping_rate".to_string()),
        ["discount" | "discountCode", ..] => Some("discount_code".to_string()),
        ["note"] => Some("note".to_string()),
        ["paymentMethodId" | "paymentIntentId", ..] => Some("card".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_shipping_address_fields() {
        assert_eq!(
            form_field(&path(&["shippingAddress", "address1"])).as_deref(),
            Some("address1")
        );
        assert_eq!(
            form_field(&path(&["input", "shippingAddress", "countryCode"])).as_deref(),
            Some("country_code")
        );
        assert_eq!(
            form_field(&path(&["shippingAddress", "provinceCode"])).as_deref(),
            Some("province")
        );
    }

    #[test]
    fn test_billing_address_fields_are_prefixed() {
        assert_eq!(
            form_field(&path(&["billingAddress", "zip"])).as_deref(),
            Some("billing_zip")
        );
    }

    #[test]
    fn test_other_fields() {
        assert_eq!(form_field(&path(&["input", "email"])).as_deref(), Some("email"));
        assert_eq!(
            form_field(&path(&["discount", "code"])).as_deref(),
            Some("discount_code")
        );
        assert_eq!(
            form_field(&path(&["shippingRateHandle"])).as_deref(),
            Some("shipping_rate")
        );
    }

    #[test]
    fn test_unknown_paths_are_form_level() {
        assert_eq!(form_field(&path(&["lineItems", "0", "quantity"])), None);
        assert_eq!(form_field(&path(&["shippingAddress", "company"])), None);
        assert_eq!(form_field(&[]), None);
    }
}

//! Postal address shared by the information and payment steps.
//!
//! The same struct is submitted as the shipping address on the information
//! step and read back from `checkout.shipping_address` on the payment step,
//! so the field names here are the single source of truth for both.

use serde::{Deserialize, Serialize};

/// A shipping or billing address.
///
/// Missing fields deserialize as blank so validation can report them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    /// Province or state code, e.g. `CA`.
    pub province: String,
    pub zip: String,
    /// ISO 3166-1 alpha-2 country code, e.g. `US`.
    pub country_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Form field names of an [`Address`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressField {
    FirstName,
    LastName,
    Address1,
    Address2,
    City,
    Province,
    Zip,
    CountryCode,
    Phone,
}

impl AddressField {
    /// Fields a deliverable address cannot do without.
    pub const REQUIRED: [Self; 7] = [
        Self::FirstName,
        Self::LastName,
        Self::Address1,
        Self::City,
        Self::Province,
        Self::Zip,
        Self::CountryCode,
    ];

    /// Snake-case form field name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Address1 => "address1",
            Self::Address2 => "address2",
            Self::City => "city",
            Self::Province => "province",
            Self::Zip => "zip",
            Self::CountryCode => "country_code",
            Self::Phone => "phone",
        }
    }

    /// Human label used in validation messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FirstName => "First name",
            Self::LastName => "Last name",
            Self::Address1 => "Address",
            Self::Address2 => "Apartment, suite, etc.",
            Self::City => "City",
            Self::Province => "State",
            Self::Zip => "ZIP code",
            Self::CountryCode => "Country",
            Self::Phone => "Phone",
        }
    }
}

impl Address {
    /// Value of a single field; optional fields read as empty.
    #[must_use]
    pub fn get(&self, field: AddressField) -> &str {
        match field {
            AddressField::FirstName => &self.first_name,
            AddressField::LastName => &self.last_name,
            AddressField::Address1 => &self.address1,
            AddressField::Address2 => self.address2.as_deref().unwrap_or(""),
            AddressField::City => &self.city,
            AddressField::Province => &self.province,
            AddressField::Zip => &self.zip,
            AddressField::CountryCode => &self.country_code,
            AddressField::Phone => self.phone.as_deref().unwrap_or(""),
        }
    }

    /// Required fields left blank, in form order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<AddressField> {
        AddressField::REQUIRED
            .into_iter()
            .filter(|field| self.get(*field).trim().is_empty())
            .collect()
    }

    /// Copy with surrounding whitespace stripped and empty optionals dropped.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let opt = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        Self {
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            address1: self.address1.trim().to_owned(),
            address2: opt(&self.address2),
            city: self.city.trim().to_owned(),
            province: self.province.trim().to_owned(),
            zip: self.zip.trim().to_owned(),
            country_code: self.country_code.trim().to_ascii_uppercase(),
            phone: opt(&self.phone),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_in_form_order() {
        let address = Address {
            first_name: "Ada".to_string(),
            city: "  ".to_string(),
            ..Address::default()
        };
        let missing = address.missing_fields();
        assert_eq!(missing.first(), Some(&AddressField::LastName));
        assert!(missing.contains(&AddressField::City));
        assert!(!missing.contains(&AddressField::FirstName));
    }

    #[test]
    fn test_normalized_drops_blank_optionals() {
        let address = Address {
            address2: Some("   ".to_string()),
            country_code: "us".to_string(),
            ..Address::default()
        }
        .normalized();
        assert_eq!(address.address2, None);
        assert_eq!(address.country_code, "US");
    }
}

//! Product form: turns a shopper's selections into cart lines.

use serde::Deserialize;
use tracing::{instrument, warn};
use uuid::Uuid;

use wagwell_core::{Frequency, VariantId};

use crate::checkout::{CheckoutError, FieldErrors};
use crate::commerce::Attribute;
use crate::models::{Cart, CartLine};
use crate::shopify::{CatalogApi, Product, ProductVariant};

/// Line property holding the chosen container.
pub const CONTAINER_PROPERTY: &str = "container";

/// Line property marking the bump offer line.
pub const BUMP_OFFER_PROPERTY: &str = "bump_offer";

const fn default_quantity() -> u32 {
    1
}

/// Values submitted from the product page.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductFormValues {
    pub sku: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Subscribe and save instead of a one-time purchase.
    #[serde(default)]
    pub subscription: bool,
    /// Delivery frequency. Ignored for one-time purchases.
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub container: Option<String>,
    /// Shopper ticked the bump offer next to the add-to-cart button.
    #[serde(default)]
    pub bump_offer: bool,
}

/// The configured bump offer resolved against the catalog.
#[derive(Debug, Clone, Copy)]
pub struct BumpOffer<'a> {
    pub product: &'a Product,
    pub variant: &'a ProductVariant,
}

fn line(
    product: &Product,
    variant: &ProductVariant,
    quantity: u32,
    frequency: Option<Frequency>,
    properties: Vec<Attribute>,
) -> Result<CartLine, CheckoutError> {
    let unit_price = variant.price.to_price().ok_or_else(|| {
        CheckoutError::contract(format!(
            "variant {} has an unusable price {} {}",
            variant.id, variant.price.amount, variant.price.currency_code
        ))
    })?;
    Ok(CartLine {
        key: Uuid::new_v4(),
        variant_id: variant.id.clone(),
        product_handle: product.handle.clone(),
        sku: variant.sku.clone(),
        title: product.title.clone(),
        quantity,
        frequency,
        unit_price,
        properties,
    })
}

/// Build the cart lines for a product form submission.
///
/// # Errors
///
/// - `ContractViolation` when the SKU is not one of the product's variants
///   (the form only offers real SKUs)
/// - `Rejected` when the variant is sold out
/// - `Validation` for quantity, subscription, frequency and container
pub fn cart_lines(
    product: &Product,
    values: &ProductFormValues,
    bump: Option<BumpOffer<'_>>,
) -> Result<Vec<CartLine>, CheckoutError> {
    let variant = product.variant_by_sku(&values.sku).ok_or_else(|| {
        CheckoutError::contract(format!(
            "sku {} is not a variant of {}",
            values.sku, product.handle
        ))
    })?;
    if !variant.available_for_sale {
        return Err(CheckoutError::rejected(format!(
            "{} is sold out.",
            product.title
        )));
    }

    let mut errors = FieldErrors::new();

    if values.quantity == 0 {
        errors.add("quantity", "Quantity must be at least 1");
    }

    let frequency = if values.subscription {
        if !product.supports_subscription() {
            errors.add("subscription", "This product isn't available as a subscription");
        }
        match values.frequency {
            None => {
                errors.add("frequency", "Please choose a delivery frequency");
                None
            }
            Some(f)
                if !product.subscription_frequencies.is_empty()
                    && !product.subscription_frequencies.contains(&f) =>
            {
                errors.add("frequency", "Please choose a delivery frequency");
                None
            }
            Some(f) => Some(f),
        }
    } else {
        if product.requires_selling_plan {
            errors.add("subscription", "This product is only available as a subscription");
        }
        None
    };

    let container = values
        .container
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    match container {
        Some(c) if !product.container_options.is_empty()
            && !product.container_options.iter().any(|o| o == c) =>
        {
            errors.add("container", "Please choose a container");
        }
        None if !product.container_options.is_empty() => {
            errors.add("container", "Please choose a container");
        }
        _ => {}
    }

    errors.into_result()?;

    let properties = container
        .map(|c| vec![Attribute::new(CONTAINER_PROPERTY, c)])
        .unwrap_or_default();
    let mut lines = vec![line(product, variant, values.quantity, frequency, properties)?];

    if values.bump_offer {
        match bump {
            Some(offer) => lines.push(line(
                offer.product,
                offer.variant,
                1,
                None,
                vec![Attribute::new(BUMP_OFFER_PROPERTY, "true")],
            )?),
            None => warn!(handle = %product.handle, "Bump offer accepted but none is configured"),
        }
    }

    Ok(lines)
}

/// Product form service.
pub struct ProductForm<'a, S> {
    catalog: &'a S,
    bump_offer_handle: Option<&'a str>,
    bump_offer_variant_id: Option<&'a VariantId>,
}

impl<'a, S: CatalogApi> ProductForm<'a, S> {
    pub const fn new(
        catalog: &'a S,
        bump_offer_handle: Option<&'a str>,
        bump_offer_variant_id: Option<&'a VariantId>,
    ) -> Self {
        Self {
            catalog,
            bump_offer_handle,
            bump_offer_variant_id,
        }
    }

    /// Add a product form submission to the cart. Returns the number of
    /// lines added.
    ///
    /// # Errors
    ///
    /// Catalog errors, plus everything [`cart_lines`] returns.
    #[instrument(skip(self, cart, values), fields(sku = %values.sku))]
    pub async fn add_to_cart(
        &self,
        cart: &mut Cart,
        handle: &str,
        values: &ProductFormValues,
    ) -> Result<usize, CheckoutError> {
        let product = self.catalog.product_by_handle(handle).await?;

        let bump_product = match (values.bump_offer, self.bump_offer_handle) {
            (true, Some(bump_handle)) => Some(self.catalog.product_by_handle(bump_handle).await?),
            _ => None,
        };
        let bump = bump_product.as_ref().and_then(|product| {
            let variant_id = self.bump_offer_variant_id?;
            let variant = product.variants.iter().find(|v| &v.id == variant_id);
            if variant.is_none() {
                warn!(handle = %product.handle, variant_id = %variant_id, "Bump offer variant not found");
            }
            variant.map(|variant| BumpOffer { product, variant })
        });

        let lines = cart_lines(&product, values, bump)?;
        let added = lines.len();
        for line in lines {
            cart.add(line);
        }
        Ok(added)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::shopify::Money;
    use wagwell_core::{IntervalUnit, ProductId};

    fn variant(id: &str, sku: &str, amount: &str) -> ProductVariant {
        ProductVariant {
            id: VariantId::new(id),
            title: "Default".to_string(),
            sku: Some(sku.to_string()),
            available_for_sale: true,
            price: Money {
                amount: amount.to_string(),
                currency_code: "USD".to_string(),
            },
            compare_at_price: None,
            selected_options: vec![],
        }
    }

    fn product() -> Product {
        Product {
            id: ProductId::new("p1"),
            handle: "hip-joint".to_string(),
            title: "Hip & Joint".to_string(),
            description: String::new(),
            product_type: "Supplement".to_string(),
            tags: vec![],
            featured_image: None,
            variants: vec![variant("v1", "HJ-30", "39.00")],
            requires_selling_plan: false,
            subscription_frequencies: vec![Frequency::new(4, IntervalUnit::Week)],
            container_options: vec!["pouch".to_string(), "jar".to_string()],
        }
    }

    fn values() -> ProductFormValues {
        ProductFormValues {
            sku: "HJ-30".to_string(),
            quantity: 2,
            subscription: true,
            frequency: Some(Frequency::new(4, IntervalUnit::Week)),
            container: Some("jar".to_string()),
            bump_offer: false,
        }
    }

    #[test]
    fn test_subscription_line() {
        let lines = cart_lines(&product(), &values(), None).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
        assert!(lines[0].is_subscription());
        assert_eq!(lines[0].properties, vec![Attribute::new("container", "jar")]);
        assert_eq!(lines[0].line_price().to_string(), "$78.00");
    }

    #[test]
    fn test_unknown_sku_is_contract_violation() {
        let values = ProductFormValues {
            sku: "NOPE".to_string(),
            ..values()
        };
        let err = cart_lines(&product(), &values, None).unwrap_err();
        assert!(matches!(err, CheckoutError::ContractViolation(_)));
    }

    #[test]
    fn test_subscription_requires_frequency() {
        let values = ProductFormValues {
            frequency: None,
            quantity: 0,
            ..values()
        };
        let CheckoutError::Validation(errors) = cart_lines(&product(), &values, None).unwrap_err()
        else {
            panic!("expected validation error");
        };
        assert!(errors.get("frequency").is_some());
        assert!(errors.get("quantity").is_some());
    }

    #[test]
    fn test_one_time_ignores_frequency() {
        let values = ProductFormValues {
            subscription: false,
            ..values()
        };
        let lines = cart_lines(&product(), &values, None).unwrap();
        assert!(!lines[0].is_subscription());
    }

    #[test]
    fn test_container_must_be_offered() {
        let values = ProductFormValues {
            container: Some("bucket".to_string()),
            ..values()
        };
        let CheckoutError::Validation(errors) = cart_lines(&product(), &values, None).unwrap_err()
        else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("container"), Some("Please choose a container"));
    }

    #[test]
    fn test_bump_offer_appends_one_time_line() {
        let mut bump_product = product();
        bump_product.handle = "dental-chews".to_string();
        bump_product.variants = vec![variant("v9", "DC-10", "9.90")];
        let bump = BumpOffer {
            product: &bump_product,
            variant: &bump_product.variants[0],
        };

        let values = ProductFormValues {
            bump_offer: true,
            ..values()
        };
        let lines = cart_lines(&product(), &values, Some(bump)).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].variant_id, VariantId::new("v9"));
        assert_eq!(lines[1].quantity, 1);
        assert!(!lines[1].is_subscription());
        assert_eq!(
            lines[1].properties,
            vec![Attribute::new(BUMP_OFFER_PROPERTY, "true")]
        );
    }

    #[test]
    fn test_form_defaults() {
        let values: ProductFormValues =
            serde_json::from_value(serde_json::json!({ "sku": "HJ-30" })).unwrap();
        assert_eq!(values.quantity, 1);
        assert!(!values.subscription);
        assert!(!values.bump_offer);
    }
}

//! Cart to checkout input conversion.

use crate::commerce::{Attribute, LineItemInput};
use crate::models::{Cart, CartLine};
use crate::shopify::HostedLineItemInput;

/// Attribute carrying the cart line key on hosted checkout lines.
pub const LINE_KEY_ATTRIBUTE: &str = "_line_key";

/// Hide a custom property from the hosted checkout's order summary and
/// stop it from merging otherwise identical lines.
fn hosted_attribute_key(key: &str) -> String {
    if key.starts_with('_') {
        key.to_string()
    } else {
        format!("_{key}")
    }
}

fn hosted_line(line: &CartLine) -> HostedLineItemInput {
    let mut custom_attributes: Vec<Attribute> = line
        .properties
        .iter()
        .map(|p| Attribute::new(hosted_attribute_key(&p.key), p.value.clone()))
        .collect();
    custom_attributes.push(Attribute::new(LINE_KEY_ATTRIBUTE, line.key.to_string()));

    HostedLineItemInput {
        variant_id: line.variant_id.clone(),
        quantity: line.quantity,
        custom_attributes,
    }
}

/// Line items for `SHOPIFY_CHECKOUT_CREATE` / `SHOPIFY_CHECKOUT_LINE_ITEM_REPLACE`.
#[must_use]
pub fn hosted_line_items(cart: &Cart) -> Vec<HostedLineItemInput> {
    cart.lines.iter().map(hosted_line).collect()
}

/// Line items for the custom checkout.
#[must_use]
pub fn custom_line_items(cart: &Cart) -> Vec<LineItemInput> {
    cart.lines
        .iter()
        .map(|line| LineItemInput {
            variant_id: line.variant_id.clone(),
            quantity: line.quantity,
            order_interval_frequency: line.frequency.map(|f| f.interval),
            order_interval_unit: line.frequency.map(|f| f.unit),
            properties: line.properties.clone(),
        })
        .collect()
}

/// Note attributes for the custom checkout: tracking attributes merged
/// over any the checkout already carries.
#[must_use]
pub fn note_attributes(existing: &[Attribute], tracking: &[Attribute]) -> Vec<Attribute> {
    let mut merged: Vec<Attribute> = existing
        .iter()
        .filter(|a| !tracking.iter().any(|t| t.key == a.key))
        .cloned()
        .collect();
    merged.extend(tracking.iter().cloned());
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;
    use wagwell_core::{CurrencyCode, Frequency, IntervalUnit, Price, VariantId};

    fn cart_line(properties: Vec<Attribute>, frequency: Option<Frequency>) -> CartLine {
        CartLine {
            key: Uuid::new_v4(),
            variant_id: VariantId::new("v1"),
            product_handle: "hip-joint".to_string(),
            sku: None,
            title: "Hip & Joint".to_string(),
            quantity: 2,
            frequency,
            unit_price: Price::new(Decimal::new(3900, 2), CurrencyCode::USD),
            properties,
        }
    }

    #[test]
    fn test_hosted_attributes_are_prefixed_and_keyed() {
        let mut cart = Cart::default();
        cart.lines.push(cart_line(
            vec![
                Attribute::new("container", "jar"),
                Attribute::new("_internal", "x"),
            ],
            None,
        ));
        let items = hosted_line_items(&cart);
        let attrs = &items[0].custom_attributes;
        assert_eq!(attrs[0], Attribute::new("_container", "jar"));
        assert_eq!(attrs[1], Attribute::new("_internal", "x"));
        assert_eq!(attrs[2].key, LINE_KEY_ATTRIBUTE);
        assert_eq!(attrs[2].value, cart.lines[0].key.to_string());
    }

    #[test]
    fn test_identical_lines_stay_distinct_on_hosted_checkout() {
        let mut cart = Cart::default();
        cart.lines.push(cart_line(vec![], None));
        cart.lines.push(cart_line(vec![], None));
        let items = hosted_line_items(&cart);
        assert_ne!(items[0].custom_attributes, items[1].custom_attributes);
    }

    #[test]
    fn test_custom_line_items_carry_frequency() {
        let mut cart = Cart::default();
        cart.lines.push(cart_line(
            vec![Attribute::new("container", "pouch")],
            Some(Frequency::new(4, IntervalUnit::Week)),
        ));
        let items = custom_line_items(&cart);
        assert_eq!(items[0].order_interval_frequency, Some(4));
        assert_eq!(items[0].order_interval_unit, Some(IntervalUnit::Week));
        assert_eq!(items[0].properties[0].key, "container");
    }

    #[test]
    fn test_note_attributes_tracking_wins() {
        let merged = note_attributes(
            &[
                Attribute::new("gift", "yes"),
                Attribute::new("utm_source", "old"),
            ],
            &[Attribute::new("utm_source", "newsletter")],
        );
        assert_eq!(
            merged,
            vec![
                Attribute::new("gift", "yes"),
                Attribute::new("utm_source", "newsletter")
            ]
        );
    }
}

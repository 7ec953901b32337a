//! Raw response to domain type conversions.

use wagwell_core::Frequency;

use super::queries::{CollectionNode, Metafield, ProductNode, ProductSummaryNode, VariantNode};
use crate::shopify::types::{Collection, Product, ProductSummary, ProductVariant};

/// Decode a metafield holding a JSON list of strings.
///
/// Malformed metafields are logged and treated as empty so a bad merchant
/// edit does not take the product page down.
fn string_list(metafield: Option<Metafield>, name: &str) -> Vec<String> {
    let Some(metafield) = metafield else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<String>>(&metafield.value) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!(metafield = name, error = %e, "Ignoring malformed metafield");
            Vec::new()
        }
    }
}

fn parse_frequencies(metafield: Option<Metafield>) -> Vec<Frequency> {
    string_list(metafield, "subscriptions.frequencies")
        .into_iter()
        .filter_map(|raw| match raw.parse::<Frequency>() {
            Ok(f) => Some(f),
            Err(e) => {
                tracing::warn!(value = %raw, error = %e, "Skipping unknown frequency");
                None
            }
        })
        .collect()
}

fn convert_variant(node: VariantNode) -> ProductVariant {
    ProductVariant {
        id: node.id,
        title: node.title,
        sku: node.sku.filter(|s| !s.is_empty()),
        available_for_sale: node.available_for_sale,
        price: node.price,
        compare_at_price: node.compare_at_price,
        selected_options: node.selected_options,
    }
}

pub fn convert_product(node: ProductNode) -> Product {
    Product {
        id: node.id,
        handle: node.handle,
        title: node.title,
        description: node.description,
        product_type: node.product_type,
        tags: node.tags,
        featured_image: node.featured_image,
        variants: node.variants.nodes.into_iter().map(convert_variant).collect(),
        requires_selling_plan: node.requires_selling_plan,
        subscription_frequencies: parse_frequencies(node.frequencies),
        container_options: string_list(node.containers, "custom.container_options"),
    }
}

fn convert_product_summary(node: ProductSummaryNode) -> ProductSummary {
    ProductSummary {
        id: node.id,
        handle: node.handle,
        title: node.title,
        available_for_sale: node.available_for_sale,
        featured_image: node.featured_image,
        min_price: node.price_range.min_variant_price,
    }
}

pub fn convert_collection(node: CollectionNode) -> Collection {
    Collection {
        id: node.id,
        handle: node.handle,
        title: node.title,
        description: node.description,
        products: node
            .products
            .nodes
            .into_iter()
            .map(convert_product_summary)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wagwell_core::IntervalUnit;

    fn metafield(value: &str) -> Option<Metafield> {
        Some(Metafield {
            value: value.to_string(),
        })
    }

    #[test]
    fn test_parse_frequencies_skips_unknown() {
        let parsed = parse_frequencies(metafield(r#"["4_week","fortnightly","2_month"]"#));
        assert_eq!(
            parsed,
            vec![
                Frequency::new(4, IntervalUnit::Week),
                Frequency::new(2, IntervalUnit::Month)
            ]
        );
    }

    #[test]
    fn test_malformed_metafield_is_empty() {
        assert!(string_list(metafield("not json"), "test").is_empty());
        assert!(string_list(None, "test").is_empty());
    }

    #[test]
    fn test_container_options() {
        assert_eq!(
            string_list(metafield(r#"["pouch","jar"]"#), "test"),
            vec!["pouch".to_string(), "jar".to_string()]
        );
    }
}

//! Product type conversion functions.

use cartlink_core::{Product, ProductId, ProductVariant, VariantId};

use crate::shopify::ShopifyError;

use super::super::wire::ProductNode;
use super::cart::convert_money;

pub fn convert_product(node: ProductNode) -> Result<Product, ShopifyError> {
    let variants = node
        .variants
        .edges
        .into_iter()
        .map(|edge| {
            let variant = edge.node;
            Ok(ProductVariant {
                id: VariantId::new(variant.id),
                title: variant.title,
                available_for_sale: variant.available_for_sale,
                price: convert_money(&variant.price)?,
            })
        })
        .collect::<Result<Vec<_>, ShopifyError>>()?;

    Ok(Product {
        id: ProductId::new(node.id),
        handle: node.handle,
        title: node.title,
        variants,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shopify::storefront::wire::GetProductData;

    #[test]
    fn test_convert_product() {
        let data: GetProductData = serde_json::from_str(
            r#"{
                "product": {
                    "id": "gid://shopify/Product/7",
                    "handle": "onward-package-protection",
                    "title": "Package Protection",
                    "variants": { "edges": [
                        { "node": {
                            "id": "gid://shopify/ProductVariant/70",
                            "title": "Default Title",
                            "availableForSale": true,
                            "price": { "amount": "1.96", "currencyCode": "EUR" }
                        } }
                    ] }
                }
            }"#,
        )
        .unwrap();

        let product = convert_product(data.product.unwrap()).unwrap();
        assert_eq!(product.handle, "onward-package-protection");
        assert_eq!(product.variants.len(), 1);
        assert_eq!(product.variants.first().map(|v| v.price.display()), Some("€1.96".to_string()));
    }
}

//! Widget-facing projections of cart and catalog state.
//!
//! The checkout widget only ever sees these shapes. Unit prices are withheld
//! from the embedded variant: the widget gets the aggregate line cost and
//! nothing else, so it cannot reprice lines on its own.
//!
//! Snapshots are owned values. Replacing the authoritative [`Cart`] later
//! never changes a snapshot that was already produced.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::cart::{Cart, LineItem};
use super::id::{LineId, VariantId};
use super::price::{CurrencyCode, WidgetMoney};
use super::product::Product;

/// A field the widget contract requires but that is never filled in.
///
/// Always serializes as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Withheld;

impl Serialize for Withheld {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_none()
    }
}

impl<'de> Deserialize<'de> for Withheld {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<serde::de::IgnoredAny>::deserialize(deserializer).map(|_| Self)
    }
}

/// Variant reference embedded in a snapshot line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotVariant {
    pub id: VariantId,
    pub requires_shipping: bool,
    /// Unit price, withheld.
    #[serde(default)]
    pub price: Withheld,
}

/// One cart line as the widget sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub id: LineId,
    /// Unit price × quantity at snapshot time.
    pub cost: WidgetMoney,
    pub quantity: u32,
    #[serde(default)]
    pub properties: Withheld,
    pub variant: SnapshotVariant,
}

impl From<&LineItem> for SnapshotItem {
    fn from(line: &LineItem) -> Self {
        Self {
            id: line.id.clone(),
            cost: line.cost().to_widget(),
            quantity: line.quantity,
            properties: Withheld,
            variant: SnapshotVariant {
                id: line.variant.id.clone(),
                requires_shipping: line.variant.requires_shipping,
                price: Withheld,
            },
        }
    }
}

/// Point-in-time projection of a cart for the widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub currency: Option<CurrencyCode>,
    pub items: Vec<SnapshotItem>,
}

impl CartSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&Cart> for CartSnapshot {
    fn from(cart: &Cart) -> Self {
        Self {
            currency: cart.currency_code,
            items: cart.lines.iter().map(SnapshotItem::from).collect(),
        }
    }
}

/// A priced variant of the insurance add-on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceVariant {
    pub id: VariantId,
    pub price: WidgetMoney,
}

/// The insurance add-on product as the widget sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceProduct {
    pub variants: Vec<InsuranceVariant>,
}

impl From<&Product> for InsuranceProduct {
    fn from(product: &Product) -> Self {
        Self {
            variants: product
                .variants
                .iter()
                .map(|variant| InsuranceVariant {
                    id: variant.id.clone(),
                    price: variant.price.to_widget(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::types::cart::Variant;
    use crate::types::id::{CartId, ProductId};
    use crate::types::price::Price;
    use crate::types::product::ProductVariant;

    fn cart_with(lines: Vec<(&str, &str, u32)>) -> Cart {
        let eur = CurrencyCode::EUR;
        Cart {
            id: CartId::new("gid://shopify/Cart/c1"),
            checkout_url: "https://shop.example/cart/c/c1".to_string(),
            currency_code: Some(eur),
            lines: lines
                .into_iter()
                .enumerate()
                .map(|(i, (variant, amount, quantity))| LineItem {
                    id: LineId::new(format!("line-{i}")),
                    quantity,
                    variant: Variant {
                        id: VariantId::new(variant),
                        title: "Default Title".to_string(),
                        product_title: "Dried Pineapple".to_string(),
                        price: Price::parse(amount, "EUR").unwrap(),
                        requires_shipping: i % 2 == 0,
                    },
                })
                .collect(),
            subtotal: Price::zero(eur),
            total_tax: None,
            total: Price::zero(eur),
        }
    }

    #[test]
    fn test_single_line_cost_and_currency() {
        let cart = cart_with(vec![("v1", "10.00", 3)]);
        let snapshot = CartSnapshot::from(&cart);

        assert_eq!(snapshot.currency, Some(CurrencyCode::EUR));
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].cost.amount, Decimal::new(3000, 2));
        assert_eq!(snapshot.items[0].cost.currency_code, CurrencyCode::EUR);
        assert_eq!(snapshot.items[0].quantity, 3);
    }

    #[test]
    fn test_every_line_cost_matches_price_times_quantity() {
        let cart = cart_with(vec![("v1", "0.99", 7), ("v2", "12.50", 1), ("v3", "3", 12)]);
        let snapshot = CartSnapshot::from(&cart);

        for (line, item) in cart.lines.iter().zip(&snapshot.items) {
            assert_eq!(
                item.cost.amount,
                line.variant.price.amount() * Decimal::from(line.quantity)
            );
            assert_eq!(item.variant.requires_shipping, line.variant.requires_shipping);
        }
    }

    #[test]
    fn test_wire_shape_withholds_unit_price() {
        let cart = cart_with(vec![("gid://shopify/ProductVariant/1", "10.00", 3)]);
        let value = serde_json::to_value(CartSnapshot::from(&cart)).unwrap();

        assert_eq!(
            value,
            json!({
                "currency": "EUR",
                "items": [{
                    "id": "line-0",
                    "cost": { "amount": 30.0, "currencyCode": "EUR" },
                    "quantity": 3,
                    "properties": null,
                    "variant": {
                        "id": "gid://shopify/ProductVariant/1",
                        "requiresShipping": true,
                        "price": null
                    }
                }]
            })
        );
    }

    #[test]
    fn test_snapshot_is_detached_from_cart() {
        let mut cart = cart_with(vec![("v1", "10.00", 1)]);
        let snapshot = CartSnapshot::from(&cart);

        cart.lines[0].quantity = 5;
        cart.lines.clear();

        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].quantity, 1);
    }

    #[test]
    fn test_empty_cart_snapshot() {
        let snapshot = CartSnapshot::from(&cart_with(vec![]));
        assert!(snapshot.is_empty());
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["items"], json!([]));
    }

    #[test]
    fn test_insurance_product_prices_are_numeric() {
        let product = Product {
            id: ProductId::new("gid://shopify/Product/9"),
            handle: "onward-package-protection".to_string(),
            title: "Package Protection".to_string(),
            variants: vec![ProductVariant {
                id: VariantId::new("gid://shopify/ProductVariant/90"),
                title: "Default Title".to_string(),
                available_for_sale: true,
                price: Price::parse("2.5", "EUR").unwrap(),
            }],
        };

        let value = serde_json::to_value(InsuranceProduct::from(&product)).unwrap();
        assert_eq!(
            value,
            json!({
                "variants": [{
                    "id": "gid://shopify/ProductVariant/90",
                    "price": { "amount": 2.5, "currencyCode": "EUR" }
                }]
            })
        );
    }
}

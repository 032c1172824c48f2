//! Authoritative cart model.
//!
//! A [`Cart`] is always a copy of what the commerce backend last returned.
//! Mutations go through the backend and come back as a whole new `Cart`.

use serde::{Deserialize, Serialize};

use super::id::{CartId, LineId, VariantId};
use super::price::{CurrencyCode, Price};

/// A specific purchasable configuration of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Variant ID.
    pub id: VariantId,
    /// Variant title ("Default Title" for single-variant products).
    pub title: String,
    /// Title of the parent product.
    pub product_title: String,
    /// Unit price.
    pub price: Price,
    /// Whether the variant ships physically.
    pub requires_shipping: bool,
}

impl Variant {
    /// Variant title worth showing next to the product title.
    #[must_use]
    pub fn display_title(&self) -> Option<&str> {
        (self.title != "Default Title" && !self.title.is_empty()).then_some(self.title.as_str())
    }
}

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Cart line ID.
    pub id: LineId,
    /// Quantity (always at least one in a cart returned by the backend).
    pub quantity: u32,
    /// The purchased variant.
    pub variant: Variant,
}

impl LineItem {
    /// Derived line cost: unit price × quantity.
    #[must_use]
    pub fn cost(&self) -> Price {
        self.variant.price.times(self.quantity)
    }
}

/// A shopping cart as last reported by the commerce backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart ID.
    pub id: CartId,
    /// Hosted checkout URL.
    pub checkout_url: String,
    /// Cart currency, when the backend reports one.
    pub currency_code: Option<CurrencyCode>,
    /// Cart lines, in backend order.
    pub lines: Vec<LineItem>,
    /// Subtotal before tax and shipping.
    pub subtotal: Price,
    /// Total tax, when already known.
    pub total_tax: Option<Price>,
    /// Total amount.
    pub total: Price,
}

impl Cart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// IDs of every line, in order.
    #[must_use]
    pub fn line_ids(&self) -> Vec<LineId> {
        self.lines.iter().map(|line| line.id.clone()).collect()
    }

    /// Look up a line by ID.
    #[must_use]
    pub fn line(&self, id: &LineId) -> Option<&LineItem> {
        self.lines.iter().find(|line| &line.id == id)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn variant(id: &str, amount: &str) -> Variant {
        Variant {
            id: VariantId::new(id),
            title: "Default Title".to_string(),
            product_title: "Pineapple".to_string(),
            price: Price::parse(amount, "EUR").unwrap(),
            requires_shipping: true,
        }
    }

    #[test]
    fn test_line_cost_is_price_times_quantity() {
        let line = LineItem {
            id: LineId::new("l1"),
            quantity: 4,
            variant: variant("v1", "2.25"),
        };
        assert_eq!(line.cost(), Price::parse("9.00", "EUR").unwrap());
    }

    #[test]
    fn test_display_title_hides_default() {
        let mut v = variant("v1", "1.00");
        assert_eq!(v.display_title(), None);
        v.title = "Large".to_string();
        assert_eq!(v.display_title(), Some("Large"));
    }

    #[test]
    fn test_cart_lookup_helpers() {
        let eur = CurrencyCode::EUR;
        let cart = Cart {
            id: CartId::new("c1"),
            checkout_url: "https://shop.example/checkout".to_string(),
            currency_code: Some(eur),
            lines: vec![
                LineItem {
                    id: LineId::new("l1"),
                    quantity: 1,
                    variant: variant("v1", "1.00"),
                },
                LineItem {
                    id: LineId::new("l2"),
                    quantity: 2,
                    variant: variant("v2", "1.00"),
                },
            ],
            subtotal: Price::zero(eur),
            total_tax: None,
            total: Price::zero(eur),
        };

        assert_eq!(cart.line_ids(), vec![LineId::new("l1"), LineId::new("l2")]);
        assert_eq!(cart.total_quantity(), 3);
        assert!(cart.line(&LineId::new("l2")).is_some());
        assert!(cart.line(&LineId::new("l3")).is_none());
        assert!(!cart.is_empty());
    }
}

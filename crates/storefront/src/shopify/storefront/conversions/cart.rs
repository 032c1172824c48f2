//! Cart type conversion functions.

use cartlink_core::{Cart, CartId, CurrencyCode, LineId, LineItem, Price, Variant, VariantId};
use tracing::warn;

use crate::shopify::ShopifyError;

use super::super::wire::{CartLineNode, CartMutationPayload, CartNode, MoneyNode};

/// Normalize a Storefront API money object.
pub fn convert_money(money: &MoneyNode) -> Result<Price, ShopifyError> {
    Price::parse(&money.amount, &money.currency_code)
        .map_err(|e| ShopifyError::InvalidData(e.to_string()))
}

/// Convert a `CartFields` selection into the domain cart.
pub fn convert_cart(node: CartNode) -> Result<Cart, ShopifyError> {
    let total = convert_money(&node.cost.total_amount)?;
    let currency_code = CurrencyCode::parse(&node.cost.total_amount.currency_code).ok();

    let mut lines = Vec::with_capacity(node.lines.edges.len());
    for edge in node.lines.edges {
        if let Some(line) = convert_cart_line(edge.node)? {
            lines.push(line);
        }
    }

    Ok(Cart {
        id: CartId::new(node.id),
        checkout_url: node.checkout_url,
        currency_code,
        lines,
        subtotal: convert_money(&node.cost.subtotal_amount)?,
        total_tax: node
            .cost
            .total_tax_amount
            .as_ref()
            .map(convert_money)
            .transpose()?,
        total,
    })
}

/// Convert one cart line.
///
/// Returns `Ok(None)` for lines whose merchandise is not a product variant.
fn convert_cart_line(node: CartLineNode) -> Result<Option<LineItem>, ShopifyError> {
    let merchandise = node.merchandise;
    let (Some(variant_id), Some(price)) = (merchandise.id, merchandise.price) else {
        warn!(line_id = %node.id, "Skipping cart line without product variant merchandise");
        return Ok(None);
    };

    let quantity = u32::try_from(node.quantity).map_err(|_| {
        ShopifyError::InvalidData(format!(
            "line {} has quantity {}",
            node.id, node.quantity
        ))
    })?;
    if quantity == 0 {
        warn!(line_id = %node.id, "Skipping cart line with zero quantity");
        return Ok(None);
    }

    Ok(Some(LineItem {
        id: LineId::new(node.id),
        quantity,
        variant: Variant {
            id: VariantId::new(variant_id),
            title: merchandise.title.unwrap_or_default(),
            product_title: merchandise
                .product
                .map(|p| p.title)
                .unwrap_or_default(),
            price: convert_money(&price)?,
            // Shopify defaults variants to shippable
            requires_shipping: merchandise.requires_shipping.unwrap_or(true),
        },
    }))
}

/// Unwrap a cart mutation payload, surfacing user errors.
pub fn mutation_cart(
    payload: Option<CartMutationPayload>,
    action: &str,
) -> Result<CartNode, ShopifyError> {
    let Some(payload) = payload else {
        return Err(ShopifyError::graphql(format!("Failed to {action}")));
    };

    if !payload.user_errors.is_empty() {
        return Err(ShopifyError::UserError(
            payload
                .user_errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; "),
        ));
    }

    payload
        .cart
        .ok_or_else(|| ShopifyError::graphql(format!("Failed to {action}: no cart returned")))
}

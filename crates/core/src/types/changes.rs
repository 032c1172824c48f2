//! Change sets the checkout widget submits against the cart.
//!
//! The widget posts plain JSON arrays; validation happens here so that
//! malformed entries are rejected before anything reaches the backend.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cart::Cart;
use super::id::{LineId, VariantId};

/// Malformed change-set entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangeError {
    #[error("change #{index} has an empty id")]
    EmptyId { index: usize },

    #[error("change #{index} adds zero units")]
    ZeroQuantity { index: usize },

    #[error("line {0} appears more than once")]
    DuplicateLine(LineId),

    #[error("line {0} is not in the cart")]
    UnknownLine(LineId),
}

/// Set an existing line's quantity. Zero removes the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineQuantityChange {
    pub id: LineId,
    pub quantity: u32,
}

/// Add units of a variant to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLineChange {
    pub variant_id: VariantId,
    pub quantity: u32,
}

impl LineQuantityChange {
    /// Check a quantity change set against the cart it applies to.
    ///
    /// # Errors
    ///
    /// Rejects empty IDs, lines named twice, and lines the cart does not have.
    pub fn validate_all(changes: &[Self], cart: &Cart) -> Result<(), ChangeError> {
        let mut seen = HashSet::with_capacity(changes.len());
        for (index, change) in changes.iter().enumerate() {
            if change.id.is_blank() {
                return Err(ChangeError::EmptyId { index });
            }
            if !seen.insert(&change.id) {
                return Err(ChangeError::DuplicateLine(change.id.clone()));
            }
            if cart.line(&change.id).is_none() {
                return Err(ChangeError::UnknownLine(change.id.clone()));
            }
        }
        Ok(())
    }
}

impl NewLineChange {
    /// Check an add-lines change set.
    ///
    /// The same variant may appear more than once; the backend merges them.
    ///
    /// # Errors
    ///
    /// Rejects empty variant IDs and zero quantities.
    pub fn validate_all(changes: &[Self]) -> Result<(), ChangeError> {
        for (index, change) in changes.iter().enumerate() {
            if change.variant_id.is_blank() {
                return Err(ChangeError::EmptyId { index });
            }
            if change.quantity == 0 {
                return Err(ChangeError::ZeroQuantity { index });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::types::cart::{LineItem, Variant};
    use crate::types::id::CartId;
    use crate::types::price::{CurrencyCode, Price};

    fn cart() -> Cart {
        Cart {
            id: CartId::new("c1"),
            checkout_url: String::new(),
            currency_code: Some(CurrencyCode::EUR),
            lines: vec![LineItem {
                id: LineId::new("l1"),
                quantity: 1,
                variant: Variant {
                    id: VariantId::new("v1"),
                    title: String::new(),
                    product_title: String::new(),
                    price: Price::zero(CurrencyCode::EUR),
                    requires_shipping: true,
                },
            }],
            subtotal: Price::zero(CurrencyCode::EUR),
            total_tax: None,
            total: Price::zero(CurrencyCode::EUR),
        }
    }

    fn qty(id: &str, quantity: u32) -> LineQuantityChange {
        LineQuantityChange {
            id: LineId::new(id),
            quantity,
        }
    }

    #[test]
    fn test_quantity_changes_accept_known_lines() {
        assert!(LineQuantityChange::validate_all(&[qty("l1", 0)], &cart()).is_ok());
        assert!(LineQuantityChange::validate_all(&[], &cart()).is_ok());
    }

    #[test]
    fn test_quantity_changes_reject_bad_entries() {
        assert_eq!(
            LineQuantityChange::validate_all(&[qty("l1", 1), qty(" ", 1)], &cart()),
            Err(ChangeError::EmptyId { index: 1 })
        );
        assert_eq!(
            LineQuantityChange::validate_all(&[qty("l1", 1), qty("l1", 2)], &cart()),
            Err(ChangeError::DuplicateLine(LineId::new("l1")))
        );
        assert_eq!(
            LineQuantityChange::validate_all(&[qty("nope", 1)], &cart()),
            Err(ChangeError::UnknownLine(LineId::new("nope")))
        );
    }

    #[test]
    fn test_new_lines_reject_zero_quantity() {
        let changes = [NewLineChange {
            variant_id: VariantId::new("v1"),
            quantity: 0,
        }];
        assert_eq!(
            NewLineChange::validate_all(&changes),
            Err(ChangeError::ZeroQuantity { index: 0 })
        );
    }

    #[test]
    fn test_new_line_wire_names() {
        let changes: Vec<NewLineChange> =
            serde_json::from_str(r#"[{"variantId":"v1","quantity":2}]"#).unwrap();
        assert_eq!(changes[0].variant_id, VariantId::new("v1"));
        assert!(NewLineChange::validate_all(&changes).is_ok());
    }
}

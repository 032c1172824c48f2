//! Session-related types.
//!
//! The browser session only remembers which Shopify cart it shops with.

/// Session keys.
pub mod keys {
    /// Key for storing the Shopify cart ID.
    pub const CART_ID: &str = "cart_id";
}

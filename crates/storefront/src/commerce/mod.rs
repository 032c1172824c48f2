//! Commerce backend seam.
//!
//! The widget adapter talks to the cart through [`CommerceBackend`]. In
//! production it is the Shopify [`StorefrontClient`](crate::shopify::StorefrontClient);
//! tests use [`InMemoryCommerce`].

#[cfg(any(test, feature = "test-util"))]
mod memory;

use async_trait::async_trait;
use cartlink_core::{Cart, CartId, LineId, LineQuantityChange, NewLineChange, Product};

use crate::shopify::ShopifyError;

#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryCommerce;

/// Cart and catalog operations the widget bridge needs.
///
/// Every cart mutation returns the complete cart as the backend now sees it.
#[async_trait]
pub trait CommerceBackend: Send + Sync {
    /// Create an empty cart.
    async fn create_cart(&self) -> Result<Cart, ShopifyError>;

    /// Fetch a cart. Unknown carts are [`ShopifyError::NotFound`].
    async fn get_cart(&self, cart_id: &CartId) -> Result<Cart, ShopifyError>;

    async fn add_lines(
        &self,
        cart_id: &CartId,
        lines: &[NewLineChange],
    ) -> Result<Cart, ShopifyError>;

    /// Set line quantities. A zero quantity removes the line.
    async fn update_lines(
        &self,
        cart_id: &CartId,
        lines: &[LineQuantityChange],
    ) -> Result<Cart, ShopifyError>;

    async fn remove_lines(
        &self,
        cart_id: &CartId,
        line_ids: &[LineId],
    ) -> Result<Cart, ShopifyError>;

    /// Look up a product by handle. `Ok(None)` when no such product exists.
    async fn product_by_handle(&self, handle: &str) -> Result<Option<Product>, ShopifyError>;
}

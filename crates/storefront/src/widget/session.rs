//! The authoritative cart for one shopping session.

use std::sync::Arc;

use cartlink_core::{Cart, CartId, CartSnapshot};
use tokio::sync::RwLock;

use super::sync::SyncSender;

/// Holds the locally known cart and publishes every replacement.
///
/// The cart is only ever swapped whole. The lock is held for the swap and
/// the enqueue of its snapshot, so notifications go out in swap order.
#[derive(Debug)]
pub struct CartSession {
    id: CartId,
    cart: RwLock<Arc<Cart>>,
    sync: SyncSender,
}

impl CartSession {
    #[must_use]
    pub fn new(cart: Cart, sync: SyncSender) -> Self {
        Self {
            id: cart.id.clone(),
            cart: RwLock::new(Arc::new(cart)),
            sync,
        }
    }

    #[must_use]
    pub const fn cart_id(&self) -> &CartId {
        &self.id
    }

    /// The cart as last reported by the backend.
    pub async fn current(&self) -> Arc<Cart> {
        Arc::clone(&*self.cart.read().await)
    }

    pub async fn snapshot(&self) -> CartSnapshot {
        CartSnapshot::from(&*self.current().await)
    }

    /// Replace the cart with a backend response and notify the widget.
    pub async fn replace(&self, cart: Cart) -> CartSnapshot {
        let snapshot = CartSnapshot::from(&cart);
        let mut current = self.cart.write().await;
        *current = Arc::new(cart);
        self.sync.notify(snapshot.clone());
        snapshot
    }
}

//! Widget adapter: the storefront client the checkout widget drives.
//!
//! Each operation talks to the commerce backend, replaces the session's
//! authoritative cart with whatever the backend returned, and hands the
//! widget a fresh [`CartSnapshot`]. Errors are not recovered locally.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cartlink_core::{
    Cart, CartId, CartSnapshot, ChangeError, InsuranceProduct, LineQuantityChange, NewLineChange,
};
use thiserror::Error;
use tracing::{debug, instrument};

use super::bridge::{Bridge, BridgeError};
use super::session::CartSession;
use super::sync::SyncTrigger;
use crate::commerce::CommerceBackend;
use crate::shopify::ShopifyError;

/// Errors surfaced to the widget.
#[derive(Debug, Error)]
pub enum WidgetError {
    /// The commerce backend was unreachable or rejected the request.
    #[error("Commerce backend error: {0}")]
    Backend(ShopifyError),

    /// A requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A change set entry was malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ChangeError),

    /// Checkout was requested while a cart operation was still running.
    #[error("A cart operation is still in progress")]
    Busy,

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl From<ShopifyError> for WidgetError {
    fn from(err: ShopifyError) -> Self {
        match err {
            ShopifyError::NotFound(what) => Self::NotFound(what),
            other => Self::Backend(other),
        }
    }
}

/// Counts an in-flight cart operation for as long as it lives.
struct Pending<'a>(&'a AtomicUsize);

impl<'a> Pending<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Cart operations exposed to the checkout widget for one session.
pub struct WidgetAdapter {
    backend: Arc<dyn CommerceBackend>,
    session: CartSession,
    bridge: Bridge,
    insurance_handle: String,
    pending: AtomicUsize,
}

impl WidgetAdapter {
    /// Build an adapter around a cart the backend just returned.
    ///
    /// Spawns the session's sync trigger, so this must run inside a tokio
    /// runtime. The initial cart is not pushed to the widget; the widget
    /// reads it during its one-time initialization.
    #[must_use]
    pub fn new(
        backend: Arc<dyn CommerceBackend>,
        cart: Cart,
        bridge: Bridge,
        insurance_handle: impl Into<String>,
    ) -> Self {
        let (sync, trigger) = SyncTrigger::channel(bridge.clone());
        trigger.spawn();

        Self {
            backend,
            session: CartSession::new(cart, sync),
            bridge,
            insurance_handle: insurance_handle.into(),
            pending: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub const fn cart_id(&self) -> &CartId {
        self.session.cart_id()
    }

    /// The locally held cart, without asking the backend.
    pub async fn cart(&self) -> Arc<Cart> {
        self.session.current().await
    }

    /// Snapshot of the locally held cart, without asking the backend.
    pub async fn snapshot(&self) -> CartSnapshot {
        self.session.snapshot().await
    }

    /// Whether any cart operation is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    /// Look up the insurance add-on product.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError::NotFound`] when the catalog has no product with
    /// the configured handle, or [`WidgetError::Backend`] if the lookup fails.
    #[instrument(skip(self), fields(handle = %self.insurance_handle))]
    pub async fn fetch_insurance_product(&self) -> Result<InsuranceProduct, WidgetError> {
        let product = self
            .backend
            .product_by_handle(&self.insurance_handle)
            .await?
            .ok_or_else(|| WidgetError::NotFound(format!("product {}", self.insurance_handle)))?;
        Ok(InsuranceProduct::from(&product))
    }

    /// Re-read the cart from the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(cart_id = %self.cart_id()))]
    pub async fn fetch_cart(&self) -> Result<CartSnapshot, WidgetError> {
        let _pending = Pending::start(&self.pending);
        let cart = self.backend.get_cart(self.cart_id()).await?;
        Ok(self.session.replace(cart).await)
    }

    /// Remove every line from the cart.
    ///
    /// Clearing an already empty cart returns its snapshot without a
    /// backend call.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(cart_id = %self.cart_id()))]
    pub async fn clear_cart(&self) -> Result<CartSnapshot, WidgetError> {
        let current = self.session.current().await;
        if current.is_empty() {
            debug!("Cart already empty");
            return Ok(CartSnapshot::from(&*current));
        }

        let _pending = Pending::start(&self.pending);
        let cart = self
            .backend
            .remove_lines(self.cart_id(), &current.line_ids())
            .await?;
        Ok(self.session.replace(cart).await)
    }

    /// Set line quantities. A zero quantity removes the line.
    ///
    /// An empty change set returns the current snapshot without a backend
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError::InvalidArgument`] for blank, repeated, or
    /// unknown line ids, or an error if the backend call fails.
    #[instrument(skip(self, changes), fields(cart_id = %self.cart_id(), changes = changes.len()))]
    pub async fn update_cart_lines(
        &self,
        changes: &[LineQuantityChange],
    ) -> Result<CartSnapshot, WidgetError> {
        let current = self.session.current().await;
        if changes.is_empty() {
            return Ok(CartSnapshot::from(&*current));
        }
        LineQuantityChange::validate_all(changes, &current)?;

        let _pending = Pending::start(&self.pending);
        let cart = self.backend.update_lines(self.cart_id(), changes).await?;
        Ok(self.session.replace(cart).await)
    }

    /// Add units of variants to the cart.
    ///
    /// An empty change set returns the current snapshot without a backend
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError::InvalidArgument`] for blank variant ids or zero
    /// quantities, or an error if the backend call fails.
    #[instrument(skip(self, changes), fields(cart_id = %self.cart_id(), changes = changes.len()))]
    pub async fn add_cart_lines(
        &self,
        changes: &[NewLineChange],
    ) -> Result<CartSnapshot, WidgetError> {
        if changes.is_empty() {
            return Ok(self.session.snapshot().await);
        }
        NewLineChange::validate_all(changes)?;

        let _pending = Pending::start(&self.pending);
        let cart = self.backend.add_lines(self.cart_id(), changes).await?;
        Ok(self.session.replace(cart).await)
    }

    /// Hand off to the hosted checkout.
    ///
    /// Runs the widget's pre-checkout hook when a widget is attached, then
    /// returns the checkout URL to open.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError::Busy`] while a cart operation is in flight, or
    /// the hook's error.
    #[instrument(skip(self), fields(cart_id = %self.cart_id()))]
    pub async fn checkout(&self) -> Result<String, WidgetError> {
        if self.is_loading() {
            return Err(WidgetError::Busy);
        }
        self.bridge.update_cart_for_checkout().await?;
        Ok(self.session.current().await.checkout_url.clone())
    }
}

impl std::fmt::Debug for WidgetAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetAdapter")
            .field("cart_id", self.cart_id())
            .field("bridge", &self.bridge)
            .field("insurance_handle", &self.insurance_handle)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

//! One widget adapter per shopping session.
//!
//! Browser sessions only remember their cart id. The registry maps that id
//! to the live [`WidgetSession`] holding the authoritative cart, creating
//! one on first use.

use std::sync::Arc;
use std::time::Duration;

use cartlink_core::{Cart, CartId};
use moka::future::Cache;
use tokio::sync::broadcast;
use tracing::{info, instrument};

use super::adapter::{WidgetAdapter, WidgetError};
use super::bridge::{Bridge, EventBridge, WidgetEvent};
use crate::commerce::CommerceBackend;
use crate::shopify::ShopifyError;

/// Snapshots buffered per session for slow SSE subscribers.
const EVENT_BUFFER: usize = 32;

/// Live state for one shopping session.
#[derive(Debug)]
pub struct WidgetSession {
    adapter: WidgetAdapter,
    events: broadcast::Sender<WidgetEvent>,
}

impl WidgetSession {
    #[must_use]
    pub const fn adapter(&self) -> &WidgetAdapter {
        &self.adapter
    }

    /// Subscribe to the cart changes pushed to the widget.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.subscribe()
    }
}

/// Registry of live widget sessions, keyed by cart id.
#[derive(Clone)]
pub struct SessionRegistry {
    backend: Arc<dyn CommerceBackend>,
    sessions: Cache<CartId, Arc<WidgetSession>>,
    insurance_handle: String,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(backend: Arc<dyn CommerceBackend>, insurance_handle: impl Into<String>) -> Self {
        let sessions = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(Duration::from_secs(60 * 60)) // 1 hour
            .build();

        Self {
            backend,
            sessions,
            insurance_handle: insurance_handle.into(),
        }
    }

    /// Open the session for a stored cart id, or start a new cart.
    ///
    /// Concurrent opens of the same cart id share one initialization, so a
    /// cart only ever has one live session. A cart id the backend no longer
    /// knows (expired or completed) is replaced by a fresh cart, and the
    /// session is reachable under both ids. Callers should persist the
    /// returned session's cart id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot fetch or create the cart.
    #[instrument(skip(self))]
    pub async fn open(&self, cart_id: Option<&CartId>) -> Result<Arc<WidgetSession>, WidgetError> {
        let Some(cart_id) = cart_id else {
            let cart = self.backend.create_cart().await?;
            let session = self.start(cart);
            self.sessions
                .insert(session.adapter.cart_id().clone(), Arc::clone(&session))
                .await;
            return Ok(session);
        };

        let session = self
            .sessions
            .try_get_with(cart_id.clone(), self.load(cart_id))
            .await
            .map_err(unshare)?;

        let current = session.adapter.cart_id();
        if current == cart_id {
            return Ok(session);
        }
        // Recreated cart: later requests arrive with the new id
        let session = self
            .sessions
            .get_with(current.clone(), async { Arc::clone(&session) })
            .await;
        Ok(session)
    }

    /// Build the session for a stored cart id.
    async fn load(&self, cart_id: &CartId) -> Result<Arc<WidgetSession>, WidgetError> {
        let cart = match self.backend.get_cart(cart_id).await {
            Ok(cart) => cart,
            Err(ShopifyError::NotFound(_)) => {
                info!(%cart_id, "Stored cart no longer exists, creating a new one");
                self.backend.create_cart().await?
            }
            Err(e) => return Err(e.into()),
        };
        Ok(self.start(cart))
    }

    fn start(&self, cart: Cart) -> Arc<WidgetSession> {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let bridge = Bridge::new(Arc::new(EventBridge::new(events.clone())));
        let adapter = WidgetAdapter::new(
            Arc::clone(&self.backend),
            cart,
            bridge,
            self.insurance_handle.clone(),
        );
        info!(cart_id = %adapter.cart_id(), "Opened widget session");
        Arc::new(WidgetSession { adapter, events })
    }
}

/// Take back an initialization error moka shared between waiters.
fn unshare(err: Arc<WidgetError>) -> WidgetError {
    Arc::try_unwrap(err).unwrap_or_else(|shared| match &*shared {
        WidgetError::NotFound(what) => WidgetError::NotFound(what.clone()),
        other => WidgetError::Backend(ShopifyError::graphql(other.to_string())),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use cartlink_core::{NewLineChange, VariantId};

    use super::*;
    use crate::commerce::InMemoryCommerce;

    const PINEAPPLE: &str = "gid://shopify/ProductVariant/10";

    fn registry() -> (InMemoryCommerce, SessionRegistry) {
        let backend =
            InMemoryCommerce::default().with_variant(PINEAPPLE, "Dried Pineapple", "10.00", true);
        let registry = SessionRegistry::new(Arc::new(backend.clone()), "onward-package-protection");
        (backend, registry)
    }

    #[tokio::test]
    async fn test_open_without_cart_creates_one() {
        let (backend, registry) = registry();

        let session = registry.open(None).await.unwrap();

        assert!(backend.cart(session.adapter().cart_id()).is_some());
        assert!(session.adapter().snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_open_reuses_live_session() {
        let (backend, registry) = registry();
        let cart_id = backend.seed_cart(&[(PINEAPPLE, 1)]);

        let first = registry.open(Some(&cart_id)).await.unwrap();
        let second = registry.open(Some(&cart_id)).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_open_replaces_missing_cart() {
        let (_, registry) = registry();
        let stale = CartId::new("gid://shopify/Cart/expired");

        let session = registry.open(Some(&stale)).await.unwrap();

        assert_ne!(session.adapter().cart_id(), &stale);
    }

    #[tokio::test]
    async fn test_open_propagates_backend_failure() {
        let (backend, registry) = registry();
        let cart_id = backend.seed_cart(&[]);
        backend.fail_next_request("Shopify unavailable");

        let err = registry.open(Some(&cart_id)).await.unwrap_err();
        assert!(matches!(err, WidgetError::Backend(_)));
    }

    #[tokio::test]
    async fn test_subscribers_receive_changes() {
        let (_, registry) = registry();
        let session = registry.open(None).await.unwrap();
        let mut events = session.subscribe();

        session
            .adapter()
            .add_cart_lines(&[NewLineChange {
                variant_id: VariantId::new(PINEAPPLE),
                quantity: 1,
            }])
            .await
            .unwrap();

        let WidgetEvent::CartChanged { cart } = events.recv().await.unwrap();
        assert_eq!(cart.items.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_opens_share_one_session() {
        let (backend, registry) = registry();
        let cart_id = backend.seed_cart(&[(PINEAPPLE, 1)]);
        let gate = backend.hold_requests();

        let open = |registry: SessionRegistry, cart_id: CartId| {
            tokio::spawn(async move { registry.open(Some(&cart_id)).await.unwrap() })
        };
        let first = open(registry.clone(), cart_id.clone());
        let second = open(registry.clone(), cart_id.clone());
        while backend.request_count() == 0 {
            tokio::task::yield_now().await;
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        gate.add_permits(1);

        let first = first.await.unwrap();
        let second = second.await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.request_count(), 1);

        // A change made through either handle reaches the one session
        let mut events = first.subscribe();
        gate.add_permits(1);
        second
            .adapter()
            .update_cart_lines(&[cartlink_core::LineQuantityChange {
                id: first.adapter().cart().await.lines[0].id.clone(),
                quantity: 2,
            }])
            .await
            .unwrap();

        let WidgetEvent::CartChanged { cart } = events.recv().await.unwrap();
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(first.adapter().cart().await.total_quantity(), 2);
    }

    #[tokio::test]
    async fn test_recreated_cart_is_reachable_by_new_id() {
        let (backend, registry) = registry();
        let stale = CartId::new("gid://shopify/Cart/expired");

        let session = registry.open(Some(&stale)).await.unwrap();
        let requests = backend.request_count();
        let fresh = session.adapter().cart_id().clone();

        let reopened = registry.open(Some(&fresh)).await.unwrap();
        assert!(Arc::ptr_eq(&session, &reopened));
        assert!(Arc::ptr_eq(&session, &registry.open(Some(&stale)).await.unwrap()));
        assert_eq!(backend.request_count(), requests);
    }

    #[tokio::test]
    async fn test_failed_open_is_not_cached() {
        let (backend, registry) = registry();
        let cart_id = backend.seed_cart(&[(PINEAPPLE, 1)]);
        backend.fail_next_request("Shopify unavailable");

        assert!(registry.open(Some(&cart_id)).await.is_err());

        let session = registry.open(Some(&cart_id)).await.unwrap();
        assert_eq!(session.adapter().cart_id(), &cart_id);
    }
}

//! The checkout widget as an optional capability.
//!
//! Nothing in the adapter assumes the widget is present. [`Bridge`] wraps an
//! optional [`WidgetBridge`]; with nothing attached every call is a no-op.

use std::sync::Arc;

use async_trait::async_trait;
use cartlink_core::CartSnapshot;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::trace;

/// The widget refused or failed its pre-checkout hook.
#[derive(Debug, Clone, Error)]
#[error("widget pre-checkout hook failed: {0}")]
pub struct BridgeError(pub String);

/// Calls the cart side makes into the checkout widget.
#[async_trait]
pub trait WidgetBridge: Send + Sync {
    /// Tell the widget the cart changed.
    async fn cart_changed(&self, snapshot: &CartSnapshot);

    /// Give the widget a chance to finalize its own lines before checkout.
    async fn update_cart_for_checkout(&self) -> Result<(), BridgeError> {
        Ok(())
    }
}

/// Optional widget capability.
#[derive(Clone, Default)]
pub struct Bridge(Option<Arc<dyn WidgetBridge>>);

impl Bridge {
    #[must_use]
    pub fn new(bridge: Arc<dyn WidgetBridge>) -> Self {
        Self(Some(bridge))
    }

    /// A bridge with no widget behind it.
    #[must_use]
    pub const fn absent() -> Self {
        Self(None)
    }

    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.0.is_some()
    }

    pub async fn cart_changed(&self, snapshot: &CartSnapshot) {
        if let Some(bridge) = &self.0 {
            bridge.cart_changed(snapshot).await;
        }
    }

    /// Run the widget's pre-checkout hook, if there is a widget.
    ///
    /// # Errors
    ///
    /// Returns the hook's error unchanged.
    pub async fn update_cart_for_checkout(&self) -> Result<(), BridgeError> {
        match &self.0 {
            Some(bridge) => bridge.update_cart_for_checkout().await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Bridge")
            .field(&if self.is_attached() { "attached" } else { "absent" })
            .finish()
    }
}

// =============================================================================
// Browser bridge
// =============================================================================

/// Message pushed to the browser-side widget over server-sent events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WidgetEvent {
    CartChanged { cart: CartSnapshot },
}

impl WidgetEvent {
    /// SSE event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CartChanged { .. } => "cartChanged",
        }
    }
}

/// Publishes cart changes to every browser tab subscribed to the session.
///
/// The pre-checkout hook runs in the browser before the checkout form is
/// submitted, so the server side keeps the default no-op.
#[derive(Debug, Clone)]
pub struct EventBridge {
    events: broadcast::Sender<WidgetEvent>,
}

impl EventBridge {
    #[must_use]
    pub const fn new(events: broadcast::Sender<WidgetEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl WidgetBridge for EventBridge {
    async fn cart_changed(&self, snapshot: &CartSnapshot) {
        let event = WidgetEvent::CartChanged {
            cart: snapshot.clone(),
        };
        // No subscribers just means no widget tab is open
        if let Ok(receivers) = self.events.send(event) {
            trace!(receivers, "Published cart snapshot");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn empty_snapshot() -> CartSnapshot {
        CartSnapshot {
            currency: None,
            items: vec![],
        }
    }

    #[tokio::test]
    async fn test_absent_bridge_is_noop() {
        let bridge = Bridge::absent();
        assert!(!bridge.is_attached());
        bridge.cart_changed(&empty_snapshot()).await;
        assert!(bridge.update_cart_for_checkout().await.is_ok());
    }

    #[tokio::test]
    async fn test_event_bridge_publishes_snapshot() {
        let (tx, mut rx) = broadcast::channel(4);
        let bridge = Bridge::new(Arc::new(EventBridge::new(tx)));

        bridge.cart_changed(&empty_snapshot()).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "cartChanged");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "type": "cartChanged", "cart": { "currency": null, "items": [] } })
        );
    }

    #[tokio::test]
    async fn test_event_bridge_without_subscribers() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        let bridge = EventBridge::new(tx);
        bridge.cart_changed(&empty_snapshot()).await;
        assert!(bridge.update_cart_for_checkout().await.is_ok());
    }
}

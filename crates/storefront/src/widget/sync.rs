//! Sync trigger: forwards every cart replacement to the widget.
//!
//! The session pushes a snapshot into an unbounded channel each time it
//! replaces the authoritative cart. A single task drains the channel and
//! hands each snapshot to the [`Bridge`], so the widget sees exactly one
//! `cart_changed` per replacement, in replacement order, with no debouncing.

use cartlink_core::CartSnapshot;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::bridge::Bridge;

/// Producer half held by the cart session.
#[derive(Debug, Clone)]
pub struct SyncSender(mpsc::UnboundedSender<CartSnapshot>);

impl SyncSender {
    /// Queue a snapshot for the widget.
    pub fn notify(&self, snapshot: CartSnapshot) {
        if self.0.send(snapshot).is_err() {
            debug!("Sync trigger stopped, dropping cart snapshot");
        }
    }
}

/// Consumer half: delivers queued snapshots to the widget.
#[derive(Debug)]
pub struct SyncTrigger {
    snapshots: mpsc::UnboundedReceiver<CartSnapshot>,
    bridge: Bridge,
}

impl SyncTrigger {
    #[must_use]
    pub fn channel(bridge: Bridge) -> (SyncSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            SyncSender(tx),
            Self {
                snapshots: rx,
                bridge,
            },
        )
    }

    /// Deliver snapshots until every [`SyncSender`] is dropped.
    pub async fn run(mut self) {
        while let Some(snapshot) = self.snapshots.recv().await {
            self.bridge.cart_changed(&snapshot).await;
        }
        debug!("Cart session closed, sync trigger exiting");
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use cartlink_core::CurrencyCode;
    use tokio::sync::Mutex;

    use super::*;
    use crate::widget::bridge::WidgetBridge;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<CartSnapshot>>);

    #[async_trait]
    impl WidgetBridge for Recorder {
        async fn cart_changed(&self, snapshot: &CartSnapshot) {
            self.0.lock().await.push(snapshot.clone());
        }
    }

    fn snapshot(currency: Option<CurrencyCode>) -> CartSnapshot {
        CartSnapshot {
            currency,
            items: vec![],
        }
    }

    #[tokio::test]
    async fn test_delivers_each_snapshot_in_order() {
        let recorder = Arc::new(Recorder::default());
        let (tx, trigger) = SyncTrigger::channel(Bridge::new(recorder.clone()));

        tx.notify(snapshot(None));
        tx.notify(snapshot(Some(CurrencyCode::EUR)));
        tx.notify(snapshot(Some(CurrencyCode::EUR)));
        drop(tx);
        trigger.run().await;

        let seen = recorder.0.lock().await;
        assert_eq!(
            *seen,
            vec![
                snapshot(None),
                snapshot(Some(CurrencyCode::EUR)),
                snapshot(Some(CurrencyCode::EUR)),
            ]
        );
    }

    #[tokio::test]
    async fn test_absent_bridge_drains_quietly() {
        let (tx, trigger) = SyncTrigger::channel(Bridge::absent());
        let handle = trigger.spawn();
        tx.notify(snapshot(None));
        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_notify_after_trigger_stopped() {
        let (tx, trigger) = SyncTrigger::channel(Bridge::absent());
        drop(trigger);
        tx.notify(snapshot(None));
    }
}

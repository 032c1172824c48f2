//! Storefront client API for the checkout widget.
//!
//! The browser-side shim passed to the widget's initializer forwards each
//! storefront-client call to one of these handlers. Every response body is a
//! widget-shaped snapshot; errors map to status codes via [`AppError`].
//!
//! [`AppError`]: crate::error::AppError

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use cartlink_core::{CartSnapshot, InsuranceProduct, LineQuantityChange, NewLineChange, WidgetInit};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_sessions::Session;
use tracing::{debug, instrument, warn};

use super::widget_session;
use crate::error::{Result, add_breadcrumb};
use crate::state::AppState;
use crate::widget::{WidgetEvent, WidgetSession};

/// Widget initialization options.
pub async fn config(State(state): State<AppState>) -> Json<WidgetInit> {
    Json(state.widget_init().clone())
}

/// `fetchCart`: re-read the cart from Shopify.
#[instrument(skip_all)]
pub async fn fetch_cart(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CartSnapshot>> {
    let widget = widget_session(&state, &session).await?;
    Ok(Json(widget.adapter().fetch_cart().await?))
}

/// `fetchInsuranceProduct`: the package-protection add-on.
#[instrument(skip_all)]
pub async fn fetch_insurance_product(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<InsuranceProduct>> {
    let widget = widget_session(&state, &session).await?;
    Ok(Json(widget.adapter().fetch_insurance_product().await?))
}

/// `clearCart`: remove every line.
#[instrument(skip_all)]
pub async fn clear_cart(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CartSnapshot>> {
    let widget = widget_session(&state, &session).await?;
    let snapshot = widget.adapter().clear_cart().await?;
    add_breadcrumb("cart", "Widget cleared cart", None);
    Ok(Json(snapshot))
}

/// `updateCartLines`: set quantities of existing lines.
#[instrument(skip_all, fields(changes = changes.len()))]
pub async fn update_cart_lines(
    State(state): State<AppState>,
    session: Session,
    Json(changes): Json<Vec<LineQuantityChange>>,
) -> Result<Json<CartSnapshot>> {
    let widget = widget_session(&state, &session).await?;
    let snapshot = widget.adapter().update_cart_lines(&changes).await?;
    add_breadcrumb("cart", "Widget updated cart lines", None);
    Ok(Json(snapshot))
}

/// `addCartLines`: add units of variants.
#[instrument(skip_all, fields(changes = changes.len()))]
pub async fn add_cart_lines(
    State(state): State<AppState>,
    session: Session,
    Json(changes): Json<Vec<NewLineChange>>,
) -> Result<Json<CartSnapshot>> {
    let widget = widget_session(&state, &session).await?;
    let snapshot = widget.adapter().add_cart_lines(&changes).await?;
    add_breadcrumb("cart", "Widget added cart lines", None);
    Ok(Json(snapshot))
}

/// Stream of `cartChanged` events, one per cart replacement.
///
/// Each event's data is the widget snapshot. A subscriber that falls behind
/// skips ahead to the current snapshot.
#[instrument(skip_all)]
pub async fn events(
    State(state): State<AppState>,
    session: Session,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let widget = widget_session(&state, &session).await?;
    let receiver = widget.subscribe();
    debug!(cart_id = %widget.adapter().cart_id(), "Widget subscribed to cart events");

    Ok(Sse::new(snapshot_stream(widget, receiver)).keep_alive(KeepAlive::default()))
}

fn snapshot_stream(
    widget: Arc<WidgetSession>,
    receiver: broadcast::Receiver<WidgetEvent>,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    stream::unfold((widget, receiver), |(widget, mut receiver)| async move {
        let event = match receiver.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Widget event subscriber lagged");
                WidgetEvent::CartChanged {
                    cart: widget.adapter().snapshot().await,
                }
            }
            Err(RecvError::Closed) => return None,
        };
        Some((Ok(to_sse(&event)), (widget, receiver)))
    })
}

fn to_sse(event: &WidgetEvent) -> Event {
    let WidgetEvent::CartChanged { cart } = event;
    let sse = Event::default().event(event.name());
    match serde_json::to_string(cart) {
        Ok(data) => sse.data(data),
        Err(e) => {
            warn!(error = %e, "Failed to serialize cart snapshot");
            sse.comment("unserializable snapshot")
        }
    }
}

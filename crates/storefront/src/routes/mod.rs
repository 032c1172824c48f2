//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Health check
//!
//! # Cart
//! GET  /cart                           - Cart page (boots the widget once)
//! POST /cart/checkout                  - Pre-checkout hook, then redirect to Shopify checkout
//!
//! # Widget storefront client (JSON)
//! GET  /api/widget/config              - Widget init options
//! GET  /api/widget/cart                - fetchCart
//! GET  /api/widget/insurance           - fetchInsuranceProduct
//! POST /api/widget/cart/clear          - clearCart
//! POST /api/widget/cart/lines/update   - updateCartLines  [{id, quantity}]
//! POST /api/widget/cart/lines/add      - addCartLines     [{variantId, quantity}]
//! GET  /api/widget/events              - Cart snapshots (server-sent events)
//! ```

pub mod cart;
pub mod widget;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use cartlink_core::CartId;
use tower_sessions::Session;

use crate::error::Result;
use crate::models::session_keys;
use crate::state::AppState;
use crate::widget::WidgetSession;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/checkout", post(cart::checkout))
}

/// Create the widget API routes router.
pub fn widget_routes() -> Router<AppState> {
    Router::new()
        .route("/config", get(widget::config))
        .route("/cart", get(widget::fetch_cart))
        .route("/insurance", get(widget::fetch_insurance_product))
        .route("/cart/clear", post(widget::clear_cart))
        .route("/cart/lines/update", post(widget::update_cart_lines))
        .route("/cart/lines/add", post(widget::add_cart_lines))
        .route("/events", get(widget::events))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_routes())
        .nest("/api/widget", widget_routes())
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Resolve the shopper's widget session, starting a cart if needed.
///
/// Persists the cart id whenever it changes (first visit, or the stored cart
/// expired on the Shopify side).
pub async fn widget_session(state: &AppState, session: &Session) -> Result<Arc<WidgetSession>> {
    let stored = session.get::<CartId>(session_keys::CART_ID).await?;
    let widget = state.sessions().open(stored.as_ref()).await?;

    let cart_id = widget.adapter().cart_id();
    if stored.as_ref() != Some(cart_id) {
        session.insert(session_keys::CART_ID, cart_id).await?;
    }

    Ok(widget)
}

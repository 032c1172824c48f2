//! Cart page and checkout handoff.
//!
//! The page renders the authoritative cart server-side and boots the
//! checkout widget exactly once. After that the widget drives the cart
//! through [`super::widget`] and hears about changes over SSE.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use cartlink_core::{Cart, LineItem};
use tower_sessions::Session;
use tracing::{info, instrument};

use super::widget_session;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::CspNonce;
use crate::state::AppState;
use crate::widget::WidgetError;

/// Cart item display data for templates.
#[derive(Debug, Clone)]
pub struct CartItemView {
    pub id: String,
    pub title: String,
    pub variant_title: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub taxes: Option<String>,
    pub total: String,
    pub item_count: u32,
}

impl CartView {
    /// Format a cart for display in the given locale.
    #[must_use]
    pub fn new(cart: &Cart, locale: &str) -> Self {
        Self {
            items: cart
                .lines
                .iter()
                .map(|line| CartItemView::new(line, locale))
                .collect(),
            subtotal: cart.subtotal.format_for_locale(locale),
            taxes: cart.total_tax.map(|tax| tax.format_for_locale(locale)),
            total: cart.total.format_for_locale(locale),
            item_count: cart.total_quantity(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CartItemView {
    #[must_use]
    pub fn new(line: &LineItem, locale: &str) -> Self {
        Self {
            id: line.id.to_string(),
            title: line.variant.product_title.clone(),
            variant_title: line.variant.display_title().map(String::from),
            quantity: line.quantity,
            price: line.variant.price.format_for_locale(locale),
            line_price: line.cost().format_for_locale(locale),
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    /// Checkout stays disabled while a cart operation is in flight.
    pub checkout_disabled: bool,
    pub container_id: String,
    pub widget_init: String,
    pub widget_script: Option<String>,
    pub nonce: String,
}

/// Display cart page.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
) -> Result<CartShowTemplate> {
    let widget = widget_session(&state, &session).await?;
    let adapter = widget.adapter();
    let cart = adapter.cart().await;
    let init = state.widget_init();

    Ok(CartShowTemplate {
        cart: CartView::new(&cart, &init.locale.request_locale),
        checkout_disabled: adapter.is_loading(),
        container_id: init
            .container_selector
            .strip_prefix('#')
            .unwrap_or(&init.container_selector)
            .to_string(),
        widget_init: serde_json::to_string(init)
            .map_err(|e| crate::error::AppError::Internal(e.to_string()))?,
        widget_script: state
            .config()
            .widget
            .script_url
            .as_ref()
            .map(ToString::to_string),
        nonce,
    })
}

/// Hand off to Shopify checkout.
///
/// Runs the widget's pre-checkout hook, then redirects to the hosted
/// checkout. While a cart operation is still running the shopper is sent
/// back to the cart page instead.
#[instrument(skip(state, session))]
pub async fn checkout(State(state): State<AppState>, session: Session) -> Result<Response> {
    let widget = widget_session(&state, &session).await?;

    match widget.adapter().checkout().await {
        Ok(url) => {
            info!(cart_id = %widget.adapter().cart_id(), "Redirecting to checkout");
            add_breadcrumb("checkout", "Started checkout", None);
            Ok(Redirect::to(&url).into_response())
        }
        Err(WidgetError::Busy) => Ok(Redirect::to("/cart").into_response()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use cartlink_core::{CartId, CurrencyCode, LineId, Price, Variant, VariantId};

    use super::*;

    fn line(id: &str, title: &str, price: &str, quantity: u32) -> LineItem {
        LineItem {
            id: LineId::new(id),
            quantity,
            variant: Variant {
                id: VariantId::new(format!("{id}-variant")),
                title: title.to_string(),
                product_title: "Dried Pineapple".to_string(),
                price: Price::parse(price, "EUR").unwrap(),
                requires_shipping: true,
            },
        }
    }

    fn cart(lines: Vec<LineItem>, tax: Option<&str>) -> Cart {
        let subtotal = Price::parse("1234.5", "EUR").unwrap();
        Cart {
            id: CartId::new("gid://shopify/Cart/v1"),
            checkout_url: "https://checkout.test/c/v1".to_string(),
            currency_code: Some(CurrencyCode::EUR),
            lines,
            subtotal,
            total_tax: tax.map(|t| Price::parse(t, "EUR").unwrap()),
            total: subtotal,
        }
    }

    #[test]
    fn test_cart_view_formats_for_locale() {
        let view = CartView::new(
            &cart(vec![line("l1", "Default Title", "10.00", 3)], Some("6")),
            "fr-FR",
        );

        assert_eq!(view.item_count, 3);
        assert_eq!(view.items[0].price, "10,00\u{a0}€");
        assert_eq!(view.items[0].line_price, "30,00\u{a0}€");
        assert_eq!(view.items[0].variant_title, None);
        assert_eq!(view.subtotal, "1\u{202f}234,50\u{a0}€");
        assert_eq!(view.taxes.as_deref(), Some("6,00\u{a0}€"));
    }

    #[test]
    fn test_cart_view_keeps_variant_title() {
        let view = CartView::new(&cart(vec![line("l1", "500 g", "4.25", 1)], None), "en-US");

        assert_eq!(view.items[0].variant_title.as_deref(), Some("500 g"));
        assert_eq!(view.items[0].price, "€4.25");
        assert!(view.taxes.is_none());
    }

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::new(&cart(vec![], None), "fr-FR");
        assert!(view.is_empty());
        assert_eq!(view.item_count, 0);
    }
}

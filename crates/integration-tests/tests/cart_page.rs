//! Integration tests for the cart page and checkout handoff.

use std::sync::Arc;

use axum::http::StatusCode;
use cartlink_integration_tests::{PINEAPPLE, TestApp, catalog};
use serde_json::json;

async fn add_pineapple(app: &TestApp, quantity: u32) {
    let response = app
        .post_json(
            "/api/widget/cart/lines/add",
            &json!([{ "variantId": PINEAPPLE, "quantity": quantity }]),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "ok");
    assert!(response.header("x-request-id").is_some());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new();
    let request = axum::http::Request::builder()
        .uri("/health")
        .header("x-request-id", "edge-42")
        .body(axum::body::Body::empty())
        .unwrap_or_default();

    let response = app.buffered(request).await;
    assert_eq!(response.header("x-request-id"), Some("edge-42"));
}

#[tokio::test]
async fn test_empty_cart_page() {
    let app = TestApp::new();
    let response = app.get("/cart").await;

    assert_eq!(response.status, StatusCode::OK);
    let html = response.text();
    assert!(html.contains("Your cart is empty"));
    assert!(html.contains("View trending products"));
    assert!(!html.contains("checkout-form\" method"));
}

#[tokio::test]
async fn test_cart_page_lists_lines_in_widget_locale() {
    let app = TestApp::new();
    add_pineapple(&app, 3).await;

    let html = app.get("/cart").await.text();

    assert!(html.contains("Dried Pineapple"));
    assert!(html.contains("10,00\u{a0}€"));
    assert!(html.contains("30,00\u{a0}€"));
    assert!(html.contains("Calculated at checkout"));
    assert!(html.contains("Total Price"));
    assert!(html.contains("(3 items)"));
    assert!(html.contains(r#"<div id="onward-container"></div>"#));
    assert!(!html.contains(" disabled>Checkout"));
}

#[tokio::test]
async fn test_cart_page_boots_widget_with_nonce() {
    let app = TestApp::with(
        catalog(),
        &[("WIDGET_SCRIPT_URL", "https://cdn.onward.example/widget.js")],
    );
    let response = app.get("/cart").await;

    let policy = response
        .header("content-security-policy")
        .unwrap_or_default()
        .to_string();
    let nonce = policy
        .split("'nonce-")
        .nth(1)
        .and_then(|rest| rest.split('\'').next())
        .unwrap_or_default()
        .to_string();
    assert!(!nonce.is_empty(), "{policy}");
    assert!(policy.contains("https://cdn.onward.example"));

    let html = response.text();
    assert!(html.contains(&format!(r#"nonce="{nonce}""#)));
    assert!(html.contains(r#"src="https://cdn.onward.example/widget.js""#));
    assert!(html.contains("data-widget-init="));
    assert_eq!(html.matches("window.initializeOnward(").count(), 1);
    // The insurance lookup never disables checkout
    assert!(html.contains(r#"request("GET", "/insurance")"#));
    assert!(!html.contains(r#"call("GET", "/insurance")"#));
}

#[tokio::test]
async fn test_checkout_redirects_to_shopify() {
    let app = TestApp::new();
    add_pineapple(&app, 1).await;

    let response = app.post("/cart/checkout").await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert!(
        response
            .header("location")
            .is_some_and(|l| l.starts_with("https://checkout.test/cart/c/"))
    );
}

#[tokio::test]
async fn test_checkout_disabled_while_loading() {
    let app = Arc::new(TestApp::new());
    add_pineapple(&app, 1).await;

    let gate = app.backend.hold_requests();
    let requests = app.backend.request_count();
    let refresh = tokio::spawn({
        let app = Arc::clone(&app);
        async move { app.get("/api/widget/cart").await.status }
    });
    while app.backend.request_count() == requests {
        tokio::task::yield_now().await;
    }

    let html = app.get("/cart").await.text();
    assert!(html.contains(" disabled>Checkout"));

    let response = app.post("/cart/checkout").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), Some("/cart"));

    gate.add_permits(1);
    assert_eq!(refresh.await.ok(), Some(StatusCode::OK));

    let html = app.get("/cart").await.text();
    assert!(!html.contains(" disabled>Checkout"));
}

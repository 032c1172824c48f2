//! Integration tests for Cartlink.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartlink-integration-tests
//! ```
//!
//! Tests drive the full storefront router (session cookies, middleware,
//! widget API) in-process against [`InMemoryCommerce`], so they need
//! neither a network nor a Shopify store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use cartlink_storefront::commerce::InMemoryCommerce;
use cartlink_storefront::config::StorefrontConfig;
use cartlink_storefront::state::AppState;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

pub use cartlink_storefront::commerce::CommerceBackend;

pub const PINEAPPLE: &str = "gid://shopify/ProductVariant/10";
pub const MANGO: &str = "gid://shopify/ProductVariant/20";
pub const GIFT_CARD: &str = "gid://shopify/ProductVariant/30";
pub const INSURANCE_HANDLE: &str = "onward-package-protection";
pub const INSURANCE_VARIANT: &str = "gid://shopify/ProductVariant/90";

const BODY_LIMIT: usize = 1024 * 1024;

/// Catalog shared by the tests.
#[must_use]
pub fn catalog() -> InMemoryCommerce {
    InMemoryCommerce::default()
        .with_variant(PINEAPPLE, "Dried Pineapple", "10.00", true)
        .with_variant(MANGO, "Dried Mango", "7.50", true)
        .with_variant(GIFT_CARD, "Gift Card", "25.00", false)
        .with_product(
            INSURANCE_HANDLE,
            "Package Protection",
            &[(INSURANCE_VARIANT, "1.96")],
        )
}

/// Configuration with test credentials and the given overrides.
///
/// # Panics
///
/// Panics if the overrides make the configuration invalid.
#[must_use]
#[allow(clippy::expect_used)]
pub fn config(overrides: &[(&str, &str)]) -> StorefrontConfig {
    let mut vars: HashMap<String, String> = [
        ("SHOPIFY_STORE", "pineapple.myshopify.com"),
        (
            "SHOPIFY_STOREFRONT_PRIVATE_TOKEN",
            "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        vars.insert((*k).to_string(), (*v).to_string());
    }
    StorefrontConfig::from_vars(&vars).expect("valid test configuration")
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// # Panics
    ///
    /// Panics if the body is not the expected JSON.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// One shopper talking to an in-process storefront.
///
/// Carries the session cookie between requests like a browser would.
pub struct TestApp {
    pub backend: InMemoryCommerce,
    router: Router,
    cookie: Arc<Mutex<Option<String>>>,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with(catalog(), &[])
    }

    #[must_use]
    pub fn with(backend: InMemoryCommerce, overrides: &[(&str, &str)]) -> Self {
        let state = AppState::new(config(overrides), Arc::new(backend.clone()));
        Self {
            backend,
            router: cartlink_storefront::app(state),
            cookie: Arc::new(Mutex::new(None)),
        }
    }

    /// A second shopper on the same storefront, with no cookie yet.
    #[must_use]
    pub fn other_shopper(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            router: self.router.clone(),
            cookie: Arc::new(Mutex::new(None)),
        }
    }

    fn request(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(path);
        let cookie = self
            .cookie
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    fn remember_cookie(&self, headers: &HeaderMap) {
        if let Some(cookie) = headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
        {
            *self.cookie.lock().unwrap_or_else(PoisonError::into_inner) = Some(cookie.to_string());
        }
    }

    /// Send a request and return the raw streaming response.
    ///
    /// # Panics
    ///
    /// Panics if the router fails, which it never does for valid requests.
    #[allow(clippy::expect_used)]
    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        self.remember_cookie(response.headers());
        response
    }

    /// # Panics
    ///
    /// Panics if the body cannot be read.
    #[allow(clippy::expect_used)]
    pub async fn buffered(&self, request: Request<Body>) -> TestResponse {
        let response = self.send(request).await;
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, BODY_LIMIT)
            .await
            .expect("readable body");
        TestResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    /// # Panics
    ///
    /// Panics if the request cannot be built.
    #[allow(clippy::expect_used)]
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = self
            .request("GET", path)
            .body(Body::empty())
            .expect("valid request");
        self.buffered(request).await
    }

    /// # Panics
    ///
    /// Panics if the request cannot be built.
    #[allow(clippy::expect_used)]
    pub async fn post(&self, path: &str) -> TestResponse {
        let request = self
            .request("POST", path)
            .body(Body::empty())
            .expect("valid request");
        self.buffered(request).await
    }

    /// # Panics
    ///
    /// Panics if the request cannot be built.
    #[allow(clippy::expect_used)]
    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> TestResponse {
        let request = self
            .request("POST", path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request");
        self.buffered(request).await
    }

    /// Open the SSE stream for this shopper.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    #[allow(clippy::expect_used)]
    pub async fn events(&self) -> axum::response::Response {
        let request = self
            .request("GET", "/api/widget/events")
            .body(Body::empty())
            .expect("valid request");
        self.send(request).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

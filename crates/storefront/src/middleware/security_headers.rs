//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Start locked down and loosen only for what the cart page needs: its own
//! nonce'd inline bootstrap script, and the checkout widget's script origin.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};
use url::Url;

use super::csp::CspNonce;
use crate::state::AppState;

/// Build the Content-Security-Policy for a response.
///
/// The widget renders inside the page and calls back into its own origin,
/// so that origin is allowed for scripts, styles, images, and connections.
#[must_use]
pub fn content_security_policy(nonce: &str, widget_script: Option<&Url>) -> String {
    let widget_origin = widget_script
        .map(|url| url.origin().ascii_serialization())
        .filter(|origin| origin != "null")
        .map(|origin| format!(" {origin}"))
        .unwrap_or_default();

    format!(
        "default-src 'none'; \
         script-src 'self' 'nonce-{nonce}'{widget_origin}; \
         style-src 'self'{widget_origin}; \
         font-src 'self'{widget_origin}; \
         img-src 'self' https://cdn.shopify.com{widget_origin}; \
         connect-src 'self'{widget_origin}; \
         frame-src 'none'; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self' https:; \
         frame-ancestors 'none'"
    )
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY` - Prevent clickjacking
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
/// - `Referrer-Policy: no-referrer` - Zero referrer leakage
/// - `Content-Security-Policy` - See [`content_security_policy`]
/// - `Permissions-Policy` - Deny sensitive features the cart never uses
/// - `Cache-Control: no-store, max-age=0` - Cart pages are per-shopper
/// - `Cross-Origin-Opener-Policy: same-origin` - Process isolation
///
/// The form action allows `https:` because checkout redirects to the hosted
/// Shopify checkout.
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let nonce = request
        .extensions()
        .get::<CspNonce>()
        .map(|n| n.value().to_string())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));

    let policy = content_security_policy(&nonce, state.config().widget.script_url.as_ref());
    match HeaderValue::from_str(&policy) {
        Ok(value) => {
            headers.insert(CONTENT_SECURITY_POLICY, value);
        }
        Err(e) => tracing::error!(error = %e, "Invalid Content-Security-Policy header"),
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             magnetometer=(), \
             microphone=(), \
             usb=(), \
             xr-spatial-tracking=()",
        ),
    );

    headers.insert(
        HeaderName::from_static("cache-control"),
        HeaderValue::from_static("no-store, max-age=0"),
    );

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_without_widget_script() {
        let policy = content_security_policy("abc", None);
        assert!(policy.contains("script-src 'self' 'nonce-abc';"));
        assert!(policy.contains("connect-src 'self';"));
    }

    #[test]
    fn test_policy_allows_widget_origin() {
        let url = Url::parse("https://cdn.onward.example/widget/v2.js").unwrap();
        let policy = content_security_policy("abc", Some(&url));
        assert!(policy.contains("script-src 'self' 'nonce-abc' https://cdn.onward.example;"));
        assert!(policy.contains("connect-src 'self' https://cdn.onward.example;"));
    }
}

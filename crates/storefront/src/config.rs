//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_STOREFRONT_PRIVATE_TOKEN` - Storefront API private access token
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL (default: <http://localhost:3000>)
//! - `SHOPIFY_API_VERSION` - API version (default: 2026-01)
//! - `WIDGET_CONTAINER_SELECTOR` - Widget mount point (default: #onward-container)
//! - `WIDGET_FORCE_INIT` - Force widget re-initialization (default: true)
//! - `WIDGET_CURRENCY` - Widget currency ISO code (default: EUR)
//! - `WIDGET_LOCALE` - Widget request locale (default: fr-FR)
//! - `WIDGET_INSURANCE_HANDLE` - Insurance product handle (default: onward-package-protection)
//! - `WIDGET_SCRIPT_URL` - Widget script to load on the cart page
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use cartlink_core::{CurrencyCode, WidgetInit, WidgetLocale};
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Shopify-issued tokens are random hex or base62; anything flatter was typed
/// by hand.
const MIN_TOKEN_ENTROPY: f64 = 3.3;

/// Fragments that only show up in copied-from-docs sample values.
const SAMPLE_VALUE_MARKERS: &[&str] = &[
    "your-", "your_", "changeme", "replace", "placeholder", "example", "sample",
    "secret", "token", "xxx", "todo", "fixme", "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Source of configuration values, keyed by variable name.
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Shopify Storefront API configuration
    pub shopify: ShopifyStorefrontConfig,
    /// Checkout widget configuration
    pub widget: WidgetConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g., production, staging)
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Shopify Storefront API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ShopifyStorefrontConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2026-01)
    pub api_version: String,
    /// Storefront API private access token (server-side only)
    pub storefront_private_token: SecretString,
}

impl std::fmt::Debug for ShopifyStorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyStorefrontConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("storefront_private_token", &"[REDACTED]")
            .finish()
    }
}

/// Checkout widget configuration.
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    /// CSS selector the widget mounts into
    pub container_selector: String,
    /// Force re-initialization on page load
    pub force_init: bool,
    /// Currency the widget prices in
    pub currency: CurrencyCode,
    /// Locale the widget renders in
    pub locale: String,
    /// Catalog handle of the insurance add-on product
    pub insurance_handle: String,
    /// Widget script URL, if the page should load it
    pub script_url: Option<Url>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        let init = WidgetInit::default();
        Self {
            container_selector: init.container_selector,
            force_init: init.force,
            currency: init.locale.currency_iso_code,
            locale: init.locale.request_locale,
            insurance_handle: "onward-package-protection".to_string(),
            script_url: None,
        }
    }
}

impl WidgetConfig {
    /// One-time initialization payload for the widget.
    #[must_use]
    pub fn init(&self) -> WidgetInit {
        WidgetInit {
            container_selector: self.container_selector.clone(),
            force: self.force_init,
            locale: WidgetLocale {
                currency_iso_code: self.currency,
                request_locale: self.locale.clone(),
            },
        }
    }

    fn load(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let currency = match lookup("WIDGET_CURRENCY") {
            Some(code) => CurrencyCode::parse(&code).map_err(|e| {
                ConfigError::InvalidEnvVar("WIDGET_CURRENCY".to_string(), e.to_string())
            })?,
            None => defaults.currency,
        };
        let script_url = lookup("WIDGET_SCRIPT_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("WIDGET_SCRIPT_URL".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            container_selector: lookup("WIDGET_CONTAINER_SELECTOR")
                .unwrap_or(defaults.container_selector),
            force_init: parse_bool(lookup, "WIDGET_FORCE_INIT", defaults.force_init)?,
            currency,
            locale: lookup("WIDGET_LOCALE").unwrap_or(defaults.locale),
            insurance_handle: lookup("WIDGET_INSURANCE_HANDLE")
                .unwrap_or(defaults.insurance_handle),
            script_url,
        })
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::load(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an explicit set of variables.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(&|key| vars.get(key).cloned())
    }

    fn load(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let host = get_or_default(lookup, "STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_or_default(lookup, "STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_or_default(lookup, "STOREFRONT_BASE_URL", "http://localhost:3000");
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            host,
            port,
            base_url,
            shopify: ShopifyStorefrontConfig::load(lookup)?,
            widget: WidgetConfig::load(lookup)?,
            sentry_dsn: lookup("SENTRY_DSN"),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_rate(lookup, "SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: parse_rate(lookup, "SENTRY_TRACES_SAMPLE_RATE", 0.1)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ShopifyStorefrontConfig {
    fn load(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            store: get_required(lookup, "SHOPIFY_STORE")?,
            api_version: get_or_default(lookup, "SHOPIFY_API_VERSION", "2026-01"),
            storefront_private_token: get_token(lookup, "SHOPIFY_STOREFRONT_PRIVATE_TOKEN")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required variable.
fn get_required(lookup: Lookup<'_>, key: &str) -> Result<String, ConfigError> {
    lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a variable with a default value.
fn get_or_default(lookup: Lookup<'_>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn parse_bool(lookup: Lookup<'_>, key: &str, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

fn parse_rate(lookup: Lookup<'_>, key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let rate = raw
        .trim()
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ))
    }
}

/// Shannon entropy of `value`, in bits per character.
fn bits_per_char(value: &str) -> f64 {
    let mut chars: Vec<char> = value.chars().collect();
    if chars.is_empty() {
        return 0.0;
    }
    chars.sort_unstable();

    #[allow(clippy::cast_precision_loss)] // token lengths are tiny
    let total = chars.len() as f64;
    chars
        .chunk_by(|a, b| a == b)
        .map(|run| {
            #[allow(clippy::cast_precision_loss)]
            let p = run.len() as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Reject tokens that look like sample values or were typed by hand.
fn check_token(token: &str, key: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| Err(ConfigError::InsecureSecret(key.to_string(), reason));

    let lower = token.to_ascii_lowercase();
    if let Some(marker) = SAMPLE_VALUE_MARKERS.iter().find(|m| lower.contains(*m)) {
        return insecure(format!("looks like a sample value (contains '{marker}')"));
    }

    let entropy = bits_per_char(token);
    if entropy < MIN_TOKEN_ENTROPY {
        return insecure(format!(
            "{entropy:.2} bits/char is below {MIN_TOKEN_ENTROPY:.1}; use the token Shopify generated"
        ));
    }
    Ok(())
}

fn get_token(lookup: Lookup<'_>, key: &str) -> Result<SecretString, ConfigError> {
    let token = get_required(lookup, key)?;
    check_token(&token, key)?;
    Ok(SecretString::from(token))
}

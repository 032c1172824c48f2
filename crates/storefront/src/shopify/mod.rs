//! Shopify Storefront API client.
//!
//! # Architecture
//!
//! - GraphQL documents are sent through `graphql_client`'s request/response
//!   envelope, with `reqwest` 0.13 for HTTP
//! - Shopify is source of truth - NO local sync, direct API calls
//! - Catalog lookups are cached via `moka` (5 minute TTL); carts never are
//!
//! # Example
//!
//! ```rust,ignore
//! use cartlink_storefront::shopify::StorefrontClient;
//!
//! let client = StorefrontClient::new(&config.shopify);
//!
//! let cart = client.create_cart().await?;
//! let cart = client.add_lines(&cart.id, &[NewLineChange {
//!     variant_id: VariantId::new("gid://shopify/ProductVariant/1"),
//!     quantity: 1,
//! }]).await?;
//! ```

mod storefront;

pub use storefront::StorefrontClient;

use thiserror::Error;

/// Errors that can occur when interacting with Shopify APIs.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response parsed but carried values we cannot represent.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),
}

impl ShopifyError {
    /// A GraphQL failure with only a message.
    pub(crate) fn graphql(message: impl Into<String>) -> Self {
        Self::GraphQL(vec![GraphQLError::new(message)])
    }
}

/// A GraphQL error returned by the Shopify API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphQLError {
    pub message: String,
    /// Dotted response path, e.g. `cartLinesAdd.userErrors.0`.
    pub path: Option<String>,
    /// First source location as (line, column), 1-indexed.
    pub location: Option<(i64, i64)>,
}

impl GraphQLError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

impl std::fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut wrote = false;
        if !self.message.is_empty() {
            f.write_str(&self.message)?;
            wrote = true;
        }
        if let Some(path) = &self.path {
            write!(f, "{}at {path}", if wrote { " " } else { "" })?;
            wrote = true;
        }
        if let Some((line, column)) = self.location {
            write!(f, "{}({line}:{column})", if wrote { " " } else { "" })?;
            wrote = true;
        }
        if !wrote {
            f.write_str("unknown error")?;
        }
        Ok(())
    }
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "no details".to_string();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ShopifyError::NotFound("cart gid://shopify/Cart/1".to_string());
        assert_eq!(err.to_string(), "Not found: cart gid://shopify/Cart/1");
    }

    #[test]
    fn test_multiple_graphql_errors() {
        let err = ShopifyError::GraphQL(vec![
            GraphQLError::new("Field not found"),
            GraphQLError::new("Invalid ID"),
        ]);
        assert_eq!(err.to_string(), "GraphQL errors: Field not found; Invalid ID");
    }

    #[test]
    fn test_graphql_error_with_path_and_location() {
        let err = GraphQLError {
            message: "Variant is sold out".to_string(),
            path: Some("cartLinesAdd.0".to_string()),
            location: Some((5, 10)),
        };
        assert_eq!(err.to_string(), "Variant is sold out at cartLinesAdd.0 (5:10)");
    }

    #[test]
    fn test_empty_graphql_errors() {
        assert_eq!(GraphQLError::default().to_string(), "unknown error");
        assert_eq!(
            ShopifyError::GraphQL(vec![]).to_string(),
            "GraphQL errors: no details"
        );
    }
}

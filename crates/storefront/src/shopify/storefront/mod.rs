//! Shopify Storefront API client implementation.
//!
//! Sends the documents in [`queries`] through `graphql_client`'s
//! `QueryBody`/`Response` envelope with `reqwest` 0.13 for HTTP.
//! Caches product lookups using `moka` (5-minute TTL).

mod conversions;
pub mod queries;
mod wire;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cartlink_core::{Cart, CartId, LineId, LineQuantityChange, NewLineChange, Product};
use graphql_client::{QueryBody, Response};
use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::commerce::CommerceBackend;
use crate::config::ShopifyStorefrontConfig;
use crate::shopify::{GraphQLError, ShopifyError};

use conversions::{convert_cart, convert_product, mutation_cart};
use queries::Operation;
use wire::{
    AddCartLinesData, CartIdVars, CartInput, CartLineInput, CartLineUpdateInput,
    CartLinesPageData, CartLinesPageVars, CartLinesVars, CartNode, CreateCartData, CreateCartVars,
    GetCartData, GetProductData, HandleVars, RemoveCartLinesData, RemoveLinesVars,
    UpdateCartLinesData,
};

/// Upper bound on line pages fetched for one cart.
///
/// Shopify caps carts at 500 lines, two pages of [`queries::LINES_PAGE_SIZE`].
const MAX_LINE_PAGES: usize = 4;

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the Shopify Storefront API.
///
/// Provides typed access to cart operations and product lookups.
/// Products are cached for 5 minutes.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    products: Cache<String, Product>,
}

impl StorefrontClient {
    /// Create a new Storefront API client.
    #[must_use]
    pub fn new(config: &ShopifyStorefrontConfig) -> Self {
        let products = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let endpoint = format!(
            "https://{}/api/{}/graphql.json",
            config.store, config.api_version
        );

        Self {
            inner: Arc::new(StorefrontClientInner {
                client: reqwest::Client::new(),
                endpoint,
                access_token: config.storefront_private_token.expose_secret().to_string(),
                products,
            }),
        }
    }

    /// Execute a GraphQL operation.
    async fn execute<V, D>(&self, operation: Operation, variables: V) -> Result<D, ShopifyError>
    where
        V: Serialize + Send,
        D: DeserializeOwned,
    {
        let request_body = QueryBody {
            variables,
            query: operation.document,
            operation_name: operation.name,
        };

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            // Private access tokens use a different header than public tokens
            // See: https://shopify.dev/docs/storefronts/headless/building-with-the-storefront-api/getting-started
            .header(
                "Shopify-Storefront-Private-Token",
                &self.inner.access_token,
            )
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Read the body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                operation = operation.name,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify API returned non-success status"
            );
            return Err(ShopifyError::graphql(format!(
                "HTTP {status}: {}",
                response_text.chars().take(200).collect::<String>()
            )));
        }

        let response: Response<D> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    operation = operation.name,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse Shopify GraphQL response"
                );
                return Err(ShopifyError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            debug!(errors = ?errors, "GraphQL errors in response");
            return Err(ShopifyError::GraphQL(
                errors.into_iter().map(convert_graphql_error).collect(),
            ));
        }

        response
            .data
            .ok_or_else(|| ShopifyError::graphql("No data in response"))
    }

    // =========================================================================
    // Product Methods (cached)
    // =========================================================================

    /// Get a product by its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_product_by_handle(&self, handle: &str) -> Result<Product, ShopifyError> {
        if let Some(product) = self.inner.products.get(handle).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let data: GetProductData = self
            .execute(
                queries::GET_PRODUCT_BY_HANDLE,
                HandleVars {
                    handle: handle.to_string(),
                },
            )
            .await?;

        let node = data
            .product
            .ok_or_else(|| ShopifyError::NotFound(format!("Product not found: {handle}")))?;
        let product = convert_product(node)?;

        self.inner
            .products
            .insert(handle.to_string(), product.clone())
            .await;

        Ok(product)
    }

    // =========================================================================
    // Cart Methods (not cached - mutable state)
    // =========================================================================

    /// Fetch the remaining pages of a cart's lines, then convert it.
    async fn complete_cart(&self, mut node: CartNode) -> Result<Cart, ShopifyError> {
        let mut pages = 1;
        while let Some(after) = node.lines.next_cursor() {
            if pages == MAX_LINE_PAGES {
                warn!(cart_id = %node.id, pages, "Cart has more line pages than expected");
                break;
            }

            let data: CartLinesPageData = self
                .execute(
                    queries::GET_CART_LINES_PAGE,
                    CartLinesPageVars {
                        cart_id: node.id.clone(),
                        after,
                    },
                )
                .await?;
            let page = data
                .cart
                .ok_or_else(|| ShopifyError::NotFound(format!("Cart not found: {}", node.id)))?;
            node.lines.append(page.lines);
            pages += 1;
        }

        debug!(pages, lines = node.lines.edges.len(), "Fetched cart lines");
        convert_cart(node)
    }

    /// Create an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart creation fails or user errors are returned.
    #[instrument(skip(self))]
    pub async fn create_cart(&self) -> Result<Cart, ShopifyError> {
        let data: CreateCartData = self
            .execute(
                queries::CREATE_CART,
                CreateCartVars {
                    input: CartInput::default(),
                },
            )
            .await?;
        self.complete_cart(mutation_cart(data.cart_create, "create cart")?)
            .await
    }

    /// Get an existing cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart is not found or the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn get_cart(&self, cart_id: &CartId) -> Result<Cart, ShopifyError> {
        let data: GetCartData = self
            .execute(
                queries::GET_CART,
                CartIdVars {
                    cart_id: cart_id.to_string(),
                },
            )
            .await?;

        let node = data
            .cart
            .ok_or_else(|| ShopifyError::NotFound(format!("Cart not found: {cart_id}")))?;
        self.complete_cart(node).await
    }

    /// Add lines to a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id, lines = lines.len()))]
    pub async fn add_lines(
        &self,
        cart_id: &CartId,
        lines: &[NewLineChange],
    ) -> Result<Cart, ShopifyError> {
        let variables = CartLinesVars {
            cart_id: cart_id.to_string(),
            lines: lines
                .iter()
                .map(|line| CartLineInput {
                    merchandise_id: line.variant_id.to_string(),
                    quantity: i64::from(line.quantity),
                })
                .collect(),
        };

        let data: AddCartLinesData = self.execute(queries::ADD_CART_LINES, variables).await?;
        self.complete_cart(mutation_cart(data.cart_lines_add, "add to cart")?)
            .await
    }

    /// Update cart line quantities.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id, lines = lines.len()))]
    pub async fn update_lines(
        &self,
        cart_id: &CartId,
        lines: &[LineQuantityChange],
    ) -> Result<Cart, ShopifyError> {
        let variables = CartLinesVars {
            cart_id: cart_id.to_string(),
            lines: lines
                .iter()
                .map(|line| CartLineUpdateInput {
                    id: line.id.to_string(),
                    quantity: i64::from(line.quantity),
                })
                .collect(),
        };

        let data: UpdateCartLinesData = self.execute(queries::UPDATE_CART_LINES, variables).await?;
        self.complete_cart(mutation_cart(data.cart_lines_update, "update cart")?)
            .await
    }

    /// Remove lines from a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self, line_ids), fields(cart_id = %cart_id, lines = line_ids.len()))]
    pub async fn remove_lines(
        &self,
        cart_id: &CartId,
        line_ids: &[LineId],
    ) -> Result<Cart, ShopifyError> {
        let variables = RemoveLinesVars {
            cart_id: cart_id.to_string(),
            line_ids: line_ids.iter().map(ToString::to_string).collect(),
        };

        let data: RemoveCartLinesData = self.execute(queries::REMOVE_CART_LINES, variables).await?;
        self.complete_cart(mutation_cart(data.cart_lines_remove, "remove from cart")?)
            .await
    }
}

fn convert_graphql_error(error: graphql_client::Error) -> GraphQLError {
    let path = error.path.filter(|p| !p.is_empty()).map(|fragments| {
        fragments
            .iter()
            .map(|fragment| match fragment {
                graphql_client::PathFragment::Key(key) => key.clone(),
                graphql_client::PathFragment::Index(index) => index.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    });
    let location = error.locations.and_then(|locations| {
        locations
            .first()
            .map(|l| (i64::from(l.line), i64::from(l.column)))
    });

    GraphQLError {
        message: error.message,
        path,
        location,
    }
}

#[async_trait]
impl CommerceBackend for StorefrontClient {
    async fn create_cart(&self) -> Result<Cart, ShopifyError> {
        Self::create_cart(self).await
    }

    async fn get_cart(&self, cart_id: &CartId) -> Result<Cart, ShopifyError> {
        Self::get_cart(self, cart_id).await
    }

    async fn add_lines(
        &self,
        cart_id: &CartId,
        lines: &[NewLineChange],
    ) -> Result<Cart, ShopifyError> {
        Self::add_lines(self, cart_id, lines).await
    }

    async fn update_lines(
        &self,
        cart_id: &CartId,
        lines: &[LineQuantityChange],
    ) -> Result<Cart, ShopifyError> {
        Self::update_lines(self, cart_id, lines).await
    }

    async fn remove_lines(
        &self,
        cart_id: &CartId,
        line_ids: &[LineId],
    ) -> Result<Cart, ShopifyError> {
        Self::remove_lines(self, cart_id, line_ids).await
    }

    async fn product_by_handle(&self, handle: &str) -> Result<Option<Product>, ShopifyError> {
        match self.get_product_by_handle(handle).await {
            Ok(product) => Ok(Some(product)),
            Err(ShopifyError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

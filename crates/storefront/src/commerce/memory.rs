//! In-process commerce backend for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use cartlink_core::{
    Cart, CartId, CurrencyCode, LineId, LineItem, LineQuantityChange, NewLineChange, Price,
    Product, ProductId, ProductVariant, Variant, VariantId,
};
use rust_decimal::Decimal;
use tokio::sync::Semaphore;

use super::CommerceBackend;
use crate::shopify::ShopifyError;

/// A commerce backend that keeps carts in memory.
///
/// Behaves like the Storefront API for the operations the widget uses:
/// adding a variant that is already in the cart bumps that line, a zero
/// quantity update removes the line, and totals are recomputed after every
/// mutation.
#[derive(Clone)]
pub struct InMemoryCommerce {
    inner: Arc<Inner>,
}

struct Inner {
    currency: CurrencyCode,
    state: Mutex<State>,
    requests: AtomicUsize,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

#[derive(Default)]
struct State {
    variants: HashMap<VariantId, Variant>,
    products: HashMap<String, Product>,
    carts: HashMap<CartId, Cart>,
    next_id: u64,
    fail_next: Option<String>,
}

impl State {
    fn next_id(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("gid://shopify/{kind}/{}", self.next_id)
    }
}

impl Default for InMemoryCommerce {
    fn default() -> Self {
        Self::new(CurrencyCode::EUR)
    }
}

impl InMemoryCommerce {
    #[must_use]
    pub fn new(currency: CurrencyCode) -> Self {
        Self {
            inner: Arc::new(Inner {
                currency,
                state: Mutex::new(State::default()),
                requests: AtomicUsize::new(0),
                gate: Mutex::new(None),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a purchasable variant.
    ///
    /// # Panics
    ///
    /// Panics if `price` is not a valid non-negative decimal.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_variant(
        self,
        id: &str,
        product_title: &str,
        price: &str,
        requires_shipping: bool,
    ) -> Self {
        let price = Price::parse(price, self.inner.currency.as_str()).expect("valid test price");
        self.state().variants.insert(
            VariantId::new(id),
            Variant {
                id: VariantId::new(id),
                title: "Default Title".to_string(),
                product_title: product_title.to_string(),
                price,
                requires_shipping,
            },
        );
        self
    }

    /// Register a catalog product with one variant per `(id, price)` pair.
    ///
    /// # Panics
    ///
    /// Panics if a price is not a valid non-negative decimal.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_product(self, handle: &str, title: &str, variants: &[(&str, &str)]) -> Self {
        let currency = self.inner.currency;
        {
            let mut state = self.state();
            let id = state.next_id("Product");
            let variants = variants
                .iter()
                .map(|(id, price)| ProductVariant {
                    id: VariantId::new(*id),
                    title: "Default Title".to_string(),
                    available_for_sale: true,
                    price: Price::parse(price, currency.as_str()).expect("valid test price"),
                })
                .collect();
            state.products.insert(
                handle.to_string(),
                Product {
                    id: ProductId::new(id),
                    handle: handle.to_string(),
                    title: title.to_string(),
                    variants,
                },
            );
        }
        self
    }

    /// Create a cart holding `(variant, quantity)` lines outside the request count.
    ///
    /// # Panics
    ///
    /// Panics if a variant was not registered with [`Self::with_variant`].
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn seed_cart(&self, lines: &[(&str, u32)]) -> CartId {
        let mut state = self.state();
        let cart_id = CartId::new(state.next_id("Cart"));
        let mut cart = self.empty_cart(cart_id.clone());
        for (variant, quantity) in lines {
            let variant = state
                .variants
                .get(&VariantId::new(*variant))
                .cloned()
                .expect("seeded variant is registered");
            let line_id = LineId::new(state.next_id("CartLine"));
            cart.lines.push(LineItem {
                id: line_id,
                quantity: *quantity,
                variant,
            });
        }
        self.recompute(&mut cart);
        state.carts.insert(cart_id.clone(), cart);
        cart_id
    }

    /// Current backend copy of a cart.
    #[must_use]
    pub fn cart(&self, cart_id: &CartId) -> Option<Cart> {
        self.state().carts.get(cart_id).cloned()
    }

    /// Fail the next backend call with the given message.
    pub fn fail_next_request(&self, message: impl Into<String>) {
        self.state().fail_next = Some(message.into());
    }

    /// Number of backend calls made so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    /// Hold every subsequent call until a permit is added to the returned
    /// semaphore.
    #[must_use]
    pub fn hold_requests(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self
            .inner
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&gate));
        gate
    }

    async fn begin(&self) -> Result<(), ShopifyError> {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);

        let gate = self
            .inner
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|_| ShopifyError::graphql("backend shut down"))?
                .forget();
        }

        match self.state().fail_next.take() {
            Some(message) => Err(ShopifyError::graphql(message)),
            None => Ok(()),
        }
    }

    fn empty_cart(&self, id: CartId) -> Cart {
        let zero = Price::zero(self.inner.currency);
        Cart {
            checkout_url: format!("https://checkout.test/cart/c/{}", id.as_str()),
            id,
            currency_code: Some(self.inner.currency),
            lines: Vec::new(),
            subtotal: zero,
            total_tax: None,
            total: zero,
        }
    }

    fn recompute(&self, cart: &mut Cart) {
        let subtotal = cart
            .lines
            .iter()
            .map(|line| line.cost().amount())
            .sum::<Decimal>();
        let subtotal = Price::try_new(subtotal, self.inner.currency)
            .unwrap_or_else(|_| Price::zero(self.inner.currency));
        cart.subtotal = subtotal;
        cart.total = subtotal;
    }

    fn with_cart<F>(&self, cart_id: &CartId, mutate: F) -> Result<Cart, ShopifyError>
    where
        F: FnOnce(&mut State, &mut Cart) -> Result<(), ShopifyError>,
    {
        let mut state = self.state();
        let mut cart = state
            .carts
            .get(cart_id)
            .cloned()
            .ok_or_else(|| ShopifyError::NotFound(format!("Cart not found: {cart_id}")))?;
        mutate(&mut state, &mut cart)?;
        self.recompute(&mut cart);
        state.carts.insert(cart_id.clone(), cart.clone());
        Ok(cart)
    }
}

#[async_trait]
impl CommerceBackend for InMemoryCommerce {
    async fn create_cart(&self) -> Result<Cart, ShopifyError> {
        self.begin().await?;
        let mut state = self.state();
        let cart = self.empty_cart(CartId::new(state.next_id("Cart")));
        state.carts.insert(cart.id.clone(), cart.clone());
        Ok(cart)
    }

    async fn get_cart(&self, cart_id: &CartId) -> Result<Cart, ShopifyError> {
        self.begin().await?;
        self.state()
            .carts
            .get(cart_id)
            .cloned()
            .ok_or_else(|| ShopifyError::NotFound(format!("Cart not found: {cart_id}")))
    }

    async fn add_lines(
        &self,
        cart_id: &CartId,
        lines: &[NewLineChange],
    ) -> Result<Cart, ShopifyError> {
        self.begin().await?;
        self.with_cart(cart_id, |state, cart| {
            for change in lines {
                if let Some(line) = cart
                    .lines
                    .iter_mut()
                    .find(|line| line.variant.id == change.variant_id)
                {
                    line.quantity += change.quantity;
                    continue;
                }
                let variant = state.variants.get(&change.variant_id).cloned().ok_or_else(|| {
                    ShopifyError::UserError(format!(
                        "The merchandise with id {} does not exist.",
                        change.variant_id
                    ))
                })?;
                let id = LineId::new(state.next_id("CartLine"));
                cart.lines.push(LineItem {
                    id,
                    quantity: change.quantity,
                    variant,
                });
            }
            Ok(())
        })
    }

    async fn update_lines(
        &self,
        cart_id: &CartId,
        lines: &[LineQuantityChange],
    ) -> Result<Cart, ShopifyError> {
        self.begin().await?;
        self.with_cart(cart_id, |_, cart| {
            for change in lines {
                let line = cart
                    .lines
                    .iter_mut()
                    .find(|line| line.id == change.id)
                    .ok_or_else(|| {
                        ShopifyError::UserError(format!("The cart line {} does not exist.", change.id))
                    })?;
                line.quantity = change.quantity;
            }
            cart.lines.retain(|line| line.quantity > 0);
            Ok(())
        })
    }

    async fn remove_lines(
        &self,
        cart_id: &CartId,
        line_ids: &[LineId],
    ) -> Result<Cart, ShopifyError> {
        self.begin().await?;
        self.with_cart(cart_id, |_, cart| {
            cart.lines.retain(|line| !line_ids.contains(&line.id));
            Ok(())
        })
    }

    async fn product_by_handle(&self, handle: &str) -> Result<Option<Product>, ShopifyError> {
        self.begin().await?;
        Ok(self.state().products.get(handle).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn backend() -> InMemoryCommerce {
        InMemoryCommerce::default()
            .with_variant("gid://shopify/ProductVariant/10", "Dried Pineapple", "10.00", true)
            .with_variant("gid://shopify/ProductVariant/20", "Gift Card", "25.00", false)
    }

    #[tokio::test]
    async fn test_add_merges_same_variant() {
        let backend = backend();
        let cart_id = backend.seed_cart(&[("gid://shopify/ProductVariant/10", 1)]);

        let cart = backend
            .add_lines(
                &cart_id,
                &[NewLineChange {
                    variant_id: VariantId::new("gid://shopify/ProductVariant/10"),
                    quantity: 2,
                }],
            )
            .await
            .unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 3);
        assert_eq!(cart.subtotal.amount(), Decimal::new(30, 0));
    }

    #[tokio::test]
    async fn test_update_to_zero_removes_line() {
        let backend = backend();
        let cart_id = backend.seed_cart(&[
            ("gid://shopify/ProductVariant/10", 1),
            ("gid://shopify/ProductVariant/20", 1),
        ]);
        let before = backend.cart(&cart_id).unwrap();

        let cart = backend
            .update_lines(
                &cart_id,
                &[LineQuantityChange {
                    id: before.lines[0].id.clone(),
                    quantity: 0,
                }],
            )
            .await
            .unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.total.amount(), Decimal::new(25, 0));
    }

    #[tokio::test]
    async fn test_unknown_variant_is_user_error() {
        let backend = backend();
        let cart_id = backend.seed_cart(&[]);

        let err = backend
            .add_lines(
                &cart_id,
                &[NewLineChange {
                    variant_id: VariantId::new("gid://shopify/ProductVariant/999"),
                    quantity: 1,
                }],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ShopifyError::UserError(_)));
    }

    #[tokio::test]
    async fn test_fail_next_request_fails_once() {
        let backend = backend();
        let cart_id = backend.seed_cart(&[]);
        backend.fail_next_request("boom");

        assert!(backend.get_cart(&cart_id).await.is_err());
        assert!(backend.get_cart(&cart_id).await.is_ok());
        assert_eq!(backend.request_count(), 2);
    }
}

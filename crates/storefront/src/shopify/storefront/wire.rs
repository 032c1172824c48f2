//! Request variables and response shapes for the documents in
//! [`super::queries`].
//!
//! These mirror the GraphQL selections field for field. Conversion into the
//! domain types in `cartlink_core` lives in [`super::conversions`].

use serde::{Deserialize, Serialize};

// =============================================================================
// Variables
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartIdVars {
    pub cart_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLinesPageVars {
    pub cart_id: String,
    pub after: String,
}

#[derive(Debug, Serialize)]
pub struct CreateCartVars {
    pub input: CartInput,
}

#[derive(Debug, Default, Serialize)]
pub struct CartInput {
    pub lines: Vec<CartLineInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    pub merchandise_id: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct CartLineUpdateInput {
    pub id: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLinesVars<L> {
    pub cart_id: String,
    pub lines: Vec<L>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLinesVars {
    pub cart_id: String,
    pub line_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HandleVars {
    pub handle: String,
}

// =============================================================================
// Shared shapes
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyNode {
    pub amount: String,
    pub currency_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    /// Absent when the selection does not ask for it.
    #[serde(default)]
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    /// Cursor of the next page, if there is one.
    pub fn next_cursor(&self) -> Option<String> {
        if self.page_info.has_next_page {
            self.page_info.end_cursor.clone()
        } else {
            None
        }
    }

    /// Append the page that follows this one.
    pub fn append(&mut self, next: Self) {
        self.edges.extend(next.edges);
        self.page_info = next.page_info;
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserErrorNode {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartNode {
    pub id: String,
    pub checkout_url: String,
    pub cost: CartCostNode,
    pub lines: Connection<CartLineNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCostNode {
    pub subtotal_amount: MoneyNode,
    pub total_amount: MoneyNode,
    #[serde(default)]
    pub total_tax_amount: Option<MoneyNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CartLineNode {
    pub id: String,
    pub quantity: i64,
    pub merchandise: MerchandiseNode,
}

/// `Merchandise` union; only the `ProductVariant` arm is selected, so every
/// field is absent for other merchandise types.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MerchandiseNode {
    pub id: Option<String>,
    pub title: Option<String>,
    pub requires_shipping: Option<bool>,
    pub price: Option<MoneyNode>,
    pub product: Option<ProductTitleNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductTitleNode {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartMutationPayload {
    pub cart: Option<CartNode>,
    #[serde(default)]
    pub user_errors: Vec<UserErrorNode>,
}

#[derive(Debug, Deserialize)]
pub struct GetCartData {
    pub cart: Option<CartNode>,
}

#[derive(Debug, Deserialize)]
pub struct CartLinesPageData {
    pub cart: Option<CartLinesNode>,
}

#[derive(Debug, Deserialize)]
pub struct CartLinesNode {
    pub lines: Connection<CartLineNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCartData {
    pub cart_create: Option<CartMutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartLinesData {
    pub cart_lines_add: Option<CartMutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartLinesData {
    pub cart_lines_update: Option<CartMutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveCartLinesData {
    pub cart_lines_remove: Option<CartMutationPayload>,
}

// =============================================================================
// Product
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct GetProductData {
    pub product: Option<ProductNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductNode {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub variants: Connection<ProductVariantNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariantNode {
    pub id: String,
    pub title: String,
    pub available_for_sale: bool,
    pub price: MoneyNode,
}

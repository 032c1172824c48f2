//! GraphQL documents for the Shopify Storefront API.
//!
//! Every cart query and mutation selects the same `CartFields` fragment so
//! that all of them deserialize into [`super::wire::CartNode`].

/// Page size for cart lines, Shopify's maximum for a connection.
///
/// Carts hold at most 500 lines, so a cart spans at most two pages.
pub const LINES_PAGE_SIZE: usize = 250;

/// Fields selected for every cart line.
macro_rules! cart_line_fields {
    () => {
        r"
fragment CartLineFields on CartLine {
  id
  quantity
  merchandise {
    ... on ProductVariant {
      id
      title
      requiresShipping
      price { amount currencyCode }
      product { title }
    }
  }
}
"
    };
}

/// Fields selected for every cart response.
///
/// Only the first page of lines is selected; the rest is fetched with
/// [`GET_CART_LINES_PAGE`].
macro_rules! cart_fields {
    () => {
        concat!(
            r"
fragment CartFields on Cart {
  id
  checkoutUrl
  cost {
    subtotalAmount { amount currencyCode }
    totalAmount { amount currencyCode }
    totalTaxAmount { amount currencyCode }
  }
  lines(first: 250) {
    pageInfo { hasNextPage endCursor }
    edges { node { ...CartLineFields } }
  }
}
",
            cart_line_fields!()
        )
    };
}

/// A named GraphQL operation.
#[derive(Debug, Clone, Copy)]
pub struct Operation {
    pub name: &'static str,
    pub document: &'static str,
}

pub const GET_CART: Operation = Operation {
    name: "GetCart",
    document: concat!(
        "query GetCart($cartId: ID!) {\n  cart(id: $cartId) { ...CartFields }\n}\n",
        cart_fields!()
    ),
};

pub const GET_CART_LINES_PAGE: Operation = Operation {
    name: "GetCartLinesPage",
    document: concat!(
        "query GetCartLinesPage($cartId: ID!, $after: String!) {\n",
        "  cart(id: $cartId) {\n",
        "    lines(first: 250, after: $after) {\n",
        "      pageInfo { hasNextPage endCursor }\n",
        "      edges { node { ...CartLineFields } }\n",
        "    }\n",
        "  }\n}\n",
        cart_line_fields!()
    ),
};

pub const CREATE_CART: Operation = Operation {
    name: "CreateCart",
    document: concat!(
        "mutation CreateCart($input: CartInput) {\n",
        "  cartCreate(input: $input) {\n",
        "    cart { ...CartFields }\n",
        "    userErrors { field message }\n",
        "  }\n}\n",
        cart_fields!()
    ),
};

pub const ADD_CART_LINES: Operation = Operation {
    name: "AddCartLines",
    document: concat!(
        "mutation AddCartLines($cartId: ID!, $lines: [CartLineInput!]!) {\n",
        "  cartLinesAdd(cartId: $cartId, lines: $lines) {\n",
        "    cart { ...CartFields }\n",
        "    userErrors { field message }\n",
        "  }\n}\n",
        cart_fields!()
    ),
};

pub const UPDATE_CART_LINES: Operation = Operation {
    name: "UpdateCartLines",
    document: concat!(
        "mutation UpdateCartLines($cartId: ID!, $lines: [CartLineUpdateInput!]!) {\n",
        "  cartLinesUpdate(cartId: $cartId, lines: $lines) {\n",
        "    cart { ...CartFields }\n",
        "    userErrors { field message }\n",
        "  }\n}\n",
        cart_fields!()
    ),
};

pub const REMOVE_CART_LINES: Operation = Operation {
    name: "RemoveCartLines",
    document: concat!(
        "mutation RemoveCartLines($cartId: ID!, $lineIds: [ID!]!) {\n",
        "  cartLinesRemove(cartId: $cartId, lineIds: $lineIds) {\n",
        "    cart { ...CartFields }\n",
        "    userErrors { field message }\n",
        "  }\n}\n",
        cart_fields!()
    ),
};

pub const GET_PRODUCT_BY_HANDLE: Operation = Operation {
    name: "GetProductByHandle",
    document: r"query GetProductByHandle($handle: String!) {
  product(handle: $handle) {
    id
    handle
    title
    variants(first: 50) {
      edges {
        node {
          id
          title
          availableForSale
          price { amount currencyCode }
        }
      }
    }
  }
}
",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_operations_include_fragment() {
        for op in [
            GET_CART,
            CREATE_CART,
            ADD_CART_LINES,
            UPDATE_CART_LINES,
            REMOVE_CART_LINES,
        ] {
            assert!(op.document.contains("...CartFields"), "{}", op.name);
            assert!(
                op.document.contains("fragment CartFields on Cart"),
                "{}",
                op.name
            );
            assert!(op.document.contains(op.name), "{}", op.name);
            assert!(op.document.contains("hasNextPage"), "{}", op.name);
        }
    }

    #[test]
    fn test_line_pages_use_the_shared_line_fragment() {
        let doc = GET_CART_LINES_PAGE.document;
        assert!(doc.contains("after: $after"));
        assert!(doc.contains("fragment CartLineFields on CartLine"));
        assert!(!doc.contains("fragment CartFields"));

        let first = format!("lines(first: {LINES_PAGE_SIZE}");
        assert!(doc.contains(&first));
        assert!(GET_CART.document.contains(&first));
    }
}

//! Cartlink Core - Shared types library.
//!
//! This crate provides the types shared by the storefront service and its
//! integration tests:
//! - `storefront` - Cart page, checkout-widget API, and Shopify client
//! - `integration-tests` - End-to-end router tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure transformations - no I/O, no
//! HTTP clients. Everything the checkout widget is allowed to see is defined
//! here, so the information-hiding rules live next to the data they protect.
//!
//! # Modules
//!
//! - [`types`] - Ids, prices, carts, widget snapshots, and change sets

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

//! Core types for Cartlink.
//!
//! This module provides type-safe wrappers for the cart domain and the
//! widget-facing projections derived from it.

pub mod cart;
pub mod changes;
pub mod id;
pub mod price;
pub mod product;
pub mod snapshot;
pub mod widget;

pub use cart::{Cart, LineItem, Variant};
pub use changes::{ChangeError, LineQuantityChange, NewLineChange};
pub use id::*;
pub use price::{CurrencyCode, Price, PriceError, WidgetMoney};
pub use product::{Product, ProductVariant};
pub use snapshot::{CartSnapshot, InsuranceProduct, InsuranceVariant, SnapshotItem, SnapshotVariant, Withheld};
pub use widget::{WidgetInit, WidgetLocale};

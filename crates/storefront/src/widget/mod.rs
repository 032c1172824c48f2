//! Checkout widget integration.
//!
//! # Architecture
//!
//! - [`WidgetAdapter`] implements the storefront-client contract the widget
//!   calls: insurance lookup, fetch, clear, update, add
//! - [`CartSession`] owns the authoritative cart; every backend response
//!   replaces it whole
//! - [`SyncTrigger`] pushes one snapshot per replacement to the widget
//! - [`Bridge`] is the widget itself, optional and injected
//! - [`SessionRegistry`] keeps one adapter per shopping session

pub mod adapter;
pub mod bridge;
pub mod registry;
pub mod session;
pub mod sync;

pub use adapter::{WidgetAdapter, WidgetError};
pub use bridge::{Bridge, BridgeError, EventBridge, WidgetBridge, WidgetEvent};
pub use registry::{SessionRegistry, WidgetSession};
pub use session::CartSession;
pub use sync::{SyncSender, SyncTrigger};

//! Application state shared across handlers.

use std::sync::Arc;

use cartlink_core::WidgetInit;

use crate::commerce::CommerceBackend;
use crate::config::StorefrontConfig;
use crate::widget::SessionRegistry;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the session registry and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    sessions: SessionRegistry,
    widget_init: WidgetInit,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `backend` - Commerce backend the widget sessions talk to
    #[must_use]
    pub fn new(config: StorefrontConfig, backend: Arc<dyn CommerceBackend>) -> Self {
        let sessions = SessionRegistry::new(backend, config.widget.insurance_handle.clone());
        let widget_init = config.widget.init();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                sessions,
                widget_init,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the widget session registry.
    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    /// Widget initialization settings handed to the page.
    #[must_use]
    pub fn widget_init(&self) -> &WidgetInit {
        &self.inner.widget_init
    }
}

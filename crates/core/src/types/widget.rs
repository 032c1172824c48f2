//! Initialization payload for the checkout widget script.

use serde::{Deserialize, Serialize};

use super::price::CurrencyCode;

/// Locale the widget prices and translates itself in.
///
/// Field names follow the widget's own (snake case) convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetLocale {
    pub currency_iso_code: CurrencyCode,
    pub request_locale: String,
}

/// Options passed once to the widget's initializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetInit {
    /// CSS selector of the element the widget mounts into.
    pub container_selector: String,
    /// Re-mount even if the widget believes it is already initialized.
    pub force: bool,
    pub locale: WidgetLocale,
}

impl Default for WidgetInit {
    fn default() -> Self {
        Self {
            container_selector: "#onward-container".to_string(),
            force: true,
            locale: WidgetLocale {
                currency_iso_code: CurrencyCode::EUR,
                request_locale: "fr-FR".to_string(),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_init_wire_shape() {
        let value = serde_json::to_value(WidgetInit::default()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "containerSelector": "#onward-container",
                "force": true,
                "locale": {
                    "currency_iso_code": "EUR",
                    "request_locale": "fr-FR"
                }
            })
        );
    }
}

//! Type-safe price representation using decimal arithmetic.
//!
//! Shopify returns money as a decimal string plus an ISO 4217 code
//! (`{"amount": "10.0", "currencyCode": "EUR"}`). [`Price::parse`] turns that
//! into a canonical, non-negative [`Decimal`]; [`WidgetMoney`] is the same
//! value rendered as a JSON number for the checkout widget.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced while normalizing a monetary amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// The amount is not a decimal number.
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    /// Amounts are never negative in this domain.
    #[error("negative amount: {0}")]
    Negative(Decimal),

    /// The currency code is not three ASCII letters.
    #[error("invalid currency code '{0}'")]
    InvalidCurrency(String),
}

// =============================================================================
// Currency
// =============================================================================

/// ISO 4217 currency code, stored as three uppercase ASCII letters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub const EUR: Self = Self(*b"EUR");

    /// Parse a currency code, accepting any letter case.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::InvalidCurrency`] unless the input is exactly
    /// three ASCII letters.
    pub fn parse(code: &str) -> Result<Self, PriceError> {
        match code.trim().as_bytes() {
            [a, b, c] if [a, b, c].iter().all(|byte| byte.is_ascii_alphabetic()) => Ok(Self([
                a.to_ascii_uppercase(),
                b.to_ascii_uppercase(),
                c.to_ascii_uppercase(),
            ])),
            _ => Err(PriceError::InvalidCurrency(code.to_owned())),
        }
    }

    /// The code as a string slice (e.g. `"EUR"`).
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Only ASCII letters are ever stored; "XXX" is ISO 4217 for "no currency".
        std::str::from_utf8(&self.0).unwrap_or("XXX")
    }

    /// Display symbol for the most common storefront currencies.
    #[must_use]
    pub const fn symbol(&self) -> Option<&'static str> {
        match &self.0 {
            b"USD" | b"CAD" | b"AUD" => Some("$"),
            b"EUR" => Some("€"),
            b"GBP" => Some("£"),
            b"JPY" => Some("¥"),
            _ => None,
        }
    }
}

impl fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CurrencyCode").field(&self.as_str()).finish()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for CurrencyCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Self::parse(&code).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Price
// =============================================================================

/// A non-negative price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PriceRepr")]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., euros, not cents).
    amount: Decimal,
    /// ISO 4217 currency code.
    currency_code: CurrencyCode,
}

#[derive(Deserialize)]
struct PriceRepr {
    amount: Decimal,
    currency_code: CurrencyCode,
}

impl TryFrom<PriceRepr> for Price {
    type Error = PriceError;

    fn try_from(repr: PriceRepr) -> Result<Self, Self::Error> {
        Self::try_new(repr.amount, repr.currency_code)
    }
}

impl Price {
    /// Create a price, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for amounts below zero.
    pub fn try_new(amount: Decimal, currency_code: CurrencyCode) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self {
            amount,
            currency_code,
        })
    }

    /// Normalize a raw amount string and currency code.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not a decimal, is negative, or the
    /// currency code is malformed.
    pub fn parse(amount: &str, currency_code: &str) -> Result<Self, PriceError> {
        let value = Decimal::from_str(amount.trim())
            .map_err(|_| PriceError::InvalidAmount(amount.to_owned()))?;
        Self::try_new(value, CurrencyCode::parse(currency_code)?)
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency_code,
        }
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    #[must_use]
    pub const fn currency_code(&self) -> CurrencyCode {
        self.currency_code
    }

    /// Unit price multiplied by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self {
            amount: self.amount * Decimal::from(quantity),
            currency_code: self.currency_code,
        }
    }

    /// Numeric representation handed to the checkout widget.
    #[must_use]
    pub const fn to_widget(self) -> WidgetMoney {
        WidgetMoney {
            amount: self.amount,
            currency_code: self.currency_code,
        }
    }

    /// Format for display with English conventions (e.g., "€19.99").
    #[must_use]
    pub fn display(&self) -> String {
        self.format_for_locale("en-US")
    }

    /// Format for display following a BCP 47 locale's number conventions.
    ///
    /// `fr-FR` renders 1234.5 EUR as "1 234,50 €"; the default style renders
    /// it as "€1,234.50".
    #[must_use]
    pub fn format_for_locale(&self, locale: &str) -> String {
        let style = NumberStyle::for_locale(locale);
        let plain = format!(
            "{:.2}",
            self.amount
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        );
        let (whole, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));
        let number = format!(
            "{}{}{fraction}",
            group_thousands(whole, style.group),
            style.decimal
        );

        match (self.currency_code.symbol(), style.symbol_after) {
            (Some(symbol), false) => format!("{symbol}{number}"),
            (Some(symbol), true) => format!("{number}\u{a0}{symbol}"),
            (None, false) => format!("{}\u{a0}{number}", self.currency_code),
            (None, true) => format!("{number}\u{a0}{}", self.currency_code),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Monetary amount as the checkout widget expects it: a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetMoney {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency_code: CurrencyCode,
}

// =============================================================================
// Locale formatting
// =============================================================================

struct NumberStyle {
    group: &'static str,
    decimal: char,
    symbol_after: bool,
}

impl NumberStyle {
    fn for_locale(locale: &str) -> Self {
        let language = locale
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        match language.as_str() {
            "fr" => Self {
                group: "\u{202f}",
                decimal: ',',
                symbol_after: true,
            },
            "de" | "es" | "it" | "nl" | "pt" => Self {
                group: ".",
                decimal: ',',
                symbol_after: true,
            },
            _ => Self {
                group: ",",
                decimal: '.',
                symbol_after: false,
            },
        }
    }
}

fn group_thousands(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3 * separator.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push_str(separator);
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_amount_and_code() {
        let price = Price::parse(" 10.0 ", "eur").unwrap();
        assert_eq!(price.amount(), Decimal::new(10, 0));
        assert_eq!(price.currency_code(), CurrencyCode::EUR);
    }

    #[test]
    fn test_parse_rejects_negative() {
        assert!(matches!(
            Price::parse("-1.00", "EUR"),
            Err(PriceError::Negative(_))
        ));
        // Negative zero is still zero.
        assert!(Price::parse("-0.00", "EUR").is_ok());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Price::parse("ten", "EUR"),
            Err(PriceError::InvalidAmount(_))
        ));
        assert!(matches!(
            Price::parse("1.00", "EURO"),
            Err(PriceError::InvalidCurrency(_))
        ));
        assert!(matches!(
            Price::parse("1.00", "E1R"),
            Err(PriceError::InvalidCurrency(_))
        ));
    }

    #[test]
    fn test_times_quantity() {
        let unit = Price::parse("10.00", "EUR").unwrap();
        assert_eq!(unit.times(3).amount(), Decimal::new(3000, 2));
        assert_eq!(unit.times(0).amount(), Decimal::ZERO);
    }

    #[test]
    fn test_display_default_locale() {
        assert_eq!(Price::parse("19.99", "USD").unwrap().display(), "$19.99");
        assert_eq!(Price::parse("1234.5", "EUR").unwrap().display(), "€1,234.50");
        assert_eq!(Price::parse("5", "CHF").unwrap().display(), "CHF\u{a0}5.00");
    }

    #[test]
    fn test_display_french_locale() {
        let price = Price::parse("1234.5", "EUR").unwrap();
        assert_eq!(
            price.format_for_locale("fr-FR"),
            "1\u{202f}234,50\u{a0}€"
        );
        assert_eq!(
            Price::parse("30", "EUR").unwrap().format_for_locale("fr-FR"),
            "30,00\u{a0}€"
        );
    }

    #[test]
    fn test_display_rounds_to_cents() {
        assert_eq!(Price::parse("0.125", "GBP").unwrap().display(), "£0.13");
    }

    #[test]
    fn test_widget_money_is_numeric() {
        let money = Price::parse("30.00", "EUR").unwrap().to_widget();
        let json = serde_json::to_value(money).unwrap();
        assert_eq!(json, serde_json::json!({ "amount": 30.0, "currencyCode": "EUR" }));
    }

    #[test]
    fn test_price_deserialize_rejects_negative() {
        let json = r#"{"amount":"-2.00","currency_code":"EUR"}"#;
        assert!(serde_json::from_str::<Price>(json).is_err());

        let json = r#"{"amount":"2.00","currency_code":"EUR"}"#;
        let price: Price = serde_json::from_str(json).unwrap();
        assert_eq!(price.amount(), Decimal::new(200, 2));
    }
}

//! Token metadata and amount display.
use std::collections::HashMap;

use serde::Serialize;

use crate::{config::TokenConfig, entities::decimal, reducer::ZERO_ADDRESS};

pub const NATIVE_SYMBOL: &str = "ETH";
pub const UNKNOWN_SYMBOL: &str = "TOKEN";
pub const DEFAULT_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    fn native() -> Self {
        Self {
            symbol: NATIVE_SYMBOL.to_owned(),
            decimals: DEFAULT_DECIMALS,
        }
    }

    fn unknown() -> Self {
        Self {
            symbol: UNKNOWN_SYMBOL.to_owned(),
            decimals: DEFAULT_DECIMALS,
        }
    }
}

/// Symbol and decimals per token address.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    by_address: HashMap<String, TokenInfo>,
}

impl TokenRegistry {
    pub fn new(tokens: &[TokenConfig]) -> Self {
        let by_address = tokens
            .iter()
            .map(|t| {
                (
                    t.address.trim().to_ascii_lowercase(),
                    TokenInfo {
                        symbol: t.symbol.clone(),
                        decimals: t.decimals,
                    },
                )
            })
            .collect();
        Self { by_address }
    }

    /// `None` and the zero address are the native asset; unlisted tokens get the 18-decimal default.
    pub fn get(&self, address: Option<&str>) -> TokenInfo {
        let Some(address) = address.map(|a| a.trim().to_ascii_lowercase()) else {
            return TokenInfo::native();
        };
        if address.is_empty() || address == ZERO_ADDRESS {
            return TokenInfo::native();
        }
        self.by_address.get(&address).cloned().unwrap_or_else(TokenInfo::unknown)
    }

    /// Configured token addresses, in no particular order.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.by_address.keys().map(String::as_str)
    }
}

fn pow10(decimals: u8) -> u128 {
    10_u128.checked_pow(u32::from(decimals)).unwrap_or(u128::MAX)
}

/// Scale a raw amount down by `decimals`. The whole and fractional parts are converted
/// separately so small fractions survive large whole parts.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn to_display(raw: u128, decimals: u8) -> f64 {
    let divisor = pow10(decimals);
    let whole = raw / divisor;
    let fraction = raw % divisor;
    whole as f64 + fraction as f64 / divisor as f64
}

/// How many fraction digits an amount of this magnitude deserves.
pub fn fraction_digits(value: f64) -> u8 {
    let value = value.abs();
    if value == 0.0 || value >= 1.0 {
        2
    } else if value >= 0.01 {
        4
    } else if value >= 0.0001 {
        6
    } else {
        8
    }
}

/// `raw` at `decimals`, rounded half up to the magnitude's fraction digits with trailing
/// zeros dropped, followed by the symbol.
pub fn format_amount(raw: u128, decimals: u8, symbol: &str) -> String {
    let digits = fraction_digits(to_display(raw, decimals)).min(decimals);
    let dropped = decimals - digits;
    let step = pow10(dropped);

    let mut rounded = raw / step;
    if dropped > 0 && raw % step >= step / 2 {
        rounded = rounded.saturating_add(1);
    }

    let unit = pow10(digits);
    let whole = rounded / unit;
    let fraction = rounded % unit;

    let mut text = whole.to_string();
    if digits > 0 && fraction > 0 {
        let fraction = format!("{fraction:0width$}", width = usize::from(digits));
        text.push('.');
        text.push_str(fraction.trim_end_matches('0'));
    }
    format!("{text} {symbol}")
}

/// An on-chain amount with everything needed to show it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    #[serde(with = "decimal")]
    pub raw: u128,
    pub amount: f64,
    pub symbol: String,
    pub decimals: u8,
    pub display: String,
}

impl TokenAmount {
    pub fn new(raw: u128, token: &TokenInfo) -> Self {
        Self {
            raw,
            amount: to_display(raw, token.decimals),
            symbol: token.symbol.clone(),
            decimals: token.decimals,
            display: format_amount(raw, token.decimals, &token.symbol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TokenRegistry {
        TokenRegistry::new(&[TokenConfig {
            address: "0x833589FCD6EDB6E08F4C7C23142546C457AEEB86".to_owned(),
            symbol: "USDC".to_owned(),
            decimals: 6,
        }])
    }

    #[test]
    fn lookup_defaults() {
        let tokens = registry();
        assert_eq!(tokens.get(None).symbol, "ETH");
        assert_eq!(tokens.get(Some(ZERO_ADDRESS)).symbol, "ETH");
        assert_eq!(tokens.get(Some("0x833589fcd6edb6e08f4c7c23142546c457aeeb86")).decimals, 6);

        let unknown = tokens.get(Some("0x0000000000000000000000000000000000000abc"));
        assert_eq!(unknown.symbol, "TOKEN");
        assert_eq!(unknown.decimals, 18);
    }

    #[test]
    fn display_keeps_small_fractions() {
        assert_eq!(to_display(1_500_000, 6), 1.5);
        assert_eq!(to_display(0, 18), 0.0);
        assert!((to_display(1, 18) - 1e-18).abs() < f64::EPSILON);
        assert_eq!(to_display(42, 0), 42.0);
    }

    #[test]
    fn digits_follow_magnitude() {
        assert_eq!(fraction_digits(0.0), 2);
        assert_eq!(fraction_digits(12.5), 2);
        assert_eq!(fraction_digits(0.05), 4);
        assert_eq!(fraction_digits(0.0005), 6);
        assert_eq!(fraction_digits(0.000_000_5), 8);
        assert_eq!(fraction_digits(-3.0), 2);
    }

    #[test]
    fn formatting() {
        assert_eq!(format_amount(0, 18, "ETH"), "0 ETH");
        assert_eq!(format_amount(1_234_567, 6, "USDC"), "1.23 USDC");
        assert_eq!(format_amount(1_235_000, 6, "USDC"), "1.24 USDC");
        assert_eq!(format_amount(2_000_000_000_000_000_000, 18, "ETH"), "2 ETH");
        assert_eq!(format_amount(50_000_000_000_000_000, 18, "ETH"), "0.05 ETH");
        assert_eq!(format_amount(123_456_789_000_000, 18, "ETH"), "0.000123 ETH");
        assert_eq!(format_amount(7, 0, "PTS"), "7 PTS");
    }
}

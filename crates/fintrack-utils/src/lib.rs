//! Formatting helpers for amounts, months and table cells

use chrono::{DateTime, Local, NaiveDate, Utc};
use fintrack_config::CurrencyConfig;
use rust_decimal::{Decimal, RoundingStrategy};

/// Insert a separator every three digits of an unsigned integer string
pub fn group_digits(digits: &str, separator: &str) -> String {
    let mut result = String::with_capacity(digits.len() + digits.len() / 3 * separator.len());
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push_str(separator);
        }
        result.push(c);
    }
    result
}

/// Format a number with thousands separators
pub fn format_number<T: ToString>(n: T) -> String {
    let s = n.to_string();
    match s.strip_prefix('-') {
        Some(rest) => format!("-{}", group_digits(rest, ",")),
        None => group_digits(&s, ","),
    }
}

/// Render an amount as currency, e.g. `-$1,234.50`
pub fn format_currency(amount: Decimal, currency: &CurrencyConfig) -> String {
    let places = currency.decimal_places;
    let rounded = amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.*}", places as usize, rounded.abs());
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut out = String::new();
    if rounded.is_sign_negative() && !rounded.is_zero() {
        out.push('-');
    }
    out.push_str(&currency.symbol);
    out.push_str(&group_digits(whole, &currency.thousands_separator));
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// `2024-01` -> `January 2024`; other input is returned unchanged
pub fn format_month_label(month: &str) -> String {
    NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|_| month.to_string())
}

/// Local calendar date of a server timestamp
pub fn format_date(instant: &DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

/// Cut a cell to `max` characters, marking the cut with `...`
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(-1000), "-1,000");
    }

    #[test]
    fn test_format_currency() {
        let usd = CurrencyConfig::default();
        assert_eq!(format_currency(dec("1234.5"), &usd), "$1,234.50");
        assert_eq!(format_currency(dec("-40"), &usd), "-$40.00");
        assert_eq!(format_currency(dec("0.005"), &usd), "$0.01");
        assert_eq!(format_currency(dec("-0.001"), &usd), "$0.00");
        assert_eq!(format_currency(dec("1000000"), &usd), "$1,000,000.00");
    }

    #[test]
    fn test_format_currency_custom() {
        let eur = CurrencyConfig {
            symbol: "€".to_string(),
            decimal_places: 0,
            thousands_separator: ".".to_string(),
        };
        assert_eq!(format_currency(dec("12345.6"), &eur), "€12.346");
    }

    #[test]
    fn test_format_month_label() {
        assert_eq!(format_month_label("2024-01"), "January 2024");
        assert_eq!(format_month_label("2023-12"), "December 2023");
        assert_eq!(format_month_label("garbage"), "garbage");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long description", 10), "a long ...");
    }
}

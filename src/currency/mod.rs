//! Locale-aware number, money and date rendering used by the input adapters
//! and the CLI summaries.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn symbol(&self) -> String {
        symbol_for(self.as_str())
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("USD")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DateFormatStyle {
    Short,
    Medium,
    Long,
}

/// Separators and date style for a language tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocaleConfig {
    pub language_tag: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
    pub date_format: DateFormatStyle,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language_tag: "en-US".into(),
            decimal_separator: '.',
            grouping_separator: ',',
            date_format: DateFormatStyle::Medium,
        }
    }
}

impl LocaleConfig {
    /// Builds the separators for a handful of known tags; unknown tags fall
    /// back to the `en-US` conventions while keeping the requested tag.
    pub fn from_tag(tag: &str) -> Self {
        let normalized = tag.trim();
        let (decimal_separator, grouping_separator) = match normalized
            .split(&['-', '_'][..])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "de" | "es" | "it" | "nl" | "pt" | "id" => (',', '.'),
            "fr" | "sv" | "fi" | "nb" | "pl" | "cs" => (',', ' '),
            _ => ('.', ','),
        };
        Self {
            language_tag: if normalized.is_empty() {
                "en-US".into()
            } else {
                normalized.to_string()
            },
            decimal_separator,
            grouping_separator,
            date_format: DateFormatStyle::Medium,
        }
    }
}

pub fn symbol_for(code: &str) -> String {
    match code {
        "USD" => "$".into(),
        "EUR" => "€".into(),
        "GBP" => "£".into(),
        "JPY" => "¥".into(),
        "AUD" => "A$".into(),
        "BRL" => "R$".into(),
        "INR" => "₹".into(),
        _ => code.into(),
    }
}

pub fn minor_units_for(code: &str) -> u8 {
    match code {
        "JPY" | "KRW" => 0,
        "KWD" | "BHD" => 3,
        _ => 2,
    }
}

/// Formats `value` with `precision` decimals using the locale's separators,
/// e.g. `1234.5` → `1,234.50` for `en-US`.
pub fn format_number(locale: &LocaleConfig, value: f64, precision: u8) -> String {
    let raw = format!("{:.*}", precision as usize, value.abs());
    let (int_part, fraction) = match raw.split_once('.') {
        Some((int_part, fraction)) => (int_part, Some(fraction)),
        None => (raw.as_str(), None),
    };

    let mut body = group_digits(int_part, locale.grouping_separator);
    if let Some(fraction) = fraction {
        body.push(locale.decimal_separator);
        body.push_str(fraction);
    }
    // `-0` after rounding renders without a sign.
    if value < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        body.insert(0, '-');
    }
    body
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (count, ch) in digits.chars().rev().enumerate() {
        if count != 0 && count % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(ch);
    }
    grouped.chars().rev().collect()
}

/// Renders an amount with symbol and the currency's minor units.
pub fn format_money(amount: f64, code: &CurrencyCode, locale: &LocaleConfig) -> String {
    let body = format_number(locale, amount.abs(), minor_units_for(code.as_str()));
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{}{body}", code.symbol())
}

pub fn format_date(locale: &LocaleConfig, date: NaiveDate) -> String {
    match locale.date_format {
        DateFormatStyle::Short => date.format("%Y-%m-%d").to_string(),
        DateFormatStyle::Medium => format!(
            "{:02} {} {}",
            date.day(),
            month_label(date.month()),
            date.year()
        ),
        DateFormatStyle::Long => format!(
            "{}, {:02} {} {}",
            date.weekday(),
            date.day(),
            month_label(date.month()),
            date.year()
        ),
    }
}

fn month_label(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "",
    }
}

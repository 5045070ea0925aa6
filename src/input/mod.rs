//! Field input adapters that turn free text into bounded wizard values.

pub mod date;
pub mod numeric;

use serde_json::Value;

use crate::currency::{CurrencyCode, LocaleConfig};
use crate::errors::Result;
use crate::wizard::step::FieldKind;

pub use date::{parse_date, DateInput};
pub use numeric::{NumericBounds, NumericFormat, NumericInput};

/// Non-text keys the adapters react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    ArrowUp,
    ArrowDown,
    Enter,
    /// Focus left the field.
    Blur,
}

/// Adapter chosen for a field kind. Text, choice and boolean fields are
/// forwarded without an adapter.
#[derive(Debug, Clone)]
pub enum FieldAdapter {
    Numeric { input: NumericInput, integer: bool },
    Date(DateInput),
}

impl FieldAdapter {
    pub fn for_kind(
        kind: &FieldKind,
        currency: &CurrencyCode,
        locale: &LocaleConfig,
    ) -> Result<Option<Self>> {
        let adapter = match kind {
            FieldKind::Currency { min, max, step } => Some(FieldAdapter::Numeric {
                input: NumericInput::currency(
                    currency.clone(),
                    NumericBounds::new(*min, *max, *step)?,
                    locale.clone(),
                ),
                integer: false,
            }),
            FieldKind::Percent { min, max, step } => Some(FieldAdapter::Numeric {
                input: NumericInput::percent(NumericBounds::new(*min, *max, *step)?, locale.clone()),
                integer: false,
            }),
            FieldKind::Integer { min, max } => Some(FieldAdapter::Numeric {
                input: NumericInput::new(
                    NumericFormat::Plain,
                    NumericBounds::new(*min as f64, *max as f64, 1.0)?,
                    locale.clone(),
                ),
                integer: true,
            }),
            FieldKind::Date => Some(FieldAdapter::Date(DateInput::new(locale.clone()))),
            FieldKind::Text | FieldKind::Choice(_) | FieldKind::Boolean => None,
        };
        Ok(adapter)
    }

    /// Feeds a whole answer through the adapter as typed text followed by
    /// Enter. Returns the committed value and its display text.
    pub fn submit_text(&mut self, raw: &str) -> (Option<Value>, String) {
        match self {
            FieldAdapter::Numeric { input, integer } => {
                input.focus();
                input.input(raw);
                let value = input.handle_key(InputKey::Enter);
                let json = if *integer {
                    Value::from(value.round() as i64)
                } else {
                    number_value(value)
                };
                (Some(json), input.text().to_string())
            }
            FieldAdapter::Date(input) => {
                input.input(raw);
                let value = input.handle_key(InputKey::Enter);
                (
                    value.map(|date| Value::String(date.format("%Y-%m-%d").to_string())),
                    input.text().to_string(),
                )
            }
        }
    }
}

/// Whole numbers are stored as JSON integers so drafts stay readable.
pub fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

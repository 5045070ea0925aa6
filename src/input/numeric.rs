use crate::currency::{format_number, CurrencyCode, LocaleConfig};
use crate::errors::{Result, WishError};
use crate::input::InputKey;

const MAX_PRECISION: u8 = 6;

/// How the committed value is rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericFormat {
    Currency(CurrencyCode),
    Percent,
    Plain,
}

/// Inclusive range and snapping increment for a numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericBounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl NumericBounds {
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && step.is_finite()) {
            return Err(WishError::InvalidInput("numeric bounds must be finite".into()));
        }
        if min > max {
            return Err(WishError::InvalidInput(format!(
                "minimum {} is above maximum {}",
                min, max
            )));
        }
        if step <= 0.0 {
            return Err(WishError::InvalidInput("step must be positive".into()));
        }
        Ok(Self { min, max, step })
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Nearest multiple of `step` inside the bounds. Falls back to the
    /// clamped value when no multiple fits.
    pub fn snap(&self, value: f64) -> f64 {
        let precision = self.precision();
        let mut snapped = round_to((self.clamp(value) / self.step).round() * self.step, precision);
        if snapped > self.max {
            snapped = round_to((self.max / self.step).floor() * self.step, precision);
        }
        if snapped < self.min {
            snapped = round_to((self.min / self.step).ceil() * self.step, precision);
        }
        if snapped < self.min || snapped > self.max {
            return self.clamp(value);
        }
        snapped
    }

    /// Decimals shown for values of this field, taken from `step`.
    pub fn precision(&self) -> u8 {
        let rendered = format!("{}", self.step);
        rendered
            .split_once('.')
            .map(|(_, fraction)| fraction.len().min(MAX_PRECISION as usize) as u8)
            .unwrap_or(0)
    }
}

fn round_to(value: f64, precision: u8) -> f64 {
    let factor = 10f64.powi(precision as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Keystroke adapter for currency, percent and plain numeric fields.
///
/// The text the user edits and the value handed to the wizard are tracked
/// separately. Every keystroke forwards a clamped value; committing (blur or
/// Enter) snaps to the step grid and reformats the text for display.
#[derive(Debug, Clone)]
pub struct NumericInput {
    format: NumericFormat,
    bounds: NumericBounds,
    locale: LocaleConfig,
    text: String,
    value: f64,
    focused: bool,
}

impl NumericInput {
    pub fn new(format: NumericFormat, bounds: NumericBounds, locale: LocaleConfig) -> Self {
        let value = bounds.snap(0.0);
        let mut input = Self {
            format,
            bounds,
            locale,
            text: String::new(),
            value,
            focused: false,
        };
        input.text = input.display_text();
        input
    }

    pub fn currency(code: CurrencyCode, bounds: NumericBounds, locale: LocaleConfig) -> Self {
        Self::new(NumericFormat::Currency(code), bounds, locale)
    }

    pub fn percent(bounds: NumericBounds, locale: LocaleConfig) -> Self {
        Self::new(NumericFormat::Percent, bounds, locale)
    }

    /// Seeds the adapter with an existing value, e.g. from a draft.
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = self.bounds.snap(value);
        self.text = self.display_text();
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bounds(&self) -> NumericBounds {
        self.bounds
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Currency symbol rendered in front of the field.
    pub fn prefix(&self) -> Option<String> {
        match &self.format {
            NumericFormat::Currency(code) => Some(code.symbol()),
            _ => None,
        }
    }

    /// Switches the text to its raw editable form.
    pub fn focus(&mut self) {
        self.focused = true;
        self.text = self.editable_text();
    }

    /// Handles a full replacement of the text box contents and returns the
    /// value to forward.
    pub fn input(&mut self, raw: &str) -> f64 {
        self.focused = true;
        self.text = self.sanitize(raw);
        self.value = self.bounds.clamp(self.parse_text().unwrap_or(0.0));
        self.value
    }

    /// Snaps to the step grid and renders the display text.
    pub fn commit(&mut self) -> f64 {
        self.focused = false;
        self.value = self.bounds.snap(self.value);
        self.text = self.display_text();
        self.value
    }

    pub fn handle_key(&mut self, key: InputKey) -> f64 {
        match key {
            InputKey::ArrowUp => self.nudge(self.bounds.step),
            InputKey::ArrowDown => self.nudge(-self.bounds.step),
            InputKey::Enter | InputKey::Blur => self.commit(),
        }
    }

    fn nudge(&mut self, delta: f64) -> f64 {
        self.value = round_to(
            self.bounds.clamp(self.value + delta),
            self.bounds.precision(),
        );
        self.text = if self.focused {
            self.editable_text()
        } else {
            self.display_text()
        };
        self.value
    }

    /// Keeps digits, the first decimal separator and a leading minus when
    /// negative values are allowed.
    fn sanitize(&self, raw: &str) -> String {
        let decimal = self.locale.decimal_separator;
        let allow_negative = self.bounds.min < 0.0;
        let mut cleaned = String::with_capacity(raw.len());
        let mut seen_decimal = false;
        for ch in raw.trim().chars() {
            if ch.is_ascii_digit() {
                cleaned.push(ch);
            } else if ch == decimal && !seen_decimal {
                seen_decimal = true;
                cleaned.push(ch);
            } else if ch == '-' && allow_negative && cleaned.is_empty() {
                cleaned.push(ch);
            }
        }
        cleaned
    }

    fn parse_text(&self) -> Option<f64> {
        let normalized = self.text.replace(self.locale.decimal_separator, ".");
        normalized
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
    }

    fn editable_text(&self) -> String {
        let precision = self.bounds.precision() as usize;
        format!("{:.*}", precision, self.value).replace('.', &self.locale.decimal_separator.to_string())
    }

    fn display_text(&self) -> String {
        let body = format_number(&self.locale, self.value, self.bounds.precision());
        match self.format {
            NumericFormat::Percent => format!("{body}%"),
            NumericFormat::Currency(_) | NumericFormat::Plain => body,
        }
    }
}

use chrono::{Duration, NaiveDate};

use crate::currency::{format_date, LocaleConfig};
use crate::input::InputKey;
use crate::wizard::schema::DATE_FORMAT;

const ACCEPTED_FORMATS: [&str; 2] = [DATE_FORMAT, "%Y/%m/%d"];

/// Text adapter for date fields. Values are forwarded as ISO dates and kept
/// inside the optional `[min, max]` window.
#[derive(Debug, Clone)]
pub struct DateInput {
    min: Option<NaiveDate>,
    max: Option<NaiveDate>,
    locale: LocaleConfig,
    text: String,
    value: Option<NaiveDate>,
}

impl DateInput {
    pub fn new(locale: LocaleConfig) -> Self {
        Self {
            min: None,
            max: None,
            locale,
            text: String::new(),
            value: None,
        }
    }

    pub fn not_before(mut self, date: NaiveDate) -> Self {
        self.min = Some(date);
        self
    }

    pub fn not_after(mut self, date: NaiveDate) -> Self {
        self.max = Some(date);
        self
    }

    pub fn with_value(mut self, date: NaiveDate) -> Self {
        self.value = Some(self.clamp(date));
        self.text = self.iso_text();
        self
    }

    pub fn value(&self) -> Option<NaiveDate> {
        self.value
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Locale flavoured label for summaries, e.g. `05 Mar 2025`.
    pub fn label(&self) -> Option<String> {
        self.value.map(|date| format_date(&self.locale, date))
    }

    /// Replaces the text. A parseable date is clamped and forwarded; partial
    /// text keeps the previous value.
    pub fn input(&mut self, raw: &str) -> Option<NaiveDate> {
        self.text = raw
            .chars()
            .filter(|ch| ch.is_ascii_digit() || *ch == '-' || *ch == '/')
            .collect();
        if let Some(date) = parse_date(&self.text) {
            self.value = Some(self.clamp(date));
        }
        self.value
    }

    pub fn commit(&mut self) -> Option<NaiveDate> {
        self.text = self.iso_text();
        self.value
    }

    pub fn handle_key(&mut self, key: InputKey) -> Option<NaiveDate> {
        match key {
            InputKey::ArrowUp => self.shift(1),
            InputKey::ArrowDown => self.shift(-1),
            InputKey::Enter | InputKey::Blur => self.commit(),
        }
    }

    fn shift(&mut self, days: i64) -> Option<NaiveDate> {
        let current = self.value.or(self.min).or(self.max)?;
        let moved = current
            .checked_add_signed(Duration::days(days))
            .unwrap_or(current);
        self.value = Some(self.clamp(moved));
        self.text = self.iso_text();
        self.value
    }

    fn clamp(&self, date: NaiveDate) -> NaiveDate {
        let lower = self.min.map_or(date, |min| date.max(min));
        self.max.map_or(lower, |max| lower.min(max))
    }

    fn iso_text(&self) -> String {
        self.value
            .map(|date| date.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    ACCEPTED_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

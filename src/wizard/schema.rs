//! Declarative validation contract for wizard steps.
//!
//! An [`ObjectSchema`] describes a set of dotted field paths and the rule each
//! must satisfy. [`ObjectSchema::safe_parse`] never fails loudly: it returns
//! either the parsed (trimmed / canonicalised) values or a path-keyed list of
//! messages. [`ObjectSchema::pick`] extracts the sub-schema for a subset of
//! keys so one large schema can gate each step separately.
//! [`ObjectSchema::refine`] adds cross-field checks that run once every field
//! involved is valid on its own.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::wizard::values::FormValues;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Field-path keyed validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(path.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields with at least one message.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, path: &str) -> &[String] {
        self.fields.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn first(&self, path: &str) -> Option<&str> {
        self.get(path).first().map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(path, messages)| (path.as_str(), messages.as_slice()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (path, messages) in &self.fields {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{path}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

type RuleCallback = dyn Fn(&Value) -> Result<Value, String> + Send + Sync;

/// Built-in value rules.
#[derive(Clone)]
pub enum Rule {
    Any,
    Text {
        min_len: Option<usize>,
        max_len: Option<usize>,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
        integer: bool,
    },
    Date {
        min: Option<NaiveDate>,
        max: Option<NaiveDate>,
    },
    Choice(Vec<String>),
    Boolean,
    Custom(Arc<RuleCallback>),
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Any => write!(f, "Any"),
            Rule::Text { min_len, max_len } => f
                .debug_struct("Text")
                .field("min_len", min_len)
                .field("max_len", max_len)
                .finish(),
            Rule::Number { min, max, integer } => f
                .debug_struct("Number")
                .field("min", min)
                .field("max", max)
                .field("integer", integer)
                .finish(),
            Rule::Date { min, max } => f
                .debug_struct("Date")
                .field("min", min)
                .field("max", max)
                .finish(),
            Rule::Choice(options) => f.debug_tuple("Choice").field(options).finish(),
            Rule::Boolean => write!(f, "Boolean"),
            Rule::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl Rule {
    fn check(&self, value: &Value) -> Result<Value, String> {
        match self {
            Rule::Any => Ok(value.clone()),
            Rule::Text { min_len, max_len } => {
                let text = value.as_str().ok_or("Expected text")?.trim();
                let len = text.chars().count();
                if let Some(min) = min_len {
                    if len < *min {
                        return Err(if *min == 1 {
                            "Required".to_string()
                        } else {
                            format!("Must be at least {min} characters")
                        });
                    }
                }
                if let Some(max) = max_len {
                    if len > *max {
                        return Err(format!("Must be at most {max} characters"));
                    }
                }
                Ok(Value::String(text.to_string()))
            }
            Rule::Number { min, max, integer } => {
                let number = value.as_f64().ok_or("Expected a number")?;
                if !number.is_finite() {
                    return Err("Expected a number".into());
                }
                if *integer && number.fract() != 0.0 {
                    return Err("Expected a whole number".into());
                }
                if let Some(min) = min {
                    if number < *min {
                        return Err(format!("Must be {} or more", display_bound(*min)));
                    }
                }
                if let Some(max) = max {
                    if number > *max {
                        return Err(format!("Must be {} or less", display_bound(*max)));
                    }
                }
                Ok(value.clone())
            }
            Rule::Date { min, max } => {
                let raw = value.as_str().ok_or("Use YYYY-MM-DD format")?;
                let date = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                    .map_err(|_| "Use YYYY-MM-DD format".to_string())?;
                if let Some(min) = min {
                    if date < *min {
                        return Err(format!("Must be on or after {}", min.format(DATE_FORMAT)));
                    }
                }
                if let Some(max) = max {
                    if date > *max {
                        return Err(format!("Must be on or before {}", max.format(DATE_FORMAT)));
                    }
                }
                Ok(Value::String(date.format(DATE_FORMAT).to_string()))
            }
            Rule::Choice(options) => {
                let raw = value.as_str().unwrap_or_default().trim();
                options
                    .iter()
                    .find(|candidate| candidate.eq_ignore_ascii_case(raw))
                    .map(|candidate| Value::String(candidate.clone()))
                    .ok_or_else(|| format!("Must be one of: {}", options.join(", ")))
            }
            Rule::Boolean => value
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| "Expected true or false".to_string()),
            Rule::Custom(func) => func(value),
        }
    }
}

fn display_bound(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

/// Rule plus presence requirements for one field path.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    rule: Rule,
    optional: bool,
    message: Option<String>,
}

impl FieldSchema {
    pub fn new(rule: Rule) -> Self {
        Self {
            rule,
            optional: false,
            message: None,
        }
    }

    pub fn text() -> Self {
        Self::new(Rule::Text {
            min_len: None,
            max_len: None,
        })
    }

    pub fn number() -> Self {
        Self::new(Rule::Number {
            min: None,
            max: None,
            integer: false,
        })
    }

    pub fn integer() -> Self {
        Self::new(Rule::Number {
            min: None,
            max: None,
            integer: true,
        })
    }

    pub fn date() -> Self {
        Self::new(Rule::Date {
            min: None,
            max: None,
        })
    }

    pub fn choice<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Rule::Choice(options.into_iter().map(Into::into).collect()))
    }

    pub fn boolean() -> Self {
        Self::new(Rule::Boolean)
    }

    pub fn custom<F>(func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self::new(Rule::Custom(Arc::new(func)))
    }

    /// Lower bound for number rules.
    pub fn min(mut self, bound: f64) -> Self {
        if let Rule::Number { min, .. } = &mut self.rule {
            *min = Some(bound);
        }
        self
    }

    /// Upper bound for number rules.
    pub fn max(mut self, bound: f64) -> Self {
        if let Rule::Number { max, .. } = &mut self.rule {
            *max = Some(bound);
        }
        self
    }

    pub fn min_len(mut self, len: usize) -> Self {
        if let Rule::Text { min_len, .. } = &mut self.rule {
            *min_len = Some(len);
        }
        self
    }

    pub fn max_len(mut self, len: usize) -> Self {
        if let Rule::Text { max_len, .. } = &mut self.rule {
            *max_len = Some(len);
        }
        self
    }

    pub fn not_before(mut self, date: NaiveDate) -> Self {
        if let Rule::Date { min, .. } = &mut self.rule {
            *min = Some(date);
        }
        self
    }

    pub fn not_after(mut self, date: NaiveDate) -> Self {
        if let Rule::Date { max, .. } = &mut self.rule {
            *max = Some(date);
        }
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Replaces every failure message of this field.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Validates one value. `Ok(None)` means an absent optional field.
    pub fn validate(&self, value: Option<&Value>) -> Result<Option<Value>, String> {
        let outcome = match value {
            None | Some(Value::Null) if self.optional => return Ok(None),
            None | Some(Value::Null) => Err("Required".to_string()),
            Some(value) => self.rule.check(value).map(Some),
        };
        outcome.map_err(|err| self.message.clone().unwrap_or(err))
    }
}

type RefineCallback = dyn Fn(&FormValues) -> Result<(), String> + Send + Sync;

/// Cross-field check over `keys`, reported under `target`.
#[derive(Clone)]
struct Refinement {
    keys: Vec<String>,
    target: String,
    check: Arc<RefineCallback>,
}

impl fmt::Debug for Refinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refinement")
            .field("keys", &self.keys)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of field schemas keyed by dotted path.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: Vec<(String, FieldSchema)>,
    refinements: Vec<Refinement>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, path: impl Into<String>, schema: FieldSchema) -> Self {
        let path = path.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == path) {
            Some((_, slot)) => *slot = schema,
            None => self.fields.push((path, schema)),
        }
        self
    }

    /// Adds a check over several fields. It sees the parsed values of `keys`
    /// and its message is filed under `target`. It only runs when each of
    /// `keys` passed its own rule.
    pub fn refine<F>(mut self, keys: &[&str], target: impl Into<String>, check: F) -> Self
    where
        F: Fn(&FormValues) -> Result<(), String> + Send + Sync + 'static,
    {
        self.refinements.push(Refinement {
            keys: keys.iter().map(|key| key.to_string()).collect(),
            target: target.into(),
            check: Arc::new(check),
        });
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(path, _)| path.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&FieldSchema> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == path)
            .map(|(_, schema)| schema)
    }

    /// Sub-schema restricted to `keys`, keeping declaration order. Keys the
    /// schema does not know are ignored. Refinements survive when all of
    /// their keys are picked.
    pub fn pick(&self, keys: &[&str]) -> ObjectSchema {
        for key in keys {
            if self.get(key).is_none() {
                tracing::warn!(key = *key, "pick ignored a key missing from the schema");
            }
        }
        ObjectSchema {
            fields: self
                .fields
                .iter()
                .filter(|(path, _)| keys.contains(&path.as_str()))
                .cloned()
                .collect(),
            refinements: self
                .refinements
                .iter()
                .filter(|refinement| {
                    refinement
                        .keys
                        .iter()
                        .all(|key| keys.contains(&key.as_str()))
                })
                .cloned()
                .collect(),
        }
    }

    /// Validates every declared path of `values`. Undeclared keys are
    /// ignored and not copied into the parsed output.
    pub fn safe_parse(&self, values: &FormValues) -> Result<FormValues, ValidationErrors> {
        let mut parsed = FormValues::new();
        let mut errors = ValidationErrors::new();
        for (path, schema) in &self.fields {
            match schema.validate(values.get(path)) {
                Ok(Some(value)) => {
                    if let Err(err) = parsed.set(path, value) {
                        errors.add(path.clone(), err.to_string());
                    }
                }
                Ok(None) => {}
                Err(message) => errors.add(path.clone(), message),
            }
        }
        if errors.is_empty() {
            for refinement in &self.refinements {
                if let Err(message) = (refinement.check)(&parsed) {
                    errors.add(refinement.target.clone(), message);
                }
            }
        }
        if errors.is_empty() {
            Ok(parsed)
        } else {
            Err(errors)
        }
    }

    /// Validates a single declared field, returning its first message.
    /// Refinements filed under `path` run too once their other keys are valid.
    pub fn check_field(&self, path: &str, values: &FormValues) -> Option<String> {
        let schema = self.get(path)?;
        if let Err(message) = schema.validate(values.get(path)) {
            return Some(message);
        }
        self.refinements
            .iter()
            .filter(|refinement| refinement.target == path)
            .find_map(|refinement| self.run_refinement(refinement, values))
    }

    fn run_refinement(&self, refinement: &Refinement, values: &FormValues) -> Option<String> {
        let mut parsed = FormValues::new();
        for key in &refinement.keys {
            let value = self.get(key)?.validate(values.get(key)).ok()??;
            parsed.set(key, value).ok()?;
        }
        (refinement.check)(&parsed).err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(json: Value) -> FormValues {
        FormValues::from_json(json).unwrap()
    }

    #[test]
    fn number_bounds_produce_readable_messages() {
        let schema = ObjectSchema::new().field("amount", FieldSchema::number().min(0.0));
        let errors = schema.safe_parse(&values(json!({"amount": -5}))).unwrap_err();
        assert_eq!(errors.first("amount"), Some("Must be 0 or more"));

        let schema = ObjectSchema::new().field("rate", FieldSchema::number().max(99.5));
        let errors = schema.safe_parse(&values(json!({"rate": 100}))).unwrap_err();
        assert_eq!(errors.first("rate"), Some("Must be 99.5 or less"));
    }

    #[test]
    fn missing_required_field_is_reported() {
        let schema = ObjectSchema::new()
            .field("name", FieldSchema::text().min_len(1))
            .field("notes", FieldSchema::text().optional());
        let errors = schema.safe_parse(&FormValues::new()).unwrap_err();
        assert_eq!(errors.first("name"), Some("Required"));
        assert!(errors.get("notes").is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn text_is_trimmed_and_length_checked() {
        let schema = ObjectSchema::new().field("wish", FieldSchema::text().min_len(3).max_len(5));
        let parsed = schema.safe_parse(&values(json!({"wish": "  run  "}))).unwrap();
        assert_eq!(parsed.get_str("wish"), Some("run"));

        let errors = schema.safe_parse(&values(json!({"wish": "ab"}))).unwrap_err();
        assert_eq!(errors.first("wish"), Some("Must be at least 3 characters"));
        let errors = schema.safe_parse(&values(json!({"wish": "abcdef"}))).unwrap_err();
        assert_eq!(errors.first("wish"), Some("Must be at most 5 characters"));
    }

    #[test]
    fn choice_is_case_insensitive_and_canonicalised() {
        let schema = ObjectSchema::new().field("priority", FieldSchema::choice(["low", "high"]));
        let parsed = schema.safe_parse(&values(json!({"priority": "HIGH"}))).unwrap();
        assert_eq!(parsed.get_str("priority"), Some("high"));
        let errors = schema.safe_parse(&values(json!({"priority": "urgent"}))).unwrap_err();
        assert_eq!(errors.first("priority"), Some("Must be one of: low, high"));
    }

    #[test]
    fn date_bounds_and_format() {
        let min = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let schema = ObjectSchema::new().field("start", FieldSchema::date().not_before(min));
        assert!(schema.safe_parse(&values(json!({"start": "2025-02-01"}))).is_ok());
        let errors = schema.safe_parse(&values(json!({"start": "2024-12-31"}))).unwrap_err();
        assert_eq!(errors.first("start"), Some("Must be on or after 2025-01-01"));
        let errors = schema.safe_parse(&values(json!({"start": "01/02/2025"}))).unwrap_err();
        assert_eq!(errors.first("start"), Some("Use YYYY-MM-DD format"));
    }

    #[test]
    fn integer_rule_rejects_fractions() {
        let schema = ObjectSchema::new().field("months", FieldSchema::integer().min(0.0));
        let errors = schema.safe_parse(&values(json!({"months": 2.5}))).unwrap_err();
        assert_eq!(errors.first("months"), Some("Expected a whole number"));
    }

    #[test]
    fn custom_message_overrides_defaults() {
        let schema = ObjectSchema::new().field(
            "income",
            FieldSchema::number().min(1.0).message("Enter your monthly income"),
        );
        let errors = schema.safe_parse(&FormValues::new()).unwrap_err();
        assert_eq!(errors.first("income"), Some("Enter your monthly income"));
    }

    #[test]
    fn custom_rule_runs_callback() {
        let schema = ObjectSchema::new().field(
            "code",
            FieldSchema::custom(|value| match value.as_str() {
                Some(code) if code.len() == 3 => Ok(Value::String(code.to_uppercase())),
                _ => Err("Use a three-letter code".into()),
            }),
        );
        let parsed = schema.safe_parse(&values(json!({"code": "usd"}))).unwrap();
        assert_eq!(parsed.get_str("code"), Some("USD"));
    }

    #[test]
    fn pick_extracts_subset_in_declaration_order() {
        let schema = ObjectSchema::new()
            .field("a", FieldSchema::number())
            .field("b.c", FieldSchema::text())
            .field("d", FieldSchema::boolean());
        let picked = schema.pick(&["d", "a", "unknown"]);
        assert_eq!(picked.keys().collect::<Vec<_>>(), vec!["a", "d"]);
    }

    #[test]
    fn parse_ignores_undeclared_keys() {
        let schema = ObjectSchema::new().field("a", FieldSchema::number());
        let parsed = schema
            .safe_parse(&values(json!({"a": 1, "later": "step two"})))
            .unwrap();
        assert_eq!(parsed.to_json(), json!({"a": 1}));
    }

    #[test]
    fn errors_render_as_path_message_pairs() {
        let mut errors = ValidationErrors::new();
        errors.add("a", "Required");
        errors.add("b", "Expected a number");
        assert_eq!(errors.to_string(), "a: Required; b: Expected a number");
    }

    fn ordered_range() -> ObjectSchema {
        ObjectSchema::new()
            .field("from", FieldSchema::integer())
            .field("to", FieldSchema::integer())
            .field("label", FieldSchema::text().optional())
            .refine(&["from", "to"], "to", |values| {
                if values.get_f64("to") > values.get_f64("from") {
                    Ok(())
                } else {
                    Err("Must be greater than from".into())
                }
            })
    }

    #[test]
    fn refinement_reports_under_its_target() {
        let schema = ordered_range();
        let errors = schema
            .safe_parse(&values(json!({"from": 5, "to": 2})))
            .unwrap_err();
        assert_eq!(errors.first("to"), Some("Must be greater than from"));
        assert_eq!(errors.len(), 1);
        assert!(schema.safe_parse(&values(json!({"from": 1, "to": 2}))).is_ok());
    }

    #[test]
    fn refinement_waits_for_field_rules() {
        let errors = ordered_range()
            .safe_parse(&values(json!({"from": 5})))
            .unwrap_err();
        assert_eq!(errors.first("to"), Some("Required"));
        assert_eq!(errors.get("to").len(), 1);
    }

    #[test]
    fn pick_keeps_refinements_only_with_all_keys() {
        let schema = ordered_range();
        let bad = values(json!({"from": 5, "to": 2}));
        assert!(schema.pick(&["from", "to"]).safe_parse(&bad).is_err());
        assert!(schema.pick(&["to"]).safe_parse(&bad).is_ok());
    }

    #[test]
    fn check_field_runs_refinements_for_the_target() {
        let schema = ordered_range();
        let bad = values(json!({"from": 5, "to": 2}));
        assert_eq!(
            schema.check_field("to", &bad).as_deref(),
            Some("Must be greater than from")
        );
        assert_eq!(schema.check_field("from", &bad), None);
        assert_eq!(schema.check_field("to", &values(json!({"to": 2}))), None);
    }
}

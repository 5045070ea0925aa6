use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Result, WishError};

const PATH_SEPARATOR: char = '.';

/// Aggregate form state shared by every step of a wizard.
///
/// Fields are addressed by dotted key paths (`housing.rent`). Keys are only
/// ever added or overwritten; nothing is removed when validation fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(Map<String, Value>);

impl FormValues {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builds values from a JSON object; any other JSON shape is rejected.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(WishError::InvalidInput(format!(
                "form values must be a JSON object, got `{}`",
                other
            ))),
        }
    }

    /// Builder-style helper used when seeding defaults.
    pub fn with(mut self, path: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(path, value)?;
        Ok(self)
    }

    /// Merges a single value at `path`, creating intermediate objects. A
    /// non-object intermediate is replaced by an object.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let segments = split_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| WishError::InvalidInput("empty field path".into()))?;

        let mut cursor = &mut self.0;
        for segment in parents {
            let slot = cursor
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            cursor = slot.as_object_mut().ok_or_else(|| {
                WishError::InvalidInput(format!("field path `{}` is not an object", path))
            })?;
        }
        cursor.insert(last.to_string(), value.into());
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        let segments = split_path(path).ok()?;
        let (first, rest) = segments.split_first()?;
        let mut current = self.0.get(*first)?;
        for segment in rest {
            current = current.as_object()?.get(*segment)?;
        }
        Some(current)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(Value::as_f64)
    }

    /// Copies the listed paths (when present) into a fresh object, preserving
    /// their nesting. Used to validate one step's slice of the aggregate.
    pub fn project<'a, I>(&self, paths: I) -> FormValues
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut slice = FormValues::new();
        for path in paths {
            if let Some(value) = self.get(path) {
                // Paths coming from `get` are already known to be valid.
                let _ = slice.set(path, value.clone());
            }
        }
        slice
    }

    /// Overlays every leaf of `other` onto `self`.
    pub fn merge(&mut self, other: &FormValues) {
        merge_objects(&mut self.0, &other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for FormValues {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn merge_objects(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_objects(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

fn split_path(path: &str) -> Result<Vec<&str>> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(WishError::InvalidInput("empty field path".into()));
    }
    let segments: Vec<&str> = trimmed.split(PATH_SEPARATOR).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(WishError::InvalidInput(format!(
            "field path `{}` has an empty segment",
            path
        )));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_creates_nested_objects() {
        let mut values = FormValues::new();
        values.set("housing.rent", 1200).unwrap();
        values.set("housing.utilities", 150).unwrap();
        assert_eq!(
            values.to_json(),
            json!({"housing": {"rent": 1200, "utilities": 150}})
        );
        assert_eq!(values.get_f64("housing.rent"), Some(1200.0));
    }

    #[test]
    fn set_replaces_scalar_intermediate() {
        let mut values = FormValues::new();
        values.set("goal", "run").unwrap();
        values.set("goal.title", "Run a marathon").unwrap();
        assert_eq!(values.get_str("goal.title"), Some("Run a marathon"));
    }

    #[test]
    fn rejects_malformed_paths() {
        let mut values = FormValues::new();
        assert!(values.set("", 1).is_err());
        assert!(values.set("a..b", 1).is_err());
        assert!(values.set(".a", 1).is_err());
        assert!(values.is_empty());
    }

    #[test]
    fn project_keeps_only_requested_paths() {
        let values = FormValues::from_json(json!({
            "income": 5000,
            "housing": {"rent": 1500, "utilities": 200},
            "notes": "draft"
        }))
        .unwrap();
        let slice = values.project(["income", "housing.rent", "missing"]);
        assert_eq!(slice.to_json(), json!({"income": 5000, "housing": {"rent": 1500}}));
    }

    #[test]
    fn merge_overlays_leaves() {
        let mut base = FormValues::from_json(json!({"a": {"x": 1, "y": 2}, "b": 3})).unwrap();
        let patch = FormValues::from_json(json!({"a": {"y": 20}, "c": 4})).unwrap();
        base.merge(&patch);
        assert_eq!(base.to_json(), json!({"a": {"x": 1, "y": 20}, "b": 3, "c": 4}));
    }

    #[test]
    fn from_json_requires_object() {
        assert!(FormValues::from_json(json!([1, 2])).is_err());
    }
}

use crate::wizard::schema::ObjectSchema;

/// Supported data kinds for wizard fields. The kind decides which input
/// adapter a front end uses to turn keystrokes into a value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Currency { min: f64, max: f64, step: f64 },
    Percent { min: f64, max: f64, step: f64 },
    Integer { min: i64, max: i64 },
    Date,
    Choice(Vec<String>),
    Boolean,
}

/// Declarative description of a single field rendered by a step.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub help: Option<&'static str>,
}

impl FieldDescriptor {
    pub fn new(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            kind,
            help: None,
        }
    }

    pub fn text(key: &'static str, label: &'static str) -> Self {
        Self::new(key, label, FieldKind::Text)
    }

    pub fn currency(key: &'static str, label: &'static str) -> Self {
        Self::new(
            key,
            label,
            FieldKind::Currency {
                min: 0.0,
                max: 10_000_000.0,
                step: 1.0,
            },
        )
    }

    pub fn percent(key: &'static str, label: &'static str) -> Self {
        Self::new(
            key,
            label,
            FieldKind::Percent {
                min: 0.0,
                max: 100.0,
                step: 1.0,
            },
        )
    }

    pub fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

/// One page of a wizard: a title, the fields it renders and the optional
/// schema gating forward navigation.
#[derive(Debug, Clone)]
pub struct Step {
    pub title: String,
    pub description: Option<String>,
    pub schema: Option<ObjectSchema>,
    pub fields: Vec<FieldDescriptor>,
}

impl Step {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            schema: None,
            fields: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_schema(mut self, schema: ObjectSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Paths owned by this step, taken from the schema's shape.
    pub fn owned_keys(&self) -> Vec<&str> {
        self.schema
            .as_ref()
            .map(|schema| schema.keys().collect())
            .unwrap_or_default()
    }

    /// Whether writing `path` can change a value this step validates. A
    /// parent or child path of an owned key counts.
    pub fn owns_path(&self, path: &str) -> bool {
        self.owned_keys()
            .into_iter()
            .any(|key| key == path || is_nested(key, path) || is_nested(path, key))
    }
}

fn is_nested(child: &str, parent: &str) -> bool {
    child
        .strip_prefix(parent)
        .is_some_and(|rest| rest.starts_with('.'))
}

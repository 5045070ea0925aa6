use crate::wizard::{FieldDescriptor, Progress, ValidationErrors};

/// High-level lifecycle states emitted by the wizard runner.
#[derive(Debug, Clone, PartialEq)]
pub enum FormResult<T> {
    Completed(T),
    Cancelled,
}

/// Describes how prompts can be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResponse {
    /// User supplied a concrete value.
    Value(String),
    /// Keep the current value.
    Keep,
    /// Abort the wizard, keeping the draft.
    Cancel,
    /// Go back to the previous field, or the previous step from the first
    /// field of a step.
    Back,
    /// Request additional information for the current field.
    Help,
}

/// Responses accepted when confirming the collected data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationResponse {
    Confirm,
    Back,
    Cancel,
}

/// Everything a front end needs to render one field prompt.
pub struct PromptContext<'a> {
    pub field: &'a FieldDescriptor,
    /// Current value rendered for display, if any.
    pub current: Option<String>,
    pub step_title: &'a str,
    pub step_index: usize,
    pub step_count: usize,
    pub field_index: usize,
    pub field_count: usize,
    /// Message from the last rejected answer for this field.
    pub error: Option<String>,
}

impl PromptContext<'_> {
    /// Back is meaningful anywhere except the very first field.
    pub fn can_go_back(&self) -> bool {
        self.step_index > 0 || self.field_index > 0
    }
}

/// Snapshot of collected data displayed before final confirmation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FormSummary {
    pub title: String,
    pub entries: Vec<(String, String)>,
}

impl FormSummary {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Review your {}:", self.title)];
        for (label, value) in &self.entries {
            lines.push(format!("  {}: {}", label, value));
        }
        lines
    }
}

/// Interaction surface used by [`super::runner::WizardRunner`]. The terminal
/// implementation lives in [`super::terminal`]; tests script their own.
pub trait WizardInteraction {
    fn prompt_field(&mut self, context: &PromptContext<'_>) -> PromptResponse;

    fn confirm(&mut self, summary: &FormSummary) -> ConfirmationResponse;

    fn show_step(&mut self, _progress: &Progress, _description: Option<&str>) {}

    fn show_errors(&mut self, _errors: &ValidationErrors) {}

    fn show_help(&mut self, _field: &FieldDescriptor) {}

    fn show_message(&mut self, _message: &str) {}
}

//! dialoguer front end for [`WizardInteraction`].

use dialoguer::{theme::ColorfulTheme, Input, Select};

use crate::cli::interaction::{
    ConfirmationResponse, FormSummary, PromptContext, PromptResponse, WizardInteraction,
};
use crate::cli::output;
use crate::cli::test_mode::{self, ScriptedInput};
use crate::wizard::{FieldDescriptor, FieldKind, Progress, ValidationErrors, WizardOptions};

const BACK_LABEL: &str = "< Back";
const CANCEL_LABEL: &str = "Cancel";
const PROGRESS_WIDTH: usize = 20;

/// Reads answers from the terminal, or from the scripted queue when
/// `GOFAST_WISH_TEST_INPUTS` is set.
pub struct TerminalInteraction {
    theme: ColorfulTheme,
    show_progress_bar: bool,
    show_step_indicator: bool,
    show_step_title: bool,
}

impl TerminalInteraction {
    pub fn new(options: &WizardOptions) -> Self {
        Self {
            theme: ColorfulTheme::default(),
            show_progress_bar: options.show_progress_bar,
            show_step_indicator: options.show_step_indicator,
            show_step_title: options.show_step_title,
        }
    }

    fn prompt_text(&self, context: &PromptContext<'_>) -> PromptResponse {
        let label = prompt_label(context);
        let raw = Input::<String>::with_theme(&self.theme)
            .with_prompt(label)
            .allow_empty(true)
            .interact_text();
        match raw {
            Ok(buffer) => interpret_buffer(&buffer),
            Err(err) => {
                tracing::debug!(error = %err, "text prompt aborted");
                PromptResponse::Cancel
            }
        }
    }

    fn prompt_select(&self, context: &PromptContext<'_>, options: &[String]) -> PromptResponse {
        let mut items: Vec<String> = options.to_vec();
        if context.can_go_back() {
            items.push(BACK_LABEL.into());
        }
        items.push(CANCEL_LABEL.into());

        let default = context
            .current
            .as_deref()
            .and_then(|current| {
                options
                    .iter()
                    .position(|option| option.eq_ignore_ascii_case(current))
            })
            .unwrap_or(0);

        let picked = Select::with_theme(&self.theme)
            .with_prompt(prompt_label(context))
            .items(&items)
            .default(default)
            .interact_opt();
        match picked {
            Ok(Some(index)) if index < options.len() => {
                let choice = &options[index];
                let unchanged = context
                    .current
                    .as_deref()
                    .is_some_and(|current| current.eq_ignore_ascii_case(choice));
                if unchanged {
                    PromptResponse::Keep
                } else {
                    PromptResponse::Value(choice.clone())
                }
            }
            Ok(Some(index)) if items[index] == BACK_LABEL => PromptResponse::Back,
            Ok(_) => PromptResponse::Cancel,
            Err(err) => {
                tracing::debug!(error = %err, "select prompt aborted");
                PromptResponse::Cancel
            }
        }
    }
}

impl WizardInteraction for TerminalInteraction {
    fn prompt_field(&mut self, context: &PromptContext<'_>) -> PromptResponse {
        if let Some(error) = &context.error {
            output::error(error);
        }
        if let Some(scripted) = test_mode::next_input(context.field.label) {
            return match scripted {
                ScriptedInput::Value(value) => PromptResponse::Value(value),
                ScriptedInput::Keep | ScriptedInput::Confirm => PromptResponse::Keep,
                ScriptedInput::Back => PromptResponse::Back,
                ScriptedInput::Help => PromptResponse::Help,
                ScriptedInput::Cancel => PromptResponse::Cancel,
            };
        }
        match &context.field.kind {
            FieldKind::Choice(options) => self.prompt_select(context, options),
            FieldKind::Boolean => {
                let options = vec!["Yes".to_string(), "No".to_string()];
                self.prompt_select(context, &options)
            }
            _ => self.prompt_text(context),
        }
    }

    fn confirm(&mut self, summary: &FormSummary) -> ConfirmationResponse {
        output::section("Review");
        for line in summary.lines() {
            output::info(line);
        }

        if let Some(scripted) = test_mode::next_input("confirm") {
            return match scripted {
                ScriptedInput::Confirm | ScriptedInput::Keep => ConfirmationResponse::Confirm,
                ScriptedInput::Value(value)
                    if matches!(value.to_ascii_lowercase().as_str(), "y" | "yes") =>
                {
                    ConfirmationResponse::Confirm
                }
                ScriptedInput::Back => ConfirmationResponse::Back,
                _ => ConfirmationResponse::Cancel,
            };
        }

        let items = ["Submit", "Back to the last step", CANCEL_LABEL];
        match Select::with_theme(&self.theme)
            .with_prompt("Submit these answers?")
            .items(&items)
            .default(0)
            .interact_opt()
        {
            Ok(Some(0)) => ConfirmationResponse::Confirm,
            Ok(Some(1)) => ConfirmationResponse::Back,
            _ => ConfirmationResponse::Cancel,
        }
    }

    fn show_step(&mut self, progress: &Progress, description: Option<&str>) {
        let mut header = Vec::new();
        if self.show_step_indicator {
            header.push(format!("Step {} of {}", progress.position, progress.total));
        }
        if self.show_step_title {
            header.push(progress.title.clone());
        }
        if !header.is_empty() {
            output::section(header.join(": "));
        }
        if self.show_progress_bar {
            output::info(output::progress_bar(progress.percent, PROGRESS_WIDTH));
        }
        if let Some(description) = description {
            output::info(description);
        }
    }

    fn show_errors(&mut self, errors: &ValidationErrors) {
        output::warning("Please fix the following before continuing:");
        for (path, messages) in errors.iter() {
            for message in messages {
                output::error(format!("{}: {}", path, message));
            }
        }
    }

    fn show_help(&mut self, field: &FieldDescriptor) {
        let text = field.help.map(str::to_string).unwrap_or_else(|| hint_for(&field.kind));
        output::info(format!("{}: {}", field.label, text));
        output::info("Type :back for the previous field, :cancel to stop (your draft is kept).");
    }

    fn show_message(&mut self, message: &str) {
        output::warning(message);
    }
}

fn prompt_label(context: &PromptContext<'_>) -> String {
    match &context.current {
        Some(current) if !current.is_empty() => format!("{} [{}]", context.field.label, current),
        _ => context.field.label.to_string(),
    }
}

/// Empty input keeps the current value; `:back`, `:help` and `:cancel` are
/// commands, `:clear` submits an empty value.
fn interpret_buffer(buffer: &str) -> PromptResponse {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return PromptResponse::Keep;
    }
    match trimmed.to_ascii_lowercase().as_str() {
        ":cancel" => PromptResponse::Cancel,
        ":back" => PromptResponse::Back,
        ":help" => PromptResponse::Help,
        ":clear" => PromptResponse::Value(String::new()),
        _ => PromptResponse::Value(trimmed.to_string()),
    }
}

fn hint_for(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Text => "Free text.".into(),
        FieldKind::Currency { min, max, .. } => {
            format!("An amount between {} and {}.", min, max)
        }
        FieldKind::Percent { min, max, .. } => format!("A percentage from {} to {}.", min, max),
        FieldKind::Integer { min, max } => format!("A whole number from {} to {}.", min, max),
        FieldKind::Date => "A date as YYYY-MM-DD or YYYY/MM/DD.".into(),
        FieldKind::Choice(options) => format!("One of: {}.", options.join(", ")),
        FieldKind::Boolean => "Yes or no.".into(),
    }
}

use std::sync::Arc;

use serde_json::Value;

use crate::cli::interaction::{
    ConfirmationResponse, FormResult, FormSummary, PromptContext, PromptResponse,
    WizardInteraction,
};
use crate::currency::{format_money, CurrencyCode, LocaleConfig};
use crate::errors::CliError;
use crate::features::AnyWizard;
use crate::input::FieldAdapter;
use crate::storage::{DraftStore, JsonDraftStore};
use crate::wizard::{
    DraftSink, FieldDescriptor, FieldKind, FormValues, Step, StepOutcome, SubmitBlocked,
    SubmitOutcome, ValidationErrors, WizardOptions, WizardSession,
};

/// Drives a [`WizardSession`] for one wizard through a [`WizardInteraction`]:
/// prompts field by field, gates steps on validation, confirms and submits.
pub struct WizardRunner<'a> {
    wizard: &'a dyn AnyWizard,
    store: Option<Arc<JsonDraftStore>>,
    options: WizardOptions,
    currency: CurrencyCode,
    locale: LocaleConfig,
}

impl<'a> WizardRunner<'a> {
    pub fn new(wizard: &'a dyn AnyWizard) -> Self {
        Self {
            wizard,
            store: None,
            options: WizardOptions::default(),
            currency: CurrencyCode::default(),
            locale: LocaleConfig::default(),
        }
    }

    pub fn with_store(mut self, store: Arc<JsonDraftStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_options(mut self, options: WizardOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_locale(mut self, currency: CurrencyCode, locale: LocaleConfig) -> Self {
        self.currency = currency;
        self.locale = locale;
        self
    }

    /// Wizard defaults, overlaid with the stored draft when `resume` is set.
    /// A resumed wizard still starts on its first step.
    pub fn initial_values(&self, resume: bool) -> Result<FormValues, CliError> {
        let mut values = self.wizard.defaults();
        if !resume {
            return Ok(values);
        }
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| CliError::Command("no draft store configured".into()))?;
        match store.try_load(self.wizard.name())? {
            Some(draft) => {
                tracing::info!(wizard = self.wizard.name(), saved_at = %draft.saved_at, "resuming draft");
                values.merge(&draft.values);
            }
            None => tracing::info!(wizard = self.wizard.name(), "no draft to resume"),
        }
        Ok(values)
    }

    fn open_session(&self, initial: FormValues) -> Result<WizardSession, CliError> {
        let session = WizardSession::new(
            self.wizard.name(),
            self.wizard.steps(),
            initial,
            self.options.clone(),
        )?;
        Ok(match &self.store {
            Some(store) => {
                let sink: Arc<dyn DraftSink> = store.clone();
                session.with_autosave(sink)
            }
            None => session,
        })
    }

    pub async fn run<I: WizardInteraction>(
        &self,
        interaction: &mut I,
        initial: FormValues,
    ) -> Result<FormResult<Value>, CliError> {
        let mut session = self.open_session(initial)?;
        let mut field_index = 0;
        let mut announced = None;
        let mut pending_error: Option<String> = None;

        loop {
            let step_index = session.current_step_index();
            let step = session.current_step().clone();
            if announced != Some(step_index) {
                interaction.show_step(&session.progress(), step.description.as_deref());
                if session.should_show_errors(step_index) {
                    if let Some(errors) = session.errors_for(step_index) {
                        interaction.show_errors(errors);
                    }
                }
                announced = Some(step_index);
            }

            if field_index >= step.fields.len() {
                match session.go_next() {
                    StepOutcome::Advanced { .. } => field_index = 0,
                    StepOutcome::Invalid(errors) => {
                        interaction.show_errors(&errors);
                        field_index = first_invalid_field(&step, &errors)
                            .ok_or_else(|| unreachable_step(&step))?;
                    }
                    StepOutcome::Ready => {
                        let summary = self.summary(session.values());
                        match interaction.confirm(&summary) {
                            ConfirmationResponse::Confirm => {
                                if let Some(value) = self.submit(&mut session, interaction).await {
                                    return Ok(FormResult::Completed(value));
                                }
                                let reopened = session.current_step_index();
                                field_index = session
                                    .errors_for(reopened)
                                    .and_then(|errors| {
                                        first_invalid_field(session.current_step(), errors)
                                    })
                                    .unwrap_or(0);
                            }
                            ConfirmationResponse::Back => {
                                field_index = step.fields.len().saturating_sub(1);
                            }
                            ConfirmationResponse::Cancel => {
                                self.cancel(&mut session, interaction);
                                return Ok(FormResult::Cancelled);
                            }
                        }
                    }
                    StepOutcome::Locked => {
                        return Err(CliError::Command("wizard session is locked".into()));
                    }
                }
                continue;
            }

            let field = &step.fields[field_index];
            let context = PromptContext {
                field,
                current: session
                    .values()
                    .get(field.key)
                    .and_then(|value| self.display_value(&field.kind, value)),
                step_title: &step.title,
                step_index,
                step_count: session.step_count(),
                field_index,
                field_count: step.fields.len(),
                error: pending_error.take(),
            };

            match interaction.prompt_field(&context) {
                PromptResponse::Keep => field_index += 1,
                PromptResponse::Help => interaction.show_help(field),
                PromptResponse::Cancel => {
                    self.cancel(&mut session, interaction);
                    return Ok(FormResult::Cancelled);
                }
                PromptResponse::Back => {
                    if field_index > 0 {
                        field_index -= 1;
                    } else if step_index > 0 {
                        let target = session.go_back();
                        field_index = session.steps()[target].fields.len().saturating_sub(1);
                    }
                }
                PromptResponse::Value(raw) => match self.convert(field, &raw) {
                    Ok(value) => {
                        session.update_field(field.key, value)?;
                        let rejected = step
                            .schema
                            .as_ref()
                            .and_then(|schema| schema.check_field(field.key, session.values()));
                        match rejected {
                            Some(message) => pending_error = Some(message),
                            None => field_index += 1,
                        }
                    }
                    Err(message) => pending_error = Some(message),
                },
            }
        }
    }

    async fn submit<I: WizardInteraction>(
        &self,
        session: &mut WizardSession,
        interaction: &mut I,
    ) -> Option<Value> {
        let wizard = self.wizard;
        let outcome = session
            .submit(|values| async move { wizard.commit_json(&values) })
            .await;
        match outcome {
            Ok(SubmitOutcome::Completed(value)) => {
                self.discard_draft();
                Some(value)
            }
            Ok(SubmitOutcome::Blocked(SubmitBlocked::Invalid { step, errors })) => {
                interaction.show_errors(&errors);
                if let Err(reason) = session.go_to_step(step) {
                    tracing::warn!(wizard = self.wizard.name(), %reason, "could not reopen invalid step");
                }
                None
            }
            Ok(SubmitOutcome::Blocked(reason)) => {
                interaction.show_message(&reason.to_string());
                None
            }
            Err(err) => {
                interaction.show_message(&err.to_string());
                None
            }
        }
    }

    fn cancel<I: WizardInteraction>(&self, session: &mut WizardSession, interaction: &mut I) {
        match session.flush_draft() {
            Ok(true) => interaction.show_message("Draft saved. Resume later with --resume."),
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(wizard = self.wizard.name(), error = %err, "draft flush failed");
            }
        }
        tracing::info!(wizard = self.wizard.name(), "wizard cancelled");
    }

    fn discard_draft(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(err) = store.discard(self.wizard.name()) {
            tracing::warn!(wizard = self.wizard.name(), error = %err, "could not discard draft");
        }
    }

    /// Turns a typed answer into the value stored under the field's path.
    fn convert(&self, field: &FieldDescriptor, raw: &str) -> Result<Value, String> {
        if let Some(mut adapter) = FieldAdapter::for_kind(&field.kind, &self.currency, &self.locale)
            .map_err(|err| err.to_string())?
        {
            return match adapter.submit_text(raw) {
                (Some(value), _) => Ok(value),
                (None, _) => Err("Use YYYY-MM-DD format".into()),
            };
        }
        match &field.kind {
            FieldKind::Choice(options) => choose(options, raw)
                .map(|option| Value::String(option.clone()))
                .ok_or_else(|| format!("Must be one of: {}", options.join(", "))),
            FieldKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" | "true" | "1" => Ok(Value::Bool(true)),
                "n" | "no" | "false" | "0" => Ok(Value::Bool(false)),
                _ => Err("Answer yes or no".into()),
            },
            _ => Ok(Value::String(raw.to_string())),
        }
    }

    fn display_value(&self, kind: &FieldKind, value: &Value) -> Option<String> {
        match (kind, value) {
            (_, Value::Null) => None,
            (FieldKind::Currency { .. }, Value::Number(number)) => number
                .as_f64()
                .map(|amount| format_money(amount, &self.currency, &self.locale)),
            (FieldKind::Percent { .. }, Value::Number(number)) => Some(format!("{}%", number)),
            (_, Value::Bool(flag)) => Some(if *flag { "yes" } else { "no" }.to_string()),
            (_, Value::String(text)) => Some(text.clone()),
            (_, other) => Some(other.to_string()),
        }
    }

    fn summary(&self, values: &FormValues) -> FormSummary {
        let mut summary = FormSummary {
            title: self.wizard.title().to_string(),
            entries: Vec::new(),
        };
        for step in self.wizard.steps() {
            for field in &step.fields {
                let display = values
                    .get(field.key)
                    .and_then(|value| self.display_value(&field.kind, value))
                    .unwrap_or_else(|| "[unfilled]".to_string());
                summary.entries.push((field.label.to_string(), display));
            }
        }
        summary
    }
}

/// Matches a 1-based option number or the option text, ignoring case.
fn choose<'o>(options: &'o [String], raw: &str) -> Option<&'o String> {
    let trimmed = raw.trim();
    if let Ok(number) = trimmed.parse::<usize>() {
        if let Some(option) = number.checked_sub(1).and_then(|index| options.get(index)) {
            return Some(option);
        }
    }
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(trimmed))
}

/// First field, in display order, that carries a message.
fn first_invalid_field(step: &Step, errors: &ValidationErrors) -> Option<usize> {
    step.fields
        .iter()
        .position(|field| !errors.get(field.key).is_empty())
        .or_else(|| (!step.fields.is_empty()).then_some(0))
}

fn unreachable_step(step: &Step) -> CliError {
    CliError::Command(format!(
        "step `{}` failed validation but has no field to correct",
        step.title
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Result as WishResult, WishError};
    use crate::features::{GoalForm, WishClarityCoach, WizardFlow};
    use crate::storage::DraftStore;
    use crate::wizard::{Draft, FieldSchema, ObjectSchema, Progress};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use uuid::Uuid;

    struct MockInteraction {
        prompts: VecDeque<PromptResponse>,
        confirmations: VecDeque<ConfirmationResponse>,
        asked: Vec<&'static str>,
        errors_seen: Vec<String>,
        messages: Vec<String>,
        steps_shown: Vec<usize>,
        help_hits: usize,
    }

    impl MockInteraction {
        fn new(prompts: Vec<PromptResponse>, confirmations: Vec<ConfirmationResponse>) -> Self {
            Self {
                prompts: prompts.into(),
                confirmations: confirmations.into(),
                asked: Vec::new(),
                errors_seen: Vec::new(),
                messages: Vec::new(),
                steps_shown: Vec::new(),
                help_hits: 0,
            }
        }
    }

    impl WizardInteraction for MockInteraction {
        fn prompt_field(&mut self, context: &PromptContext<'_>) -> PromptResponse {
            self.asked.push(context.field.label);
            if let Some(error) = &context.error {
                self.errors_seen.push(error.clone());
            }
            self.prompts.pop_front().unwrap_or(PromptResponse::Cancel)
        }

        fn confirm(&mut self, _summary: &FormSummary) -> ConfirmationResponse {
            self.confirmations
                .pop_front()
                .unwrap_or(ConfirmationResponse::Cancel)
        }

        fn show_step(&mut self, progress: &Progress, _description: Option<&str>) {
            self.steps_shown.push(progress.position);
        }

        fn show_errors(&mut self, errors: &ValidationErrors) {
            self.errors_seen.push(errors.to_string());
        }

        fn show_help(&mut self, _field: &FieldDescriptor) {
            self.help_hits += 1;
        }

        fn show_message(&mut self, message: &str) {
            self.messages.push(message.to_string());
        }
    }

    /// Two step profile form whose commit fails `failures` times first.
    #[derive(Default)]
    struct ProfileForm {
        failures: usize,
        attempts: AtomicUsize,
    }

    impl WizardFlow for ProfileForm {
        type Output = Value;

        fn name(&self) -> &'static str {
            "profile"
        }

        fn title(&self) -> &'static str {
            "Profile"
        }

        fn schema(&self) -> ObjectSchema {
            ObjectSchema::new()
                .field("name", FieldSchema::text().min_len(2))
                .field("age", FieldSchema::integer().min(18.0))
                .field("agree", FieldSchema::boolean())
        }

        fn steps(&self) -> Vec<Step> {
            let schema = self.schema();
            vec![
                Step::new("About you")
                    .with_schema(schema.pick(&["name", "age"]))
                    .field(FieldDescriptor::text("name", "Name"))
                    .field(FieldDescriptor::new(
                        "age",
                        "Age",
                        FieldKind::Integer { min: 0, max: 120 },
                    )),
                Step::new("Terms")
                    .with_schema(schema.pick(&["agree"]))
                    .field(FieldDescriptor::new("agree", "Agree", FieldKind::Boolean)),
            ]
        }

        fn commit(&self, values: &FormValues) -> WishResult<Value> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(WishError::StorageError("network error".into()));
            }
            Ok(values.to_json())
        }
    }

    fn value(text: &str) -> PromptResponse {
        PromptResponse::Value(text.to_string())
    }

    fn store() -> (TempDir, Arc<JsonDraftStore>) {
        let temp = TempDir::new().unwrap();
        let store = JsonDraftStore::new(Some(temp.path().to_path_buf())).unwrap();
        (temp, Arc::new(store))
    }

    #[tokio::test]
    async fn completes_and_returns_committed_json() {
        let form = ProfileForm::default();
        let runner = WizardRunner::new(&form);
        let mut interaction = MockInteraction::new(
            vec![value("Al"), value("30"), value("yes")],
            vec![ConfirmationResponse::Confirm],
        );
        let result = runner.run(&mut interaction, FormValues::new()).await.unwrap();
        assert_eq!(
            result,
            FormResult::Completed(json!({"name": "Al", "age": 30, "agree": true}))
        );
        assert_eq!(interaction.steps_shown, vec![1, 2]);
    }

    #[tokio::test]
    async fn rejected_field_is_prompted_again_with_its_message() {
        let form = ProfileForm::default();
        let runner = WizardRunner::new(&form);
        let mut interaction = MockInteraction::new(
            vec![value("A"), value("Ann"), value("12"), value("40"), value("y")],
            vec![ConfirmationResponse::Confirm],
        );
        let result = runner.run(&mut interaction, FormValues::new()).await.unwrap();
        assert!(matches!(result, FormResult::Completed(_)));
        assert_eq!(interaction.asked, vec!["Name", "Name", "Age", "Age", "Agree"]);
        assert_eq!(
            interaction.errors_seen,
            vec!["Must be at least 2 characters", "Must be 18 or more"]
        );
    }

    #[tokio::test]
    async fn back_from_first_field_returns_to_previous_step() {
        let form = ProfileForm::default();
        let runner = WizardRunner::new(&form);
        let mut interaction = MockInteraction::new(
            vec![
                value("Al"),
                value("30"),
                PromptResponse::Back,
                PromptResponse::Keep,
                value("no"),
            ],
            vec![ConfirmationResponse::Confirm],
        );
        let result = runner.run(&mut interaction, FormValues::new()).await.unwrap();
        assert_eq!(interaction.asked, vec!["Name", "Age", "Agree", "Age", "Agree"]);
        assert_eq!(interaction.steps_shown, vec![1, 2, 1, 2]);
        assert_eq!(
            result,
            FormResult::Completed(json!({"name": "Al", "age": 30, "agree": false}))
        );
    }

    #[tokio::test]
    async fn keeping_an_empty_required_field_blocks_the_step() {
        let form = ProfileForm::default();
        let runner = WizardRunner::new(&form);
        let mut interaction = MockInteraction::new(
            vec![
                PromptResponse::Keep,
                PromptResponse::Keep,
                PromptResponse::Help,
                value("Bo"),
                PromptResponse::Cancel,
            ],
            vec![],
        );
        let result = runner.run(&mut interaction, FormValues::new()).await.unwrap();
        assert_eq!(result, FormResult::Cancelled);
        assert_eq!(interaction.help_hits, 1);
        assert!(interaction.errors_seen[0].contains("name: Required"));
        assert_eq!(interaction.asked, vec!["Name", "Age", "Name", "Name", "Age"]);
    }

    #[tokio::test]
    async fn rejected_submission_stays_on_last_step_and_retries() {
        let form = ProfileForm {
            failures: 1,
            ..ProfileForm::default()
        };
        let runner = WizardRunner::new(&form);
        let mut interaction = MockInteraction::new(
            vec![value("Al"), value("30"), value("yes"), PromptResponse::Keep],
            vec![ConfirmationResponse::Confirm, ConfirmationResponse::Confirm],
        );
        let result = runner.run(&mut interaction, FormValues::new()).await.unwrap();
        assert!(matches!(result, FormResult::Completed(_)));
        assert_eq!(
            interaction.messages,
            vec!["submission rejected: Persistence error: network error"]
        );
        assert_eq!(interaction.asked, vec!["Name", "Age", "Agree", "Agree"]);
    }

    #[tokio::test]
    async fn confirm_back_reopens_last_field() {
        let form = ProfileForm::default();
        let runner = WizardRunner::new(&form);
        let mut interaction = MockInteraction::new(
            vec![value("Al"), value("30"), value("yes"), value("no")],
            vec![ConfirmationResponse::Back, ConfirmationResponse::Confirm],
        );
        let result = runner.run(&mut interaction, FormValues::new()).await.unwrap();
        assert_eq!(
            result,
            FormResult::Completed(json!({"name": "Al", "age": 30, "agree": false}))
        );
    }

    #[tokio::test]
    async fn cancel_flushes_the_pending_draft() {
        let (_temp, store) = store();
        let form = ProfileForm::default();
        let options = WizardOptions {
            auto_save: true,
            ..WizardOptions::default()
        };
        let runner = WizardRunner::new(&form)
            .with_store(store.clone())
            .with_options(options);
        let mut interaction =
            MockInteraction::new(vec![value("Al"), PromptResponse::Cancel], vec![]);
        let result = runner.run(&mut interaction, FormValues::new()).await.unwrap();
        assert_eq!(result, FormResult::Cancelled);

        let draft = store.load("profile").unwrap();
        assert_eq!(draft.values.get_str("name"), Some("Al"));
        assert_eq!(interaction.messages.len(), 1);
    }

    #[tokio::test]
    async fn success_discards_stored_draft_and_resume_merges_it() {
        let (_temp, store) = store();
        let saved = FormValues::new().with("name", "Dee").unwrap();
        store
            .save(&Draft::new("profile", Uuid::new_v4(), 1, saved))
            .unwrap();

        let form = ProfileForm::default();
        let runner = WizardRunner::new(&form).with_store(store.clone());
        let initial = runner.initial_values(true).unwrap();
        assert_eq!(initial.get_str("name"), Some("Dee"));

        let mut interaction = MockInteraction::new(
            vec![PromptResponse::Keep, value("51"), value("yes")],
            vec![ConfirmationResponse::Confirm],
        );
        let result = runner.run(&mut interaction, initial).await.unwrap();
        assert_eq!(
            result,
            FormResult::Completed(json!({"name": "Dee", "age": 51, "agree": true}))
        );
        assert!(store.try_load("profile").unwrap().is_none());
    }

    #[tokio::test]
    async fn choice_fields_accept_numbers_or_text() {
        let today = chrono::NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let form = GoalForm::create(today);
        let runner = WizardRunner::new(&form);
        let mut interaction = MockInteraction::new(
            vec![
                value("Stretch daily"),
                PromptResponse::Keep,
                value("7"),
                value("1"),
                value("2025/04/07"),
                value("DAILY"),
                value("1"),
            ],
            vec![ConfirmationResponse::Confirm],
        );
        let result = runner
            .run(&mut interaction, WizardFlow::defaults(&form))
            .await
            .unwrap();
        let FormResult::Completed(goal) = result else {
            panic!("goal form was cancelled");
        };
        assert_eq!(goal["category"], "Health");
        assert_eq!(goal["start_date"], "2025-04-07");
        assert_eq!(goal["frequency"], "daily");
        assert_eq!(
            interaction.errors_seen,
            vec!["Must be one of: Health, Career, Finance, Learning, Personal"]
        );
    }

    #[tokio::test]
    async fn inverted_timeline_is_caught_on_the_target_date_field() {
        let coach = WishClarityCoach;
        let runner = WizardRunner::new(&coach);
        let mut initial = WizardFlow::defaults(&coach);
        for (key, answer) in [
            ("wish.title", "Run a half marathon"),
            ("wish.category", "Health"),
            ("why.reason", "I want more energy for my kids."),
            ("vision.success", "Crossing the finish line smiling."),
            ("measure.metric", "km"),
            ("obstacles.main", "Busy evenings"),
            ("obstacles.plan", "Run before work"),
            ("resources.support", "Running club"),
            ("timeline.start", "2025-03-01"),
            ("commitment.first_step", "Buy running shoes"),
        ] {
            initial.set(key, answer).unwrap();
        }
        initial.set("measure.target", 21).unwrap();

        let mut prompts = vec![PromptResponse::Keep; 11];
        prompts.extend([value("2025-02-01"), value("2025-09-01")]);
        prompts.extend([PromptResponse::Keep, PromptResponse::Keep]);
        let mut interaction = MockInteraction::new(prompts, vec![ConfirmationResponse::Confirm]);

        let result = runner.run(&mut interaction, initial).await.unwrap();
        let FormResult::Completed(plan) = result else {
            panic!("clarity coach was cancelled");
        };
        assert_eq!(plan["days_available"], 184);
        assert_eq!(interaction.errors_seen, vec!["Must be after the start date"]);
        let retried: Vec<_> = interaction
            .asked
            .iter()
            .filter(|label| **label == "Target date")
            .collect();
        assert_eq!(retried.len(), 2);
        assert!(interaction.messages.is_empty());
    }
}

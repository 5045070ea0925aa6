use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use uuid::Uuid;

use crate::errors::{Result, WishError};
use crate::wizard::autosave::{AutoSaver, Draft, DraftSink};
use crate::wizard::schema::ValidationErrors;
use crate::wizard::step::Step;
use crate::wizard::submit::{SubmitBlocked, SubmitTicket};
use crate::wizard::values::FormValues;

pub const DEFAULT_AUTO_SAVE_DELAY: Duration = Duration::from_millis(1000);

/// Behavioural and presentation switches for a wizard session. The `show_*`
/// flags only matter to renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardOptions {
    pub allow_skip_steps: bool,
    pub allow_step_reset: bool,
    pub auto_save: bool,
    pub auto_save_delay: Duration,
    pub show_progress_bar: bool,
    pub show_step_indicator: bool,
    pub show_step_title: bool,
    /// Upper bound for an in-flight completion callback; `None` waits forever.
    pub submit_timeout: Option<Duration>,
}

impl Default for WizardOptions {
    fn default() -> Self {
        Self {
            allow_skip_steps: false,
            allow_step_reset: false,
            auto_save: false,
            auto_save_delay: DEFAULT_AUTO_SAVE_DELAY,
            show_progress_bar: true,
            show_step_indicator: true,
            show_step_title: true,
            submit_timeout: None,
        }
    }
}

/// High-level lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    Editing(usize),
    Submitting,
    Done,
}

/// Result of [`WizardSession::go_next`].
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Advanced { from: usize, to: usize },
    /// The last step validated; the session can be submitted.
    Ready,
    /// The current step failed validation; the index did not move.
    Invalid(ValidationErrors),
    /// Navigation is frozen while submitting or after completion.
    Locked,
}

/// Why [`WizardSession::go_to_step`] refused to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDenied {
    OutOfRange { index: usize, len: usize },
    Unvalidated { step: usize },
    Locked,
}

impl fmt::Display for NavigationDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationDenied::OutOfRange { index, len } => {
                write!(f, "step {} is outside 1..={}", index + 1, len)
            }
            NavigationDenied::Unvalidated { step } => {
                write!(f, "step {} has not been completed", step + 1)
            }
            NavigationDenied::Locked => write!(f, "wizard is not accepting navigation"),
        }
    }
}

/// Data needed to draw a step indicator or progress bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// 1-based position of the current step.
    pub position: usize,
    pub total: usize,
    pub title: String,
    pub percent: u8,
}

/// Controller for one open wizard: owns the aggregate values, the current
/// step, the validation gate and the optional autosave timer.
pub struct WizardSession {
    id: Uuid,
    name: String,
    steps: Vec<Step>,
    options: WizardOptions,
    initial: FormValues,
    values: FormValues,
    current: usize,
    visited: BTreeSet<usize>,
    completed: BTreeSet<usize>,
    errors: BTreeMap<usize, ValidationErrors>,
    submitting: bool,
    done: bool,
    autosave: Option<AutoSaver>,
}

impl WizardSession {
    pub fn new(
        name: impl Into<String>,
        steps: Vec<Step>,
        initial: FormValues,
        options: WizardOptions,
    ) -> Result<Self> {
        if steps.is_empty() {
            return Err(WishError::EmptyWizard);
        }
        let name = name.into();
        tracing::debug!(wizard = %name, steps = steps.len(), "wizard session created");
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            steps,
            options,
            values: initial.clone(),
            initial,
            current: 0,
            visited: BTreeSet::new(),
            completed: BTreeSet::new(),
            errors: BTreeMap::new(),
            submitting: false,
            done: false,
            autosave: None,
        })
    }

    /// Attaches a draft sink. Ignored unless `options.auto_save` is set.
    pub fn with_autosave(mut self, sink: Arc<dyn DraftSink>) -> Self {
        if self.options.auto_save {
            self.autosave = Some(AutoSaver::new(sink, self.options.auto_save_delay));
        } else {
            tracing::debug!(wizard = %self.name, "autosave disabled; sink ignored");
        }
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &WizardOptions {
        &self.options
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn current_step_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> &Step {
        &self.steps[self.current]
    }

    pub fn last_step_index(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn is_last_step(&self) -> bool {
        self.current == self.last_step_index()
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn state(&self) -> WizardState {
        if self.done {
            WizardState::Done
        } else if self.submitting {
            WizardState::Submitting
        } else {
            WizardState::Editing(self.current)
        }
    }

    /// Steps whose validation has run at least once.
    pub fn was_visited(&self, step: usize) -> bool {
        self.visited.contains(&step)
    }

    /// Steps whose most recent validation passed.
    pub fn is_step_complete(&self, step: usize) -> bool {
        self.completed.contains(&step)
    }

    pub fn errors_for(&self, step: usize) -> Option<&ValidationErrors> {
        self.errors.get(&step)
    }

    /// Errors are only surfaced for steps the user already tried to leave.
    pub fn should_show_errors(&self, step: usize) -> bool {
        self.was_visited(step) && self.errors.contains_key(&step)
    }

    pub fn progress(&self) -> Progress {
        let total = self.steps.len();
        let position = self.current + 1;
        Progress {
            position,
            total,
            title: self.current_step().title.clone(),
            percent: ((position * 100) / total) as u8,
        }
    }

    fn is_locked(&self) -> bool {
        self.submitting || self.done
    }

    /// Validates `step` against its projection of the aggregate values and
    /// records the outcome in the visited/completed sets and the error map.
    pub fn validate_step(&mut self, step: usize) -> std::result::Result<(), ValidationErrors> {
        let Some(descriptor) = self.steps.get(step) else {
            return Ok(());
        };
        self.visited.insert(step);

        let outcome = match &descriptor.schema {
            None => Ok(()),
            Some(schema) => {
                let slice = self.values.project(schema.keys());
                schema.safe_parse(&slice).map(|_| ())
            }
        };

        match &outcome {
            Ok(()) => {
                self.completed.insert(step);
                self.errors.remove(&step);
            }
            Err(errors) => {
                self.completed.remove(&step);
                self.errors.insert(step, errors.clone());
            }
        }
        outcome
    }

    /// Advances one step when the current step validates.
    pub fn go_next(&mut self) -> StepOutcome {
        if self.is_locked() {
            return StepOutcome::Locked;
        }
        let from = self.current;
        if let Err(errors) = self.validate_step(from) {
            tracing::debug!(wizard = %self.name, step = from, fields = errors.len(), "step blocked by validation");
            return StepOutcome::Invalid(errors);
        }
        if self.is_last_step() {
            return StepOutcome::Ready;
        }
        self.current = from + 1;
        tracing::debug!(wizard = %self.name, from, to = self.current, "advanced");
        StepOutcome::Advanced {
            from,
            to: self.current,
        }
    }

    /// Moves back one step without validating the step being left.
    pub fn go_back(&mut self) -> usize {
        if self.is_locked() {
            return self.current;
        }
        let target = self.current.saturating_sub(1);
        self.move_to(target);
        self.current
    }

    /// Jumps to `index` when skipping is allowed, when moving backwards, or
    /// when every step from the current one up to the target has completed.
    pub fn go_to_step(&mut self, index: usize) -> std::result::Result<usize, NavigationDenied> {
        let denial = if self.is_locked() {
            Some(NavigationDenied::Locked)
        } else if index >= self.steps.len() {
            Some(NavigationDenied::OutOfRange {
                index,
                len: self.steps.len(),
            })
        } else if index <= self.current || self.options.allow_skip_steps {
            None
        } else {
            (self.current..index)
                .find(|step| !self.completed.contains(step))
                .map(|step| NavigationDenied::Unvalidated { step })
        };

        if let Some(reason) = denial {
            tracing::debug!(wizard = %self.name, target = index, %reason, "navigation denied");
            return Err(reason);
        }
        self.move_to(index);
        Ok(self.current)
    }

    fn move_to(&mut self, target: usize) {
        if target < self.current && self.options.allow_step_reset {
            self.visited.retain(|step| *step <= target);
            self.completed.retain(|step| *step <= target);
            self.errors.retain(|step, _| *step <= target);
        }
        self.current = target;
    }

    /// Merges one field into the aggregate values and restarts the autosave
    /// debounce. Steps owning `path` must validate again before they can be
    /// skipped over.
    pub fn update_field(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        if self.done {
            return Err(WishError::SessionClosed);
        }
        self.values.set(path, value)?;
        let steps = &self.steps;
        self.completed.retain(|index| !steps[*index].owns_path(path));
        self.schedule_autosave();
        Ok(())
    }

    /// Current progress as a draft payload.
    pub fn draft(&self) -> Draft {
        Draft::new(self.name.clone(), self.id, self.current, self.values.clone())
    }

    fn schedule_autosave(&mut self) {
        let draft = self.draft();
        if let Some(saver) = self.autosave.as_mut() {
            saver.schedule(draft);
        }
    }

    /// Writes any pending draft right away. Returns whether one was written.
    pub fn flush_draft(&mut self) -> Result<bool> {
        match self.autosave.as_mut() {
            Some(saver) => saver.flush(),
            None => Ok(false),
        }
    }

    /// Restores the initial data and returns to the first step.
    pub fn reset(&mut self) {
        self.values = self.initial.clone();
        self.current = 0;
        self.visited.clear();
        self.completed.clear();
        self.errors.clear();
        self.submitting = false;
        self.done = false;
        if let Some(saver) = self.autosave.as_mut() {
            saver.cancel();
        }
    }

    /// First half of submission: checks the session is on the last step,
    /// validates every step in order and marks it as submitting.
    pub fn begin_submit(&mut self) -> std::result::Result<SubmitTicket, SubmitBlocked> {
        if self.done {
            return Err(SubmitBlocked::Closed);
        }
        if self.submitting {
            return Err(SubmitBlocked::AlreadySubmitting);
        }
        if !self.is_last_step() {
            return Err(SubmitBlocked::NotOnLastStep {
                current: self.current,
                last: self.last_step_index(),
            });
        }
        for step in 0..self.steps.len() {
            self.validate_step(step)
                .map_err(|errors| SubmitBlocked::Invalid { step, errors })?;
        }

        self.submitting = true;
        tracing::info!(wizard = %self.name, session = %self.id, "submitting");
        Ok(SubmitTicket::new(self.id, self.values.clone()))
    }

    /// Second half of submission. Success closes the session; failure hands
    /// control back on the last step.
    pub fn finish_submit(&mut self, succeeded: bool) {
        if !self.submitting {
            return;
        }
        self.submitting = false;
        if succeeded {
            self.done = true;
            if let Some(saver) = self.autosave.as_mut() {
                saver.cancel();
            }
            tracing::info!(wizard = %self.name, session = %self.id, "wizard completed");
        } else {
            tracing::info!(wizard = %self.name, session = %self.id, "submission failed; back to editing");
        }
    }
}

impl fmt::Debug for WizardSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardSession")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("steps", &self.steps.len())
            .field("values", &self.values)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::schema::{FieldSchema, ObjectSchema};
    use serde_json::json;

    fn three_steps() -> Vec<Step> {
        vec![
            Step::new("Amount")
                .with_schema(ObjectSchema::new().field("amount", FieldSchema::number().min(0.0))),
            Step::new("Name")
                .with_schema(ObjectSchema::new().field("name", FieldSchema::text().min_len(1))),
            Step::new("Review"),
        ]
    }

    fn session(options: WizardOptions) -> WizardSession {
        WizardSession::new("test", three_steps(), FormValues::new(), options).unwrap()
    }

    #[test]
    fn rejects_empty_step_list() {
        let err = WizardSession::new("empty", Vec::new(), FormValues::new(), WizardOptions::default())
            .unwrap_err();
        assert!(matches!(err, WishError::EmptyWizard));
    }

    #[test]
    fn invalid_step_keeps_index_and_values() {
        let mut wizard = session(WizardOptions::default());
        wizard.update_field("amount", -5).unwrap();
        match wizard.go_next() {
            StepOutcome::Invalid(errors) => {
                assert_eq!(errors.first("amount"), Some("Must be 0 or more"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(wizard.current_step_index(), 0);
        assert_eq!(wizard.values().get_f64("amount"), Some(-5.0));
        assert!(wizard.was_visited(0));
        assert!(wizard.should_show_errors(0));

        wizard.update_field("amount", 10).unwrap();
        assert_eq!(wizard.go_next(), StepOutcome::Advanced { from: 0, to: 1 });
        assert!(wizard.errors_for(0).is_none());
    }

    #[test]
    fn later_steps_do_not_block_earlier_ones() {
        let mut wizard = session(WizardOptions::default());
        wizard.update_field("amount", 3).unwrap();
        // `name` belongs to step 1 and is still missing.
        assert!(matches!(wizard.go_next(), StepOutcome::Advanced { .. }));
    }

    #[test]
    fn back_never_validates() {
        let mut wizard = session(WizardOptions::default());
        wizard.update_field("amount", 1).unwrap();
        wizard.go_next();
        assert_eq!(wizard.go_back(), 0);
        assert_eq!(wizard.go_back(), 0);
        assert!(!wizard.was_visited(1));
    }

    #[test]
    fn last_step_validation_reports_ready() {
        let mut wizard = session(WizardOptions::default());
        wizard.update_field("amount", 1).unwrap();
        wizard.update_field("name", "Trip").unwrap();
        wizard.go_next();
        wizard.go_next();
        assert_eq!(wizard.current_step_index(), 2);
        assert_eq!(wizard.go_next(), StepOutcome::Ready);
        assert_eq!(wizard.current_step_index(), 2);
    }

    #[test]
    fn skipping_ahead_is_denied_by_default() {
        let mut wizard = session(WizardOptions::default());
        assert_eq!(
            wizard.go_to_step(2),
            Err(NavigationDenied::Unvalidated { step: 0 })
        );
        assert_eq!(wizard.current_step_index(), 0);
        assert_eq!(
            wizard.go_to_step(9),
            Err(NavigationDenied::OutOfRange { index: 9, len: 3 })
        );
    }

    #[test]
    fn skipping_ahead_through_completed_steps_is_allowed() {
        let mut wizard = session(WizardOptions::default());
        wizard.update_field("amount", 1).unwrap();
        wizard.update_field("name", "Trip").unwrap();
        wizard.go_next();
        wizard.go_next();
        wizard.go_to_step(0).unwrap();
        assert_eq!(wizard.go_to_step(2), Ok(2));
    }

    #[test]
    fn editing_a_completed_step_requires_revalidation() {
        let mut wizard = session(WizardOptions::default());
        wizard.update_field("amount", 10).unwrap();
        wizard.update_field("name", "Trip").unwrap();
        wizard.go_next();
        wizard.go_next();
        wizard.go_to_step(0).unwrap();
        assert!(wizard.is_step_complete(0));

        wizard.update_field("name", "Trip to Oslo").unwrap();
        assert!(wizard.is_step_complete(0));
        assert!(!wizard.is_step_complete(1));

        wizard.update_field("amount", -5).unwrap();
        assert!(!wizard.is_step_complete(0));
        assert_eq!(
            wizard.go_to_step(2),
            Err(NavigationDenied::Unvalidated { step: 0 })
        );
        assert_eq!(wizard.current_step_index(), 0);
    }

    #[test]
    fn submit_checks_every_step() {
        let mut wizard = session(WizardOptions {
            allow_skip_steps: true,
            ..WizardOptions::default()
        });
        wizard.update_field("amount", -5).unwrap();
        wizard.update_field("name", "Trip").unwrap();
        wizard.go_to_step(2).unwrap();
        match wizard.begin_submit() {
            Err(SubmitBlocked::Invalid { step, errors }) => {
                assert_eq!(step, 0);
                assert_eq!(errors.first("amount"), Some("Must be 0 or more"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!wizard.is_submitting());
        assert!(wizard.should_show_errors(0));
    }

    #[test]
    fn skip_option_allows_any_jump() {
        let mut wizard = session(WizardOptions {
            allow_skip_steps: true,
            ..WizardOptions::default()
        });
        assert_eq!(wizard.go_to_step(2), Ok(2));
    }

    #[test]
    fn step_reset_clears_forward_validation_state() {
        let mut wizard = session(WizardOptions {
            allow_step_reset: true,
            ..WizardOptions::default()
        });
        wizard.update_field("amount", 1).unwrap();
        wizard.update_field("name", "Trip").unwrap();
        wizard.go_next();
        wizard.go_next();
        assert!(wizard.is_step_complete(1));
        wizard.go_to_step(0).unwrap();
        assert!(!wizard.is_step_complete(1));
        assert!(wizard.is_step_complete(0));
        assert!(wizard.go_to_step(2).is_err());
    }

    #[test]
    fn rehydration_is_idempotent() {
        let initial = FormValues::from_json(json!({"amount": 42, "name": "Trip"})).unwrap();
        let first =
            WizardSession::new("t", three_steps(), initial.clone(), WizardOptions::default())
                .unwrap();
        let second =
            WizardSession::new("t", three_steps(), initial, WizardOptions::default()).unwrap();
        assert_eq!(first.values(), second.values());
        assert_eq!(first.current_step_index(), 0);
        assert_eq!(second.current_step_index(), 0);
    }

    #[test]
    fn submit_requires_last_step() {
        let mut wizard = session(WizardOptions::default());
        assert_eq!(
            wizard.begin_submit().unwrap_err(),
            SubmitBlocked::NotOnLastStep { current: 0, last: 2 }
        );
        assert!(!wizard.is_submitting());
    }

    #[test]
    fn double_submit_is_blocked() {
        let mut wizard = session(WizardOptions {
            allow_skip_steps: true,
            ..WizardOptions::default()
        });
        wizard.update_field("amount", 1).unwrap();
        wizard.update_field("name", "Trip").unwrap();
        wizard.go_to_step(2).unwrap();
        let ticket = wizard.begin_submit().unwrap();
        assert_eq!(ticket.values().get_str("name"), Some("Trip"));
        assert!(wizard.is_submitting());
        assert_eq!(wizard.state(), WizardState::Submitting);
        assert_eq!(
            wizard.begin_submit().unwrap_err(),
            SubmitBlocked::AlreadySubmitting
        );
        assert_eq!(wizard.go_next(), StepOutcome::Locked);
        assert_eq!(wizard.go_to_step(0), Err(NavigationDenied::Locked));

        wizard.finish_submit(false);
        assert!(!wizard.is_submitting());
        assert_eq!(wizard.state(), WizardState::Editing(2));

        wizard.begin_submit().unwrap();
        wizard.finish_submit(true);
        assert_eq!(wizard.state(), WizardState::Done);
        assert_eq!(wizard.begin_submit().unwrap_err(), SubmitBlocked::Closed);
        assert!(matches!(
            wizard.update_field("amount", 1),
            Err(WishError::SessionClosed)
        ));
    }

    #[test]
    fn reset_restores_initial_state() {
        let initial = FormValues::new().with("amount", 5).unwrap();
        let mut wizard =
            WizardSession::new("t", three_steps(), initial.clone(), WizardOptions::default())
                .unwrap();
        wizard.update_field("amount", 50).unwrap();
        wizard.go_next();
        wizard.reset();
        assert_eq!(wizard.values(), &initial);
        assert_eq!(wizard.current_step_index(), 0);
        assert!(!wizard.was_visited(0));
    }

    #[test]
    fn progress_reports_position() {
        let mut wizard = session(WizardOptions::default());
        wizard.update_field("amount", 5).unwrap();
        wizard.go_next();
        let progress = wizard.progress();
        assert_eq!(progress.position, 2);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.title, "Name");
        assert_eq!(progress.percent, 66);
    }
}

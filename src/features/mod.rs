//! Concrete wizards built on the engine in [`crate::wizard`].
//!
//! Each flow declares one full schema for its data and hands every step the
//! `pick` of the keys that step owns.

pub mod budget_planner;
pub mod goal_form;
pub mod wish_clarity;

use serde::Serialize;
use serde_json::Value;

use crate::errors::{Result, WishError};
use crate::wizard::{FormValues, ObjectSchema, Step};

pub use budget_planner::{BudgetLine, BudgetPlan, BudgetPlanner};
pub use goal_form::{GoalDraft, GoalForm, GoalFrequency};
pub use wish_clarity::{ClarityPlan, WishClarityCoach};

/// Describes a wizard: its steps, their defaults and how the collected values
/// become a typed result.
pub trait WizardFlow {
    type Output: Serialize;

    /// Stable identifier used for drafts and the CLI.
    fn name(&self) -> &'static str;

    fn title(&self) -> &'static str;

    fn summary(&self) -> &'static str {
        ""
    }

    fn schema(&self) -> ObjectSchema;

    fn steps(&self) -> Vec<Step>;

    fn defaults(&self) -> FormValues {
        FormValues::new()
    }

    fn commit(&self, values: &FormValues) -> Result<Self::Output>;
}

/// Object-safe view of a [`WizardFlow`] with a JSON result, used where the
/// concrete flow is picked at runtime.
pub trait AnyWizard {
    fn name(&self) -> &'static str;
    fn title(&self) -> &'static str;
    fn summary(&self) -> &'static str;
    fn steps(&self) -> Vec<Step>;
    fn defaults(&self) -> FormValues;
    fn commit_json(&self, values: &FormValues) -> Result<Value>;
}

impl<W: WizardFlow> AnyWizard for W {
    fn name(&self) -> &'static str {
        WizardFlow::name(self)
    }

    fn title(&self) -> &'static str {
        WizardFlow::title(self)
    }

    fn summary(&self) -> &'static str {
        WizardFlow::summary(self)
    }

    fn steps(&self) -> Vec<Step> {
        WizardFlow::steps(self)
    }

    fn defaults(&self) -> FormValues {
        WizardFlow::defaults(self)
    }

    fn commit_json(&self, values: &FormValues) -> Result<Value> {
        let output = self.commit(values)?;
        Ok(serde_json::to_value(output)?)
    }
}

/// Every wizard the CLI can run, in display order.
pub fn registry() -> Vec<Box<dyn AnyWizard>> {
    vec![
        Box::new(BudgetPlanner),
        Box::new(WishClarityCoach),
        Box::new(GoalForm::create(chrono::Local::now().date_naive())),
    ]
}

/// Looks a wizard up by name, suggesting the closest match on a miss.
pub fn find_wizard(name: &str) -> Result<Box<dyn AnyWizard>> {
    let wanted = name.trim().to_lowercase();
    let mut wizards = registry();
    if let Some(index) = wizards.iter().position(|wizard| wizard.name() == wanted) {
        return Ok(wizards.swap_remove(index));
    }
    let names: Vec<&str> = wizards.iter().map(|wizard| wizard.name()).collect();
    let message = match suggest(&wanted, &names) {
        Some(candidate) => format!("{} (did you mean `{}`?)", name, candidate),
        None => name.to_string(),
    };
    Err(WishError::WizardNotFound(message))
}

/// Closest candidate by Levenshtein distance, when reasonably close.
pub fn suggest<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|candidate| (strsim::levenshtein(input, candidate), *candidate))
        .filter(|(distance, candidate)| *distance <= 3.max(candidate.len() / 3))
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}

/// Validates the whole aggregate against a flow's schema before commit.
pub(crate) fn parse_all(schema: &ObjectSchema, values: &FormValues) -> Result<FormValues> {
    schema
        .safe_parse(values)
        .map_err(|errors| WishError::InvalidInput(errors.to_string()))
}

pub(crate) fn amount(values: &FormValues, path: &str) -> f64 {
    values.get_f64(path).unwrap_or(0.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names_are_unique() {
        let wizards = registry();
        let mut names: Vec<_> = wizards.iter().map(|w| w.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), wizards.len());
    }

    #[test]
    fn find_is_case_insensitive() {
        assert_eq!(find_wizard("Budget-Planner").unwrap().name(), "budget-planner");
    }

    #[test]
    fn unknown_wizard_suggests_closest_name() {
        let err = find_wizard("budget-planer").err().unwrap();
        assert_eq!(
            err.to_string(),
            "Wizard not found: budget-planer (did you mean `budget-planner`?)"
        );
        let err = find_wizard("zzzzzzzzzzzzzzzzzzzz").err().unwrap();
        assert!(!err.to_string().contains("did you mean"));
    }

    #[test]
    fn every_step_schema_is_a_pick_of_the_full_schema() {
        for wizard in registry() {
            for step in wizard.steps() {
                assert!(!step.fields.is_empty() || step.schema.is_none(), "{}", step.title);
                for field in &step.fields {
                    if let Some(schema) = &step.schema {
                        assert!(
                            schema.get(field.key).is_some(),
                            "{}: {} has no rule",
                            wizard.name(),
                            field.key
                        );
                    }
                }
            }
        }
    }
}

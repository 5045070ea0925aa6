use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, WishError};
use crate::features::{amount, parse_all, WizardFlow};
use crate::wizard::schema::DATE_FORMAT;
use crate::wizard::{FieldDescriptor, FieldKind, FieldSchema, FormValues, ObjectSchema, Step};

pub const GOAL_CATEGORIES: [&str; 5] = ["Health", "Career", "Finance", "Learning", "Personal"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl GoalFrequency {
    pub const ALL: [GoalFrequency; 3] = [
        GoalFrequency::Daily,
        GoalFrequency::Weekly,
        GoalFrequency::Monthly,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GoalFrequency::Daily => "daily",
            GoalFrequency::Weekly => "weekly",
            GoalFrequency::Monthly => "monthly",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|freq| freq.label().eq_ignore_ascii_case(label))
    }
}

/// Goal data produced by the form. `id` is set when editing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalDraft {
    pub id: Option<Uuid>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub start_date: NaiveDate,
    pub frequency: GoalFrequency,
    pub target_per_period: u32,
}

enum GoalFormMode {
    Create,
    Edit(GoalDraft),
}

/// Two step goal editor used for both creation and updates.
pub struct GoalForm {
    mode: GoalFormMode,
    today: NaiveDate,
}

impl GoalForm {
    pub fn create(today: NaiveDate) -> Self {
        Self {
            mode: GoalFormMode::Create,
            today,
        }
    }

    pub fn edit(existing: GoalDraft, today: NaiveDate) -> Self {
        Self {
            mode: GoalFormMode::Edit(existing),
            today,
        }
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.mode, GoalFormMode::Edit(_))
    }
}

impl WizardFlow for GoalForm {
    type Output = GoalDraft;

    fn name(&self) -> &'static str {
        "goal"
    }

    fn title(&self) -> &'static str {
        if self.is_edit() {
            "Edit Goal"
        } else {
            "New Goal"
        }
    }

    fn summary(&self) -> &'static str {
        "Create a recurring goal"
    }

    fn schema(&self) -> ObjectSchema {
        let frequencies: Vec<&str> = GoalFrequency::ALL.iter().map(|f| f.label()).collect();
        ObjectSchema::new()
            .field("goal.title", FieldSchema::text().min_len(3).max_len(80))
            .field(
                "goal.description",
                FieldSchema::text().max_len(500).optional(),
            )
            .field("goal.category", FieldSchema::choice(GOAL_CATEGORIES))
            .field("schedule.start_date", FieldSchema::date())
            .field("schedule.frequency", FieldSchema::choice(frequencies))
            .field(
                "schedule.target_per_period",
                FieldSchema::integer()
                    .min(1.0)
                    .max(100.0)
                    .message("Pick between 1 and 100 check-ins"),
            )
    }

    fn steps(&self) -> Vec<Step> {
        let schema = self.schema();
        vec![
            Step::new("Goal")
                .with_schema(schema.pick(&["goal.title", "goal.description", "goal.category"]))
                .field(FieldDescriptor::text("goal.title", "Title"))
                .field(FieldDescriptor::text("goal.description", "Description"))
                .field(FieldDescriptor::new(
                    "goal.category",
                    "Category",
                    FieldKind::Choice(GOAL_CATEGORIES.iter().map(|c| c.to_string()).collect()),
                )),
            Step::new("Schedule")
                .with_schema(schema.pick(&[
                    "schedule.start_date",
                    "schedule.frequency",
                    "schedule.target_per_period",
                ]))
                .field(FieldDescriptor::new(
                    "schedule.start_date",
                    "Start date",
                    FieldKind::Date,
                ))
                .field(FieldDescriptor::new(
                    "schedule.frequency",
                    "Frequency",
                    FieldKind::Choice(
                        GoalFrequency::ALL
                            .iter()
                            .map(|f| f.label().to_string())
                            .collect(),
                    ),
                ))
                .field(
                    FieldDescriptor::new(
                        "schedule.target_per_period",
                        "Check-ins per period",
                        FieldKind::Integer { min: 1, max: 100 },
                    )
                    .with_help("How many times per period you want to work on it."),
                ),
        ]
    }

    fn defaults(&self) -> FormValues {
        let mut values = FormValues::new();
        match &self.mode {
            GoalFormMode::Create => {
                let _ = values.set(
                    "schedule.start_date",
                    self.today.format(DATE_FORMAT).to_string(),
                );
                let _ = values.set("schedule.frequency", GoalFrequency::Weekly.label());
                let _ = values.set("schedule.target_per_period", 1);
            }
            GoalFormMode::Edit(existing) => {
                let _ = values.set("goal.title", existing.title.as_str());
                if let Some(description) = &existing.description {
                    let _ = values.set("goal.description", description.as_str());
                }
                let _ = values.set("goal.category", existing.category.as_str());
                let _ = values.set(
                    "schedule.start_date",
                    existing.start_date.format(DATE_FORMAT).to_string(),
                );
                let _ = values.set("schedule.frequency", existing.frequency.label());
                let _ = values.set("schedule.target_per_period", existing.target_per_period);
            }
        }
        values
    }

    fn commit(&self, values: &FormValues) -> Result<GoalDraft> {
        let parsed = parse_all(&self.schema(), values)?;
        let text = |path: &str| parsed.get_str(path).map(str::to_string);
        let start_date = parsed
            .get_str("schedule.start_date")
            .and_then(|raw| NaiveDate::parse_from_str(raw, DATE_FORMAT).ok())
            .ok_or_else(|| WishError::InvalidInput("schedule.start_date is not a date".into()))?;
        let frequency = parsed
            .get_str("schedule.frequency")
            .and_then(GoalFrequency::from_label)
            .ok_or_else(|| WishError::InvalidInput("unknown schedule.frequency".into()))?;

        let id = match &self.mode {
            GoalFormMode::Create => None,
            GoalFormMode::Edit(existing) => existing.id,
        };
        Ok(GoalDraft {
            id,
            title: text("goal.title").unwrap_or_default(),
            description: text("goal.description").filter(|d| !d.is_empty()),
            category: text("goal.category").unwrap_or_default(),
            start_date,
            frequency,
            target_per_period: amount(&parsed, "schedule.target_per_period") as u32,
        })
    }
}

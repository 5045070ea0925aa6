use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, WishError};
use crate::features::{amount, parse_all, WizardFlow};
use crate::wizard::schema::DATE_FORMAT;
use crate::wizard::{FieldDescriptor, FieldKind, FieldSchema, FormValues, ObjectSchema, Step};

pub const CATEGORIES: [&str; 7] = [
    "Health",
    "Career",
    "Finance",
    "Relationships",
    "Learning",
    "Travel",
    "Personal",
];

/// Result of the clarity coach: a single sentence wish, a score describing
/// how concrete it is and the prompt handed to the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarityPlan {
    pub statement: String,
    pub category: String,
    pub clarity_score: u8,
    pub days_available: i64,
    pub first_step: String,
    pub coaching_prompt: String,
}

/// Eight questions that turn a vague wish into a measurable, dated goal.
#[derive(Debug, Clone, Copy, Default)]
pub struct WishClarityCoach;

impl WizardFlow for WishClarityCoach {
    type Output = ClarityPlan;

    fn name(&self) -> &'static str {
        "wish-clarity"
    }

    fn title(&self) -> &'static str {
        "Wish Clarity Coach"
    }

    fn summary(&self) -> &'static str {
        "Turn a wish into a concrete, measurable plan"
    }

    fn schema(&self) -> ObjectSchema {
        ObjectSchema::new()
            .field("wish.title", FieldSchema::text().min_len(3).max_len(120))
            .field("wish.category", FieldSchema::choice(CATEGORIES))
            .field("why.reason", FieldSchema::text().min_len(10).max_len(500))
            .field("vision.success", FieldSchema::text().min_len(10).max_len(500))
            .field("measure.metric", FieldSchema::text().min_len(1).max_len(80))
            .field("measure.target", FieldSchema::integer().min(1.0))
            .field("obstacles.main", FieldSchema::text().min_len(3))
            .field("obstacles.plan", FieldSchema::text().min_len(3))
            .field("resources.support", FieldSchema::text().max_len(200).optional())
            .field(
                "resources.hours_per_week",
                FieldSchema::integer().min(0.0).max(80.0),
            )
            .field("timeline.start", FieldSchema::date())
            .field("timeline.target_date", FieldSchema::date())
            .field("commitment.level", FieldSchema::integer().min(1.0).max(10.0))
            .field("commitment.first_step", FieldSchema::text().min_len(3))
            .refine(
                &["timeline.start", "timeline.target_date"],
                "timeline.target_date",
                target_after_start,
            )
    }

    fn steps(&self) -> Vec<Step> {
        let schema = self.schema();
        vec![
            Step::new("Wish")
                .with_description("Name the wish in a few words.")
                .with_schema(schema.pick(&["wish.title", "wish.category"]))
                .field(FieldDescriptor::text("wish.title", "Your wish"))
                .field(FieldDescriptor::new(
                    "wish.category",
                    "Category",
                    FieldKind::Choice(CATEGORIES.iter().map(|c| c.to_string()).collect()),
                )),
            Step::new("Why")
                .with_schema(schema.pick(&["why.reason"]))
                .field(
                    FieldDescriptor::text("why.reason", "Why does it matter?")
                        .with_help("At least one full sentence."),
                ),
            Step::new("Vision")
                .with_schema(schema.pick(&["vision.success"]))
                .field(FieldDescriptor::text(
                    "vision.success",
                    "What does success look like?",
                )),
            Step::new("Measure")
                .with_schema(schema.pick(&["measure.metric", "measure.target"]))
                .field(
                    FieldDescriptor::text("measure.metric", "Metric")
                        .with_help("A unit you can count, e.g. `km run` or `pages written`."),
                )
                .field(FieldDescriptor::new(
                    "measure.target",
                    "Target",
                    FieldKind::Integer {
                        min: 1,
                        max: 1_000_000,
                    },
                )),
            Step::new("Obstacles")
                .with_schema(schema.pick(&["obstacles.main", "obstacles.plan"]))
                .field(FieldDescriptor::text("obstacles.main", "Biggest obstacle"))
                .field(FieldDescriptor::text("obstacles.plan", "How you will handle it")),
            Step::new("Resources")
                .with_schema(schema.pick(&["resources.support", "resources.hours_per_week"]))
                .field(FieldDescriptor::text(
                    "resources.support",
                    "People or tools that help",
                ))
                .field(FieldDescriptor::new(
                    "resources.hours_per_week",
                    "Hours per week",
                    FieldKind::Integer { min: 0, max: 80 },
                )),
            Step::new("Timeline")
                .with_schema(schema.pick(&["timeline.start", "timeline.target_date"]))
                .field(FieldDescriptor::new("timeline.start", "Start date", FieldKind::Date))
                .field(FieldDescriptor::new(
                    "timeline.target_date",
                    "Target date",
                    FieldKind::Date,
                )),
            Step::new("Commitment")
                .with_schema(schema.pick(&["commitment.level", "commitment.first_step"]))
                .field(
                    FieldDescriptor::new(
                        "commitment.level",
                        "Commitment (1-10)",
                        FieldKind::Integer { min: 1, max: 10 },
                    )
                    .with_help("How sure are you that you will follow through?"),
                )
                .field(FieldDescriptor::text(
                    "commitment.first_step",
                    "First step this week",
                )),
        ]
    }

    fn defaults(&self) -> FormValues {
        let mut values = FormValues::new();
        let _ = values.set("resources.hours_per_week", 2);
        let _ = values.set("commitment.level", 7);
        values
    }

    fn commit(&self, values: &FormValues) -> Result<ClarityPlan> {
        let parsed = parse_all(&self.schema(), values)?;
        let text = |path: &str| parsed.get_str(path).unwrap_or_default().to_string();
        let date = |path: &str| {
            parsed
                .get_str(path)
                .and_then(|raw| NaiveDate::parse_from_str(raw, DATE_FORMAT).ok())
                .ok_or_else(|| WishError::InvalidInput(format!("{} is not a date", path)))
        };

        let start = date("timeline.start")?;
        let target = date("timeline.target_date")?;
        let days_available = (target - start).num_days();

        let title = text("wish.title");
        let reason = text("why.reason");
        let metric = text("measure.metric");
        let goal_count = amount(&parsed, "measure.target") as i64;
        let statement = format!(
            "I will {} ({} {}) by {} because {}",
            lowercase_first(&title),
            goal_count,
            metric,
            target.format(DATE_FORMAT),
            reason.trim_end_matches('.')
        );

        let clarity_score = clarity_score(&parsed, days_available);
        let coaching_prompt = format!(
            "Coach me on this {} goal: \"{}\". Success looks like: {}. Main obstacle: {} (plan: {}). \
             I can spend {} hours per week and rate my commitment {}/10. Suggest weekly milestones \
             over {} days starting with: {}.",
            text("wish.category").to_lowercase(),
            title,
            text("vision.success"),
            text("obstacles.main"),
            text("obstacles.plan"),
            amount(&parsed, "resources.hours_per_week") as i64,
            amount(&parsed, "commitment.level") as i64,
            days_available,
            text("commitment.first_step"),
        );

        tracing::info!(score = clarity_score, days = days_available, "clarity plan committed");
        Ok(ClarityPlan {
            statement: format!("{}.", statement),
            category: text("wish.category"),
            clarity_score,
            days_available,
            first_step: text("commitment.first_step"),
            coaching_prompt,
        })
    }
}

fn target_after_start(values: &FormValues) -> std::result::Result<(), String> {
    let date = |path: &str| {
        values
            .get_str(path)
            .and_then(|raw| NaiveDate::parse_from_str(raw, DATE_FORMAT).ok())
    };
    match (date("timeline.start"), date("timeline.target_date")) {
        (Some(start), Some(target)) if target <= start => {
            Err("Must be after the start date".into())
        }
        _ => Ok(()),
    }
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 0-100 heuristic rewarding detailed answers, time and commitment.
fn clarity_score(values: &FormValues, days_available: i64) -> u8 {
    let length = |path: &str| values.get_str(path).map_or(0, |text| text.chars().count());
    let mut score = 0.0;
    if length("wish.title") >= 10 {
        score += 10.0;
    }
    score += if length("why.reason") >= 40 { 15.0 } else { 5.0 };
    score += if length("vision.success") >= 40 { 15.0 } else { 5.0 };
    if amount(values, "measure.target") > 0.0 {
        score += 15.0;
    }
    if length("obstacles.plan") >= 20 {
        score += 10.0;
    }
    if amount(values, "resources.hours_per_week") > 0.0 {
        score += 10.0;
    }
    if days_available >= 14 {
        score += 10.0;
    }
    score += amount(values, "commitment.level") * 1.5;
    score.clamp(0.0, 100.0).round() as u8
}

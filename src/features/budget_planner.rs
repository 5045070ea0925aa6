use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;
use crate::features::{amount, parse_all, round2, WizardFlow};
use crate::wizard::{FieldDescriptor, FieldKind, FieldSchema, FormValues, ObjectSchema, Step};

const MAX_AMOUNT: f64 = 10_000_000.0;

const INCOME_KEYS: [&str; 2] = ["income.monthly", "income.other"];
const HOUSING_KEYS: [&str; 2] = ["housing.rent", "housing.utilities"];
const ESSENTIAL_KEYS: [&str; 3] = [
    "essentials.groceries",
    "essentials.transport",
    "essentials.insurance",
];
const DEBT_KEYS: [&str; 1] = ["debt.payments"];
const LIFESTYLE_KEYS: [&str; 3] = [
    "lifestyle.dining",
    "lifestyle.entertainment",
    "lifestyle.subscriptions",
];
const SAVINGS_KEYS: [&str; 2] = ["savings.rate", "savings.emergency_months"];
const REVIEW_KEYS: [&str; 1] = ["review.confirmed"];

/// Monthly spending for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub category: String,
    pub amount: f64,
    /// Percent of monthly income.
    pub share_of_income: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetPlan {
    pub monthly_income: f64,
    pub lines: Vec<BudgetLine>,
    pub total_expenses: f64,
    pub savings_rate: f64,
    pub savings_target: f64,
    pub emergency_fund_target: f64,
    /// Income left after expenses and the savings target. Negative when the
    /// plan overspends.
    pub surplus: f64,
}

impl BudgetPlan {
    pub fn is_balanced(&self) -> bool {
        self.surplus >= 0.0
    }
}

/// Seven step monthly budget: income, fixed costs, discretionary spending and
/// a savings goal.
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetPlanner;

fn money(min: f64) -> FieldSchema {
    FieldSchema::number().min(min).max(MAX_AMOUNT)
}

impl WizardFlow for BudgetPlanner {
    type Output = BudgetPlan;

    fn name(&self) -> &'static str {
        "budget-planner"
    }

    fn title(&self) -> &'static str {
        "Budget Planner"
    }

    fn summary(&self) -> &'static str {
        "Plan a monthly budget with a savings target"
    }

    fn schema(&self) -> ObjectSchema {
        ObjectSchema::new()
            .field(
                "income.monthly",
                money(1.0).message("Enter your monthly take-home income"),
            )
            .field("income.other", money(0.0))
            .field("housing.rent", money(0.0))
            .field("housing.utilities", money(0.0))
            .field("essentials.groceries", money(0.0))
            .field("essentials.transport", money(0.0))
            .field("essentials.insurance", money(0.0))
            .field("debt.payments", money(0.0))
            .field("lifestyle.dining", money(0.0))
            .field("lifestyle.entertainment", money(0.0))
            .field("lifestyle.subscriptions", money(0.0))
            .field("savings.rate", FieldSchema::number().min(0.0).max(100.0))
            .field(
                "savings.emergency_months",
                FieldSchema::integer().min(0.0).max(24.0),
            )
            .field(
                "review.confirmed",
                FieldSchema::custom(|value| match value.as_bool() {
                    Some(true) => Ok(Value::Bool(true)),
                    _ => Err("Confirm the plan to finish".to_string()),
                }),
            )
    }

    fn steps(&self) -> Vec<Step> {
        let schema = self.schema();
        vec![
            Step::new("Income")
                .with_description("What reaches your account each month after tax.")
                .with_schema(schema.pick(&INCOME_KEYS))
                .field(FieldDescriptor::currency("income.monthly", "Monthly income"))
                .field(
                    FieldDescriptor::currency("income.other", "Other income")
                        .with_help("Side jobs, benefits or rental income."),
                ),
            Step::new("Housing")
                .with_schema(schema.pick(&HOUSING_KEYS))
                .field(FieldDescriptor::currency("housing.rent", "Rent or mortgage"))
                .field(FieldDescriptor::currency("housing.utilities", "Utilities")),
            Step::new("Essentials")
                .with_schema(schema.pick(&ESSENTIAL_KEYS))
                .field(FieldDescriptor::currency("essentials.groceries", "Groceries"))
                .field(FieldDescriptor::currency("essentials.transport", "Transport"))
                .field(FieldDescriptor::currency("essentials.insurance", "Insurance")),
            Step::new("Debt")
                .with_schema(schema.pick(&DEBT_KEYS))
                .field(
                    FieldDescriptor::currency("debt.payments", "Debt payments")
                        .with_help("Minimum monthly payments across loans and cards."),
                ),
            Step::new("Lifestyle")
                .with_schema(schema.pick(&LIFESTYLE_KEYS))
                .field(FieldDescriptor::currency("lifestyle.dining", "Dining out"))
                .field(FieldDescriptor::currency(
                    "lifestyle.entertainment",
                    "Entertainment",
                ))
                .field(FieldDescriptor::currency(
                    "lifestyle.subscriptions",
                    "Subscriptions",
                )),
            Step::new("Savings")
                .with_schema(schema.pick(&SAVINGS_KEYS))
                .field(
                    FieldDescriptor::percent("savings.rate", "Savings rate")
                        .with_help("Share of income set aside every month."),
                )
                .field(
                    FieldDescriptor::new(
                        "savings.emergency_months",
                        "Emergency fund (months)",
                        FieldKind::Integer { min: 0, max: 24 },
                    )
                    .with_help("Months of essential costs to keep in reserve."),
                ),
            Step::new("Review")
                .with_schema(schema.pick(&REVIEW_KEYS))
                .field(FieldDescriptor::new(
                    "review.confirmed",
                    "Save this plan?",
                    FieldKind::Boolean,
                )),
        ]
    }

    fn defaults(&self) -> FormValues {
        let mut values = FormValues::new();
        let zeroed = INCOME_KEYS[1..]
            .iter()
            .chain(&HOUSING_KEYS)
            .chain(&ESSENTIAL_KEYS)
            .chain(&DEBT_KEYS)
            .chain(&LIFESTYLE_KEYS);
        for key in zeroed {
            // Keys are static and well formed.
            let _ = values.set(key, 0);
        }
        let _ = values.set("savings.rate", 10);
        let _ = values.set("savings.emergency_months", 3);
        values
    }

    fn commit(&self, values: &FormValues) -> Result<BudgetPlan> {
        let parsed = parse_all(&self.schema(), values)?;
        let income = amount(&parsed, "income.monthly") + amount(&parsed, "income.other");
        let sum = |keys: &[&str]| keys.iter().map(|key| amount(&parsed, key)).sum::<f64>();

        let housing = sum(&HOUSING_KEYS);
        let essentials = sum(&ESSENTIAL_KEYS);
        let debt = sum(&DEBT_KEYS);
        let lifestyle = sum(&LIFESTYLE_KEYS);
        let line = |category: &str, amount: f64| BudgetLine {
            category: category.to_string(),
            amount: round2(amount),
            share_of_income: round2(amount / income * 100.0),
        };
        let lines = vec![
            line("Housing", housing),
            line("Essentials", essentials),
            line("Debt", debt),
            line("Lifestyle", lifestyle),
        ];

        let total_expenses = housing + essentials + debt + lifestyle;
        let savings_rate = amount(&parsed, "savings.rate");
        let savings_target = income * savings_rate / 100.0;
        let months = amount(&parsed, "savings.emergency_months");
        let plan = BudgetPlan {
            monthly_income: round2(income),
            lines,
            total_expenses: round2(total_expenses),
            savings_rate,
            savings_target: round2(savings_target),
            emergency_fund_target: round2((housing + essentials + debt) * months),
            surplus: round2(income - total_expenses - savings_target),
        };
        tracing::info!(
            income = plan.monthly_income,
            surplus = plan.surplus,
            "budget plan committed"
        );
        Ok(plan)
    }
}

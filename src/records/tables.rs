//! Static description of every user-owned table: name, writable columns and
//! list order. Column and table names used in SQL come only from here.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// How a payload value must look before it is handed to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Text,
    /// `YYYY-MM-DD`, optionally followed by a time part.
    Date,
    /// JSON number or numeric string; stored as NUMERIC.
    Numeric,
    /// 32-bit integer.
    Integer,
    Bool,
    /// Free-form JSONB.
    Json,
    Uuid,
    UuidArray,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: Kind,
    /// NOT NULL without a default: must be present on insert.
    pub required: bool,
    /// NOT NULL with a default: may be omitted, never set to null.
    pub defaulted: bool,
}

impl Column {
    pub fn nullable(&self) -> bool {
        !(self.required || self.defaulted)
    }
}

const fn col(name: &'static str, kind: Kind) -> Column {
    Column { name, kind, required: false, defaulted: false }
}

const fn required(name: &'static str, kind: Kind) -> Column {
    Column { name, kind, required: true, defaulted: false }
}

const fn defaulted(name: &'static str, kind: Kind) -> Column {
    Column { name, kind, required: false, defaulted: true }
}

use Kind::*;

const BODY_METRICS: &[Column] = &[
    required("date", Date),
    col("weight", Numeric),
    col("body_fat", Numeric),
    col("muscle_mass", Numeric),
    col("measurements", Json),
    col("notes", Text),
];

const WORKOUTS: &[Column] = &[
    required("date", Date),
    col("type", Text),
    col("exercises", Json),
    col("duration", Integer),
    col("notes", Text),
];

const MEALS: &[Column] = &[
    required("date", Date),
    col("meal_type", Text),
    col("foods", Json),
    col("protein", Numeric),
    col("carbs", Numeric),
    col("fat", Numeric),
    col("fiber", Numeric),
    col("calories", Integer),
    col("notes", Text),
];

const HABITS: &[Column] = &[required("name", Text), col("frequency", Text)];

const TRAINING_SESSIONS: &[Column] = &[
    required("date", Date),
    col("sport", Text),
    col("performance", Json),
    col("notes", Text),
];

const COMPETITIONS: &[Column] = &[
    required("date", Date),
    col("event", Text),
    col("results", Json),
    col("notes", Text),
];

const RECOVERY_LOGS: &[Column] = &[
    required("date", Date),
    col("sleep_hours", Numeric),
    col("sleep_quality", Integer),
    col("soreness", Integer),
    col("energy", Integer),
    col("stress", Integer),
    col("notes", Text),
];

const TRANSACTIONS: &[Column] = &[
    required("date", Date),
    required("amount", Numeric),
    col("category", Text),
    col("subcategory", Text),
    col("type", Text),
    defaulted("is_shared", Bool),
    col("notes", Text),
    col("receipt_url", Text),
];

const BUDGETS: &[Column] = &[
    required("category", Text),
    col("monthly_limit", Numeric),
    defaulted("rollover", Bool),
];

const SAVINGS_GOALS: &[Column] = &[
    required("name", Text),
    required("target_amount", Numeric),
    defaulted("current_amount", Numeric),
    col("deadline", Date),
    col("priority", Integer),
];

const COUNTRY_COMPARISONS: &[Column] = &[
    col("name", Text),
    col("country_ids", UuidArray),
    col("notes", Text),
];

const RELOCATION_PLANS: &[Column] = &[
    col("target_country_id", Uuid),
    col("target_date", Date),
    col("savings_target", Numeric),
    defaulted("current_savings", Numeric),
    col("monthly_contribution", Numeric),
    col("checklist", Json),
];

const PETS: &[Column] = &[
    required("name", Text),
    col("type", Text),
    col("breed", Text),
    col("age", Integer),
    col("weight", Numeric),
    col("medical_records", Json),
];

/// A display column pulled from a referenced table when listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    pub foreign_key: &'static str,
    pub table: &'static str,
    pub column: &'static str,
    pub alias: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnedTable {
    BodyMetrics,
    Workouts,
    Meals,
    Habits,
    TrainingSessions,
    Competitions,
    RecoveryLogs,
    Transactions,
    Budgets,
    SavingsGoals,
    CountryComparisons,
    RelocationPlans,
    Pets,
}

impl OwnedTable {
    #[cfg(test)]
    pub const ALL: [OwnedTable; 13] = [
        OwnedTable::BodyMetrics,
        OwnedTable::Workouts,
        OwnedTable::Meals,
        OwnedTable::Habits,
        OwnedTable::TrainingSessions,
        OwnedTable::Competitions,
        OwnedTable::RecoveryLogs,
        OwnedTable::Transactions,
        OwnedTable::Budgets,
        OwnedTable::SavingsGoals,
        OwnedTable::CountryComparisons,
        OwnedTable::RelocationPlans,
        OwnedTable::Pets,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OwnedTable::BodyMetrics => "body_metrics",
            OwnedTable::Workouts => "workouts",
            OwnedTable::Meals => "meals",
            OwnedTable::Habits => "habits",
            OwnedTable::TrainingSessions => "training_sessions",
            OwnedTable::Competitions => "competitions",
            OwnedTable::RecoveryLogs => "recovery_logs",
            OwnedTable::Transactions => "transactions",
            OwnedTable::Budgets => "budgets",
            OwnedTable::SavingsGoals => "savings_goals",
            OwnedTable::CountryComparisons => "country_comparisons",
            OwnedTable::RelocationPlans => "relocation_plans",
            OwnedTable::Pets => "pets",
        }
    }

    /// Columns a client may set. `id`, `user_id` and `created_at` never appear here.
    pub fn columns(self) -> &'static [Column] {
        match self {
            OwnedTable::BodyMetrics => BODY_METRICS,
            OwnedTable::Workouts => WORKOUTS,
            OwnedTable::Meals => MEALS,
            OwnedTable::Habits => HABITS,
            OwnedTable::TrainingSessions => TRAINING_SESSIONS,
            OwnedTable::Competitions => COMPETITIONS,
            OwnedTable::RecoveryLogs => RECOVERY_LOGS,
            OwnedTable::Transactions => TRANSACTIONS,
            OwnedTable::Budgets => BUDGETS,
            OwnedTable::SavingsGoals => SAVINGS_GOALS,
            OwnedTable::CountryComparisons => COUNTRY_COMPARISONS,
            OwnedTable::RelocationPlans => RELOCATION_PLANS,
            OwnedTable::Pets => PETS,
        }
    }

    pub fn lookup(self) -> Option<Lookup> {
        match self {
            OwnedTable::RelocationPlans => Some(Lookup {
                foreign_key: "target_country_id",
                table: "countries",
                column: "name",
                alias: "country_name",
            }),
            _ => None,
        }
    }

    /// Primary sort keys. `created_at DESC, id ASC` always follow as tie-breakers.
    pub fn order(self) -> &'static [(&'static str, Direction)] {
        match self {
            OwnedTable::BodyMetrics
            | OwnedTable::Workouts
            | OwnedTable::Meals
            | OwnedTable::TrainingSessions
            | OwnedTable::Competitions
            | OwnedTable::RecoveryLogs
            | OwnedTable::Transactions => &[("date", Direction::Desc)],
            OwnedTable::SavingsGoals => &[("priority", Direction::Asc), ("deadline", Direction::Asc)],
            OwnedTable::RelocationPlans => &[("target_date", Direction::Asc)],
            OwnedTable::Habits
            | OwnedTable::Budgets
            | OwnedTable::CountryComparisons
            | OwnedTable::Pets => &[],
        }
    }

    /// Whether rows carry `is_shared` and may be listed by other users.
    pub fn shareable(self) -> bool {
        matches!(self, OwnedTable::Transactions)
    }

    #[cfg(test)]
    pub fn column(self, name: &str) -> Option<&'static Column> {
        self.columns().iter().find(|c| c.name == name)
    }
}

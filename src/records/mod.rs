mod dto;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod pg;
pub mod repo;
pub mod tables;

use crate::state::AppState;
use axum::Router;
use tables::OwnedTable;

/// Path of each owned table under `/api`.
pub const ROUTES: [(&str, OwnedTable); 13] = [
    ("/health/metrics", OwnedTable::BodyMetrics),
    ("/health/workouts", OwnedTable::Workouts),
    ("/health/meals", OwnedTable::Meals),
    ("/health/habits", OwnedTable::Habits),
    ("/sports/training", OwnedTable::TrainingSessions),
    ("/sports/competitions", OwnedTable::Competitions),
    ("/sports/recovery", OwnedTable::RecoveryLogs),
    ("/budget/transactions", OwnedTable::Transactions),
    ("/budget/budgets", OwnedTable::Budgets),
    ("/budget/savings-goals", OwnedTable::SavingsGoals),
    ("/escape-plan/comparisons", OwnedTable::CountryComparisons),
    ("/escape-plan/relocation-plans", OwnedTable::RelocationPlans),
    ("/escape-plan/pets", OwnedTable::Pets),
];

pub fn router() -> Router<AppState> {
    ROUTES
        .iter()
        .fold(Router::new(), |router, (path, table)| {
            router.merge(handlers::owned_routes(path, *table))
        })
        .merge(handlers::habit_routes())
}

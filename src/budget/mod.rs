//! Monthly budget summary over the caller's and shared transactions.

use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;
use time::{Date, Month};
use tracing::instrument;

use crate::{
    auth::middleware::AuthUser,
    error::AppError,
    extract::ApiQuery,
    records::repo::CategorySummary,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub month: u8,
    pub year: i32,
}

/// First and last day of a calendar month.
pub fn month_range(year: i32, month: u8) -> Result<(Date, Date), AppError> {
    let month = Month::try_from(month).map_err(|_| AppError::validation("month must be 1-12"))?;
    let first = Date::from_calendar_date(year, month, 1)
        .map_err(|_| AppError::validation("year out of range"))?;
    let last = Date::from_calendar_date(year, month, month.length(year))
        .map_err(|_| AppError::validation("year out of range"))?;
    Ok((first, last))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/budget/summary", get(summary))
}

#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn summary(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> Result<Json<Vec<CategorySummary>>, AppError> {
    let (from, to) = month_range(query.year, query.month)?;
    let rows = state
        .records
        .summarize_transactions(identity.user_id, from, to)
        .await?;
    Ok(Json(rows))
}

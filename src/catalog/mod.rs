pub mod repo;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::middleware::AuthUser,
    error::AppError,
    extract::{ApiPath, ApiQuery},
    state::AppState,
};
use repo::{Country, CountryFilter};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/escape-plan/countries", get(list_countries))
        .route("/escape-plan/countries/:id", get(get_country))
        .route("/escape-plan/countries/:id/pets", get(country_pets))
}

#[instrument(skip(state, _user))]
pub async fn list_countries(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(filter): ApiQuery<CountryFilter>,
) -> Result<Json<Vec<Country>>, AppError> {
    Ok(Json(state.catalog.list_countries(&filter).await?))
}

#[instrument(skip(state, _user))]
pub async fn get_country(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Country>, AppError> {
    state
        .catalog
        .find_country(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// Pet import rules for a country, or `{}` when none are recorded.
#[instrument(skip(state, _user))]
pub async fn country_pets(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let body = match state.catalog.pet_requirements(id).await? {
        Some(reqs) => serde_json::to_value(reqs).map_err(anyhow::Error::from)?,
        None => json!({}),
    };
    Ok(Json(body))
}

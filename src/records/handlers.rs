use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{DeleteResponse, ListQuery};
use super::repo::Record;
use super::tables::OwnedTable;
use crate::{
    auth::middleware::AuthUser,
    error::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
};

/// List / create on `path`, update / delete on `path/:id`, all owner-scoped.
pub fn owned_routes(path: &str, table: OwnedTable) -> Router<AppState> {
    Router::new()
        .route(
            path,
            get(move |state: State<AppState>, user: AuthUser, query: ApiQuery<ListQuery>| {
                list_records(table, state, user, query)
            })
            .post(move |state: State<AppState>, user: AuthUser, body: ApiJson<Record>| {
                create_record(table, state, user, body)
            }),
        )
        .route(
            &format!("{path}/:id"),
            put(
                move |state: State<AppState>, user: AuthUser, id: ApiPath<Uuid>, body: ApiJson<Record>| {
                    update_record(table, state, user, id, body)
                },
            )
            .patch(
                move |state: State<AppState>, user: AuthUser, id: ApiPath<Uuid>, body: ApiJson<Record>| {
                    update_record(table, state, user, id, body)
                },
            )
            .delete(move |state: State<AppState>, user: AuthUser, id: ApiPath<Uuid>| {
                delete_record(table, state, user, id)
            }),
        )
}

pub fn habit_routes() -> Router<AppState> {
    Router::new().route("/health/habits/:id/complete", patch(complete_habit))
}

#[instrument(skip(state, identity, query), fields(table = table.name(), user_id = %identity.user_id))]
pub async fn list_records(
    table: OwnedTable,
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<Record>>, AppError> {
    let rows = state
        .records
        .list(table, identity.user_id, query.options_for(table))
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, identity, body), fields(table = table.name(), user_id = %identity.user_id))]
pub async fn create_record(
    table: OwnedTable,
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(body): ApiJson<Record>,
) -> Result<(StatusCode, Json<Record>), AppError> {
    let record = state.records.insert(table, identity.user_id, body).await?;
    info!("record created");
    Ok((StatusCode::CREATED, Json(record)))
}

#[instrument(skip(state, identity, body), fields(table = table.name(), user_id = %identity.user_id))]
pub async fn update_record(
    table: OwnedTable,
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<Record>,
) -> Result<Json<Record>, AppError> {
    let record = state
        .records
        .update(table, identity.user_id, id, body)
        .await?;
    Ok(Json(record))
}

#[instrument(skip(state, identity), fields(table = table.name(), user_id = %identity.user_id))]
pub async fn delete_record(
    table: OwnedTable,
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    state.records.delete(table, identity.user_id, id).await?;
    info!("record deleted");
    Ok(Json(DeleteResponse { success: true }))
}

#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn complete_habit(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Record>, AppError> {
    let today = OffsetDateTime::now_utc().date();
    let habit = state
        .records
        .complete_habit(identity.user_id, id, today)
        .await?;
    Ok(Json(habit))
}

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        jwt::JwtKeys,
        middleware::AuthUser,
        services::CredentialStore,
    },
    error::AppError,
    extract::ApiJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(creds, keys, payload))]
pub async fn register(
    State(creds): State<CredentialStore>,
    State(keys): State<JwtKeys>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = creds
        .register(&payload.email, &payload.password, &payload.name)
        .await?;
    let token = keys.issue(user.id).map_err(anyhow::Error::from)?;
    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

#[instrument(skip(creds, keys, payload))]
pub async fn login(
    State(creds): State<CredentialStore>,
    State(keys): State<JwtKeys>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = creds.verify(&payload.email, &payload.password).await?;
    let token = keys.issue(user.id).map_err(anyhow::Error::from)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

/// Answers from the identity resolved during authentication; no second lookup.
#[instrument(skip(identity), fields(user_id = %identity.user_id))]
pub async fn get_me(AuthUser(identity): AuthUser) -> Json<PublicUser> {
    Json(identity.into())
}

//! Request authentication.
//!
//! [`authenticate`] is the pipeline stage: it reads the bearer token, verifies
//! it offline with [`JwtKeys`], resolves the user and returns a tagged
//! [`AuthOutcome`]. [`require_auth`] runs it as a route layer and stores the
//! [`Identity`] in the request extensions, where [`AuthUser`] picks it up.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{jwt::JwtKeys, repo::UserStore, repo_types::Role};
use crate::{error::AppError, state::AppState};

/// The authenticated caller, attached to the request once the token checks out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingToken,
    MalformedHeader,
    InvalidToken,
    /// Token is valid but its subject no longer exists.
    UnknownUser,
}

impl RejectReason {
    pub fn message(self) -> &'static str {
        match self {
            RejectReason::MissingToken => "Missing Authorization header",
            RejectReason::MalformedHeader => "Invalid Authorization header",
            RejectReason::InvalidToken => "Invalid or expired token",
            RejectReason::UnknownUser => "User not found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Identity),
    Rejected(RejectReason),
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, RejectReason> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(RejectReason::MissingToken)?
        .to_str()
        .map_err(|_| RejectReason::MalformedHeader)?;
    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(RejectReason::MalformedHeader)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(RejectReason::MalformedHeader);
    }
    Ok(token)
}

/// Only a store failure is an `Err`; every credential problem is `Rejected`.
pub async fn authenticate(
    headers: &HeaderMap,
    keys: &JwtKeys,
    users: &dyn UserStore,
) -> Result<AuthOutcome, AppError> {
    let token = match bearer_token(headers) {
        Ok(t) => t,
        Err(reason) => return Ok(AuthOutcome::Rejected(reason)),
    };

    let verified = match keys.verify(token) {
        Ok(v) => v,
        Err(_) => {
            warn!("invalid or expired token");
            return Ok(AuthOutcome::Rejected(RejectReason::InvalidToken));
        }
    };

    let Some(user) = users.find_by_id(verified.user_id).await? else {
        warn!(user_id = %verified.user_id, "token subject not found");
        return Ok(AuthOutcome::Rejected(RejectReason::UnknownUser));
    };

    debug!(user_id = %user.id, "request authenticated");
    Ok(AuthOutcome::Authenticated(Identity {
        user_id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
        created_at: user.created_at,
    }))
}

/// Route layer: `.route_layer(middleware::from_fn_with_state(state, require_auth))`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let keys = JwtKeys::from_ref(&state);
    match authenticate(request.headers(), &keys, state.users.as_ref()).await {
        Ok(AuthOutcome::Authenticated(identity)) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Ok(AuthOutcome::Rejected(reason)) => {
            debug!(?reason, "request rejected");
            AppError::unauthorized(reason.message()).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Identity of the caller. Uses the one attached by [`require_auth`] when
/// present, otherwise authenticates the request itself.
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(AuthUser(identity.clone()));
        }
        let keys = JwtKeys::from_ref(state);
        match authenticate(&parts.headers, &keys, state.users.as_ref()).await? {
            AuthOutcome::Authenticated(identity) => Ok(AuthUser(identity)),
            AuthOutcome::Rejected(reason) => Err(AppError::unauthorized(reason.message())),
        }
    }
}

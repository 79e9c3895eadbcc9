use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::{
    auth::{
        password::{hash_password, verify_dummy, verify_password},
        repo::UserStore,
        repo_types::{NewUser, Role, User},
    },
    error::AppError,
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration and credential checks on top of a [`UserStore`].
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserStore>,
}

impl FromRef<AppState> for CredentialStore {
    fn from_ref(state: &AppState) -> Self {
        CredentialStore::new(state.users.clone())
    }
}

impl CredentialStore {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<User, AppError> {
        self.register_with_role(email, password, name, Role::User).await
    }

    pub async fn register_with_role(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let email = normalize_email(email);
        let name = name.trim();

        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::validation("Invalid email"));
        }
        if password.is_empty() {
            return Err(AppError::validation("Password is required"));
        }
        if name.is_empty() {
            return Err(AppError::validation("Name is required"));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::Conflict("Email already registered".into()));
        }

        let hash = hash_password(password)?;
        // create() re-checks uniqueness, so a concurrent registration still gets Conflict
        let user = self
            .users
            .create(NewUser {
                email: &email,
                password_hash: &hash,
                name,
                role,
            })
            .await?;

        info!(user_id = %user.id, email = %user.email, role = user.role.as_str(), "user registered");
        Ok(user)
    }

    /// Unknown email and wrong password fail identically.
    pub async fn verify(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AppError::validation("Email and password are required"));
        }

        let Some(user) = self.users.find_by_email(&email).await? else {
            verify_dummy(password);
            warn!(email = %email, "login unknown email");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(email = %email, user_id = %user.id, "login invalid password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        debug!(user_id = %user.id, "credentials verified");
        Ok(user)
    }

    /// Creates the configured admin account unless the email is already taken.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<(), AppError> {
        let normalized = normalize_email(email);
        if self.users.find_by_email(&normalized).await?.is_some() {
            info!(email = %normalized, "admin user already exists");
            return Ok(());
        }
        match self
            .register_with_role(&normalized, password, "Admin", Role::Admin)
            .await
        {
            Ok(_) | Err(AppError::Conflict(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

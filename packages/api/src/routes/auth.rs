//! Registration, login and session management.
//!
//! Login also covers the bootstrap path: hosted deployments may have no way
//! to create the first staff account from a shell, so matching credentials
//! from `INITIAL_ADMIN_USERNAME`/`INITIAL_ADMIN_PASSWORD` create it on the
//! fly as long as no staff account exists yet.

use axum::{
    Extension, Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    entity::user,
    error::ApiError,
    middleware::auth::AppUser,
    state::AppState,
    utils::{create_id, hash_password, verify_password},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
}

impl From<user::Model> for UserInfo {
    fn from(account: user::Model) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            is_staff: account.is_staff,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserInfo,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = UserInfo),
        (status = 400, description = "Invalid form input"),
        (status = 409, description = "Username already taken")
    )
)]
#[tracing::instrument(name = "POST /auth/register", skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<UserInfo>, ApiError> {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_string();

    if username.is_empty() {
        return Err(ApiError::bad_request("Username must not be empty."));
    }
    if !email.contains('@') {
        return Err(ApiError::bad_request("Enter a valid email address."));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters long.",
        ));
    }
    if payload.password != payload.password_confirm {
        return Err(ApiError::bad_request("Passwords do not match."));
    }

    let taken = user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .one(&state.db)
        .await?
        .is_some();
    if taken {
        return Err(ApiError::conflict("Username is already taken."));
    }

    let now = Utc::now().naive_utc();
    // Registration always creates a customer account.
    let account = user::ActiveModel {
        id: Set(create_id()),
        username: Set(username),
        email: Set(email),
        password_hash: Set(hash_password(&payload.password)?),
        is_staff: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    Ok(Json(account.into()))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
#[tracing::instrument(name = "POST /auth/login", skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let mut account = user::Entity::find()
        .filter(user::Column::Username.eq(payload.username.trim()))
        .one(&state.db)
        .await?
        .filter(|account| verify_password(&payload.password, &account.password_hash));

    if account.is_none() {
        account = bootstrap_admin(&state, payload.username.trim(), &payload.password).await?;
    }

    let Some(account) = account else {
        return Err(ApiError::unauthorized("Invalid username or password."));
    };

    let ttl_hours = if payload.remember_me {
        state.config.remember_me_ttl_hours
    } else {
        state.config.session_ttl_hours
    };
    let ttl = Duration::hours(ttl_hours);
    let session_id = state.sessions.create(&account.id, ttl);
    let token = state
        .issue_session_token(&account.id, &session_id, Utc::now().naive_utc() + ttl)
        .map_err(|e| ApiError::internal(format!("Failed to issue session token: {}", e)))?;

    Ok(Json(SessionResponse {
        token,
        user: account.into(),
    }))
}

/// Creates the first staff account when the submitted credentials match the
/// environment-provided pair and no staff account exists yet.
async fn bootstrap_admin(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<Option<user::Model>, ApiError> {
    let (Some(admin_username), Some(admin_password)) = (
        state.config.initial_admin_username.as_deref(),
        state.config.initial_admin_password.as_deref(),
    ) else {
        return Ok(None);
    };

    if username != admin_username || password != admin_password {
        return Ok(None);
    }

    let staff_exists = user::Entity::find()
        .filter(user::Column::IsStaff.eq(true))
        .count(&state.db)
        .await?
        > 0;
    if staff_exists {
        return Ok(None);
    }

    tracing::info!("Bootstrapping initial staff account {}", admin_username);

    let now = Utc::now().naive_utc();
    let account = user::ActiveModel {
        id: Set(create_id()),
        username: Set(admin_username.to_string()),
        email: Set(String::new()),
        password_hash: Set(hash_password(password)?),
        is_staff: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    Ok(Some(account))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Session removed"),
        (status = 401, description = "Not logged in")
    )
)]
#[tracing::instrument(name = "POST /auth/logout", skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
) -> Result<Json<()>, ApiError> {
    let auth = user.auth()?;
    state.sessions.remove(&auth.session_id);
    Ok(Json(()))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current account", body = UserInfo),
        (status = 401, description = "Not logged in")
    )
)]
#[tracing::instrument(name = "GET /auth/me", skip(user))]
pub async fn me(Extension(user): Extension<AppUser>) -> Result<Json<UserInfo>, ApiError> {
    let auth = user.auth()?;
    Ok(Json(UserInfo {
        id: auth.id.clone(),
        username: auth.username.clone(),
        email: auth.email.clone(),
        is_staff: auth.is_staff,
    }))
}

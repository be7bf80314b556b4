//! Session resolution and role gating.
//!
//! [`session_middleware`] runs on every request and resolves the bearer
//! token to a live session plus the account behind it. The role guards are
//! applied once per route area (`/admin`, `/customer`) instead of being
//! re-checked inside each handler.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum::http::header::AUTHORIZATION;
use sea_orm::EntityTrait;

use crate::{
    entity::prelude::*,
    error::ApiError,
    state::AppState,
};

/// Resolved account for the current request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub session_id: String,
}

#[derive(Debug, Clone)]
pub enum AppUser {
    Authenticated(AuthUser),
    Unauthorized,
}

impl AppUser {
    pub fn auth(&self) -> Result<&AuthUser, ApiError> {
        match self {
            AppUser::Authenticated(user) => Ok(user),
            AppUser::Unauthorized => Err(ApiError::unauthorized("Authentication required")),
        }
    }
}

pub async fn session_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response<Body>, ApiError> {
    let mut request = request;

    if let Some(auth_header) = request.headers().get(AUTHORIZATION)
        && let Ok(token) = auth_header.to_str()
    {
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();

        if let Ok(claims) = state.validate_session_token(token)
            && let Some(session) = state.sessions.get(&claims.sid)
            && session.user_id == claims.sub
            && let Some(account) = User::find_by_id(&claims.sub).one(&state.db).await?
        {
            let user = AppUser::Authenticated(AuthUser {
                id: account.id,
                username: account.username,
                email: account.email,
                is_staff: account.is_staff,
                session_id: claims.sid,
            });
            request.extensions_mut().insert::<AppUser>(user);
            return Ok(next.run(request).await);
        }
    }

    request
        .extensions_mut()
        .insert::<AppUser>(AppUser::Unauthorized);
    Ok(next.run(request).await)
}

/// Gate for the `/admin` router.
pub async fn require_staff(request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<AppUser>() {
        Some(AppUser::Authenticated(user)) if user.is_staff => Ok(next.run(request).await),
        Some(AppUser::Authenticated(_)) => Err(ApiError::forbidden("Staff access required")),
        _ => Err(ApiError::unauthorized("Authentication required")),
    }
}

/// Gate for the `/customer` router; staff accounts have no cart or orders.
pub async fn require_customer(request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<AppUser>() {
        Some(AppUser::Authenticated(user)) if !user.is_staff => Ok(next.run(request).await),
        Some(AppUser::Authenticated(_)) => Err(ApiError::forbidden("Customer access required")),
        _ => Err(ApiError::unauthorized("Authentication required")),
    }
}

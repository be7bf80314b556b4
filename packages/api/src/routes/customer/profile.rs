use axum::{Extension, Json, extract::State};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use serde::Deserialize;

use crate::{
    entity::user,
    error::ApiError,
    middleware::auth::AppUser,
    routes::auth::UserInfo,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: String,
}

#[tracing::instrument(name = "GET /customer/profile", skip(user))]
pub async fn get_profile(Extension(user): Extension<AppUser>) -> Result<Json<UserInfo>, ApiError> {
    let auth = user.auth()?;
    Ok(Json(UserInfo {
        id: auth.id.clone(),
        username: auth.username.clone(),
        email: auth.email.clone(),
        is_staff: auth.is_staff,
    }))
}

/// Email is the only account field a customer can change.
#[tracing::instrument(name = "PUT /customer/profile", skip(state, user, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserInfo>, ApiError> {
    let auth = user.auth()?;

    let email = payload.email.trim().to_string();
    if !email.contains('@') {
        return Err(ApiError::bad_request("Enter a valid email address."));
    }

    let account = user::Entity::find_by_id(&auth.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    let mut active: user::ActiveModel = account.into();
    active.email = Set(email);
    active.updated_at = Set(Utc::now().naive_utc());
    let account = active.update(&state.db).await?;

    Ok(Json(account.into()))
}

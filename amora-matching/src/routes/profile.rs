use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Serialize;

use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::models::{UpdateUser, User, UserRating};
use crate::schema::{user_ratings, users};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    pub rating: Option<UserRating>,
}

/// GET /me - the caller's own profile with their rating.
pub async fn get_profile(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(e.to_string()))?;

    let user = users::table
        .find(auth_user.id)
        .first::<User>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let rating = user_ratings::table
        .find(auth_user.id)
        .first::<UserRating>(&mut conn)
        .optional()?;

    Ok(Json(ApiResponse::ok(ProfileResponse { user, rating })))
}

/// PATCH /me - update profile fields and discovery preferences. Any update
/// also refreshes last_active, which feeds the discovery activity signal.
pub async fn update_profile(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateUser>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    if let (Some(min), Some(max)) = (req.pref_age_min, req.pref_age_max) {
        if min > max {
            return Err(AppError::new(
                ErrorCode::ValidationError,
                "pref_age_min cannot exceed pref_age_max",
            ));
        }
    }
    if let Some(distance) = req.pref_distance_km {
        if distance <= 0 {
            return Err(AppError::new(
                ErrorCode::ValidationError,
                "pref_distance_km must be positive",
            ));
        }
    }

    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(e.to_string()))?;

    let user: User = diesel::update(users::table.find(auth_user.id))
        .set((&req, users::last_active.eq(Utc::now())))
        .get_result::<User>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let rating = user_ratings::table
        .find(auth_user.id)
        .first::<UserRating>(&mut conn)
        .optional()?;

    tracing::debug!(user_id = %user.id, "profile updated");

    Ok(Json(ApiResponse::ok(ProfileResponse { user, rating })))
}

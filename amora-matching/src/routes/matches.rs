use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use diesel::prelude::*;

use amora_shared::errors::{AppError, AppResult};
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::models::Match;
use crate::schema::matches;
use crate::AppState;

/// GET /matches - the caller's matches, newest first. Counterpart profile
/// enrichment belongs to the calling layer.
pub async fn list_matches(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Match>>>> {
    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(e.to_string()))?;

    let records = matches::table
        .filter(
            matches::user1_id
                .eq(auth_user.id)
                .or(matches::user2_id.eq(auth_user.id)),
        )
        .order(matches::created_at.desc())
        .load::<Match>(&mut conn)?;

    Ok(Json(ApiResponse::ok(records)))
}

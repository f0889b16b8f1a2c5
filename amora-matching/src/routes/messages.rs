use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::models::{Match, Message};
use crate::schema::{matches, messages};
use crate::AppState;

/// GET /matches/:id/messages - the match's full thread in creation order.
pub async fn list_messages(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<Message>>>> {
    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(e.to_string()))?;

    let record: Match = matches::table
        .find(match_id)
        .first::<Match>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;

    if !record.involves(auth_user.id) {
        return Err(AppError::new(
            ErrorCode::NotMatchParticipant,
            "you are not part of this match",
        ));
    }

    let items = messages::table
        .filter(messages::match_id.eq(match_id))
        .order(messages::created_at.asc())
        .load::<Message>(&mut conn)?;

    Ok(Json(ApiResponse::ok(items)))
}

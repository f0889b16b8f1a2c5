use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult};
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::events::publisher;
use crate::matching::swipe::{self, SwipeOutcome};
use crate::models::SwipeDirection;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSwipeRequest {
    pub swiped_id: Uuid,
    pub direction: SwipeDirection,
}

/// POST /swipes - record a swipe; on a mutual like the match comes back
/// inline with is_match = true.
pub async fn create_swipe(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSwipeRequest>,
) -> AppResult<Json<ApiResponse<SwipeOutcome>>> {
    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(e.to_string()))?;

    let outcome = swipe::record_swipe(&mut conn, auth_user.id, req.swiped_id, req.direction)?;

    if let Some(record) = &outcome.match_record {
        publisher::publish_match_created(&state.rabbitmq, record).await;
    }

    Ok(Json(ApiResponse::ok(outcome)))
}

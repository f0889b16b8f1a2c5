use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use amora_shared::errors::{AppError, AppResult};
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::matching::discovery::{self, ScoredProfile};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DiscoveryParams {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    discovery::DEFAULT_LIMIT
}

/// GET /discovery?limit=20 - ranked candidate profiles for the caller.
pub async fn get_discovery(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<DiscoveryParams>,
) -> AppResult<Json<ApiResponse<Vec<ScoredProfile>>>> {
    let limit = params.limit.clamp(1, 100);

    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(e.to_string()))?;

    let profiles = discovery::discover_profiles(&mut conn, auth_user.id, limit)?;

    Ok(Json(ApiResponse::ok(profiles)))
}

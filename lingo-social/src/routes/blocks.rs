use axum::extract::{Path, Query, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use lingo_shared::errors::AppResult;
use lingo_shared::types::auth::AuthUser;
use lingo_shared::types::{ApiResponse, Paginated, PaginationParams, Removed};

use crate::services::relationship_service::{self, BlockedView};
use crate::store::BlockCascade;
use crate::AppState;

#[derive(Debug, serde::Serialize)]
pub struct BlockResult {
    pub blocked: bool,
    pub friendships_removed: usize,
    pub requests_removed: usize,
}

impl From<BlockCascade> for BlockResult {
    fn from(cascade: BlockCascade) -> Self {
        Self {
            blocked: true,
            friendships_removed: cascade.friendships_removed,
            requests_removed: cascade.requests_removed,
        }
    }
}

// --- POST /blocks/:user_id ---

pub async fn block_user(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BlockResult>>> {
    let cascade = relationship_service::block_user(&state, user.id, user_id).await?;
    Ok(Json(ApiResponse::ok(cascade.into())))
}

// --- DELETE /blocks/:user_id ---

pub async fn unblock_user(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Removed>>> {
    relationship_service::unblock_user(&state, user.id, user_id)?;
    Ok(Json(ApiResponse::ok(Removed::yes())))
}

// --- GET /blocks ---

pub async fn list_blocked(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<BlockedView>>>> {
    let blocked = relationship_service::list_blocked(&state, user.id, &page).await?;
    Ok(Json(ApiResponse::ok(blocked)))
}

use axum::extract::{Path, Query, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use lingo_shared::errors::AppResult;
use lingo_shared::types::auth::AuthUser;
use lingo_shared::types::{ApiResponse, Paginated, PaginationParams, Removed};

use crate::services::feed_service::{self, CommentView, CreateCommentRequest};
use crate::AppState;

// --- GET /posts/:id/comments ---

pub async fn list_comments(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<CommentView>>>> {
    let comments = feed_service::list_comments(&state, user.id, post_id, &page).await?;
    Ok(Json(ApiResponse::ok(comments)))
}

// --- POST /posts/:id/comments ---

pub async fn add_comment(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<Json<ApiResponse<CommentView>>> {
    let comment = feed_service::add_comment(&state, user.id, post_id, req).await?;
    Ok(Json(ApiResponse::ok(comment)))
}

// --- DELETE /comments/:id ---

pub async fn delete_comment(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(comment_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Removed>>> {
    feed_service::delete_comment(&state, user.id, comment_id)?;
    Ok(Json(ApiResponse::ok(Removed::yes())))
}

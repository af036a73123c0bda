use axum::extract::{Path, Query, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use lingo_shared::errors::AppResult;
use lingo_shared::types::auth::AuthUser;
use lingo_shared::types::{ApiResponse, Paginated, PaginationParams, Removed};

use crate::models::Like;
use crate::services::feed_service::{self, CreatePostRequest, PostView};
use crate::store::PostCascade;
use crate::AppState;

// --- POST /posts ---

pub async fn create_post(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<Json<ApiResponse<PostView>>> {
    let post = feed_service::create_post(&state, user.id, req).await?;
    Ok(Json(ApiResponse::ok(post)))
}

// --- GET /feed ---

pub async fn feed(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<PostView>>>> {
    let posts = feed_service::feed(&state, user.id, &page).await?;
    Ok(Json(ApiResponse::ok(posts)))
}

// --- GET /posts/:id ---

pub async fn get_post(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PostView>>> {
    let post = feed_service::get_post(&state, user.id, post_id).await?;
    Ok(Json(ApiResponse::ok(post)))
}

// --- DELETE /posts/:id ---

#[derive(Debug, serde::Serialize)]
pub struct PostDeleted {
    pub removed: bool,
    pub comments_removed: usize,
    pub likes_removed: usize,
}

pub async fn delete_post(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PostDeleted>>> {
    let PostCascade { comments_removed, likes_removed } =
        feed_service::delete_post(&state, user.id, post_id).await?;
    Ok(Json(ApiResponse::ok(PostDeleted {
        removed: true,
        comments_removed,
        likes_removed,
    })))
}

// --- GET /users/:user_id/posts ---

pub async fn user_posts(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(author_id): Path<Uuid>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<PostView>>>> {
    let posts = feed_service::user_posts(&state, user.id, author_id, &page).await?;
    Ok(Json(ApiResponse::ok(posts)))
}

// --- POST /posts/:id/like ---

pub async fn like_post(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Like>>> {
    let like = feed_service::like_post(&state, user.id, post_id).await?;
    Ok(Json(ApiResponse::ok(like)))
}

// --- DELETE /posts/:id/like ---

pub async fn unlike_post(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Removed>>> {
    feed_service::unlike_post(&state, user.id, post_id)?;
    Ok(Json(ApiResponse::ok(Removed::yes())))
}

use axum::extract::{Path, Query, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use lingo_shared::errors::AppResult;
use lingo_shared::types::auth::AuthUser;
use lingo_shared::types::{ApiResponse, Paginated, PaginationParams, Removed};

use crate::models::{FriendRequest, Friendship};
use crate::services::relationship_service::{self, FriendRequestView, FriendView, SendFriendRequest};
use crate::store::RequestDirection;
use crate::AppState;

// --- GET /friends ---

pub async fn list_friends(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<FriendView>>>> {
    let friends = relationship_service::list_friends(&state, user.id, &page).await?;
    Ok(Json(ApiResponse::ok(friends)))
}

// --- DELETE /friends/:user_id ---

pub async fn remove_friend(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Removed>>> {
    relationship_service::remove_friend(&state, user.id, user_id)?;
    Ok(Json(ApiResponse::ok(Removed::yes())))
}

// --- POST /friend-requests ---

pub async fn send_request(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendFriendRequest>,
) -> AppResult<Json<ApiResponse<FriendRequest>>> {
    let request = relationship_service::send_friend_request(&state, user.id, req).await?;
    Ok(Json(ApiResponse::ok(request)))
}

// --- GET /friend-requests/incoming ---

pub async fn list_incoming(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<FriendRequestView>>>> {
    let requests =
        relationship_service::list_friend_requests(&state, user.id, RequestDirection::Incoming, &page).await?;
    Ok(Json(ApiResponse::ok(requests)))
}

// --- GET /friend-requests/outgoing ---

pub async fn list_outgoing(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<FriendRequestView>>>> {
    let requests =
        relationship_service::list_friend_requests(&state, user.id, RequestDirection::Outgoing, &page).await?;
    Ok(Json(ApiResponse::ok(requests)))
}

// --- POST /friend-requests/:id/accept ---

pub async fn accept_request(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Friendship>>> {
    let friendship = relationship_service::accept_friend_request(&state, user.id, request_id).await?;
    Ok(Json(ApiResponse::ok(friendship)))
}

// --- POST /friend-requests/:id/decline ---

pub async fn decline_request(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Removed>>> {
    relationship_service::decline_friend_request(&state, user.id, request_id)?;
    Ok(Json(ApiResponse::ok(Removed::yes())))
}

// --- DELETE /friend-requests/:id ---

pub async fn cancel_request(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Removed>>> {
    relationship_service::cancel_friend_request(&state, user.id, request_id)?;
    Ok(Json(ApiResponse::ok(Removed::yes())))
}

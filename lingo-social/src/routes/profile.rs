use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use lingo_shared::errors::AppResult;
use lingo_shared::types::auth::AuthUser;
use lingo_shared::types::{ApiResponse, Removed};

use crate::services::profile_service::{
    self, CreateProfileRequest, ProfileView, UpdateProfileRequest, UsernameAvailability,
};
use crate::AppState;

// --- POST /profile ---

pub async fn create_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProfileRequest>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let profile = profile_service::create_profile(&state, &user, req).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- GET /profile ---

pub async fn get_own_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let profile = profile_service::get_own_profile(&state, user.id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- PATCH /profile ---

pub async fn update_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let profile = profile_service::update_profile(&state, user.id, req).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- DELETE /profile ---

pub async fn delete_account(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Removed>>> {
    profile_service::delete_account(&state, user.id).await?;
    Ok(Json(ApiResponse::ok_with_message(Removed::yes(), "account deleted")))
}

// --- GET /profile/:user_id ---

pub async fn get_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let profile = profile_service::get_profile(&state, user.id, user_id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- GET /username-available?username= ---

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    pub username: String,
}

pub async fn check_username(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsernameQuery>,
) -> AppResult<Json<ApiResponse<UsernameAvailability>>> {
    let availability = profile_service::check_username(&state, &query.username)?;
    Ok(Json(ApiResponse::ok(availability)))
}

// --- POST /presence ---

pub async fn touch_presence(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<()>>> {
    profile_service::touch_last_active(&state, user.id)?;
    Ok(Json(ApiResponse::ok(())))
}

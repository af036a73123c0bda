use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use lingo_shared::errors::AppResult;
use lingo_shared::types::auth::AuthUser;
use lingo_shared::types::ApiResponse;

use crate::services::profile_service::{self, UploadTicket};
use crate::AppState;

// --- POST /uploads ---

/// The image body goes straight to storage; only the returned key is sent back here.
pub async fn create_upload_url(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UploadTicket>>> {
    let ticket = profile_service::create_upload_url(&state, user.id).await?;
    Ok(Json(ApiResponse::ok(ticket)))
}

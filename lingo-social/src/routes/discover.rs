use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use lingo_shared::errors::AppResult;
use lingo_shared::types::auth::AuthUser;
use lingo_shared::types::{ApiResponse, Paginated, PaginationParams};

use crate::discovery::{DiscoverFilter, DiscoverUser};
use crate::services::discovery_service;
use crate::AppState;

type DiscoverPage = Json<ApiResponse<Paginated<DiscoverUser>>>;

// --- GET /discover ---

pub async fn browse(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(page): Query<PaginationParams>,
) -> AppResult<DiscoverPage> {
    let result = discovery_service::browse(&state, user.id, &page).await?;
    Ok(Json(ApiResponse::ok(result)))
}

// --- GET /discover/search?q= ---

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
    Query(page): Query<PaginationParams>,
) -> AppResult<DiscoverPage> {
    let result = discovery_service::search(&state, user.id, &query.q, &page).await?;
    Ok(Json(ApiResponse::ok(result)))
}

// --- GET /discover/filter?country=&spoken_language=&learning_language= ---

#[derive(Debug, Deserialize)]
pub struct FilterQuery {
    pub country: Option<String>,
    pub spoken_language: Option<String>,
    pub learning_language: Option<String>,
}

pub async fn filter(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
    Query(page): Query<PaginationParams>,
) -> AppResult<DiscoverPage> {
    let criteria = DiscoverFilter {
        country: query.country,
        spoken_language: query.spoken_language,
        learning_language: query.learning_language,
    };
    let result = discovery_service::filter(&state, user.id, criteria, &page).await?;
    Ok(Json(ApiResponse::ok(result)))
}

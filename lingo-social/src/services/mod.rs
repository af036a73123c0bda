pub mod discovery_service;
pub mod feed_service;
pub mod profile_service;
pub mod relationship_service;

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use lingo_shared::errors::{AppError, AppResult, ErrorCode};
use lingo_shared::types::{Paginated, PaginationParams};

use crate::models::Profile;
use crate::AppState;

/// Compact user card embedded in lists, posts and comments.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub user_id: Uuid,
    pub name: String,
    pub username: String,
    pub profile_picture_url: Option<String>,
}

pub(crate) fn require_profile(state: &AppState, user_id: Uuid) -> AppResult<Profile> {
    state
        .store
        .find_profile(user_id)?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
}

pub(crate) async fn picture_url(state: &AppState, key: Option<&str>) -> Option<String> {
    match key {
        Some(key) => state.blobs.resolve_url(key).await,
        None => None,
    }
}

/// Summaries for `user_ids`, keyed by id. Users without a profile are absent.
pub(crate) async fn user_summaries(
    state: &AppState,
    user_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, UserSummary>> {
    let profiles = state.store.find_profiles(user_ids)?;
    let mut out = HashMap::with_capacity(profiles.len());
    for profile in profiles {
        let profile_picture_url = picture_url(state, profile.profile_picture.as_deref()).await;
        out.insert(
            profile.user_id,
            UserSummary {
                user_id: profile.user_id,
                name: profile.name,
                username: profile.username,
                profile_picture_url,
            },
        );
    }
    Ok(out)
}

/// Pages an already materialized list.
pub(crate) fn paginate<T: Serialize>(items: Vec<T>, params: &PaginationParams) -> Paginated<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(params.offset() as usize)
        .take(params.limit() as usize)
        .collect();
    Paginated::new(items, total, params)
}

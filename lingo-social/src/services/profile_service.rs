use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use lingo_shared::errors::{AppError, AppResult, ErrorCode};
use lingo_shared::types::auth::AuthUser;

use crate::blobs::{ensure_owned_key, new_storage_key};
use crate::events::publisher;
use crate::models::{Gender, Profile, ProfileChanges};
use crate::services::{picture_url, require_profile};
use crate::store::AccountPurge;
use crate::validation;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "name must be between 1 and 50 characters"))]
    pub name: String,
    pub username: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub country_code: String,
    pub spoken_languages: Vec<String>,
    pub learning_languages: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 500, message = "bio cannot exceed 500 characters"))]
    pub bio: String,
    #[serde(default)]
    pub hobbies: Vec<String>,
    #[serde(default)]
    pub visited_countries: Vec<String>,
    #[serde(default)]
    pub wanted_countries: Vec<String>,
    #[serde(default)]
    pub favorite_books: Vec<String>,
    /// Storage key returned by `POST /uploads`.
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub gender_preference: bool,
}

/// Username, gender and birth date cannot be changed.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "name must be between 1 and 50 characters"))]
    pub name: Option<String>,
    pub country_code: Option<String>,
    pub spoken_languages: Option<Vec<String>>,
    pub learning_languages: Option<Vec<String>>,
    #[validate(length(max = 500, message = "bio cannot exceed 500 characters"))]
    pub bio: Option<String>,
    pub hobbies: Option<Vec<String>>,
    pub visited_countries: Option<Vec<String>>,
    pub wanted_countries: Option<Vec<String>>,
    pub favorite_books: Option<Vec<String>>,
    pub profile_picture: Option<String>,
    pub gender_preference: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    #[serde(rename = "self")]
    Own,
    Friends,
    RequestSent,
    RequestReceived,
    None,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user_id: Uuid,
    pub name: String,
    pub username: String,
    pub gender: String,
    pub age: i32,
    pub age_group: String,
    pub country_code: String,
    pub spoken_languages: Vec<String>,
    pub learning_languages: Vec<String>,
    pub bio: String,
    pub hobbies: Vec<String>,
    pub visited_countries: Vec<String>,
    pub wanted_countries: Vec<String>,
    pub favorite_books: Vec<String>,
    pub profile_picture_url: Option<String>,
    pub last_active_at: DateTime<Utc>,
    pub relationship: RelationshipStatus,
    // Owner-only fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender_preference: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UsernameAvailability {
    pub username: String,
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadTicket {
    pub upload_url: String,
    pub storage_key: String,
}

async fn view(state: &AppState, profile: Profile, relationship: RelationshipStatus) -> ProfileView {
    let profile_picture_url = picture_url(state, profile.profile_picture.as_deref()).await;
    let own = relationship == RelationshipStatus::Own;
    ProfileView {
        user_id: profile.user_id,
        name: profile.name,
        username: profile.username,
        gender: profile.gender,
        age: profile.age,
        age_group: profile.age_group,
        country_code: profile.country_code,
        spoken_languages: profile.spoken_languages,
        learning_languages: profile.learning_languages,
        bio: profile.bio,
        hobbies: profile.hobbies,
        visited_countries: profile.visited_countries,
        wanted_countries: profile.wanted_countries,
        favorite_books: profile.favorite_books,
        profile_picture_url,
        last_active_at: profile.last_active_at,
        relationship,
        birth_date: own.then_some(profile.birth_date),
        gender_preference: own.then_some(profile.gender_preference),
        profile_picture: if own { profile.profile_picture } else { None },
    }
}

/// Creates the caller's profile. Age and age group are computed once, here.
pub async fn create_profile(
    state: &AppState,
    user: &AuthUser,
    req: CreateProfileRequest,
) -> AppResult<ProfileView> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    if state.store.find_profile(user.id)?.is_some() {
        return Err(AppError::new(ErrorCode::ProfileAlreadyExists, "profile already exists"));
    }

    let username = validation::normalize_username(&req.username)?;
    if state.store.username_exists(&username)? {
        return Err(AppError::new(ErrorCode::UsernameTaken, "username is already taken"));
    }

    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "name cannot be empty"));
    }

    let (age, age_group) = validation::age_and_group(req.birth_date, Utc::now().date_naive())?;

    if let Some(key) = &req.profile_picture {
        ensure_owned_key(user.id, key)?;
    }

    let now = Utc::now();
    let profile = Profile {
        user_id: user.id,
        name,
        username,
        gender: req.gender.as_str().to_string(),
        birth_date: req.birth_date,
        age,
        age_group: age_group.as_str().to_string(),
        country_code: validation::country_code(&req.country_code)?,
        spoken_languages: validation::language_codes(&req.spoken_languages, "spoken_languages")?,
        learning_languages: validation::language_codes(&req.learning_languages, "learning_languages")?,
        bio: req.bio.trim().to_string(),
        hobbies: validation::text_list(&req.hobbies),
        visited_countries: validation::country_codes(&req.visited_countries)?,
        wanted_countries: validation::country_codes(&req.wanted_countries)?,
        favorite_books: validation::text_list(&req.favorite_books),
        profile_picture: req.profile_picture,
        gender_preference: req.gender_preference,
        is_admin: user.is_admin(),
        last_active_at: now,
        created_at: now,
        updated_at: now,
    };

    state.store.insert_profile(&profile)?;

    tracing::info!(
        user_id = %profile.user_id,
        username = %profile.username,
        age_group = %profile.age_group,
        "profile created"
    );

    publisher::publish_profile_created(&state.events, profile.user_id, &profile.username).await;

    Ok(view(state, profile, RelationshipStatus::Own).await)
}

pub async fn get_own_profile(state: &AppState, user_id: Uuid) -> AppResult<ProfileView> {
    let profile = require_profile(state, user_id)?;
    Ok(view(state, profile, RelationshipStatus::Own).await)
}

/// Another user's profile as seen by `viewer_id`. Hidden when either side blocked the other.
pub async fn get_profile(state: &AppState, viewer_id: Uuid, target_id: Uuid) -> AppResult<ProfileView> {
    if viewer_id == target_id {
        return get_own_profile(state, viewer_id).await;
    }

    if state.store.is_blocked_either_way(viewer_id, target_id)? {
        return Err(AppError::new(ErrorCode::ProfileNotFound, "profile not found"));
    }

    let profile = require_profile(state, target_id)?;
    let relationship = relationship_between(state, viewer_id, target_id)?;
    Ok(view(state, profile, relationship).await)
}

fn relationship_between(state: &AppState, viewer_id: Uuid, target_id: Uuid) -> AppResult<RelationshipStatus> {
    if state.store.find_friendship(viewer_id, target_id)?.is_some() {
        return Ok(RelationshipStatus::Friends);
    }
    let status = match state.store.find_request_between(viewer_id, target_id)? {
        Some(r) if r.sender_id == viewer_id => RelationshipStatus::RequestSent,
        Some(_) => RelationshipStatus::RequestReceived,
        None => RelationshipStatus::None,
    };
    Ok(status)
}

pub async fn update_profile(
    state: &AppState,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> AppResult<ProfileView> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let current = require_profile(state, user_id)?;

    let name = match req.name {
        Some(name) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::new(ErrorCode::ValidationError, "name cannot be empty"));
            }
            Some(name)
        }
        None => None,
    };

    if let Some(key) = &req.profile_picture {
        ensure_owned_key(user_id, key)?;
    }

    let changes = ProfileChanges {
        name,
        country_code: req.country_code.as_deref().map(validation::country_code).transpose()?,
        spoken_languages: req
            .spoken_languages
            .map(|l| validation::language_codes(&l, "spoken_languages"))
            .transpose()?,
        learning_languages: req
            .learning_languages
            .map(|l| validation::language_codes(&l, "learning_languages"))
            .transpose()?,
        bio: req.bio.map(|b| b.trim().to_string()),
        hobbies: req.hobbies.map(|h| validation::text_list(&h)),
        visited_countries: req
            .visited_countries
            .map(|c| validation::country_codes(&c))
            .transpose()?,
        wanted_countries: req
            .wanted_countries
            .map(|c| validation::country_codes(&c))
            .transpose()?,
        favorite_books: req.favorite_books.map(|b| validation::text_list(&b)),
        profile_picture: req.profile_picture,
        gender_preference: req.gender_preference,
        updated_at: Utc::now(),
    };

    let updated = state.store.update_profile(user_id, &changes)?;

    // The replaced picture is no longer referenced by any record.
    if let (Some(old), Some(new)) = (&current.profile_picture, &changes.profile_picture) {
        if old != new {
            if let Err(e) = state.blobs.delete(old).await {
                tracing::warn!(error = %e, key = %old, "failed to delete replaced profile picture");
            }
        }
    }

    tracing::info!(user_id = %user_id, "profile updated");
    publisher::publish_profile_updated(&state.events, user_id).await;

    Ok(view(state, updated, RelationshipStatus::Own).await)
}

/// Invalid usernames are reported as unavailable rather than as errors.
pub fn check_username(state: &AppState, raw: &str) -> AppResult<UsernameAvailability> {
    let Ok(username) = validation::normalize_username(raw) else {
        return Ok(UsernameAvailability {
            username: raw.trim().to_lowercase(),
            available: false,
        });
    };
    let available = !state.store.username_exists(&username)?;
    Ok(UsernameAvailability { username, available })
}

pub fn touch_last_active(state: &AppState, user_id: Uuid) -> AppResult<()> {
    state.store.touch_last_active(user_id, Utc::now())
}

/// Removes the account's profile, edges, posts, comments and likes, then their blobs.
pub async fn delete_account(state: &AppState, user_id: Uuid) -> AppResult<AccountPurge> {
    let purge = state.store.purge_account(user_id)?;

    for key in &purge.blob_keys {
        if let Err(e) = state.blobs.delete(key).await {
            tracing::warn!(error = %e, key = %key, "failed to delete blob of purged account");
        }
    }

    tracing::info!(
        user_id = %user_id,
        posts_removed = purge.posts_removed,
        edges_removed = purge.edges_removed,
        blobs_removed = purge.blob_keys.len(),
        "account purged"
    );

    publisher::publish_account_deleted(&state.events, user_id).await;

    Ok(purge)
}

/// Presigned upload target in the caller's namespace.
pub async fn create_upload_url(state: &AppState, user_id: Uuid) -> AppResult<UploadTicket> {
    let storage_key = new_storage_key(user_id);
    let upload_url = state.blobs.upload_url(&storage_key).await?;
    tracing::debug!(user_id = %user_id, key = %storage_key, "upload url issued");
    Ok(UploadTicket { upload_url, storage_key })
}

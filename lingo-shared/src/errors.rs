use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: Profile errors
/// - E3xxx: Relationship errors (friends, requests, blocks)
/// - E4xxx: Feed errors (posts, comments, likes)
/// - E5xxx: Discovery errors
/// - E6xxx: Blob storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    ServiceUnavailable,
    BadRequest,

    // Auth (E1xxx)
    TokenExpired,
    TokenInvalid,

    // Profile (E2xxx)
    ProfileNotFound,
    ProfileAlreadyExists,
    UsernameTaken,
    InvalidUsername,
    AgeOutOfRange,

    // Relationships (E3xxx)
    CannotBlockSelf,
    AlreadyBlocked,
    BlockNotFound,
    CannotFriendSelf,
    AlreadyFriends,
    NotFriends,
    FriendRequestExists,
    FriendRequestNotFound,
    UserBlocked,

    // Feed (E4xxx)
    PostNotFound,
    CommentNotFound,
    AlreadyLiked,
    NotLiked,
    ContentEmpty,
    ContentTooLong,

    // Discovery (E5xxx)
    MissingDiscoveryFilter,

    // Storage (E6xxx)
    UploadFailed,
    InvalidStorageKey,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::ServiceUnavailable => "E0007",
            Self::BadRequest => "E0008",

            // Auth
            Self::TokenExpired => "E1004",
            Self::TokenInvalid => "E1005",

            // Profile
            Self::ProfileNotFound => "E2001",
            Self::ProfileAlreadyExists => "E2002",
            Self::UsernameTaken => "E2003",
            Self::InvalidUsername => "E2004",
            Self::AgeOutOfRange => "E2005",

            // Relationships
            Self::CannotBlockSelf => "E3001",
            Self::AlreadyBlocked => "E3002",
            Self::BlockNotFound => "E3003",
            Self::CannotFriendSelf => "E3004",
            Self::AlreadyFriends => "E3005",
            Self::NotFriends => "E3006",
            Self::FriendRequestExists => "E3007",
            Self::FriendRequestNotFound => "E3008",
            Self::UserBlocked => "E3009",

            // Feed
            Self::PostNotFound => "E4001",
            Self::CommentNotFound => "E4002",
            Self::AlreadyLiked => "E4003",
            Self::NotLiked => "E4004",
            Self::ContentEmpty => "E4005",
            Self::ContentTooLong => "E4006",

            // Discovery
            Self::MissingDiscoveryFilter => "E5001",

            // Storage
            Self::UploadFailed => "E6001",
            Self::InvalidStorageKey => "E6002",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::InvalidUsername
            | Self::AgeOutOfRange | Self::ContentEmpty | Self::ContentTooLong
            | Self::MissingDiscoveryFilter | Self::InvalidStorageKey => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::ProfileNotFound | Self::BlockNotFound
            | Self::FriendRequestNotFound | Self::PostNotFound | Self::CommentNotFound
            | Self::NotLiked => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotFriends | Self::UserBlocked
            | Self::CannotBlockSelf | Self::CannotFriendSelf => StatusCode::FORBIDDEN,
            Self::ProfileAlreadyExists | Self::UsernameTaken | Self::AlreadyBlocked
            | Self::AlreadyFriends | Self::FriendRequestExists | Self::AlreadyLiked => StatusCode::CONFLICT,
            Self::UploadFailed => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The error code carried by a known error, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Known { code, .. } => Some(*code),
            Self::Validation(_) => Some(ErrorCode::ValidationError),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_codes_map_to_409() {
        assert_eq!(ErrorCode::AlreadyLiked.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::AlreadyBlocked.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::UsernameTaken.code(), "E2003");
    }

    #[test]
    fn known_error_renders_code_and_message() {
        let resp = AppError::new(ErrorCode::PostNotFound, "post not found").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_error_exposes_code() {
        let err = AppError::Validation("bad".into());
        assert_eq!(err.code(), Some(ErrorCode::ValidationError));
        assert_eq!(AppError::internal("x").code(), Some(ErrorCode::InternalError));
    }
}

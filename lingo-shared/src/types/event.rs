use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ Event envelope wrapping all domain events.
///
/// Routing key format: `lingo.{domain}.{entity}.{action}`
/// Example: `lingo.social.user.blocked`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // Auth events
    pub const AUTH_USER_DELETED: &str = "lingo.auth.user.deleted";

    // Profile events
    pub const SOCIAL_PROFILE_CREATED: &str = "lingo.social.profile.created";
    pub const SOCIAL_PROFILE_UPDATED: &str = "lingo.social.profile.updated";
    pub const SOCIAL_ACCOUNT_DELETED: &str = "lingo.social.account.deleted";

    // Relationship events
    pub const SOCIAL_FRIEND_REQUESTED: &str = "lingo.social.friend.requested";
    pub const SOCIAL_FRIEND_ACCEPTED: &str = "lingo.social.friend.accepted";
    pub const SOCIAL_USER_BLOCKED: &str = "lingo.social.user.blocked";

    // Feed events
    pub const SOCIAL_POST_CREATED: &str = "lingo.social.post.created";
    pub const SOCIAL_POST_LIKED: &str = "lingo.social.post.liked";
    pub const SOCIAL_COMMENT_CREATED: &str = "lingo.social.comment.created";
}

/// Common event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UserDeleted {
        pub user_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ProfileCreated {
        pub user_id: Uuid,
        pub username: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ProfileUpdated {
        pub user_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AccountDeleted {
        pub user_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct FriendRequested {
        pub request_id: Uuid,
        pub sender_id: Uuid,
        pub receiver_id: Uuid,
        pub sender_name: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct FriendAccepted {
        pub sender_id: Uuid,
        pub receiver_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UserBlocked {
        pub blocker_id: Uuid,
        pub blocked_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PostCreated {
        pub post_id: Uuid,
        pub author_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PostLiked {
        pub post_id: Uuid,
        pub author_id: Uuid,
        pub liker_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CommentCreated {
        pub comment_id: Uuid,
        pub post_id: Uuid,
        pub post_author_id: Uuid,
        pub commenter_id: Uuid,
        pub content_preview: String,
    }
}

//! Persistence seam for the social service.
//!
//! Handlers and services only talk to [`SocialStore`]. `PgStore` backs the
//! service in production, `MemoryStore` backs tests and local runs. Every
//! method that touches more than one record (block, accept request, delete
//! post, purge account) is a single atomic unit in both implementations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use lingo_shared::errors::AppResult;

use crate::models::{BlockedUser, Comment, FriendRequest, Friendship, Like, Post, Profile, ProfileChanges};

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Every relationship edge touching one user, grouped by kind.
#[derive(Debug, Clone, Default)]
pub struct RelationshipIds {
    /// Users this user blocked.
    pub blocked: Vec<Uuid>,
    /// Users who blocked this user.
    pub blocked_by: Vec<Uuid>,
    pub friends: Vec<Uuid>,
    /// Receivers of this user's pending requests.
    pub requests_sent: Vec<Uuid>,
    /// Senders of pending requests addressed to this user.
    pub requests_received: Vec<Uuid>,
}

/// Index-backed candidate lookup for discovery.
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub age_group: String,
    pub gender: Option<String>,
    pub excluded: Vec<Uuid>,
    /// Case-insensitive substring of name or username.
    pub text: Option<String>,
    pub country_code: Option<String>,
    pub spoken_language: Option<String>,
    pub learning_language: Option<String>,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDirection {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockCascade {
    pub friendships_removed: usize,
    pub requests_removed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostCascade {
    pub comments_removed: usize,
    pub likes_removed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AccountPurge {
    /// Storage keys that were referenced by deleted records.
    pub blob_keys: Vec<String>,
    pub posts_removed: usize,
    pub edges_removed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostStats {
    pub likes: u64,
    pub comments: u64,
    pub liked_by_viewer: bool,
}

pub trait SocialStore: Send + Sync {
    fn ping(&self) -> AppResult<()>;

    // --- Profiles ---

    fn find_profile(&self, user_id: Uuid) -> AppResult<Option<Profile>>;
    fn find_profiles(&self, user_ids: &[Uuid]) -> AppResult<Vec<Profile>>;
    fn username_exists(&self, username: &str) -> AppResult<bool>;
    /// Fails with `UsernameTaken` / `ProfileAlreadyExists` on uniqueness clashes.
    fn insert_profile(&self, profile: &Profile) -> AppResult<()>;
    fn update_profile(&self, user_id: Uuid, changes: &ProfileChanges) -> AppResult<Profile>;
    fn touch_last_active(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
    /// Removes the profile and everything authored by or pointing at the user.
    fn purge_account(&self, user_id: Uuid) -> AppResult<AccountPurge>;
    /// Ordered by `last_active_at` desc then `user_id`. Returns the page and the total match count.
    fn find_candidates(&self, query: &CandidateQuery) -> AppResult<(Vec<Profile>, u64)>;

    // --- Relationships ---

    fn relationship_ids(&self, user_id: Uuid) -> AppResult<RelationshipIds>;
    fn find_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<Option<BlockedUser>>;
    fn is_blocked_either_way(&self, a: Uuid, b: Uuid) -> AppResult<bool>;
    /// Inserts the block and drops the pair's friendship and pending requests.
    fn block_and_sever(&self, block: &BlockedUser) -> AppResult<BlockCascade>;
    fn delete_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<bool>;
    fn list_blocks(&self, blocker_id: Uuid) -> AppResult<Vec<BlockedUser>>;

    fn find_friendship(&self, a: Uuid, b: Uuid) -> AppResult<Option<Friendship>>;
    fn list_friendships(&self, user_id: Uuid) -> AppResult<Vec<Friendship>>;
    fn delete_friendship(&self, a: Uuid, b: Uuid) -> AppResult<bool>;

    fn find_friend_request(&self, request_id: Uuid) -> AppResult<Option<FriendRequest>>;
    /// A pending request in either direction.
    fn find_request_between(&self, a: Uuid, b: Uuid) -> AppResult<Option<FriendRequest>>;
    fn insert_friend_request(&self, request: &FriendRequest) -> AppResult<()>;
    fn list_friend_requests(&self, user_id: Uuid, direction: RequestDirection) -> AppResult<Vec<FriendRequest>>;
    fn delete_friend_request(&self, request_id: Uuid) -> AppResult<bool>;
    /// Deletes the request and inserts the friendship. Returns false when the request was already gone.
    fn accept_friend_request(&self, request_id: Uuid, friendship: &Friendship) -> AppResult<bool>;

    // --- Feed ---

    fn insert_post(&self, post: &Post) -> AppResult<()>;
    fn find_post(&self, post_id: Uuid) -> AppResult<Option<Post>>;
    /// Newest first.
    fn list_posts(&self, author_ids: &[Uuid], offset: u64, limit: u64) -> AppResult<(Vec<Post>, u64)>;
    fn delete_post_cascade(&self, post_id: Uuid) -> AppResult<PostCascade>;
    fn post_stats(&self, post_ids: &[Uuid], viewer_id: Uuid) -> AppResult<HashMap<Uuid, PostStats>>;

    fn insert_comment(&self, comment: &Comment) -> AppResult<()>;
    fn find_comment(&self, comment_id: Uuid) -> AppResult<Option<Comment>>;
    /// Oldest first.
    fn list_comments(&self, post_id: Uuid, offset: u64, limit: u64) -> AppResult<(Vec<Comment>, u64)>;
    fn delete_comment(&self, comment_id: Uuid) -> AppResult<bool>;

    fn find_like(&self, post_id: Uuid, user_id: Uuid) -> AppResult<Option<Like>>;
    /// Fails with `AlreadyLiked` if the pair exists.
    fn insert_like(&self, like: &Like) -> AppResult<()>;
    fn delete_like(&self, post_id: Uuid, user_id: Uuid) -> AppResult<bool>;
    fn list_likes(&self, post_id: Uuid) -> AppResult<Vec<Like>>;
}

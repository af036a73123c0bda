use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use lingo_shared::errors::{AppError, AppResult, ErrorCode};

use super::{
    AccountPurge, BlockCascade, CandidateQuery, PostCascade, PostStats, RelationshipIds,
    RequestDirection, SocialStore,
};
use crate::models::{
    canonical_pair, BlockedUser, Comment, FriendRequest, Friendship, Like, Post, Profile,
    ProfileChanges,
};

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    /// Keyed by the canonical pair.
    friendships: HashMap<(Uuid, Uuid), Friendship>,
    friend_requests: HashMap<Uuid, FriendRequest>,
    /// Keyed by (blocker, blocked).
    blocks: HashMap<(Uuid, Uuid), BlockedUser>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    /// Keyed by (post, user).
    likes: HashMap<(Uuid, Uuid), Like>,
}

impl Tables {
    fn sever(&mut self, a: Uuid, b: Uuid) -> BlockCascade {
        let friendships_removed = usize::from(self.friendships.remove(&canonical_pair(a, b)).is_some());
        let before = self.friend_requests.len();
        self.friend_requests.retain(|_, r| !r.is_between(a, b));
        BlockCascade {
            friendships_removed,
            requests_removed: before - self.friend_requests.len(),
        }
    }

    fn remove_post(&mut self, post_id: Uuid) -> PostCascade {
        let comments_before = self.comments.len();
        self.comments.retain(|_, c| c.post_id != post_id);
        let likes_before = self.likes.len();
        self.likes.retain(|(p, _), _| *p != post_id);
        self.posts.remove(&post_id);
        PostCascade {
            comments_removed: comments_before - self.comments.len(),
            likes_removed: likes_before - self.likes.len(),
        }
    }
}

/// In-process store. Each call holds the table lock for its whole duration,
/// so multi-record operations are atomic with respect to other calls.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| AppError::internal("memory store lock poisoned"))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| AppError::internal("memory store lock poisoned"))
    }
}

fn page<T>(items: Vec<T>, offset: u64, limit: u64) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();
    (items, total)
}

impl SocialStore for MemoryStore {
    fn ping(&self) -> AppResult<()> {
        self.read().map(|_| ())
    }

    // --- Profiles ---

    fn find_profile(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.read()?.profiles.get(&user_id).cloned())
    }

    fn find_profiles(&self, user_ids: &[Uuid]) -> AppResult<Vec<Profile>> {
        let tables = self.read()?;
        Ok(user_ids
            .iter()
            .filter_map(|id| tables.profiles.get(id).cloned())
            .collect())
    }

    fn username_exists(&self, username: &str) -> AppResult<bool> {
        Ok(self.read()?.profiles.values().any(|p| p.username == username))
    }

    fn insert_profile(&self, profile: &Profile) -> AppResult<()> {
        let mut tables = self.write()?;
        if tables.profiles.contains_key(&profile.user_id) {
            return Err(AppError::new(ErrorCode::ProfileAlreadyExists, "profile already exists"));
        }
        if tables.profiles.values().any(|p| p.username == profile.username) {
            return Err(AppError::new(ErrorCode::UsernameTaken, "username is already taken"));
        }
        tables.profiles.insert(profile.user_id, profile.clone());
        Ok(())
    }

    fn update_profile(&self, user_id: Uuid, changes: &ProfileChanges) -> AppResult<Profile> {
        let mut tables = self.write()?;
        let profile = tables
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;
        changes.apply_to(profile);
        Ok(profile.clone())
    }

    fn touch_last_active(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(profile) = self.write()?.profiles.get_mut(&user_id) {
            profile.last_active_at = at;
        }
        Ok(())
    }

    fn purge_account(&self, user_id: Uuid) -> AppResult<AccountPurge> {
        let mut tables = self.write()?;
        let mut purge = AccountPurge::default();

        if let Some(profile) = tables.profiles.remove(&user_id) {
            purge.blob_keys.extend(profile.profile_picture);
        }

        let own_posts: Vec<Uuid> = tables
            .posts
            .values()
            .filter(|p| p.author_id == user_id)
            .map(|p| p.id)
            .collect();
        for post_id in &own_posts {
            if let Some(key) = tables.posts.get(post_id).and_then(|p| p.image.clone()) {
                purge.blob_keys.push(key);
            }
            tables.remove_post(*post_id);
        }
        purge.posts_removed = own_posts.len();

        tables.comments.retain(|_, c| c.author_id != user_id);
        tables.likes.retain(|(_, u), _| *u != user_id);

        let before = tables.friendships.len() + tables.friend_requests.len() + tables.blocks.len();
        tables.friendships.retain(|_, f| !f.involves(user_id));
        tables
            .friend_requests
            .retain(|_, r| r.sender_id != user_id && r.receiver_id != user_id);
        tables
            .blocks
            .retain(|(blocker, blocked), _| *blocker != user_id && *blocked != user_id);
        let after = tables.friendships.len() + tables.friend_requests.len() + tables.blocks.len();
        purge.edges_removed = before - after;

        Ok(purge)
    }

    fn find_candidates(&self, query: &CandidateQuery) -> AppResult<(Vec<Profile>, u64)> {
        let tables = self.read()?;
        let text = query.text.as_ref().map(|t| t.to_lowercase());

        let mut matches: Vec<Profile> = tables
            .profiles
            .values()
            .filter(|p| p.age_group == query.age_group)
            .filter(|p| !p.is_admin && p.profile_picture.is_some())
            .filter(|p| !query.excluded.contains(&p.user_id))
            .filter(|p| query.gender.as_ref().map_or(true, |g| &p.gender == g))
            .filter(|p| {
                text.as_ref().map_or(true, |t| {
                    p.name.to_lowercase().contains(t.as_str()) || p.username.contains(t.as_str())
                })
            })
            .filter(|p| query.country_code.as_ref().map_or(true, |c| &p.country_code == c))
            .filter(|p| {
                query
                    .spoken_language
                    .as_ref()
                    .map_or(true, |l| p.spoken_languages.contains(l))
            })
            .filter(|p| {
                query
                    .learning_language
                    .as_ref()
                    .map_or(true, |l| p.learning_languages.contains(l))
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            b.last_active_at
                .cmp(&a.last_active_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        Ok(page(matches, query.offset, query.limit))
    }

    // --- Relationships ---

    fn relationship_ids(&self, user_id: Uuid) -> AppResult<RelationshipIds> {
        let tables = self.read()?;
        let mut ids = RelationshipIds::default();

        for (blocker, blocked) in tables.blocks.keys() {
            if *blocker == user_id {
                ids.blocked.push(*blocked);
            } else if *blocked == user_id {
                ids.blocked_by.push(*blocker);
            }
        }
        ids.friends = tables
            .friendships
            .values()
            .filter(|f| f.involves(user_id))
            .map(|f| f.other(user_id))
            .collect();
        for request in tables.friend_requests.values() {
            if request.sender_id == user_id {
                ids.requests_sent.push(request.receiver_id);
            } else if request.receiver_id == user_id {
                ids.requests_received.push(request.sender_id);
            }
        }
        Ok(ids)
    }

    fn find_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<Option<BlockedUser>> {
        Ok(self.read()?.blocks.get(&(blocker_id, blocked_id)).cloned())
    }

    fn is_blocked_either_way(&self, a: Uuid, b: Uuid) -> AppResult<bool> {
        let tables = self.read()?;
        Ok(tables.blocks.contains_key(&(a, b)) || tables.blocks.contains_key(&(b, a)))
    }

    fn block_and_sever(&self, block: &BlockedUser) -> AppResult<BlockCascade> {
        let mut tables = self.write()?;
        let key = (block.blocker_id, block.blocked_id);
        if tables.blocks.contains_key(&key) {
            return Err(AppError::new(ErrorCode::AlreadyBlocked, "user is already blocked"));
        }
        tables.blocks.insert(key, block.clone());
        Ok(tables.sever(block.blocker_id, block.blocked_id))
    }

    fn delete_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<bool> {
        Ok(self.write()?.blocks.remove(&(blocker_id, blocked_id)).is_some())
    }

    fn list_blocks(&self, blocker_id: Uuid) -> AppResult<Vec<BlockedUser>> {
        let mut blocks: Vec<BlockedUser> = self
            .read()?
            .blocks
            .values()
            .filter(|b| b.blocker_id == blocker_id)
            .cloned()
            .collect();
        blocks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(blocks)
    }

    fn find_friendship(&self, a: Uuid, b: Uuid) -> AppResult<Option<Friendship>> {
        Ok(self.read()?.friendships.get(&canonical_pair(a, b)).cloned())
    }

    fn list_friendships(&self, user_id: Uuid) -> AppResult<Vec<Friendship>> {
        let mut friendships: Vec<Friendship> = self
            .read()?
            .friendships
            .values()
            .filter(|f| f.involves(user_id))
            .cloned()
            .collect();
        friendships.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(friendships)
    }

    fn delete_friendship(&self, a: Uuid, b: Uuid) -> AppResult<bool> {
        Ok(self.write()?.friendships.remove(&canonical_pair(a, b)).is_some())
    }

    fn find_friend_request(&self, request_id: Uuid) -> AppResult<Option<FriendRequest>> {
        Ok(self.read()?.friend_requests.get(&request_id).cloned())
    }

    fn find_request_between(&self, a: Uuid, b: Uuid) -> AppResult<Option<FriendRequest>> {
        Ok(self
            .read()?
            .friend_requests
            .values()
            .find(|r| r.is_between(a, b))
            .cloned())
    }

    fn insert_friend_request(&self, request: &FriendRequest) -> AppResult<()> {
        let mut tables = self.write()?;
        if tables
            .friend_requests
            .values()
            .any(|r| r.is_between(request.sender_id, request.receiver_id))
        {
            return Err(AppError::new(ErrorCode::FriendRequestExists, "a friend request is already pending"));
        }
        tables.friend_requests.insert(request.id, request.clone());
        Ok(())
    }

    fn list_friend_requests(&self, user_id: Uuid, direction: RequestDirection) -> AppResult<Vec<FriendRequest>> {
        let mut requests: Vec<FriendRequest> = self
            .read()?
            .friend_requests
            .values()
            .filter(|r| match direction {
                RequestDirection::Incoming => r.receiver_id == user_id,
                RequestDirection::Outgoing => r.sender_id == user_id,
            })
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    fn delete_friend_request(&self, request_id: Uuid) -> AppResult<bool> {
        Ok(self.write()?.friend_requests.remove(&request_id).is_some())
    }

    fn accept_friend_request(&self, request_id: Uuid, friendship: &Friendship) -> AppResult<bool> {
        let mut tables = self.write()?;
        if tables.friend_requests.remove(&request_id).is_none() {
            return Ok(false);
        }
        tables
            .friendships
            .entry((friendship.user_id1, friendship.user_id2))
            .or_insert_with(|| friendship.clone());
        Ok(true)
    }

    // --- Feed ---

    fn insert_post(&self, post: &Post) -> AppResult<()> {
        self.write()?.posts.insert(post.id, post.clone());
        Ok(())
    }

    fn find_post(&self, post_id: Uuid) -> AppResult<Option<Post>> {
        Ok(self.read()?.posts.get(&post_id).cloned())
    }

    fn list_posts(&self, author_ids: &[Uuid], offset: u64, limit: u64) -> AppResult<(Vec<Post>, u64)> {
        let mut posts: Vec<Post> = self
            .read()?
            .posts
            .values()
            .filter(|p| author_ids.contains(&p.author_id))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(page(posts, offset, limit))
    }

    fn delete_post_cascade(&self, post_id: Uuid) -> AppResult<PostCascade> {
        Ok(self.write()?.remove_post(post_id))
    }

    fn post_stats(&self, post_ids: &[Uuid], viewer_id: Uuid) -> AppResult<HashMap<Uuid, PostStats>> {
        let tables = self.read()?;
        let mut stats: HashMap<Uuid, PostStats> =
            post_ids.iter().map(|id| (*id, PostStats::default())).collect();

        for (post_id, user_id) in tables.likes.keys() {
            if let Some(entry) = stats.get_mut(post_id) {
                entry.likes += 1;
                entry.liked_by_viewer |= *user_id == viewer_id;
            }
        }
        for comment in tables.comments.values() {
            if let Some(entry) = stats.get_mut(&comment.post_id) {
                entry.comments += 1;
            }
        }
        Ok(stats)
    }

    fn insert_comment(&self, comment: &Comment) -> AppResult<()> {
        let mut tables = self.write()?;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(AppError::new(ErrorCode::PostNotFound, "post not found"));
        }
        tables.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    fn find_comment(&self, comment_id: Uuid) -> AppResult<Option<Comment>> {
        Ok(self.read()?.comments.get(&comment_id).cloned())
    }

    fn list_comments(&self, post_id: Uuid, offset: u64, limit: u64) -> AppResult<(Vec<Comment>, u64)> {
        let mut comments: Vec<Comment> = self
            .read()?
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(page(comments, offset, limit))
    }

    fn delete_comment(&self, comment_id: Uuid) -> AppResult<bool> {
        Ok(self.write()?.comments.remove(&comment_id).is_some())
    }

    fn find_like(&self, post_id: Uuid, user_id: Uuid) -> AppResult<Option<Like>> {
        Ok(self.read()?.likes.get(&(post_id, user_id)).cloned())
    }

    fn insert_like(&self, like: &Like) -> AppResult<()> {
        let mut tables = self.write()?;
        if !tables.posts.contains_key(&like.post_id) {
            return Err(AppError::new(ErrorCode::PostNotFound, "post not found"));
        }
        let key = (like.post_id, like.user_id);
        if tables.likes.contains_key(&key) {
            return Err(AppError::new(ErrorCode::AlreadyLiked, "post already liked"));
        }
        tables.likes.insert(key, like.clone());
        Ok(())
    }

    fn delete_like(&self, post_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        Ok(self.write()?.likes.remove(&(post_id, user_id)).is_some())
    }

    fn list_likes(&self, post_id: Uuid) -> AppResult<Vec<Like>> {
        Ok(self
            .read()?
            .likes
            .values()
            .filter(|l| l.post_id == post_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(sender_id: Uuid, receiver_id: Uuid) -> FriendRequest {
        FriendRequest {
            id: Uuid::now_v7(),
            sender_id,
            receiver_id,
            message: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reverse_friend_request_conflicts() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        store.insert_friend_request(&request(a, b)).unwrap();

        let err = store.insert_friend_request(&request(b, a)).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::FriendRequestExists));
        assert_eq!(store.list_friend_requests(a, RequestDirection::Outgoing).unwrap().len(), 1);
        assert!(store.list_friend_requests(b, RequestDirection::Outgoing).unwrap().is_empty());
    }
}

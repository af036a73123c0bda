use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use lingo_shared::clients::db::{checkout, DbConn, DbPool};
use lingo_shared::errors::{AppError, AppResult, ErrorCode};

use super::{
    AccountPurge, BlockCascade, CandidateQuery, PostCascade, PostStats, RelationshipIds,
    RequestDirection, SocialStore,
};
use crate::models::{
    canonical_pair, BlockedUser, Comment, FriendRequest, Friendship, Like, Post, Profile,
    ProfileChanges,
};
use crate::schema::{blocked_users, comments, friend_requests, friendships, likes, posts, profiles};

/// Postgres-backed store. Cascades run inside a single transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> AppResult<DbConn> {
        checkout(&self.pool)
    }
}

/// Maps a constraint violation of `kind` to a domain error, anything else to `Database`.
fn map_violation(
    e: DieselError,
    kind: DatabaseErrorKind,
    on_violation: impl FnOnce(Option<&str>) -> AppError,
) -> AppError {
    if let DieselError::DatabaseError(actual, info) = &e {
        if std::mem::discriminant(actual) == std::mem::discriminant(&kind) {
            return on_violation(info.constraint_name());
        }
    }
    AppError::Database(e)
}

/// Escapes LIKE metacharacters in user-supplied search text.
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn candidate_filter(query: &CandidateQuery) -> profiles::BoxedQuery<'static, Pg> {
    let mut q = profiles::table
        .filter(profiles::age_group.eq(query.age_group.clone()))
        .filter(profiles::is_admin.eq(false))
        .filter(profiles::profile_picture.is_not_null())
        .into_boxed();

    if !query.excluded.is_empty() {
        q = q.filter(profiles::user_id.ne_all(query.excluded.clone()));
    }
    if let Some(gender) = &query.gender {
        q = q.filter(profiles::gender.eq(gender.clone()));
    }
    if let Some(text) = &query.text {
        let pattern = like_pattern(text);
        q = q.filter(
            profiles::name
                .ilike(pattern.clone())
                .or(profiles::username.ilike(pattern)),
        );
    }
    if let Some(country) = &query.country_code {
        q = q.filter(profiles::country_code.eq(country.clone()));
    }
    if let Some(lang) = &query.spoken_language {
        q = q.filter(profiles::spoken_languages.contains(vec![lang.clone()]));
    }
    if let Some(lang) = &query.learning_language {
        q = q.filter(profiles::learning_languages.contains(vec![lang.clone()]));
    }
    q
}

impl SocialStore for PgStore {
    fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }

    // --- Profiles ---

    fn find_profile(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        let mut conn = self.conn()?;
        let profile = profiles::table
            .find(user_id)
            .first::<Profile>(&mut conn)
            .optional()?;
        Ok(profile)
    }

    fn find_profiles(&self, user_ids: &[Uuid]) -> AppResult<Vec<Profile>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }
        let mut conn = self.conn()?;
        let ids = user_ids.to_vec();
        let mut found = profiles::table
            .filter(profiles::user_id.eq_any(&ids))
            .load::<Profile>(&mut conn)?;

        // Preserve caller order
        let order: HashMap<Uuid, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        found.sort_by_key(|p| order.get(&p.user_id).copied().unwrap_or(usize::MAX));
        Ok(found)
    }

    fn username_exists(&self, username: &str) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let count: i64 = profiles::table
            .filter(profiles::username.eq(username))
            .count()
            .get_result(&mut conn)?;
        Ok(count > 0)
    }

    fn insert_profile(&self, profile: &Profile) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(profiles::table)
            .values(profile)
            .execute(&mut conn)
            .map_err(|e| {
                map_violation(e, DatabaseErrorKind::UniqueViolation, |constraint| {
                    if constraint == Some("profiles_pkey") {
                        AppError::new(ErrorCode::ProfileAlreadyExists, "profile already exists")
                    } else {
                        AppError::new(ErrorCode::UsernameTaken, "username is already taken")
                    }
                })
            })?;
        Ok(())
    }

    fn update_profile(&self, user_id: Uuid, changes: &ProfileChanges) -> AppResult<Profile> {
        let mut conn = self.conn()?;
        diesel::update(profiles::table.find(user_id))
            .set(changes)
            .get_result::<Profile>(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
    }

    fn touch_last_active(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::update(profiles::table.find(user_id))
            .set(profiles::last_active_at.eq(at))
            .execute(&mut conn)?;
        Ok(())
    }

    fn purge_account(&self, user_id: Uuid) -> AppResult<AccountPurge> {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let mut purge = AccountPurge::default();

            let picture: Option<Option<String>> = profiles::table
                .find(user_id)
                .select(profiles::profile_picture)
                .first(conn)
                .optional()?;
            purge.blob_keys.extend(picture.flatten());

            let own_posts: Vec<(Uuid, Option<String>)> = posts::table
                .filter(posts::author_id.eq(user_id))
                .select((posts::id, posts::image))
                .load(conn)?;
            let post_ids: Vec<Uuid> = own_posts.iter().map(|(id, _)| *id).collect();
            purge.blob_keys.extend(own_posts.into_iter().filter_map(|(_, image)| image));

            diesel::delete(
                comments::table.filter(
                    comments::post_id
                        .eq_any(&post_ids)
                        .or(comments::author_id.eq(user_id)),
                ),
            )
            .execute(conn)?;
            diesel::delete(
                likes::table.filter(likes::post_id.eq_any(&post_ids).or(likes::user_id.eq(user_id))),
            )
            .execute(conn)?;
            purge.posts_removed = diesel::delete(posts::table.filter(posts::author_id.eq(user_id)))
                .execute(conn)?;

            let friendships_removed = diesel::delete(
                friendships::table.filter(
                    friendships::user_id1
                        .eq(user_id)
                        .or(friendships::user_id2.eq(user_id)),
                ),
            )
            .execute(conn)?;
            let requests_removed = diesel::delete(
                friend_requests::table.filter(
                    friend_requests::sender_id
                        .eq(user_id)
                        .or(friend_requests::receiver_id.eq(user_id)),
                ),
            )
            .execute(conn)?;
            let blocks_removed = diesel::delete(
                blocked_users::table.filter(
                    blocked_users::blocker_id
                        .eq(user_id)
                        .or(blocked_users::blocked_id.eq(user_id)),
                ),
            )
            .execute(conn)?;
            purge.edges_removed = friendships_removed + requests_removed + blocks_removed;

            diesel::delete(profiles::table.find(user_id)).execute(conn)?;
            Ok(purge)
        })
    }

    fn find_candidates(&self, query: &CandidateQuery) -> AppResult<(Vec<Profile>, u64)> {
        let mut conn = self.conn()?;

        let total: i64 = candidate_filter(query).count().get_result(&mut conn)?;
        let items = candidate_filter(query)
            .order((profiles::last_active_at.desc(), profiles::user_id.asc()))
            .offset(query.offset as i64)
            .limit(query.limit as i64)
            .load::<Profile>(&mut conn)?;

        Ok((items, total as u64))
    }

    // --- Relationships ---

    fn relationship_ids(&self, user_id: Uuid) -> AppResult<RelationshipIds> {
        let mut conn = self.conn()?;

        let blocked = blocked_users::table
            .filter(blocked_users::blocker_id.eq(user_id))
            .select(blocked_users::blocked_id)
            .load::<Uuid>(&mut conn)?;
        let blocked_by = blocked_users::table
            .filter(blocked_users::blocked_id.eq(user_id))
            .select(blocked_users::blocker_id)
            .load::<Uuid>(&mut conn)?;
        let friends = friendships::table
            .filter(
                friendships::user_id1
                    .eq(user_id)
                    .or(friendships::user_id2.eq(user_id)),
            )
            .load::<Friendship>(&mut conn)?
            .iter()
            .map(|f| f.other(user_id))
            .collect();
        let requests_sent = friend_requests::table
            .filter(friend_requests::sender_id.eq(user_id))
            .select(friend_requests::receiver_id)
            .load::<Uuid>(&mut conn)?;
        let requests_received = friend_requests::table
            .filter(friend_requests::receiver_id.eq(user_id))
            .select(friend_requests::sender_id)
            .load::<Uuid>(&mut conn)?;

        Ok(RelationshipIds {
            blocked,
            blocked_by,
            friends,
            requests_sent,
            requests_received,
        })
    }

    fn find_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<Option<BlockedUser>> {
        let mut conn = self.conn()?;
        let block = blocked_users::table
            .filter(blocked_users::blocker_id.eq(blocker_id))
            .filter(blocked_users::blocked_id.eq(blocked_id))
            .first::<BlockedUser>(&mut conn)
            .optional()?;
        Ok(block)
    }

    fn is_blocked_either_way(&self, a: Uuid, b: Uuid) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let count: i64 = blocked_users::table
            .filter(
                blocked_users::blocker_id
                    .eq(a)
                    .and(blocked_users::blocked_id.eq(b))
                    .or(blocked_users::blocker_id.eq(b).and(blocked_users::blocked_id.eq(a))),
            )
            .count()
            .get_result(&mut conn)?;
        Ok(count > 0)
    }

    fn block_and_sever(&self, block: &BlockedUser) -> AppResult<BlockCascade> {
        let (a, b) = (block.blocker_id, block.blocked_id);
        let (lo, hi) = canonical_pair(a, b);
        let mut conn = self.conn()?;

        conn.transaction::<_, AppError, _>(|conn| {
            diesel::insert_into(blocked_users::table)
                .values(block)
                .execute(conn)
                .map_err(|e| {
                    map_violation(e, DatabaseErrorKind::UniqueViolation, |_| {
                        AppError::new(ErrorCode::AlreadyBlocked, "user is already blocked")
                    })
                })?;

            let friendships_removed = diesel::delete(
                friendships::table
                    .filter(friendships::user_id1.eq(lo))
                    .filter(friendships::user_id2.eq(hi)),
            )
            .execute(conn)?;

            let requests_removed = diesel::delete(
                friend_requests::table.filter(
                    friend_requests::sender_id
                        .eq(a)
                        .and(friend_requests::receiver_id.eq(b))
                        .or(friend_requests::sender_id.eq(b).and(friend_requests::receiver_id.eq(a))),
                ),
            )
            .execute(conn)?;

            Ok(BlockCascade {
                friendships_removed,
                requests_removed,
            })
        })
    }

    fn delete_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(
            blocked_users::table
                .filter(blocked_users::blocker_id.eq(blocker_id))
                .filter(blocked_users::blocked_id.eq(blocked_id)),
        )
        .execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn list_blocks(&self, blocker_id: Uuid) -> AppResult<Vec<BlockedUser>> {
        let mut conn = self.conn()?;
        let blocks = blocked_users::table
            .filter(blocked_users::blocker_id.eq(blocker_id))
            .order(blocked_users::created_at.desc())
            .load::<BlockedUser>(&mut conn)?;
        Ok(blocks)
    }

    fn find_friendship(&self, a: Uuid, b: Uuid) -> AppResult<Option<Friendship>> {
        let (lo, hi) = canonical_pair(a, b);
        let mut conn = self.conn()?;
        let friendship = friendships::table
            .filter(friendships::user_id1.eq(lo))
            .filter(friendships::user_id2.eq(hi))
            .first::<Friendship>(&mut conn)
            .optional()?;
        Ok(friendship)
    }

    fn list_friendships(&self, user_id: Uuid) -> AppResult<Vec<Friendship>> {
        let mut conn = self.conn()?;
        let friendships = friendships::table
            .filter(
                friendships::user_id1
                    .eq(user_id)
                    .or(friendships::user_id2.eq(user_id)),
            )
            .order(friendships::created_at.desc())
            .load::<Friendship>(&mut conn)?;
        Ok(friendships)
    }

    fn delete_friendship(&self, a: Uuid, b: Uuid) -> AppResult<bool> {
        let (lo, hi) = canonical_pair(a, b);
        let mut conn = self.conn()?;
        let deleted = diesel::delete(
            friendships::table
                .filter(friendships::user_id1.eq(lo))
                .filter(friendships::user_id2.eq(hi)),
        )
        .execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn find_friend_request(&self, request_id: Uuid) -> AppResult<Option<FriendRequest>> {
        let mut conn = self.conn()?;
        let request = friend_requests::table
            .find(request_id)
            .first::<FriendRequest>(&mut conn)
            .optional()?;
        Ok(request)
    }

    fn find_request_between(&self, a: Uuid, b: Uuid) -> AppResult<Option<FriendRequest>> {
        let mut conn = self.conn()?;
        let request = friend_requests::table
            .filter(
                friend_requests::sender_id
                    .eq(a)
                    .and(friend_requests::receiver_id.eq(b))
                    .or(friend_requests::sender_id.eq(b).and(friend_requests::receiver_id.eq(a))),
            )
            .first::<FriendRequest>(&mut conn)
            .optional()?;
        Ok(request)
    }

    fn insert_friend_request(&self, request: &FriendRequest) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(friend_requests::table)
            .values(request)
            .execute(&mut conn)
            .map_err(|e| {
                map_violation(e, DatabaseErrorKind::UniqueViolation, |_| {
                    AppError::new(ErrorCode::FriendRequestExists, "a friend request is already pending")
                })
            })?;
        Ok(())
    }

    fn list_friend_requests(&self, user_id: Uuid, direction: RequestDirection) -> AppResult<Vec<FriendRequest>> {
        let mut conn = self.conn()?;
        let requests = match direction {
            RequestDirection::Incoming => friend_requests::table
                .filter(friend_requests::receiver_id.eq(user_id))
                .order(friend_requests::created_at.desc())
                .load::<FriendRequest>(&mut conn)?,
            RequestDirection::Outgoing => friend_requests::table
                .filter(friend_requests::sender_id.eq(user_id))
                .order(friend_requests::created_at.desc())
                .load::<FriendRequest>(&mut conn)?,
        };
        Ok(requests)
    }

    fn delete_friend_request(&self, request_id: Uuid) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(friend_requests::table.find(request_id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn accept_friend_request(&self, request_id: Uuid, friendship: &Friendship) -> AppResult<bool> {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let deleted = diesel::delete(friend_requests::table.find(request_id)).execute(conn)?;
            if deleted == 0 {
                return Ok(false);
            }
            diesel::insert_into(friendships::table)
                .values(friendship)
                .on_conflict((friendships::user_id1, friendships::user_id2))
                .do_nothing()
                .execute(conn)?;
            Ok(true)
        })
    }

    // --- Feed ---

    fn insert_post(&self, post: &Post) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(posts::table).values(post).execute(&mut conn)?;
        Ok(())
    }

    fn find_post(&self, post_id: Uuid) -> AppResult<Option<Post>> {
        let mut conn = self.conn()?;
        let post = posts::table.find(post_id).first::<Post>(&mut conn).optional()?;
        Ok(post)
    }

    fn list_posts(&self, author_ids: &[Uuid], offset: u64, limit: u64) -> AppResult<(Vec<Post>, u64)> {
        let ids = author_ids.to_vec();
        let mut conn = self.conn()?;

        let total: i64 = posts::table
            .filter(posts::author_id.eq_any(&ids))
            .count()
            .get_result(&mut conn)?;
        let items = posts::table
            .filter(posts::author_id.eq_any(&ids))
            .order((posts::created_at.desc(), posts::id.desc()))
            .offset(offset as i64)
            .limit(limit as i64)
            .load::<Post>(&mut conn)?;

        Ok((items, total as u64))
    }

    fn delete_post_cascade(&self, post_id: Uuid) -> AppResult<PostCascade> {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let comments_removed =
                diesel::delete(comments::table.filter(comments::post_id.eq(post_id))).execute(conn)?;
            let likes_removed =
                diesel::delete(likes::table.filter(likes::post_id.eq(post_id))).execute(conn)?;
            diesel::delete(posts::table.find(post_id)).execute(conn)?;
            Ok(PostCascade {
                comments_removed,
                likes_removed,
            })
        })
    }

    fn post_stats(&self, post_ids: &[Uuid], viewer_id: Uuid) -> AppResult<HashMap<Uuid, PostStats>> {
        let mut stats: HashMap<Uuid, PostStats> =
            post_ids.iter().map(|id| (*id, PostStats::default())).collect();
        if post_ids.is_empty() {
            return Ok(stats);
        }
        let ids = post_ids.to_vec();
        let mut conn = self.conn()?;

        let like_counts: Vec<(Uuid, i64)> = likes::table
            .filter(likes::post_id.eq_any(&ids))
            .group_by(likes::post_id)
            .select((likes::post_id, diesel::dsl::count_star()))
            .load(&mut conn)?;
        let comment_counts: Vec<(Uuid, i64)> = comments::table
            .filter(comments::post_id.eq_any(&ids))
            .group_by(comments::post_id)
            .select((comments::post_id, diesel::dsl::count_star()))
            .load(&mut conn)?;
        let liked: Vec<Uuid> = likes::table
            .filter(likes::post_id.eq_any(&ids))
            .filter(likes::user_id.eq(viewer_id))
            .select(likes::post_id)
            .load(&mut conn)?;

        for (id, n) in like_counts {
            if let Some(entry) = stats.get_mut(&id) {
                entry.likes = n as u64;
            }
        }
        for (id, n) in comment_counts {
            if let Some(entry) = stats.get_mut(&id) {
                entry.comments = n as u64;
            }
        }
        for id in liked {
            if let Some(entry) = stats.get_mut(&id) {
                entry.liked_by_viewer = true;
            }
        }
        Ok(stats)
    }

    fn insert_comment(&self, comment: &Comment) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(comments::table)
            .values(comment)
            .execute(&mut conn)
            .map_err(|e| {
                map_violation(e, DatabaseErrorKind::ForeignKeyViolation, |_| {
                    AppError::new(ErrorCode::PostNotFound, "post not found")
                })
            })?;
        Ok(())
    }

    fn find_comment(&self, comment_id: Uuid) -> AppResult<Option<Comment>> {
        let mut conn = self.conn()?;
        let comment = comments::table
            .find(comment_id)
            .first::<Comment>(&mut conn)
            .optional()?;
        Ok(comment)
    }

    fn list_comments(&self, post_id: Uuid, offset: u64, limit: u64) -> AppResult<(Vec<Comment>, u64)> {
        let mut conn = self.conn()?;
        let total: i64 = comments::table
            .filter(comments::post_id.eq(post_id))
            .count()
            .get_result(&mut conn)?;
        let items = comments::table
            .filter(comments::post_id.eq(post_id))
            .order((comments::created_at.asc(), comments::id.asc()))
            .offset(offset as i64)
            .limit(limit as i64)
            .load::<Comment>(&mut conn)?;
        Ok((items, total as u64))
    }

    fn delete_comment(&self, comment_id: Uuid) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(comments::table.find(comment_id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn find_like(&self, post_id: Uuid, user_id: Uuid) -> AppResult<Option<Like>> {
        let mut conn = self.conn()?;
        let like = likes::table
            .filter(likes::post_id.eq(post_id))
            .filter(likes::user_id.eq(user_id))
            .first::<Like>(&mut conn)
            .optional()?;
        Ok(like)
    }

    fn insert_like(&self, like: &Like) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(likes::table)
            .values(like)
            .execute(&mut conn)
            .map_err(|e| {
                if matches!(e, DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) {
                    return AppError::new(ErrorCode::PostNotFound, "post not found");
                }
                map_violation(e, DatabaseErrorKind::UniqueViolation, |_| {
                    AppError::new(ErrorCode::AlreadyLiked, "post already liked")
                })
            })?;
        Ok(())
    }

    fn delete_like(&self, post_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(
            likes::table
                .filter(likes::post_id.eq(post_id))
                .filter(likes::user_id.eq(user_id)),
        )
        .execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn list_likes(&self, post_id: Uuid) -> AppResult<Vec<Like>> {
        let mut conn = self.conn()?;
        let found = likes::table
            .filter(likes::post_id.eq(post_id))
            .order(likes::created_at.asc())
            .load::<Like>(&mut conn)?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    const SCHEMA: &str = include_str!("../../migrations/2026-01-01-000000_create_social/up.sql");

    #[test]
    fn friend_requests_are_unique_per_unordered_pair() {
        let index = SCHEMA
            .split(';')
            .find(|stmt| stmt.contains("friend_requests_pair_idx"))
            .expect("pair index is declared");
        assert!(index.contains("CREATE UNIQUE INDEX"));
        assert!(index.contains("LEAST(sender_id, receiver_id)"));
        assert!(index.contains("GREATEST(sender_id, receiver_id)"));
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(like_pattern("ana"), "%ana%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}

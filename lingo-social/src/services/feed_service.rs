use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lingo_shared::errors::{AppError, AppResult, ErrorCode};
use lingo_shared::types::{Paginated, PaginationParams};

use crate::blobs::ensure_owned_key;
use crate::events::publisher;
use crate::models::{Comment, Like, Post};
use crate::services::relationship_service::{self, are_friends};
use crate::services::{picture_url, require_profile, user_summaries, UserSummary};
use crate::store::PostCascade;
use crate::validation::{self, COMMENT_MAX_CHARS, POST_MAX_CHARS};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    /// Storage key returned by `POST /uploads`.
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub author: UserSummary,
    pub content: String,
    pub image_url: Option<String>,
    pub like_count: u64,
    pub comment_count: u64,
    pub liked_by_me: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author: UserSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Posts are visible to their author and the author's friends.
fn can_view(state: &AppState, viewer_id: Uuid, author_id: Uuid) -> AppResult<bool> {
    Ok(viewer_id == author_id || are_friends(state, viewer_id, author_id)?)
}

fn find_post(state: &AppState, post_id: Uuid) -> AppResult<Post> {
    state
        .store
        .find_post(post_id)?
        .ok_or_else(|| AppError::new(ErrorCode::PostNotFound, "post not found"))
}

/// The post, provided `viewer_id` is its author or a friend of the author.
fn visible_post(state: &AppState, viewer_id: Uuid, post_id: Uuid) -> AppResult<Post> {
    let post = find_post(state, post_id)?;
    if !can_view(state, viewer_id, post.author_id)? {
        return Err(AppError::new(ErrorCode::NotFriends, "only friends of the author can access this post"));
    }
    Ok(post)
}

async fn post_views(state: &AppState, viewer_id: Uuid, posts: Vec<Post>) -> AppResult<Vec<PostView>> {
    let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    let mut author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let stats = state.store.post_stats(&post_ids, viewer_id)?;
    let authors = user_summaries(state, &author_ids).await?;

    let mut views = Vec::with_capacity(posts.len());
    for post in posts {
        let Some(author) = authors.get(&post.author_id).cloned() else {
            continue;
        };
        let stat = stats.get(&post.id).copied().unwrap_or_default();
        let image_url = picture_url(state, post.image.as_deref()).await;
        views.push(PostView {
            id: post.id,
            author,
            content: post.content,
            image_url,
            like_count: stat.likes,
            comment_count: stat.comments,
            liked_by_me: stat.liked_by_viewer,
            created_at: post.created_at,
        });
    }
    Ok(views)
}

async fn post_view(state: &AppState, viewer_id: Uuid, post: Post) -> AppResult<PostView> {
    post_views(state, viewer_id, vec![post])
        .await?
        .pop()
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "author profile not found"))
}

// --- Posts ---

pub async fn create_post(state: &AppState, author_id: Uuid, req: CreatePostRequest) -> AppResult<PostView> {
    require_profile(state, author_id)?;
    let content = validation::content(&req.content, POST_MAX_CHARS, "post")?;
    if let Some(key) = &req.image {
        ensure_owned_key(author_id, key)?;
    }

    let post = Post {
        id: Uuid::now_v7(),
        author_id,
        content,
        image: req.image,
        created_at: Utc::now(),
    };
    state.store.insert_post(&post)?;

    counter!("lingo_posts_created_total").increment(1);
    tracing::info!(post_id = %post.id, author_id = %author_id, "post created");

    publisher::publish_post_created(&state.events, post.id, author_id).await;

    post_view(state, author_id, post).await
}

/// Author only. Comments and likes go with the post.
pub async fn delete_post(state: &AppState, actor_id: Uuid, post_id: Uuid) -> AppResult<PostCascade> {
    let post = find_post(state, post_id)?;
    if post.author_id != actor_id {
        return Err(AppError::forbidden("only the author can delete this post"));
    }

    let cascade = state.store.delete_post_cascade(post.id)?;

    if let Some(key) = &post.image {
        if let Err(e) = state.blobs.delete(key).await {
            tracing::warn!(error = %e, key = %key, "failed to delete post image");
        }
    }

    tracing::info!(
        post_id = %post.id,
        comments_removed = cascade.comments_removed,
        likes_removed = cascade.likes_removed,
        "post deleted"
    );

    Ok(cascade)
}

pub async fn get_post(state: &AppState, viewer_id: Uuid, post_id: Uuid) -> AppResult<PostView> {
    let post = visible_post(state, viewer_id, post_id)?;
    post_view(state, viewer_id, post).await
}

/// Posts by the viewer and their friends, newest first.
pub async fn feed(state: &AppState, viewer_id: Uuid, page: &PaginationParams) -> AppResult<Paginated<PostView>> {
    let mut author_ids = relationship_service::relationship_ids(state, viewer_id)?.friends;
    author_ids.push(viewer_id);

    let (posts, total) = state.store.list_posts(&author_ids, page.offset(), page.limit())?;
    let views = post_views(state, viewer_id, posts).await?;
    Ok(Paginated::new(views, total, page))
}

pub async fn user_posts(
    state: &AppState,
    viewer_id: Uuid,
    author_id: Uuid,
    page: &PaginationParams,
) -> AppResult<Paginated<PostView>> {
    require_profile(state, author_id)?;
    if !can_view(state, viewer_id, author_id)? {
        return Err(AppError::new(ErrorCode::NotFriends, "only friends can see this user's posts"));
    }

    let (posts, total) = state.store.list_posts(&[author_id], page.offset(), page.limit())?;
    let views = post_views(state, viewer_id, posts).await?;
    Ok(Paginated::new(views, total, page))
}

// --- Likes ---

pub async fn like_post(state: &AppState, actor_id: Uuid, post_id: Uuid) -> AppResult<Like> {
    let post = visible_post(state, actor_id, post_id)?;
    if state.store.find_like(post.id, actor_id)?.is_some() {
        return Err(AppError::new(ErrorCode::AlreadyLiked, "post already liked"));
    }

    let like = Like {
        id: Uuid::now_v7(),
        post_id: post.id,
        user_id: actor_id,
        created_at: Utc::now(),
    };
    state.store.insert_like(&like)?;

    tracing::debug!(post_id = %post.id, user_id = %actor_id, "post liked");

    if post.author_id != actor_id {
        publisher::publish_post_liked(&state.events, post.id, post.author_id, actor_id).await;
    }

    Ok(like)
}

pub fn unlike_post(state: &AppState, actor_id: Uuid, post_id: Uuid) -> AppResult<()> {
    let post = visible_post(state, actor_id, post_id)?;
    if !state.store.delete_like(post.id, actor_id)? {
        return Err(AppError::new(ErrorCode::NotLiked, "post is not liked"));
    }
    tracing::debug!(post_id = %post.id, user_id = %actor_id, "post unliked");
    Ok(())
}

// --- Comments ---

pub async fn add_comment(
    state: &AppState,
    actor_id: Uuid,
    post_id: Uuid,
    req: CreateCommentRequest,
) -> AppResult<CommentView> {
    let content = validation::content(&req.content, COMMENT_MAX_CHARS, "comment")?;
    let post = visible_post(state, actor_id, post_id)?;

    let comment = Comment {
        id: Uuid::now_v7(),
        post_id: post.id,
        author_id: actor_id,
        content,
        created_at: Utc::now(),
    };
    state.store.insert_comment(&comment)?;

    tracing::info!(comment_id = %comment.id, post_id = %post.id, author_id = %actor_id, "comment added");

    if post.author_id != actor_id {
        publisher::publish_comment_created(
            &state.events,
            comment.id,
            post.id,
            post.author_id,
            actor_id,
            &comment.content,
        )
        .await;
    }

    let mut authors = user_summaries(state, &[actor_id]).await?;
    let author = authors
        .remove(&actor_id)
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    Ok(CommentView {
        id: comment.id,
        post_id: comment.post_id,
        author,
        content: comment.content,
        created_at: comment.created_at,
    })
}

/// Oldest first.
pub async fn list_comments(
    state: &AppState,
    viewer_id: Uuid,
    post_id: Uuid,
    page: &PaginationParams,
) -> AppResult<Paginated<CommentView>> {
    let post = visible_post(state, viewer_id, post_id)?;
    let (comments, total) = state.store.list_comments(post.id, page.offset(), page.limit())?;

    let author_ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
    let authors = user_summaries(state, &author_ids).await?;

    let views = comments
        .into_iter()
        .filter_map(|c| {
            let author = authors.get(&c.author_id)?.clone();
            Some(CommentView {
                id: c.id,
                post_id: c.post_id,
                author,
                content: c.content,
                created_at: c.created_at,
            })
        })
        .collect();
    Ok(Paginated::new(views, total, page))
}

/// Comment author only.
pub fn delete_comment(state: &AppState, actor_id: Uuid, comment_id: Uuid) -> AppResult<()> {
    let comment = state
        .store
        .find_comment(comment_id)?
        .ok_or_else(|| AppError::new(ErrorCode::CommentNotFound, "comment not found"))?;
    if comment.author_id != actor_id {
        return Err(AppError::forbidden("only the author can delete this comment"));
    }
    state.store.delete_comment(comment.id)?;
    tracing::info!(comment_id = %comment.id, post_id = %comment.post_id, "comment deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blobs::new_storage_key;
    use crate::models::Friendship;
    use crate::store::SocialStore;
    use crate::test_support::TestApp;

    fn befriend(app: &TestApp, a: Uuid, b: Uuid) {
        let request = crate::models::FriendRequest {
            id: Uuid::now_v7(),
            sender_id: a,
            receiver_id: b,
            message: String::new(),
            created_at: Utc::now(),
        };
        app.store.insert_friend_request(&request).unwrap();
        app.store
            .accept_friend_request(request.id, &Friendship::between(a, b))
            .unwrap();
    }

    fn text(content: &str) -> CreatePostRequest {
        CreatePostRequest {
            content: content.into(),
            image: None,
        }
    }

    fn comment(content: &str) -> CreateCommentRequest {
        CreateCommentRequest { content: content.into() }
    }

    #[tokio::test]
    async fn liking_twice_fails() {
        let app = TestApp::new();
        let a = app.seed("alice", "female");
        let b = app.seed("bob", "male");
        befriend(&app, a.user_id, b.user_id);

        let post = create_post(&app.state, a.user_id, text("hello")).await.unwrap();
        like_post(&app.state, b.user_id, post.id).await.unwrap();
        let err = like_post(&app.state, b.user_id, post.id).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::AlreadyLiked));

        let seen = get_post(&app.state, b.user_id, post.id).await.unwrap();
        assert_eq!(seen.like_count, 1);
        assert!(seen.liked_by_me);

        unlike_post(&app.state, b.user_id, post.id).unwrap();
        let err = unlike_post(&app.state, b.user_id, post.id).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NotLiked));
        like_post(&app.state, b.user_id, post.id).await.unwrap();
    }

    #[tokio::test]
    async fn strangers_cannot_interact() {
        let app = TestApp::new();
        let a = app.seed("alice", "female");
        let stranger = app.seed("stranger", "male");
        let post = create_post(&app.state, a.user_id, text("friends only")).await.unwrap();

        let err = like_post(&app.state, stranger.user_id, post.id).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NotFriends));
        let err = add_comment(&app.state, stranger.user_id, post.id, comment("hi")).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NotFriends));
        let err = get_post(&app.state, stranger.user_id, post.id).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NotFriends));

        // Authors can always like their own posts.
        like_post(&app.state, a.user_id, post.id).await.unwrap();
    }

    #[tokio::test]
    async fn deleting_a_post_removes_comments_and_likes() {
        let app = TestApp::new();
        let a = app.seed("alice", "female");
        let b = app.seed("bob", "male");
        befriend(&app, a.user_id, b.user_id);

        let image = new_storage_key(a.user_id);
        app.blobs.put(&image);
        let post = create_post(
            &app.state,
            a.user_id,
            CreatePostRequest {
                content: "with picture".into(),
                image: Some(image.clone()),
            },
        )
        .await
        .unwrap();
        assert!(post.image_url.is_some());

        like_post(&app.state, b.user_id, post.id).await.unwrap();
        add_comment(&app.state, b.user_id, post.id, comment("nice")).await.unwrap();
        add_comment(&app.state, a.user_id, post.id, comment("thanks")).await.unwrap();

        let err = delete_post(&app.state, b.user_id, post.id).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::Forbidden));

        let cascade = delete_post(&app.state, a.user_id, post.id).await.unwrap();
        assert_eq!(cascade, PostCascade { comments_removed: 2, likes_removed: 1 });

        assert!(app.store.list_likes(post.id).unwrap().is_empty());
        assert_eq!(app.store.list_comments(post.id, 0, 100).unwrap().1, 0);
        assert!(!app.blobs.contains(&image));
        let err = get_post(&app.state, a.user_id, post.id).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PostNotFound));
    }

    #[tokio::test]
    async fn feed_shows_own_and_friends_posts_newest_first() {
        let app = TestApp::new();
        let a = app.seed("alice", "female");
        let b = app.seed("bob", "male");
        let c = app.seed("carol", "female");
        befriend(&app, a.user_id, b.user_id);

        let first = create_post(&app.state, b.user_id, text("first")).await.unwrap();
        create_post(&app.state, c.user_id, text("not a friend")).await.unwrap();
        let second = create_post(&app.state, a.user_id, text("second")).await.unwrap();

        let page = feed(&app.state, a.user_id, &PaginationParams::default()).await.unwrap();
        let ids: Vec<Uuid> = page.items.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(page.total, 2);

        let err = user_posts(&app.state, a.user_id, c.user_id, &PaginationParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NotFriends));
        let own = user_posts(&app.state, c.user_id, c.user_id, &PaginationParams::default())
            .await
            .unwrap();
        assert_eq!(own.total, 1);
    }

    #[tokio::test]
    async fn comment_content_is_bounded() {
        let app = TestApp::new();
        let a = app.seed("alice", "female");
        let post = create_post(&app.state, a.user_id, text("hi")).await.unwrap();

        let err = add_comment(&app.state, a.user_id, post.id, comment("   ")).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ContentEmpty));
        let err = add_comment(&app.state, a.user_id, post.id, comment(&"x".repeat(501)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ContentTooLong));

        let err = create_post(&app.state, a.user_id, text(&"x".repeat(2001))).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ContentTooLong));

        let err = add_comment(&app.state, a.user_id, Uuid::now_v7(), comment("hi")).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PostNotFound));
    }

    #[tokio::test]
    async fn only_the_comment_author_deletes_it() {
        let app = TestApp::new();
        let a = app.seed("alice", "female");
        let b = app.seed("bob", "male");
        befriend(&app, a.user_id, b.user_id);
        let post = create_post(&app.state, a.user_id, text("hi")).await.unwrap();
        let c = add_comment(&app.state, b.user_id, post.id, comment("hey")).await.unwrap();

        let err = delete_comment(&app.state, a.user_id, c.id).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::Forbidden));
        delete_comment(&app.state, b.user_id, c.id).unwrap();

        let listed = list_comments(&app.state, a.user_id, post.id, &PaginationParams::default())
            .await
            .unwrap();
        assert!(listed.items.is_empty());
    }
}

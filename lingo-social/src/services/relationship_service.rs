use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use lingo_shared::errors::{AppError, AppResult, ErrorCode};
use lingo_shared::types::{Paginated, PaginationParams};

use crate::events::publisher;
use crate::models::{BlockedUser, FriendRequest, Friendship};
use crate::services::{paginate, require_profile, user_summaries, UserSummary};
use crate::store::{BlockCascade, RelationshipIds, RequestDirection};
use crate::validation;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SendFriendRequest {
    pub receiver_id: Uuid,
    #[serde(default)]
    #[validate(custom = "validation::friend_message")]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BlockedView {
    #[serde(flatten)]
    pub user: UserSummary,
    pub blocked_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct FriendView {
    #[serde(flatten)]
    pub user: UserSummary,
    pub friends_since: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct FriendRequestView {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    /// The other party: the sender for incoming requests, the receiver for outgoing ones.
    pub user: UserSummary,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Every edge touching `user_id`; feeds the discovery exclusion set.
pub fn relationship_ids(state: &AppState, user_id: Uuid) -> AppResult<RelationshipIds> {
    state.store.relationship_ids(user_id)
}

pub fn are_friends(state: &AppState, a: Uuid, b: Uuid) -> AppResult<bool> {
    Ok(state.store.find_friendship(a, b)?.is_some())
}

// --- Blocks ---

/// Blocks `blocked_id` and severs the pair's friendship and pending requests.
pub async fn block_user(state: &AppState, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<BlockCascade> {
    if blocker_id == blocked_id {
        return Err(AppError::new(ErrorCode::CannotBlockSelf, "you cannot block yourself"));
    }
    require_profile(state, blocked_id)?;

    if state.store.find_block(blocker_id, blocked_id)?.is_some() {
        return Err(AppError::new(ErrorCode::AlreadyBlocked, "user is already blocked"));
    }

    let block = BlockedUser {
        id: Uuid::now_v7(),
        blocker_id,
        blocked_id,
        created_at: Utc::now(),
    };
    let cascade = state.store.block_and_sever(&block)?;

    counter!("lingo_blocks_total").increment(1);
    tracing::info!(
        blocker_id = %blocker_id,
        blocked_id = %blocked_id,
        friendships_removed = cascade.friendships_removed,
        requests_removed = cascade.requests_removed,
        "user blocked"
    );

    publisher::publish_user_blocked(&state.events, blocker_id, blocked_id).await;

    Ok(cascade)
}

pub fn unblock_user(state: &AppState, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<()> {
    if !state.store.delete_block(blocker_id, blocked_id)? {
        return Err(AppError::new(ErrorCode::BlockNotFound, "user is not blocked"));
    }
    tracing::info!(blocker_id = %blocker_id, blocked_id = %blocked_id, "user unblocked");
    Ok(())
}

pub async fn list_blocked(
    state: &AppState,
    blocker_id: Uuid,
    page: &PaginationParams,
) -> AppResult<Paginated<BlockedView>> {
    let blocks = state.store.list_blocks(blocker_id)?;
    let ids: Vec<Uuid> = blocks.iter().map(|b| b.blocked_id).collect();
    let mut users = user_summaries(state, &ids).await?;

    let views = blocks
        .into_iter()
        .filter_map(|b| {
            users.remove(&b.blocked_id).map(|user| BlockedView {
                user,
                blocked_at: b.created_at,
            })
        })
        .collect();
    Ok(paginate(views, page))
}

// --- Friend requests ---

pub async fn send_friend_request(
    state: &AppState,
    sender_id: Uuid,
    req: SendFriendRequest,
) -> AppResult<FriendRequest> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let receiver_id = req.receiver_id;
    if sender_id == receiver_id {
        return Err(AppError::new(ErrorCode::CannotFriendSelf, "you cannot befriend yourself"));
    }

    let sender = require_profile(state, sender_id)?;
    require_profile(state, receiver_id)?;

    if state.store.is_blocked_either_way(sender_id, receiver_id)? {
        return Err(AppError::new(ErrorCode::UserBlocked, "cannot send a friend request to this user"));
    }
    if are_friends(state, sender_id, receiver_id)? {
        return Err(AppError::new(ErrorCode::AlreadyFriends, "you are already friends"));
    }
    if state.store.find_request_between(sender_id, receiver_id)?.is_some() {
        return Err(AppError::new(ErrorCode::FriendRequestExists, "a friend request is already pending"));
    }

    let request = FriendRequest {
        id: Uuid::now_v7(),
        sender_id,
        receiver_id,
        message: req.message.trim().to_string(),
        created_at: Utc::now(),
    };
    state.store.insert_friend_request(&request)?;

    tracing::info!(
        request_id = %request.id,
        sender_id = %sender_id,
        receiver_id = %receiver_id,
        "friend request sent"
    );

    publisher::publish_friend_requested(&state.events, request.id, sender_id, receiver_id, &sender.name).await;

    Ok(request)
}

/// Loads a request that `user_id` may act on from the given side.
fn owned_request(
    state: &AppState,
    user_id: Uuid,
    request_id: Uuid,
    direction: RequestDirection,
) -> AppResult<FriendRequest> {
    let request = state
        .store
        .find_friend_request(request_id)?
        .filter(|r| match direction {
            RequestDirection::Incoming => r.receiver_id == user_id,
            RequestDirection::Outgoing => r.sender_id == user_id,
        })
        .ok_or_else(|| AppError::new(ErrorCode::FriendRequestNotFound, "friend request not found"))?;
    Ok(request)
}

pub async fn accept_friend_request(
    state: &AppState,
    receiver_id: Uuid,
    request_id: Uuid,
) -> AppResult<Friendship> {
    let request = owned_request(state, receiver_id, request_id, RequestDirection::Incoming)?;

    let friendship = Friendship::between(request.sender_id, request.receiver_id);
    if !state.store.accept_friend_request(request.id, &friendship)? {
        return Err(AppError::new(ErrorCode::FriendRequestNotFound, "friend request not found"));
    }

    tracing::info!(
        request_id = %request.id,
        sender_id = %request.sender_id,
        receiver_id = %receiver_id,
        "friend request accepted"
    );

    publisher::publish_friend_accepted(&state.events, request.sender_id, receiver_id).await;

    Ok(friendship)
}

pub fn decline_friend_request(state: &AppState, receiver_id: Uuid, request_id: Uuid) -> AppResult<()> {
    let request = owned_request(state, receiver_id, request_id, RequestDirection::Incoming)?;
    state.store.delete_friend_request(request.id)?;
    tracing::info!(request_id = %request.id, receiver_id = %receiver_id, "friend request declined");
    Ok(())
}

pub fn cancel_friend_request(state: &AppState, sender_id: Uuid, request_id: Uuid) -> AppResult<()> {
    let request = owned_request(state, sender_id, request_id, RequestDirection::Outgoing)?;
    state.store.delete_friend_request(request.id)?;
    tracing::info!(request_id = %request.id, sender_id = %sender_id, "friend request cancelled");
    Ok(())
}

pub async fn list_friend_requests(
    state: &AppState,
    user_id: Uuid,
    direction: RequestDirection,
    page: &PaginationParams,
) -> AppResult<Paginated<FriendRequestView>> {
    let requests = state.store.list_friend_requests(user_id, direction)?;
    let counterpart = |r: &FriendRequest| match direction {
        RequestDirection::Incoming => r.sender_id,
        RequestDirection::Outgoing => r.receiver_id,
    };
    let ids: Vec<Uuid> = requests.iter().map(counterpart).collect();
    let users = user_summaries(state, &ids).await?;

    let views = requests
        .into_iter()
        .filter_map(|r| {
            let user = users.get(&counterpart(&r))?.clone();
            Some(FriendRequestView {
                id: r.id,
                sender_id: r.sender_id,
                receiver_id: r.receiver_id,
                user,
                message: r.message,
                created_at: r.created_at,
            })
        })
        .collect();
    Ok(paginate(views, page))
}

// --- Friends ---

pub async fn list_friends(
    state: &AppState,
    user_id: Uuid,
    page: &PaginationParams,
) -> AppResult<Paginated<FriendView>> {
    let friendships = state.store.list_friendships(user_id)?;
    let ids: Vec<Uuid> = friendships.iter().map(|f| f.other(user_id)).collect();
    let mut users = user_summaries(state, &ids).await?;

    let views = friendships
        .into_iter()
        .filter_map(|f| {
            users.remove(&f.other(user_id)).map(|user| FriendView {
                user,
                friends_since: f.created_at,
            })
        })
        .collect();
    Ok(paginate(views, page))
}

pub fn remove_friend(state: &AppState, user_id: Uuid, friend_id: Uuid) -> AppResult<()> {
    if !state.store.delete_friendship(user_id, friend_id)? {
        return Err(AppError::new(ErrorCode::NotFriends, "you are not friends with this user"));
    }
    tracing::info!(user_id = %user_id, friend_id = %friend_id, "friendship removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SocialStore;
    use crate::test_support::TestApp;

    fn request_to(receiver_id: Uuid) -> SendFriendRequest {
        SendFriendRequest {
            receiver_id,
            message: "hola!".into(),
        }
    }

    #[tokio::test]
    async fn accepted_request_becomes_one_canonical_friendship() {
        let app = TestApp::new();
        let a = app.seed("alice", "female");
        let b = app.seed("bob", "male");

        let request = send_friend_request(&app.state, b.user_id, request_to(a.user_id)).await.unwrap();
        let err = accept_friend_request(&app.state, b.user_id, request.id).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::FriendRequestNotFound), "sender cannot accept");

        let friendship = accept_friend_request(&app.state, a.user_id, request.id).await.unwrap();
        assert!(friendship.user_id1 < friendship.user_id2);
        assert!(are_friends(&app.state, a.user_id, b.user_id).unwrap());
        assert!(are_friends(&app.state, b.user_id, a.user_id).unwrap());
        assert!(app.store.find_friend_request(request.id).unwrap().is_none());

        let params = PaginationParams::default();
        let a_friends = list_friends(&app.state, a.user_id, &params).await.unwrap();
        let b_friends = list_friends(&app.state, b.user_id, &params).await.unwrap();
        assert_eq!(a_friends.items[0].user.user_id, b.user_id);
        assert_eq!(b_friends.items[0].user.user_id, a.user_id);

        let err = send_friend_request(&app.state, a.user_id, request_to(b.user_id)).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::AlreadyFriends));
    }

    #[tokio::test]
    async fn only_one_pending_request_per_pair() {
        let app = TestApp::new();
        let a = app.seed("alice", "female");
        let b = app.seed("bob", "male");

        send_friend_request(&app.state, a.user_id, request_to(b.user_id)).await.unwrap();
        let err = send_friend_request(&app.state, b.user_id, request_to(a.user_id)).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::FriendRequestExists));

        let err = send_friend_request(&app.state, a.user_id, request_to(a.user_id)).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::CannotFriendSelf));
    }

    #[tokio::test]
    async fn block_severs_friendship_and_requests_in_both_directions() {
        let app = TestApp::new();
        let a = app.seed("alice", "female");
        let b = app.seed("bob", "male");

        let request = send_friend_request(&app.state, a.user_id, request_to(b.user_id)).await.unwrap();
        accept_friend_request(&app.state, b.user_id, request.id).await.unwrap();
        // A stale request in the other direction, inserted behind the service's back.
        app.store
            .insert_friend_request(&FriendRequest {
                id: Uuid::now_v7(),
                sender_id: b.user_id,
                receiver_id: a.user_id,
                message: String::new(),
                created_at: Utc::now(),
            })
            .unwrap();

        let cascade = block_user(&app.state, b.user_id, a.user_id).await.unwrap();
        assert_eq!(cascade.friendships_removed, 1);
        assert_eq!(cascade.requests_removed, 1);
        assert!(!are_friends(&app.state, a.user_id, b.user_id).unwrap());
        assert!(app.store.find_request_between(a.user_id, b.user_id).unwrap().is_none());

        let err = block_user(&app.state, b.user_id, a.user_id).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::AlreadyBlocked));

        let err = send_friend_request(&app.state, a.user_id, request_to(b.user_id)).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::UserBlocked));
    }

    #[tokio::test]
    async fn cannot_block_self_or_unknown_users() {
        let app = TestApp::new();
        let a = app.seed("alice", "female");

        let err = block_user(&app.state, a.user_id, a.user_id).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::CannotBlockSelf));

        let err = block_user(&app.state, a.user_id, Uuid::now_v7()).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ProfileNotFound));
    }

    #[tokio::test]
    async fn unblock_and_list_blocked() {
        let app = TestApp::new();
        let a = app.seed("alice", "female");
        let b = app.seed("bob", "male");
        block_user(&app.state, a.user_id, b.user_id).await.unwrap();

        let blocked = list_blocked(&app.state, a.user_id, &PaginationParams::default()).await.unwrap();
        assert_eq!(blocked.total, 1);
        assert_eq!(blocked.items[0].user.username, "bob");

        unblock_user(&app.state, a.user_id, b.user_id).unwrap();
        let err = unblock_user(&app.state, a.user_id, b.user_id).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::BlockNotFound));
    }

    #[tokio::test]
    async fn decline_and_cancel_respect_sides() {
        let app = TestApp::new();
        let a = app.seed("alice", "female");
        let b = app.seed("bob", "male");

        let request = send_friend_request(&app.state, a.user_id, request_to(b.user_id)).await.unwrap();

        let incoming = list_friend_requests(&app.state, b.user_id, RequestDirection::Incoming, &PaginationParams::default())
            .await
            .unwrap();
        assert_eq!(incoming.items[0].user.user_id, a.user_id);
        assert_eq!(incoming.items[0].message, "hola!");

        assert!(decline_friend_request(&app.state, a.user_id, request.id).is_err());
        assert!(cancel_friend_request(&app.state, b.user_id, request.id).is_err());
        cancel_friend_request(&app.state, a.user_id, request.id).unwrap();

        let request = send_friend_request(&app.state, a.user_id, request_to(b.user_id)).await.unwrap();
        decline_friend_request(&app.state, b.user_id, request.id).unwrap();
        assert!(app.store.find_friend_request(request.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn long_messages_are_rejected() {
        let app = TestApp::new();
        let a = app.seed("alice", "female");
        let b = app.seed("bob", "male");
        let req = SendFriendRequest {
            receiver_id: b.user_id,
            message: "x".repeat(301),
        };
        let err = send_friend_request(&app.state, a.user_id, req).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ValidationError));
    }

    #[tokio::test]
    async fn remove_friend_requires_friendship() {
        let app = TestApp::new();
        let a = app.seed("alice", "female");
        let b = app.seed("bob", "male");
        let err = remove_friend(&app.state, a.user_id, b.user_id).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NotFriends));
    }
}

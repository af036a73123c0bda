use metrics::counter;
use uuid::Uuid;

use lingo_shared::errors::AppResult;
use lingo_shared::types::{Paginated, PaginationParams};

use crate::discovery::{candidate_query, DiscoverFilter, DiscoverUser, DiscoveryMode, ExclusionSet};
use crate::services::{relationship_service, require_profile};
use crate::AppState;

/// One page of candidates for `viewer_id` in the given mode.
///
/// Candidates whose picture no longer resolves are dropped after paging, so a
/// page can come back shorter than `per_page` while `total` still counts them.
pub async fn discover(
    state: &AppState,
    viewer_id: Uuid,
    mode: DiscoveryMode,
    page: &PaginationParams,
) -> AppResult<Paginated<DiscoverUser>> {
    let viewer = require_profile(state, viewer_id)?;

    let mode = match mode {
        DiscoveryMode::Search(text) if text.trim().is_empty() => {
            return Ok(Paginated::empty(page));
        }
        DiscoveryMode::Filter(filter) => DiscoveryMode::Filter(filter.normalized()?),
        other => other,
    };

    let relationships = relationship_service::relationship_ids(state, viewer_id)?;
    let exclusions = ExclusionSet::build(viewer_id, &relationships);
    let query = candidate_query(&viewer, &exclusions, &mode, page);

    let (candidates, total) = state.store.find_candidates(&query)?;
    let fetched = candidates.len();

    let mut items = Vec::with_capacity(fetched);
    for profile in candidates {
        let Some(key) = profile.profile_picture.as_deref() else {
            continue;
        };
        if let Some(url) = state.blobs.resolve_url(key).await {
            items.push(DiscoverUser::new(profile, url));
        }
    }

    let dropped = fetched - items.len();
    if dropped > 0 {
        counter!("lingo_discovery_dropped_candidates_total").increment(dropped as u64);
        tracing::debug!(viewer_id = %viewer_id, dropped, "dropped candidates without a resolvable picture");
    }

    tracing::debug!(
        viewer_id = %viewer_id,
        excluded = exclusions.len(),
        returned = items.len(),
        total,
        "discovery page served"
    );

    Ok(Paginated::new(items, total, page))
}

pub async fn browse(state: &AppState, viewer_id: Uuid, page: &PaginationParams) -> AppResult<Paginated<DiscoverUser>> {
    discover(state, viewer_id, DiscoveryMode::Browse, page).await
}

pub async fn search(
    state: &AppState,
    viewer_id: Uuid,
    text: &str,
    page: &PaginationParams,
) -> AppResult<Paginated<DiscoverUser>> {
    discover(state, viewer_id, DiscoveryMode::Search(text.to_string()), page).await
}

pub async fn filter(
    state: &AppState,
    viewer_id: Uuid,
    filter: DiscoverFilter,
    page: &PaginationParams,
) -> AppResult<Paginated<DiscoverUser>> {
    discover(state, viewer_id, DiscoveryMode::Filter(filter), page).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lingo_shared::errors::ErrorCode;

    use crate::blobs::BlobStore;
    use crate::models::{BlockedUser, FriendRequest, Friendship};
    use crate::store::SocialStore;
    use crate::test_support::TestApp;

    fn ids(page: &Paginated<DiscoverUser>) -> Vec<Uuid> {
        page.items.iter().map(|u| u.user_id).collect()
    }

    fn block(app: &TestApp, blocker: Uuid, blocked: Uuid) {
        app.store
            .block_and_sever(&BlockedUser {
                id: Uuid::now_v7(),
                blocker_id: blocker,
                blocked_id: blocked,
                created_at: Utc::now(),
            })
            .unwrap();
    }

    #[tokio::test]
    async fn browse_orders_by_recent_activity_and_excludes_self() {
        let app = TestApp::new();
        let viewer = app.seed("viewer", "female");
        let older = app.seed("older", "male");
        let newer = app.seed("newer", "other");

        let page = browse(&app.state, viewer.user_id, &PaginationParams::default()).await.unwrap();
        assert_eq!(ids(&page), vec![newer.user_id, older.user_id]);
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn page_far_past_the_end_is_empty() {
        let app = TestApp::new();
        let viewer = app.seed("viewer", "female");
        app.seed("other", "male");

        let params = PaginationParams::new(u64::MAX, 100);
        let page = browse(&app.state, viewer.user_id, &params).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 1);
        assert_eq!(page.page, u64::MAX);
    }

    #[tokio::test]
    async fn block_hides_users_from_each_other() {
        let app = TestApp::new();
        let a = app.seed("alice", "female");
        let b = app.seed("bob", "male");
        block(&app, a.user_id, b.user_id);

        let params = PaginationParams::default();
        assert!(browse(&app.state, a.user_id, &params).await.unwrap().items.is_empty());
        assert!(browse(&app.state, b.user_id, &params).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn friends_and_pending_requests_are_excluded() {
        let app = TestApp::new();
        let viewer = app.seed("viewer", "female");
        let friend = app.seed("friend", "female");
        let asked = app.seed("asked", "female");
        let asker = app.seed("asker", "female");
        let stranger = app.seed("stranger", "female");

        let request_id = Uuid::now_v7();
        app.store
            .insert_friend_request(&FriendRequest {
                id: request_id,
                sender_id: viewer.user_id,
                receiver_id: friend.user_id,
                message: String::new(),
                created_at: Utc::now(),
            })
            .unwrap();
        app.store
            .accept_friend_request(request_id, &Friendship::between(viewer.user_id, friend.user_id))
            .unwrap();
        for (sender, receiver) in [(viewer.user_id, asked.user_id), (asker.user_id, viewer.user_id)] {
            app.store
                .insert_friend_request(&FriendRequest {
                    id: Uuid::now_v7(),
                    sender_id: sender,
                    receiver_id: receiver,
                    message: String::new(),
                    created_at: Utc::now(),
                })
                .unwrap();
        }

        let params = PaginationParams::default();
        let page = browse(&app.state, viewer.user_id, &params).await.unwrap();
        assert_eq!(ids(&page), vec![stranger.user_id]);

        // Symmetric from the other side.
        let page = browse(&app.state, asked.user_id, &params).await.unwrap();
        assert!(!ids(&page).contains(&viewer.user_id));
        let page = browse(&app.state, friend.user_id, &params).await.unwrap();
        assert!(!ids(&page).contains(&viewer.user_id));
    }

    #[tokio::test]
    async fn gender_preference_and_age_group_partition_the_pool() {
        let app = TestApp::new();
        let viewer = app.seed_with("viewer", "female", |p| p.gender_preference = true);
        let woman = app.seed("woman", "female");
        app.seed("man", "male");
        app.seed_with("teen", "female", |p| {
            p.age = 16;
            p.age_group = "13-17".into();
        });
        app.seed_with("admin", "female", |p| p.is_admin = true);
        app.seed_with("faceless", "female", |p| p.profile_picture = None);
        // Picture key recorded but never uploaded.
        let ghost = app.seed("ghost", "female");
        app.blobs.delete(ghost.profile_picture.as_deref().unwrap()).await.unwrap();

        let blocked = app.seed("blocked", "female");
        block(&app, blocked.user_id, viewer.user_id);

        let page = browse(&app.state, viewer.user_id, &PaginationParams::default()).await.unwrap();
        assert_eq!(ids(&page), vec![woman.user_id]);
        assert!(page.items.iter().all(|u| u.gender == "female"));
        // The unresolvable candidate was counted by the store but dropped from the page.
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn search_matches_name_or_username() {
        let app = TestApp::new();
        let viewer = app.seed("viewer", "male");
        let maria = app.seed_with("mari_92", "female", |p| p.name = "Maria".into());
        app.seed_with("kenji", "male", |p| p.name = "Kenji".into());

        let params = PaginationParams::default();
        let page = search(&app.state, viewer.user_id, "MARI", &params).await.unwrap();
        assert_eq!(ids(&page), vec![maria.user_id]);

        let page = search(&app.state, viewer.user_id, "   ", &params).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn filter_requires_a_criterion() {
        let app = TestApp::new();
        let viewer = app.seed("viewer", "male");
        let learner = app.seed_with("learner", "female", |p| {
            p.country_code = "JP".into();
            p.learning_languages = vec!["fr".into()];
        });
        app.seed_with("other", "female", |p| p.country_code = "JP".into());

        let params = PaginationParams::default();
        let err = filter(&app.state, viewer.user_id, DiscoverFilter::default(), &params)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::MissingDiscoveryFilter));

        let page = filter(
            &app.state,
            viewer.user_id,
            DiscoverFilter {
                country: Some("jp".into()),
                spoken_language: None,
                learning_language: Some("FR".into()),
            },
            &params,
        )
        .await
        .unwrap();
        assert_eq!(ids(&page), vec![learner.user_id]);
    }

    #[tokio::test]
    async fn viewer_without_profile_is_rejected() {
        let app = TestApp::new();
        let err = browse(&app.state, Uuid::now_v7(), &PaginationParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ProfileNotFound));
    }
}

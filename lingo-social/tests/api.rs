use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use lingo_shared::middleware::jwt_secret;
use lingo_shared::types::auth::{Claims, UserRole};

use lingo_social::blobs::{BlobStore, MemoryBlobStore};
use lingo_social::config::AppConfig;
use lingo_social::events::EventPublisher;
use lingo_social::store::{MemoryStore, SocialStore};
use lingo_social::AppState;

struct TestServer {
    app: Router,
    blobs: Arc<MemoryBlobStore>,
}

impl TestServer {
    fn new() -> Self {
        let blobs = Arc::new(MemoryBlobStore::new());
        let state = Arc::new(AppState::new(
            Arc::new(MemoryStore::new()) as Arc<dyn SocialStore>,
            blobs.clone() as Arc<dyn BlobStore>,
            EventPublisher::disabled(),
            AppConfig::in_memory(),
        ));
        Self {
            app: lingo_social::router(state, None),
            blobs,
        }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// Registers a user with an uploaded profile picture and returns (id, token).
    async fn signup(&self, username: &str, gender: &str) -> (Uuid, String) {
        let user_id = Uuid::now_v7();
        let token = token_for(user_id);

        let (status, body) = self.call(Method::POST, "/uploads", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let key = body["data"]["storage_key"].as_str().unwrap().to_string();
        self.blobs.put(&key);

        let (status, body) = self
            .call(
                Method::POST,
                "/profile",
                Some(&token),
                Some(json!({
                    "name": username,
                    "username": username,
                    "gender": gender,
                    "birth_date": "1994-05-01",
                    "country_code": "br",
                    "spoken_languages": ["pt"],
                    "learning_languages": ["en"],
                    "profile_picture": key,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["age_group"], "18-100");

        (user_id, token)
    }
}

fn token_for(user_id: Uuid) -> String {
    let claims = Claims::new(user_id, UserRole::User, 3600);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
    .unwrap()
}

fn item_ids(body: &Value) -> Vec<String> {
    body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["user_id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_reports_store() {
    let server = TestServer::new();
    let (status, body) = server.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "lingo-social");
}

#[tokio::test]
async fn discovery_requires_authentication() {
    let server = TestServer::new();
    let (status, body) = server.call(Method::GET, "/discover", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "E0004");
}

#[tokio::test]
async fn pending_request_and_friendship_hide_users_from_discovery() {
    let server = TestServer::new();
    let (alice, alice_token) = server.signup("alice", "female").await;
    let (bob, bob_token) = server.signup("bob", "male").await;

    let (_, body) = server.call(Method::GET, "/discover", Some(&alice_token), None).await;
    assert_eq!(item_ids(&body), vec![bob.to_string()]);

    let (status, body) = server
        .call(
            Method::POST,
            "/friend-requests",
            Some(&alice_token),
            Some(json!({ "receiver_id": bob, "message": "let's practice!" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let request_id = body["data"]["id"].as_str().unwrap().to_string();

    for token in [&alice_token, &bob_token] {
        let (_, body) = server.call(Method::GET, "/discover", Some(token), None).await;
        assert!(item_ids(&body).is_empty());
    }

    let (_, body) = server
        .call(Method::GET, &format!("/profile/{alice}"), Some(&bob_token), None)
        .await;
    assert_eq!(body["data"]["relationship"], "request_received");

    let (status, _) = server
        .call(Method::POST, &format!("/friend-requests/{request_id}/accept"), Some(&bob_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = server.call(Method::GET, "/friends", Some(&alice_token), None).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["user_id"], bob.to_string());

    let (_, body) = server.call(Method::GET, "/discover", Some(&bob_token), None).await;
    assert!(item_ids(&body).is_empty());
}

#[tokio::test]
async fn blocking_hides_profiles_and_discovery_both_ways() {
    let server = TestServer::new();
    let (alice, alice_token) = server.signup("alice", "female").await;
    let (bob, bob_token) = server.signup("bob", "male").await;

    let (status, body) = server
        .call(Method::POST, &format!("/blocks/{bob}"), Some(&alice_token), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = server
        .call(Method::POST, &format!("/blocks/{bob}"), Some(&alice_token), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "E3002");

    let (status, _) = server
        .call(Method::GET, &format!("/profile/{alice}"), Some(&bob_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = server.call(Method::GET, "/discover", Some(&bob_token), None).await;
    assert!(item_ids(&body).is_empty());

    let (status, _) = server
        .call(
            Method::POST,
            "/friend-requests",
            Some(&bob_token),
            Some(json!({ "receiver_id": alice })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn post_lifecycle_between_friends() {
    let server = TestServer::new();
    let (_, alice_token) = server.signup("alice", "female").await;
    let (bob, bob_token) = server.signup("bob", "male").await;

    let (_, body) = server
        .call(
            Method::POST,
            "/friend-requests",
            Some(&alice_token),
            Some(json!({ "receiver_id": bob })),
        )
        .await;
    let request_id = body["data"]["id"].as_str().unwrap().to_string();
    server
        .call(Method::POST, &format!("/friend-requests/{request_id}/accept"), Some(&bob_token), None)
        .await;

    let (status, body) = server
        .call(Method::POST, "/posts", Some(&alice_token), Some(json!({ "content": "Olá!" })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let post_id = body["data"]["id"].as_str().unwrap().to_string();

    let like = format!("/posts/{post_id}/like");
    let (status, _) = server.call(Method::POST, &like, Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = server.call(Method::POST, &like, Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "E4003");

    let comments = format!("/posts/{post_id}/comments");
    let (status, _) = server
        .call(Method::POST, &comments, Some(&bob_token), Some(json!({ "content": "Oi!" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = server.call(Method::GET, "/feed", Some(&bob_token), None).await;
    assert_eq!(body["data"]["items"][0]["like_count"], 1);
    assert_eq!(body["data"]["items"][0]["comment_count"], 1);
    assert_eq!(body["data"]["items"][0]["liked_by_me"], true);

    let (status, _) = server
        .call(Method::DELETE, &format!("/posts/{post_id}"), Some(&bob_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .call(Method::DELETE, &format!("/posts/{post_id}"), Some(&alice_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["comments_removed"], 1);
    assert_eq!(body["data"]["likes_removed"], 1);

    let (status, body) = server.call(Method::GET, &comments, Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "E4001");
}

#[tokio::test]
async fn filter_needs_at_least_one_criterion() {
    let server = TestServer::new();
    let (_, alice_token) = server.signup("alice", "female").await;
    let (bob, _) = server.signup("bob", "male").await;

    let (status, body) = server.call(Method::GET, "/discover/filter", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "E5001");

    let (status, body) = server
        .call(Method::GET, "/discover/filter?spoken_language=PT&per_page=5", Some(&alice_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item_ids(&body), vec![bob.to_string()]);
    assert_eq!(body["data"]["per_page"], 5);

    let (_, body) = server
        .call(Method::GET, "/discover/search?q=BO", Some(&alice_token), None)
        .await;
    assert_eq!(item_ids(&body), vec![bob.to_string()]);
}

#[tokio::test]
async fn account_deletion_leaves_no_trace() {
    let server = TestServer::new();
    let (alice, alice_token) = server.signup("alice", "female").await;
    let (_, bob_token) = server.signup("bob", "male").await;

    let (status, _) = server.call(Method::DELETE, "/profile", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .call(Method::GET, &format!("/profile/{alice}"), Some(&bob_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = server
        .call(Method::GET, "/username-available?username=alice", Some(&bob_token), None)
        .await;
    assert_eq!(body["data"]["available"], true);
}

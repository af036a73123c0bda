//! Lingo social service: profiles, discovery, friendships, blocks and the
//! friends-only feed.

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod blobs;
pub mod config;
pub mod discovery;
pub mod events;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

use blobs::BlobStore;
use config::AppConfig;
use events::EventPublisher;
use store::SocialStore;

pub struct AppState {
    pub store: Arc<dyn SocialStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub events: EventPublisher,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SocialStore>,
        blobs: Arc<dyn BlobStore>,
        events: EventPublisher,
        config: AppConfig,
    ) -> Self {
        Self { store, blobs, events, config }
    }
}

/// The full HTTP surface. `metrics` is `None` when no Prometheus recorder is installed.
pub fn router(state: Arc<AppState>, metrics: Option<PrometheusHandle>) -> Router {
    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        // Profile
        .route(
            "/profile",
            post(routes::profile::create_profile)
                .get(routes::profile::get_own_profile)
                .patch(routes::profile::update_profile)
                .delete(routes::profile::delete_account),
        )
        .route("/profile/:user_id", get(routes::profile::get_profile))
        .route("/username-available", get(routes::profile::check_username))
        .route("/presence", post(routes::profile::touch_presence))
        .route("/uploads", post(routes::uploads::create_upload_url))
        // Discovery
        .route("/discover", get(routes::discover::browse))
        .route("/discover/search", get(routes::discover::search))
        .route("/discover/filter", get(routes::discover::filter))
        // Relationships
        .route("/blocks", get(routes::blocks::list_blocked))
        .route(
            "/blocks/:user_id",
            post(routes::blocks::block_user).delete(routes::blocks::unblock_user),
        )
        .route("/friends", get(routes::friends::list_friends))
        .route("/friends/:user_id", delete(routes::friends::remove_friend))
        .route("/friend-requests", post(routes::friends::send_request))
        .route("/friend-requests/incoming", get(routes::friends::list_incoming))
        .route("/friend-requests/outgoing", get(routes::friends::list_outgoing))
        .route("/friend-requests/:id", delete(routes::friends::cancel_request))
        .route("/friend-requests/:id/accept", post(routes::friends::accept_request))
        .route("/friend-requests/:id/decline", post(routes::friends::decline_request))
        // Feed
        .route("/feed", get(routes::posts::feed))
        .route("/posts", post(routes::posts::create_post))
        .route(
            "/posts/:id",
            get(routes::posts::get_post).delete(routes::posts::delete_post),
        )
        .route("/users/:user_id/posts", get(routes::posts::user_posts))
        .route(
            "/posts/:id/like",
            post(routes::posts::like_post).delete(routes::posts::unlike_post),
        )
        .route(
            "/posts/:id/comments",
            get(routes::comments::list_comments).post(routes::comments::add_comment),
        )
        .route("/comments/:id", delete(routes::comments::delete_comment));

    if let Some(handle) = metrics {
        app = app.route("/metrics", get(move || std::future::ready(handle.render())));
    }

    app.layer(axum::middleware::from_fn(lingo_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod auth;
pub mod explorer;
pub mod posts;

/// Account creation and login. Pure dispatch: all shaping happens in [`auth`].
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register/explorer", post(auth::register_explorer))
        .route("/register/business", post(auth::register_business))
        .route("/login", post(auth::login))
}

pub fn posts_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/posts", get(posts::list_posts))
        .route("/posts/onepost/{post_id}", get(posts::view_post))
        .route("/posts/{post_id}/reviews", get(posts::list_reviews))
}

pub fn explorer_router() -> Router<Arc<AppState>> {
    Router::new()
        // Favourites
        .route(
            "/explorer/{explorer_id}/favourites",
            get(explorer::list_favourites),
        )
        .route(
            "/explorer/{explorer_id}/favourites/{post_id}/check",
            get(explorer::check_favourite),
        )
        .route(
            "/explorer/{explorer_id}/favourites/{post_id}/addOrRemove",
            post(explorer::toggle_favourite),
        )
        // Traveled
        .route(
            "/explorer/{explorer_id}/traveled",
            get(explorer::list_traveled),
        )
        .route(
            "/explorer/{explorer_id}/traveled/{post_id}/check",
            get(explorer::check_traveled),
        )
        .route(
            "/explorer/{explorer_id}/traveled/{post_id}/addOrRemove",
            post(explorer::toggle_traveled),
        )
        // Reviews
        .route(
            "/explorer/{explorer_id}/reviews/{post_id}",
            post(explorer::add_review),
        )
}

pub fn get_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(auth_router())
        .merge(posts_router())
        .merge(explorer_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

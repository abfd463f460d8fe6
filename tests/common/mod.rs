#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, header::CONTENT_TYPE};
use http_body_util::BodyExt;
use tokio::net::TcpListener;
use tower::ServiceExt;

use wayfarer::client::{ApiClient, Session};
use wayfarer::password::hash_password;
use wayfarer::routes;
use wayfarer::store::Store;
use wayfarer::{Account, AppState, NewPost, NewReview, Post, Role};

pub const PASSWORD: &str = "correct-horse";

pub fn test_state() -> Arc<AppState> {
    Arc::new(AppState::with_store(Store::memory()))
}

pub fn build_test_app(state: Arc<AppState>) -> Router {
    routes::get_api_router(state)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing is listening on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub async fn seed_account(state: &AppState, role: Role, name: &str, email: &str) -> Account {
    let hash = hash_password(PASSWORD).unwrap();
    state
        .store
        .create_account(role, name, email, &hash)
        .await
        .unwrap()
}

pub async fn seed_post(state: &AppState, description: &str) -> Post {
    let owner = seed_account(state, Role::Business, "Dar Zaghouan", "owner@zaghouan.tn").await;
    state
        .store
        .insert_post(NewPost {
            idbusiness: owner.id,
            name: "Temple des Eaux".into(),
            location: "Zaghouan".into(),
            description: description.into(),
            image: "https://img.example/main.jpg".into(),
            image2: Some("https://img.example/2.jpg".into()),
            image3: Some("https://img.example/3.jpg".into()),
            image4: Some("https://img.example/4.jpg".into()),
        })
        .await
        .unwrap()
}

pub async fn seed_review(state: &AppState, explorer: &Account, post: &Post, rating: i32, comment: &str) {
    state
        .store
        .insert_review(NewReview {
            idposts: post.idposts,
            idexplorer: explorer.id,
            author_name: explorer.name.clone(),
            comment: comment.into(),
            rating,
        })
        .await
        .unwrap();
}

pub fn session_for(explorer: &Account) -> Session {
    Session {
        explorer_id: explorer.id,
        name: explorer.name.clone(),
        token: uuid::Uuid::nil(),
    }
}

pub fn client_for(base_url: &str) -> ApiClient {
    ApiClient::new(base_url)
}

//! End-to-end tests for the post detail view against a live server.

mod common;

use std::time::Duration;

use axum::{Json, Router, routing::{get, post}};
use common::{client_for, dead_url, seed_account, seed_post, seed_review, session_for, spawn, test_state};
use serde_json::{Value, json};
use wayfarer::client::{Alert, AlertKind, Membership, PostDetailView, PostSummary};
use wayfarer::{Post, Role, ToggleRequest, routes};

fn success(message: &str) -> Alert {
    Alert {
        kind: AlertKind::Success,
        message: message.to_string(),
    }
}

fn error(message: &str) -> Alert {
    Alert {
        kind: AlertKind::Error,
        message: message.to_string(),
    }
}

async fn open_view(description: &str) -> (PostDetailView, Post) {
    let state = test_state();
    let post = seed_post(&state, description).await;
    let explorer = seed_account(&state, Role::Explorer, "Amen Jbeli", "amen@mail.tn").await;
    seed_review(&state, &explorer, &post, 5, "Amazing experience, will come back!").await;
    seed_review(&state, &explorer, &post, 4, "Beautiful scenery and great weather.").await;
    seed_review(&state, &explorer, &post, 4, "Great place to visit!").await;

    let base_url = spawn(routes::get_api_router(state)).await;
    let view = PostDetailView::new(
        client_for(&base_url),
        session_for(&explorer),
        post.idposts,
        PostSummary::from(&post),
    );
    (view, post)
}

#[tokio::test]
async fn load_hydrates_rating_flags_and_reviews() {
    let description = "d".repeat(250);
    let (mut view, _) = open_view(&description).await;

    assert_eq!(view.average_rating(), 0.0);
    assert_eq!(view.favorite(), Membership::Unknown);
    assert_eq!(view.traveled(), Membership::Unknown);
    assert_eq!(view.description(), format!("{}...", "d".repeat(100)));

    view.load().await;

    assert!((view.average_rating() - 13.0 / 3.0).abs() < 1e-9);
    assert_eq!(view.rating_label(), "4.3 out of 5");
    assert_eq!(view.post().average_rating, Some(view.average_rating()));
    assert_eq!(view.favorite(), Membership::NotMember);
    assert_eq!(view.traveled(), Membership::NotMember);
    assert_eq!(view.visible_reviews().len(), 1);
    assert!(!view.has_more_reviews());
    assert!(view.take_alerts().is_empty());

    view.toggle_reviews();
    assert_eq!(view.visible_reviews().len(), 3);
}

#[tokio::test]
async fn toggle_favorite_follows_server() {
    let (mut view, _) = open_view("short").await;
    view.load().await;

    view.toggle_favorite().await;
    assert!(view.is_favorited());
    assert_eq!(view.take_alerts(), [success("Post added to favorites")]);

    view.toggle_favorite().await;
    assert!(!view.is_favorited());
    assert_eq!(view.take_alerts(), [success("Post removed from favorites")]);

    // Re-reading from the server agrees with local state.
    view.check_favorited().await;
    assert_eq!(view.favorite(), Membership::NotMember);
}

#[tokio::test]
async fn traveled_is_independent_of_favorite() {
    let (mut view, _) = open_view("short").await;

    view.toggle_traveled().await;
    assert!(view.is_traveled());
    assert_eq!(view.favorite(), Membership::Unknown);
    assert_eq!(view.take_alerts(), [success("Post added to traveled")]);

    view.check_favorited().await;
    view.check_traveled().await;
    assert_eq!(view.favorite(), Membership::NotMember);
    assert_eq!(view.traveled(), Membership::Member);
}

#[tokio::test]
async fn unreachable_server_alerts_only_where_expected() {
    let (view, post) = open_view("short").await;
    let mut view = PostDetailView::new(
        client_for(&dead_url().await),
        view.session().clone(),
        post.idposts,
        PostSummary::from(&post),
    );

    view.load().await;
    // Status checks fail silently; only the detail fetch is surfaced.
    assert_eq!(view.take_alerts(), [error("Failed to fetch post details")]);
    assert_eq!(view.average_rating(), 0.0);
    assert_eq!(view.favorite(), Membership::Unknown);

    view.toggle_favorite().await;
    view.toggle_traveled().await;
    assert_eq!(
        view.take_alerts(),
        [error("Failed to update favorites"), error("Failed to update traveled")]
    );
    assert!(!view.is_favorited());
    assert!(!view.is_traveled());
}

fn stub_toggle_router(response: Value) -> Router {
    let respond = move |Json(body): Json<ToggleRequest>| {
        let response = response.clone();
        async move {
            assert_eq!(body.idposts, 42);
            Json(response)
        }
    };
    Router::new().route("/explorer/{explorer_id}/favourites/{post_id}/addOrRemove", post(respond))
}

fn stub_view(base_url: &str) -> PostDetailView {
    let summary = PostSummary {
        name: "Ksar Ouled Soltane".into(),
        location: "Tataouine".into(),
        description: "Granaries".into(),
        image: "a.jpg".into(),
        image2: None,
        image3: None,
        image4: None,
        average_rating: None,
    };
    let session = wayfarer::client::Session {
        explorer_id: 1,
        name: "Amen".into(),
        token: uuid::Uuid::nil(),
    };
    PostDetailView::new(client_for(base_url), session, 42, summary)
}

#[tokio::test]
async fn unexpected_toggle_message_changes_nothing() {
    let base_url = spawn(stub_toggle_router(json!({ "message": "Done!" }))).await;
    let mut view = stub_view(&base_url);

    view.toggle_favorite().await;

    assert_eq!(view.favorite(), Membership::Unknown);
    assert_eq!(view.take_alerts(), [error("Unexpected response from server")]);
}

#[tokio::test]
async fn mistyped_toggle_message_changes_nothing() {
    let base_url = spawn(stub_toggle_router(json!({ "message": 5 }))).await;
    let mut view = stub_view(&base_url);

    view.toggle_favorite().await;

    assert_eq!(view.favorite(), Membership::Unknown);
    assert_eq!(view.take_alerts(), [error("Unexpected response from server")]);
}

#[tokio::test]
async fn plain_text_toggle_body_changes_nothing() {
    let text = Router::new().route(
        "/explorer/{explorer_id}/favourites/{post_id}/addOrRemove",
        post(|| async { "Post added to favorites" }),
    );
    let base_url = spawn(text).await;
    let mut view = stub_view(&base_url);

    view.toggle_favorite().await;

    assert_eq!(view.favorite(), Membership::Unknown);
    assert_eq!(view.take_alerts(), [error("Unexpected response from server")]);
}

#[tokio::test]
async fn legacy_message_only_response_is_accepted() {
    let base_url = spawn(stub_toggle_router(json!({ "message": "Post added to favorites" }))).await;
    let mut view = stub_view(&base_url);

    view.toggle_favorite().await;

    assert!(view.is_favorited());
    assert_eq!(view.take_alerts(), [success("Post added to favorites")]);
}

#[tokio::test]
async fn closing_mid_load_drops_results() {
    let slow = Router::new().route(
        "/posts/onepost/{post_id}",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({}))
        }),
    );
    let base_url = spawn(slow).await;
    let mut view = stub_view(&base_url);
    let lifecycle = view.lifecycle_token();

    let started = tokio::time::Instant::now();
    tokio::join!(view.load(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        lifecycle.cancel();
    });

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(view.is_closed());
    assert_eq!(view.average_rating(), 0.0);
    assert_eq!(view.favorite(), Membership::Unknown);
    assert!(view.take_alerts().is_empty());

    // Nothing applies after close either.
    view.toggle_favorite().await;
    assert!(view.take_alerts().is_empty());
}

#[tokio::test]
async fn fast_results_land_while_a_check_hangs() {
    let post = Post {
        idposts: 42,
        idbusiness: 1,
        name: "Ksar Ouled Soltane".into(),
        location: "Tataouine".into(),
        description: "Granaries".into(),
        image: "a.jpg".into(),
        image2: None,
        image3: None,
        image4: None,
        average_rating: 4.5,
        created_on: time::OffsetDateTime::now_utc(),
    };
    let details = serde_json::to_value(&post).unwrap();
    let stub = Router::new()
        .route(
            "/posts/onepost/{post_id}",
            get(move || {
                let details = details.clone();
                async move { Json(details) }
            }),
        )
        .route(
            "/explorer/{explorer_id}/favourites/{post_id}/check",
            get(|| async { Json(json!({ "favorited": true })) }),
        )
        .route(
            "/explorer/{explorer_id}/traveled/{post_id}/check",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "traveled": true }))
            }),
        )
        .route(
            "/posts/{post_id}/reviews",
            get(|| async { Json(json!({ "reviews": [], "page": 1, "per_page": 10, "total": 0 })) }),
        );
    let base_url = spawn(stub).await;
    let mut view = stub_view(&base_url);
    let lifecycle = view.lifecycle_token();

    let started = tokio::time::Instant::now();
    tokio::join!(view.load(), async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        lifecycle.cancel();
    });

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(view.average_rating(), 4.5);
    assert_eq!(view.rating_label(), "4.5 out of 5");
    assert_eq!(view.favorite(), Membership::Member);
    assert_eq!(view.traveled(), Membership::Unknown);
    assert!(view.take_alerts().is_empty());
}

#[tokio::test]
async fn reloading_does_not_duplicate_reviews() {
    let (mut view, _) = open_view("short").await;

    view.load().await;
    view.load().await;
    view.toggle_reviews();

    assert_eq!(view.visible_reviews().len(), 3);
    assert!(!view.has_more_reviews());
}

#[tokio::test]
async fn more_reviews_load_page_by_page() {
    let state = test_state();
    let post = seed_post(&state, "x").await;
    let explorer = seed_account(&state, Role::Explorer, "Amen", "amen@mail.tn").await;
    for i in 0..12 {
        seed_review(&state, &explorer, &post, 3, &format!("visit {i}")).await;
    }
    let base_url = spawn(routes::get_api_router(state)).await;
    let mut view = PostDetailView::new(
        client_for(&base_url),
        session_for(&explorer),
        post.idposts,
        PostSummary::from(&post),
    );

    view.load().await;
    view.toggle_reviews();
    assert_eq!(view.visible_reviews().len(), 10);
    assert!(view.has_more_reviews());

    view.load_more_reviews().await;
    assert_eq!(view.visible_reviews().len(), 12);
    assert!(!view.has_more_reviews());
    assert_eq!(view.visible_reviews()[11].comment, "visit 11");

    view.load_more_reviews().await;
    assert_eq!(view.visible_reviews().len(), 12);
}

#[tokio::test]
async fn thumbnails_swap_with_main_image() {
    let (mut view, post) = open_view("x").await;
    let image3 = post.image3.clone().unwrap();

    assert_eq!(view.thumbnails().len(), 3);
    view.select_image(&image3);
    assert_eq!(view.main_image(), image3);
    assert!(!view.thumbnails().contains(&image3.as_str()));
    assert!(view.thumbnails().contains(&post.image.as_str()));
    assert_eq!(view.thumbnails().len(), 3);
}

//! HTTP-level tests for explorer/business registration and unified login.

mod common;

use axum::http::{StatusCode, header::SET_COOKIE};
use common::{PASSWORD, body_json, build_test_app, post_json, seed_account, test_state};
use serde_json::json;
use wayfarer::Role;

#[tokio::test]
async fn register_explorer_returns_session() {
    let app = build_test_app(test_state());
    let response = post_json(
        app,
        "/register/explorer",
        json!({ "name": "Yessmine Nouri", "email": "yessmine@mail.tn", "password": "s3cret" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("token="));

    let json = body_json(response).await;
    assert_eq!(json["role"], "explorer");
    assert_eq!(json["name"], "Yessmine Nouri");
    assert!(json["id"].is_i64());
    assert_eq!(json["token"].as_str().unwrap().len(), 36);
}

#[tokio::test]
async fn register_business_reports_business_role() {
    let app = build_test_app(test_state());
    let response = post_json(
        app,
        "/register/business",
        json!({ "name": "Dar Sebastien", "email": "contact@dar.tn", "password": "pw" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["role"], "business");
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let state = test_state();
    seed_account(&state, Role::Explorer, "Amen", "amen@mail.tn").await;

    let response = post_json(
        build_test_app(state),
        "/register/explorer",
        json!({ "name": "Amen again", "email": "amen@mail.tn", "password": "pw" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[tokio::test]
async fn registration_validates_input() {
    let state = test_state();
    for body in [
        json!({ "name": " ", "email": "a@b.tn", "password": "pw" }),
        json!({ "name": "A", "email": "no-at-sign", "password": "pw" }),
        json!({ "name": "A", "email": "a@b.tn", "password": "  " }),
    ] {
        let response = post_json(build_test_app(state.clone()), "/register/explorer", body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn login_finds_explorers_and_business_owners() {
    let state = test_state();
    let explorer = seed_account(&state, Role::Explorer, "Amen", "amen@mail.tn").await;
    let owner = seed_account(&state, Role::Business, "Dar", "dar@mail.tn").await;

    let response = post_json(
        build_test_app(state.clone()),
        "/login",
        json!({ "email": "amen@mail.tn", "password": PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_some());
    let json = body_json(response).await;
    assert_eq!(json["role"], "explorer");
    assert_eq!(json["id"], explorer.id);

    let response = post_json(
        build_test_app(state),
        "/login",
        json!({ "email": "DAR@mail.tn", "password": PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["role"], "business");
    assert_eq!(json["id"], owner.id);
}

#[tokio::test]
async fn bad_credentials_are_indistinguishable() {
    let state = test_state();
    seed_account(&state, Role::Explorer, "Amen", "amen@mail.tn").await;

    let wrong_password = post_json(
        build_test_app(state.clone()),
        "/login",
        json!({ "email": "amen@mail.tn", "password": "nope" }),
    )
    .await;
    let unknown_email = post_json(
        build_test_app(state),
        "/login",
        json!({ "email": "ghost@mail.tn", "password": PASSWORD }),
    )
    .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong_password).await, body_json(unknown_email).await);
}

#[tokio::test]
async fn auth_routes_reject_get() {
    let response = common::get(build_test_app(test_state()), "/login").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

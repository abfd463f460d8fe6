use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::{
    Account, AppState, NewReview, Post, Relation, Review, ReviewRequest, ToggleRequest,
    ToggleResponse,
};

/// Resolves both path ids, failing with 404 if either is unknown.
async fn explorer_and_post(
    app_state: &AppState,
    explorer_id: i64,
    post_id: i64,
) -> ApiResult<(Account, Post)> {
    let explorer = app_state
        .store
        .find_explorer(explorer_id)
        .await?
        .ok_or(ApiError::NotFound {
            entity: "Explorer",
            id: explorer_id,
        })?;
    let post = app_state
        .store
        .get_post(post_id)
        .await?
        .ok_or(ApiError::NotFound {
            entity: "Post",
            id: post_id,
        })?;
    Ok((explorer, post))
}

async fn check_relation(
    relation: Relation,
    app_state: &AppState,
    explorer_id: i64,
    post_id: i64,
) -> ApiResult<bool> {
    explorer_and_post(app_state, explorer_id, post_id).await?;
    Ok(app_state
        .store
        .is_related(relation, explorer_id, post_id)
        .await?)
}

async fn toggle_relation(
    relation: Relation,
    app_state: &AppState,
    explorer_id: i64,
    post_id: i64,
    body: ToggleRequest,
) -> ApiResult<Json<ToggleResponse>> {
    if body.idposts != post_id {
        return Err(ApiError::BadRequest(format!(
            "Body idposts {} does not match path post {post_id}",
            body.idposts
        )));
    }
    explorer_and_post(app_state, explorer_id, post_id).await?;

    let status = app_state
        .store
        .toggle_relation(relation, explorer_id, post_id)
        .await?;
    debug!(explorer_id, post_id, ?status, "Toggled {relation}");

    Ok(Json(ToggleResponse {
        status,
        message: relation.message(status),
    }))
}

async fn list_relation(
    relation: Relation,
    app_state: &AppState,
    explorer_id: i64,
) -> ApiResult<Json<Vec<Post>>> {
    if app_state.store.find_explorer(explorer_id).await?.is_none() {
        return Err(ApiError::NotFound {
            entity: "Explorer",
            id: explorer_id,
        });
    }
    Ok(Json(
        app_state.store.list_related(relation, explorer_id).await?,
    ))
}

#[axum::debug_handler]
pub async fn check_favourite(
    State(app_state): State<Arc<AppState>>,
    Path((explorer_id, post_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    let favorited = check_relation(Relation::Favourites, &app_state, explorer_id, post_id).await?;
    Ok(Json(json!({ "favorited": favorited })))
}

#[axum::debug_handler]
pub async fn check_traveled(
    State(app_state): State<Arc<AppState>>,
    Path((explorer_id, post_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    let traveled = check_relation(Relation::Traveled, &app_state, explorer_id, post_id).await?;
    Ok(Json(json!({ "traveled": traveled })))
}

#[axum::debug_handler]
pub async fn toggle_favourite(
    State(app_state): State<Arc<AppState>>,
    Path((explorer_id, post_id)): Path<(i64, i64)>,
    Json(body): Json<ToggleRequest>,
) -> ApiResult<Json<ToggleResponse>> {
    toggle_relation(Relation::Favourites, &app_state, explorer_id, post_id, body).await
}

#[axum::debug_handler]
pub async fn toggle_traveled(
    State(app_state): State<Arc<AppState>>,
    Path((explorer_id, post_id)): Path<(i64, i64)>,
    Json(body): Json<ToggleRequest>,
) -> ApiResult<Json<ToggleResponse>> {
    toggle_relation(Relation::Traveled, &app_state, explorer_id, post_id, body).await
}

#[axum::debug_handler]
pub async fn list_favourites(
    State(app_state): State<Arc<AppState>>,
    Path(explorer_id): Path<i64>,
) -> ApiResult<Json<Vec<Post>>> {
    list_relation(Relation::Favourites, &app_state, explorer_id).await
}

#[axum::debug_handler]
pub async fn list_traveled(
    State(app_state): State<Arc<AppState>>,
    Path(explorer_id): Path<i64>,
) -> ApiResult<Json<Vec<Post>>> {
    list_relation(Relation::Traveled, &app_state, explorer_id).await
}

#[axum::debug_handler]
pub async fn add_review(
    State(app_state): State<Arc<AppState>>,
    Path((explorer_id, post_id)): Path<(i64, i64)>,
    Json(body): Json<ReviewRequest>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    if !(1..=5).contains(&body.rating) {
        return Err(ApiError::BadRequest(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    if body.comment.trim().is_empty() {
        return Err(ApiError::BadRequest("Comment cannot be empty".to_string()));
    }

    let (explorer, post) = explorer_and_post(&app_state, explorer_id, post_id).await?;
    let review = app_state
        .store
        .insert_review(NewReview {
            idposts: post.idposts,
            idexplorer: explorer.id,
            author_name: explorer.name,
            comment: body.comment.trim().to_string(),
            rating: body.rating,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(review)))
}

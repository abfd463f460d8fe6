use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::{AppState, Post, ReviewsPage};

const DEFAULT_PER_PAGE: u32 = 10;
const MAX_PER_PAGE: u32 = 50;

#[derive(Deserialize, Default)]
pub struct PageOpts {
    page: Option<u32>,
    per_page: Option<u32>,
}

impl PageOpts {
    fn resolve(&self) -> (u32, u32) {
        (
            self.page.unwrap_or(1).max(1),
            self.per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        )
    }
}

#[axum::debug_handler]
pub async fn list_posts(State(app_state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Post>>> {
    Ok(Json(app_state.store.list_posts().await?))
}

#[axum::debug_handler]
pub async fn view_post(
    State(app_state): State<Arc<AppState>>,
    Path(post_id): Path<i64>,
) -> ApiResult<Json<Post>> {
    app_state
        .store
        .get_post(post_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound {
            entity: "Post",
            id: post_id,
        })
}

#[axum::debug_handler]
pub async fn list_reviews(
    State(app_state): State<Arc<AppState>>,
    Path(post_id): Path<i64>,
    Query(page_opts): Query<PageOpts>,
) -> ApiResult<Json<ReviewsPage>> {
    if app_state.store.get_post(post_id).await?.is_none() {
        return Err(ApiError::NotFound {
            entity: "Post",
            id: post_id,
        });
    }

    let (page, per_page) = page_opts.resolve();
    let result = app_state.store.list_reviews(post_id, page, per_page).await?;

    Ok(Json(ReviewsPage {
        reviews: result.reviews,
        page,
        per_page,
        total: result.total,
    }))
}

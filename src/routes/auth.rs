use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::password::{hash_password, verify_password};
use crate::store::StoreError;
use crate::{
    Account, AppState, AuthResponse, LoginRequest, RegisterRequest, Role, validate_email,
    validate_name,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn session_cookie(token: Uuid) -> Cookie<'static> {
    Cookie::build(("token", token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

async fn issue_session(
    app_state: &AppState,
    jar: CookieJar,
    account: &Account,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let token = app_state.store.insert_session(account).await?;

    Ok((
        jar.add(session_cookie(token)),
        Json(AuthResponse {
            id: account.id,
            role: account.role,
            name: account.name.clone(),
            token,
        }),
    ))
}

async fn register_account(
    role: Role,
    app_state: &AppState,
    jar: CookieJar,
    form: RegisterRequest,
) -> ApiResult<(StatusCode, CookieJar, Json<AuthResponse>)> {
    validate_name(&form.name).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_email(&form.email).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if form.password.trim().is_empty() {
        return Err(ApiError::BadRequest("Password cannot be empty".to_string()));
    }

    let pw_hash = hash_password(&form.password)?;
    let account = app_state
        .store
        .create_account(role, form.name.trim(), form.email.trim(), &pw_hash)
        .await
        .map_err(|e| match e {
            StoreError::Duplicate(_) => {
                ApiError::Conflict(format!("An account with email {} already exists", form.email.trim()))
            }
            other => other.into(),
        })?;

    info!(id = account.id, role = role.as_str(), "Registered account");

    let (jar, body) = issue_session(app_state, jar, &account).await?;
    Ok((StatusCode::CREATED, jar, body))
}

#[axum::debug_handler]
pub async fn register_explorer(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(form): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    register_account(Role::Explorer, &app_state, jar, form).await
}

#[axum::debug_handler]
pub async fn register_business(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(form): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    register_account(Role::Business, &app_state, jar, form).await
}

/// Explorers are checked before business owners; the first account whose
/// password matches wins.
#[axum::debug_handler]
pub async fn login(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(form): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    for role in [Role::Explorer, Role::Business] {
        let Some(account) = app_state.store.find_account(role, form.email.trim()).await? else {
            continue;
        };

        if verify_password(&form.password, &account.password_hash)? {
            info!(id = account.id, role = role.as_str(), "Login successful");
            return issue_session(&app_state, jar, &account).await;
        }
    }

    warn!("Failed login attempt");
    Err(ApiError::Unauthorized(INVALID_CREDENTIALS))
}

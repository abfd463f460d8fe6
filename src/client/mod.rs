//! HTTP client for the Wayfarer API.
//!
//! [`ApiClient`] wraps a [`reqwest::Client`] and a base URL taken from
//! configuration. Explorer-scoped calls take an explicit [`Session`] rather
//! than reading identity from shared state.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::config::{ConfigError, try_load};
use crate::{
    AuthResponse, LoginRequest, Post, RegisterRequest, Relation, Review, ReviewRequest,
    ReviewsPage, Role, ToggleRequest, ToggleStatus,
};

pub mod detail;

pub use detail::{Alert, AlertKind, Membership, PostDetailView, PostSummary, ScrollTo};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network, DNS, decode and other transport-level failures.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// A toggle response carried neither a known status nor a known message.
    #[error("Unexpected response from server: {0}")]
    UnexpectedResponse(String),

    #[error("Account {0} is not an explorer")]
    NotAnExplorer(i64),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Identity of the logged-in explorer, threaded through every call.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub explorer_id: i64,
    pub name: String,
    pub token: Uuid,
}

impl TryFrom<AuthResponse> for Session {
    type Error = ClientError;

    fn try_from(auth: AuthResponse) -> Result<Self, Self::Error> {
        match auth.role {
            Role::Explorer => Ok(Session {
                explorer_id: auth.id,
                name: auth.name,
                token: auth.token,
            }),
            Role::Business => Err(ClientError::NotAnExplorer(auth.id)),
        }
    }
}

#[derive(Deserialize)]
struct FavoritedCheck {
    favorited: bool,
}

#[derive(Deserialize)]
struct TraveledCheck {
    traveled: bool,
}

/// Reads the new membership from a toggle response. The typed `status` wins;
/// the legacy `message` text is accepted only when it matches exactly. Fields
/// of the wrong type count as absent.
fn parse_toggle(relation: Relation, body: &Value) -> ClientResult<ToggleStatus> {
    match body.get("status").and_then(Value::as_str) {
        Some("added") => return Ok(ToggleStatus::Added),
        Some("removed") => return Ok(ToggleStatus::Removed),
        _ => {}
    }

    match body.get("message").and_then(Value::as_str) {
        Some(m) if m == relation.message(ToggleStatus::Added) => Ok(ToggleStatus::Added),
        Some(m) if m == relation.message(ToggleStatus::Removed) => Ok(ToggleStatus::Removed),
        _ => Err(ClientError::UnexpectedResponse(body.to_string())),
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] and its connection pool.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Base URL from `WAYFARER_API_URL`, falling back to [`DEFAULT_API_URL`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url: String = try_load("WAYFARER_API_URL", DEFAULT_API_URL)?;
        Ok(Self::new(base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn relation_url(&self, session: &Session, relation: Relation, post_id: i64, action: &str) -> String {
        self.url(&format!(
            "/explorer/{}/{}/{post_id}/{action}",
            session.explorer_id,
            relation.segment()
        ))
    }

    // ---- auth ----

    pub async fn register_explorer(&self, form: &RegisterRequest) -> ClientResult<Session> {
        let auth: AuthResponse = self.post_json("/register/explorer", form).await?;
        Session::try_from(auth)
    }

    pub async fn register_business(&self, form: &RegisterRequest) -> ClientResult<AuthResponse> {
        self.post_json("/register/business", form).await
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        let form = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post_json("/login", &form).await
    }

    // ---- posts ----

    pub async fn list_posts(&self) -> ClientResult<Vec<Post>> {
        self.get_json("/posts").await
    }

    /// `GET /posts/onepost/{id}`: the full post including `averageRating`.
    pub async fn post_details(&self, post_id: i64) -> ClientResult<Post> {
        self.get_json(&format!("/posts/onepost/{post_id}")).await
    }

    pub async fn reviews(&self, post_id: i64, page: u32, per_page: u32) -> ClientResult<ReviewsPage> {
        self.get_json(&format!(
            "/posts/{post_id}/reviews?page={page}&per_page={per_page}"
        ))
        .await
    }

    // ---- explorer relations ----

    pub async fn check_favorited(&self, session: &Session, post_id: i64) -> ClientResult<bool> {
        let url = self.relation_url(session, Relation::Favourites, post_id, "check");
        let check: FavoritedCheck = Self::parse_response(self.client.get(url).send().await?).await?;
        Ok(check.favorited)
    }

    pub async fn check_traveled(&self, session: &Session, post_id: i64) -> ClientResult<bool> {
        let url = self.relation_url(session, Relation::Traveled, post_id, "check");
        let check: TraveledCheck = Self::parse_response(self.client.get(url).send().await?).await?;
        Ok(check.traveled)
    }

    pub async fn check(&self, session: &Session, relation: Relation, post_id: i64) -> ClientResult<bool> {
        match relation {
            Relation::Favourites => self.check_favorited(session, post_id).await,
            Relation::Traveled => self.check_traveled(session, post_id).await,
        }
    }

    /// `POST .../addOrRemove`. The server decides the direction.
    pub async fn toggle(&self, session: &Session, relation: Relation, post_id: i64) -> ClientResult<ToggleStatus> {
        let url = self.relation_url(session, relation, post_id, "addOrRemove");
        let response = self
            .client
            .post(url)
            .json(&ToggleRequest { idposts: post_id })
            .send()
            .await?;
        let text = Self::ensure_success(response).await?.text().await?;
        let body: Value =
            serde_json::from_str(&text).map_err(|_| ClientError::UnexpectedResponse(text))?;
        parse_toggle(relation, &body)
    }

    pub async fn toggle_favorite(&self, session: &Session, post_id: i64) -> ClientResult<ToggleStatus> {
        self.toggle(session, Relation::Favourites, post_id).await
    }

    pub async fn toggle_traveled(&self, session: &Session, post_id: i64) -> ClientResult<ToggleStatus> {
        self.toggle(session, Relation::Traveled, post_id).await
    }

    pub async fn related_posts(&self, session: &Session, relation: Relation) -> ClientResult<Vec<Post>> {
        self.get_json(&format!(
            "/explorer/{}/{}",
            session.explorer_id,
            relation.segment()
        ))
        .await
    }

    pub async fn add_review(
        &self,
        session: &Session,
        post_id: i64,
        comment: &str,
        rating: i32,
    ) -> ClientResult<Review> {
        let body = ReviewRequest {
            comment: comment.to_string(),
            rating,
        };
        self.post_json(
            &format!("/explorer/{}/reviews/{post_id}", session.explorer_id),
            &body,
        )
        .await
    }

    // ---- private helpers ----

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::parse_response(response).await
    }

    async fn post_json<B: serde::Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::parse_response(response).await
    }

    async fn ensure_success(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

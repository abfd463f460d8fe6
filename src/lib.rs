use serde::{Deserialize, Serialize};
use std::fmt;

pub mod client;
pub mod config;
pub mod error;
pub mod password;
pub mod routes;
pub mod store;

use config::Config;
use store::{Store, StoreError};

pub struct AppState {
    pub store: Store,
}

impl AppState {
    pub async fn new(config: &Config) -> Result<Self, StoreError> {
        let store = match &config.database_url {
            Some(url) => Store::connect(url, config.db_max_connections).await?,
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory store");
                Store::memory()
            }
        };

        Ok(Self { store })
    }

    pub fn with_store(store: Store) -> Self {
        Self { store }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Explorer,
    Business,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Explorer => "explorer",
            Role::Business => "business",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Account {
    pub id: i64,
    pub role: Role,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub idposts: i64,
    pub idbusiness: i64,
    pub name: String,
    pub location: String,
    pub description: String,
    pub image: String,
    pub image2: Option<String>,
    pub image3: Option<String>,
    pub image4: Option<String>,
    pub average_rating: f64,
    pub created_on: time::OffsetDateTime,
}

pub struct NewPost {
    pub idbusiness: i64,
    pub name: String,
    pub location: String,
    pub description: String,
    pub image: String,
    pub image2: Option<String>,
    pub image3: Option<String>,
    pub image4: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub idreview: i64,
    pub idposts: i64,
    pub idexplorer: i64,
    pub author_name: String,
    pub author_handle: String,
    pub comment: String,
    pub rating: i32,
    pub created_on: time::OffsetDateTime,
}

pub struct NewReview {
    pub idposts: i64,
    pub idexplorer: i64,
    pub author_name: String,
    pub comment: String,
    pub rating: i32,
}

/// An explorer/post membership set toggled through `addOrRemove`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Favourites,
    Traveled,
}

impl Relation {
    /// Path segment under `/explorer/{id}/`.
    pub fn segment(self) -> &'static str {
        match self {
            Relation::Favourites => "favourites",
            Relation::Traveled => "traveled",
        }
    }

    /// Noun used in the human-readable toggle messages.
    pub fn noun(self) -> &'static str {
        match self {
            Relation::Favourites => "favorites",
            Relation::Traveled => "traveled",
        }
    }

    pub fn message(self, status: ToggleStatus) -> String {
        match status {
            ToggleStatus::Added => format!("Post added to {}", self.noun()),
            ToggleStatus::Removed => format!("Post removed from {}", self.noun()),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToggleStatus {
    Added,
    Removed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToggleResponse {
    pub status: ToggleStatus,
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToggleRequest {
    pub idposts: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AuthResponse {
    pub id: i64,
    pub role: Role,
    pub name: String,
    pub token: uuid::Uuid,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReviewRequest {
    pub comment: String,
    pub rating: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReviewsPage {
    pub reviews: Vec<Review>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Derives the `@handle` shown next to a review author.
pub fn handle_for(name: &str) -> String {
    let handle: String = name
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    format!("@{handle}")
}

pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name cannot be empty");
    }
    if name.chars().count() > 64 {
        return Err("Name is too long");
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err("Email address is invalid"),
    }
}

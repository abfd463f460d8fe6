//! Persistence for accounts, sessions, posts, reviews and explorer relations.
//!
//! [`Store`] dispatches to either a Postgres pool or an in-process map store.
//! Both back ends expose the same operations with the same semantics, so the
//! HTTP layer never cares which one is active.

use uuid::Uuid;

use crate::{Account, NewPost, NewReview, Post, Relation, Review, Role, ToggleStatus};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0} already exists")]
    Duplicate(&'static str),

    #[error("{0} does not exist")]
    Missing(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One page of reviews plus the total number available for the post.
#[derive(Debug, Clone)]
pub struct ReviewPage {
    pub reviews: Vec<Review>,
    pub total: i64,
}

#[derive(Clone)]
pub enum Store {
    Postgres(PgStore),
    Memory(MemoryStore),
}

impl Store {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let store = PgStore::connect(database_url, max_connections).await?;
        store.migrate().await?;
        Ok(Store::Postgres(store))
    }

    pub fn memory() -> Self {
        Store::Memory(MemoryStore::default())
    }

    pub async fn create_account(
        &self,
        role: Role,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<Account> {
        match self {
            Store::Postgres(s) => s.create_account(role, name, email, password_hash).await,
            Store::Memory(s) => s.create_account(role, name, email, password_hash).await,
        }
    }

    pub async fn find_account(&self, role: Role, email: &str) -> StoreResult<Option<Account>> {
        match self {
            Store::Postgres(s) => s.find_account(role, email).await,
            Store::Memory(s) => s.find_account(role, email).await,
        }
    }

    pub async fn find_explorer(&self, idexplorer: i64) -> StoreResult<Option<Account>> {
        match self {
            Store::Postgres(s) => s.find_explorer(idexplorer).await,
            Store::Memory(s) => s.find_explorer(idexplorer).await,
        }
    }

    pub async fn insert_session(&self, account: &Account) -> StoreResult<Uuid> {
        match self {
            Store::Postgres(s) => s.insert_session(account).await,
            Store::Memory(s) => s.insert_session(account).await,
        }
    }

    pub async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        match self {
            Store::Postgres(s) => s.insert_post(post).await,
            Store::Memory(s) => s.insert_post(post).await,
        }
    }

    pub async fn get_post(&self, idposts: i64) -> StoreResult<Option<Post>> {
        match self {
            Store::Postgres(s) => s.get_post(idposts).await,
            Store::Memory(s) => s.get_post(idposts).await,
        }
    }

    pub async fn list_posts(&self) -> StoreResult<Vec<Post>> {
        match self {
            Store::Postgres(s) => s.list_posts().await,
            Store::Memory(s) => s.list_posts().await,
        }
    }

    pub async fn insert_review(&self, review: NewReview) -> StoreResult<Review> {
        match self {
            Store::Postgres(s) => s.insert_review(review).await,
            Store::Memory(s) => s.insert_review(review).await,
        }
    }

    /// `page` is 1-based.
    pub async fn list_reviews(&self, idposts: i64, page: u32, per_page: u32) -> StoreResult<ReviewPage> {
        match self {
            Store::Postgres(s) => s.list_reviews(idposts, page, per_page).await,
            Store::Memory(s) => s.list_reviews(idposts, page, per_page).await,
        }
    }

    pub async fn is_related(&self, relation: Relation, idexplorer: i64, idposts: i64) -> StoreResult<bool> {
        match self {
            Store::Postgres(s) => s.is_related(relation, idexplorer, idposts).await,
            Store::Memory(s) => s.is_related(relation, idexplorer, idposts).await,
        }
    }

    /// Removes the pair if present, otherwise inserts it.
    pub async fn toggle_relation(
        &self,
        relation: Relation,
        idexplorer: i64,
        idposts: i64,
    ) -> StoreResult<ToggleStatus> {
        match self {
            Store::Postgres(s) => s.toggle_relation(relation, idexplorer, idposts).await,
            Store::Memory(s) => s.toggle_relation(relation, idexplorer, idposts).await,
        }
    }

    pub async fn list_related(&self, relation: Relation, idexplorer: i64) -> StoreResult<Vec<Post>> {
        match self {
            Store::Postgres(s) => s.list_related(relation, idexplorer).await,
            Store::Memory(s) => s.list_related(relation, idexplorer).await,
        }
    }
}

pub(crate) fn page_offset(page: u32, per_page: u32) -> usize {
    (page.max(1) as usize - 1) * per_page as usize
}

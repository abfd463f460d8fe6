use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::{ReviewPage, StoreError, StoreResult, page_offset};
use crate::{Account, NewPost, NewReview, Post, Relation, Review, Role, ToggleStatus, handle_for};

const POST_COLUMNS: &str = "p.idposts, p.idbusiness, p.name, p.location, p.description, \
     p.image, p.image2, p.image3, p.image4, p.created_on, \
     COALESCE((SELECT AVG(r.rating)::float8 FROM reviews r WHERE r.idposts = p.idposts), 0) \
     AS average_rating";

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
}

impl AccountRow {
    fn into_account(self, role: Role) -> Account {
        Account {
            id: self.id,
            role,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    idposts: i64,
    idbusiness: i64,
    name: String,
    location: String,
    description: String,
    image: String,
    image2: Option<String>,
    image3: Option<String>,
    image4: Option<String>,
    average_rating: f64,
    created_on: time::OffsetDateTime,
}

impl From<PostRow> for Post {
    fn from(r: PostRow) -> Self {
        Post {
            idposts: r.idposts,
            idbusiness: r.idbusiness,
            name: r.name,
            location: r.location,
            description: r.description,
            image: r.image,
            image2: r.image2,
            image3: r.image3,
            image4: r.image4,
            average_rating: r.average_rating,
            created_on: r.created_on,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    idreview: i64,
    idposts: i64,
    idexplorer: i64,
    author_name: String,
    comment: String,
    rating: i16,
    created_on: time::OffsetDateTime,
}

impl From<ReviewRow> for Review {
    fn from(r: ReviewRow) -> Self {
        Review {
            idreview: r.idreview,
            idposts: r.idposts,
            idexplorer: r.idexplorer,
            author_handle: handle_for(&r.author_name),
            author_name: r.author_name,
            comment: r.comment,
            rating: r.rating as i32,
            created_on: r.created_on,
        }
    }
}

fn account_table(role: Role) -> (&'static str, &'static str) {
    match role {
        Role::Explorer => ("explorers", "idexplorer"),
        Role::Business => ("business_owners", "idbusiness"),
    }
}

fn relation_table(relation: Relation) -> &'static str {
    match relation {
        Relation::Favourites => "favourites",
        Relation::Traveled => "traveled",
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::info!("Database connection pool created");
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!().run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    pub async fn create_account(
        &self,
        role: Role,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<Account> {
        let (table, id_col) = account_table(role);
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "INSERT INTO {table} (name, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING {id_col} AS id, name, email, password_hash"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate("account")
            } else {
                e.into()
            }
        })?;

        Ok(row.into_account(role))
    }

    pub async fn find_account(&self, role: Role, email: &str) -> StoreResult<Option<Account>> {
        let (table, id_col) = account_table(role);
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {id_col} AS id, name, email, password_hash FROM {table} \
             WHERE lower(email) = lower($1) LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_account(role)))
    }

    pub async fn find_explorer(&self, idexplorer: i64) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT idexplorer AS id, name, email, password_hash FROM explorers WHERE idexplorer = $1",
        )
        .bind(idexplorer)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_account(Role::Explorer)))
    }

    pub async fn insert_session(&self, account: &Account) -> StoreResult<Uuid> {
        let token = Uuid::new_v4();
        sqlx::query("INSERT INTO sessions (token, role, account_id) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(account.role.as_str())
            .bind(account.id)
            .execute(&self.pool)
            .await?;
        Ok(token)
    }

    pub async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO posts (idbusiness, name, location, description, image, image2, image3, image4) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING idposts",
        )
        .bind(post.idbusiness)
        .bind(&post.name)
        .bind(&post.location)
        .bind(&post.description)
        .bind(&post.image)
        .bind(&post.image2)
        .bind(&post.image3)
        .bind(&post.image4)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::Missing("business owner")
            } else {
                e.into()
            }
        })?;

        self.get_post(id).await?.ok_or(StoreError::Missing("post"))
    }

    pub async fn get_post(&self, idposts: i64) -> StoreResult<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.idposts = $1"
        ))
        .bind(idposts)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    pub async fn list_posts(&self) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p ORDER BY p.idposts"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    pub async fn insert_review(&self, review: NewReview) -> StoreResult<Review> {
        let row = sqlx::query_as::<_, ReviewRow>(
            "INSERT INTO reviews (idposts, idexplorer, author_name, comment, rating) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING idreview, idposts, idexplorer, author_name, comment, rating, created_on",
        )
        .bind(review.idposts)
        .bind(review.idexplorer)
        .bind(&review.author_name)
        .bind(&review.comment)
        .bind(review.rating as i16)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::Missing("post")
            } else {
                e.into()
            }
        })?;

        Ok(row.into())
    }

    pub async fn list_reviews(&self, idposts: i64, page: u32, per_page: u32) -> StoreResult<ReviewPage> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE idposts = $1")
            .bind(idposts)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT idreview, idposts, idexplorer, author_name, comment, rating, created_on \
             FROM reviews WHERE idposts = $1 ORDER BY idreview LIMIT $2 OFFSET $3",
        )
        .bind(idposts)
        .bind(per_page as i64)
        .bind(page_offset(page, per_page) as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(ReviewPage {
            reviews: rows.into_iter().map(Review::from).collect(),
            total,
        })
    }

    pub async fn is_related(&self, relation: Relation, idexplorer: i64, idposts: i64) -> StoreResult<bool> {
        let table = relation_table(relation);
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS (SELECT 1 FROM {table} WHERE idexplorer = $1 AND idposts = $2)"
        ))
        .bind(idexplorer)
        .bind(idposts)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn toggle_relation(
        &self,
        relation: Relation,
        idexplorer: i64,
        idposts: i64,
    ) -> StoreResult<ToggleStatus> {
        let table = relation_table(relation);
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(&format!(
            "DELETE FROM {table} WHERE idexplorer = $1 AND idposts = $2"
        ))
        .bind(idexplorer)
        .bind(idposts)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let status = if removed > 0 {
            ToggleStatus::Removed
        } else {
            sqlx::query(&format!(
                "INSERT INTO {table} (idexplorer, idposts) VALUES ($1, $2) ON CONFLICT DO NOTHING"
            ))
            .bind(idexplorer)
            .bind(idposts)
            .execute(&mut *tx)
            .await?;
            ToggleStatus::Added
        };

        tx.commit().await?;
        Ok(status)
    }

    pub async fn list_related(&self, relation: Relation, idexplorer: i64) -> StoreResult<Vec<Post>> {
        let table = relation_table(relation);
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p JOIN {table} t ON t.idposts = p.idposts \
             WHERE t.idexplorer = $1 ORDER BY p.idposts"
        ))
        .bind(idexplorer)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }
}

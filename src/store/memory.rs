use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ReviewPage, StoreError, StoreResult, page_offset};
use crate::{Account, NewPost, NewReview, Post, Relation, Review, Role, ToggleStatus, handle_for};

#[derive(Default)]
struct Inner {
    explorers: BTreeMap<i64, Account>,
    business_owners: BTreeMap<i64, Account>,
    sessions: HashMap<Uuid, (Role, i64)>,
    posts: BTreeMap<i64, Post>,
    reviews: Vec<Review>,
    favourites: BTreeSet<(i64, i64)>,
    traveled: BTreeSet<(i64, i64)>,
    next_explorer: i64,
    next_business: i64,
    next_post: i64,
    next_review: i64,
}

impl Inner {
    fn accounts(&self, role: Role) -> &BTreeMap<i64, Account> {
        match role {
            Role::Explorer => &self.explorers,
            Role::Business => &self.business_owners,
        }
    }

    fn relation(&self, relation: Relation) -> &BTreeSet<(i64, i64)> {
        match relation {
            Relation::Favourites => &self.favourites,
            Relation::Traveled => &self.traveled,
        }
    }

    fn relation_mut(&mut self, relation: Relation) -> &mut BTreeSet<(i64, i64)> {
        match relation {
            Relation::Favourites => &mut self.favourites,
            Relation::Traveled => &mut self.traveled,
        }
    }

    fn average_rating(&self, idposts: i64) -> f64 {
        let (sum, count) = self
            .reviews
            .iter()
            .filter(|r| r.idposts == idposts)
            .fold((0i64, 0i64), |(sum, count), r| (sum + r.rating as i64, count + 1));
        if count == 0 { 0.0 } else { sum as f64 / count as f64 }
    }

    fn hydrated(&self, post: &Post) -> Post {
        Post {
            average_rating: self.average_rating(post.idposts),
            ..post.clone()
        }
    }
}

/// Map-backed store used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

/// Full Unicode case folding, the same as `lower(email)` on a UTF-8 database.
fn same_email(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl MemoryStore {
    pub async fn create_account(
        &self,
        role: Role,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<Account> {
        let mut inner = self.inner.write().await;
        if inner
            .accounts(role)
            .values()
            .any(|a| same_email(&a.email, email))
        {
            return Err(StoreError::Duplicate("account"));
        }

        let id = match role {
            Role::Explorer => {
                inner.next_explorer += 1;
                inner.next_explorer
            }
            Role::Business => {
                inner.next_business += 1;
                inner.next_business
            }
        };
        let account = Account {
            id,
            role,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };
        match role {
            Role::Explorer => inner.explorers.insert(id, account.clone()),
            Role::Business => inner.business_owners.insert(id, account.clone()),
        };
        Ok(account)
    }

    pub async fn find_account(&self, role: Role, email: &str) -> StoreResult<Option<Account>> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts(role)
            .values()
            .find(|a| same_email(&a.email, email))
            .cloned())
    }

    pub async fn find_explorer(&self, idexplorer: i64) -> StoreResult<Option<Account>> {
        Ok(self.inner.read().await.explorers.get(&idexplorer).cloned())
    }

    pub async fn insert_session(&self, account: &Account) -> StoreResult<Uuid> {
        let token = Uuid::new_v4();
        self.inner
            .write()
            .await
            .sessions
            .insert(token, (account.role, account.id));
        Ok(token)
    }

    pub async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut inner = self.inner.write().await;
        if !inner.business_owners.contains_key(&post.idbusiness) {
            return Err(StoreError::Missing("business owner"));
        }

        inner.next_post += 1;
        let post = Post {
            idposts: inner.next_post,
            idbusiness: post.idbusiness,
            name: post.name,
            location: post.location,
            description: post.description,
            image: post.image,
            image2: post.image2,
            image3: post.image3,
            image4: post.image4,
            average_rating: 0.0,
            created_on: OffsetDateTime::now_utc(),
        };
        inner.posts.insert(post.idposts, post.clone());
        Ok(post)
    }

    pub async fn get_post(&self, idposts: i64) -> StoreResult<Option<Post>> {
        let inner = self.inner.read().await;
        Ok(inner.posts.get(&idposts).map(|p| inner.hydrated(p)))
    }

    pub async fn list_posts(&self) -> StoreResult<Vec<Post>> {
        let inner = self.inner.read().await;
        Ok(inner.posts.values().map(|p| inner.hydrated(p)).collect())
    }

    pub async fn insert_review(&self, review: NewReview) -> StoreResult<Review> {
        let mut inner = self.inner.write().await;
        if !inner.posts.contains_key(&review.idposts) {
            return Err(StoreError::Missing("post"));
        }
        if !inner.explorers.contains_key(&review.idexplorer) {
            return Err(StoreError::Missing("explorer"));
        }

        inner.next_review += 1;
        let review = Review {
            idreview: inner.next_review,
            idposts: review.idposts,
            idexplorer: review.idexplorer,
            author_handle: handle_for(&review.author_name),
            author_name: review.author_name,
            comment: review.comment,
            rating: review.rating,
            created_on: OffsetDateTime::now_utc(),
        };
        inner.reviews.push(review.clone());
        Ok(review)
    }

    pub async fn list_reviews(&self, idposts: i64, page: u32, per_page: u32) -> StoreResult<ReviewPage> {
        let inner = self.inner.read().await;
        let all: Vec<&Review> = inner.reviews.iter().filter(|r| r.idposts == idposts).collect();
        Ok(ReviewPage {
            total: all.len() as i64,
            reviews: all
                .into_iter()
                .skip(page_offset(page, per_page))
                .take(per_page as usize)
                .cloned()
                .collect(),
        })
    }

    pub async fn is_related(&self, relation: Relation, idexplorer: i64, idposts: i64) -> StoreResult<bool> {
        Ok(self
            .inner
            .read()
            .await
            .relation(relation)
            .contains(&(idexplorer, idposts)))
    }

    pub async fn toggle_relation(
        &self,
        relation: Relation,
        idexplorer: i64,
        idposts: i64,
    ) -> StoreResult<ToggleStatus> {
        let mut inner = self.inner.write().await;
        let set = inner.relation_mut(relation);
        if set.remove(&(idexplorer, idposts)) {
            Ok(ToggleStatus::Removed)
        } else {
            set.insert((idexplorer, idposts));
            Ok(ToggleStatus::Added)
        }
    }

    pub async fn list_related(&self, relation: Relation, idexplorer: i64) -> StoreResult<Vec<Post>> {
        let inner = self.inner.read().await;
        Ok(inner
            .relation(relation)
            .range((idexplorer, i64::MIN)..=(idexplorer, i64::MAX))
            .filter_map(|(_, idposts)| inner.posts.get(idposts))
            .map(|p| inner.hydrated(p))
            .collect())
    }
}

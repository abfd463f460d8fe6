//! State behind the post detail screen.
//!
//! A [`PostDetailView`] is opened with a post id and whatever summary the
//! caller already has. [`PostDetailView::load`] hydrates the rating, the
//! favourite/traveled flags and the first page of reviews concurrently. The
//! two toggles never flip a flag ahead of the server: the new value is read
//! from the response, and anything unrecognised leaves the flag alone.
//!
//! Every network step races against the view's [`CancellationToken`]. Once
//! the view is closed, pending calls are dropped and late results are never
//! applied.

use std::future::Future;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::{ApiClient, ClientError, ClientResult, Session};
use crate::{Post, Relation, Review, ReviewsPage, ToggleStatus};

pub const DESCRIPTION_PREVIEW_CHARS: usize = 100;
pub const REVIEWS_PER_PAGE: u32 = 10;

const UNEXPECTED_RESPONSE: &str = "Unexpected response from server";

/// Fields known before the detail fetch, typically from a post list.
#[derive(Clone, Debug, PartialEq)]
pub struct PostSummary {
    pub name: String,
    pub location: String,
    pub description: String,
    pub image: String,
    pub image2: Option<String>,
    pub image3: Option<String>,
    pub image4: Option<String>,
    pub average_rating: Option<f64>,
}

impl From<&Post> for PostSummary {
    fn from(post: &Post) -> Self {
        PostSummary {
            name: post.name.clone(),
            location: post.location.clone(),
            description: post.description.clone(),
            image: post.image.clone(),
            image2: post.image2.clone(),
            image3: post.image3.clone(),
            image4: post.image4.clone(),
            average_rating: None,
        }
    }
}

/// Server-side membership as last observed by the view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Membership {
    #[default]
    Unknown,
    Member,
    NotMember,
}

impl Membership {
    /// `Unknown` renders as inactive.
    pub fn is_member(self) -> bool {
        matches!(self, Membership::Member)
    }
}

impl From<bool> for Membership {
    fn from(member: bool) -> Self {
        if member {
            Membership::Member
        } else {
            Membership::NotMember
        }
    }
}

impl From<ToggleStatus> for Membership {
    fn from(status: ToggleStatus) -> Self {
        match status {
            ToggleStatus::Added => Membership::Member,
            ToggleStatus::Removed => Membership::NotMember,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertKind {
    Success,
    Error,
}

/// A user-visible notification raised by the view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    fn success(message: impl Into<String>) -> Self {
        Alert {
            kind: AlertKind::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Alert {
            kind: AlertKind::Error,
            message: message.into(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            AlertKind::Success => "Success",
            AlertKind::Error => "Error",
        }
    }
}

/// Scroll request for the hosting scroll container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollTo {
    Top,
    End,
}

/// Shortens a description to its first 100 characters plus `...`.
/// Descriptions that already fit are returned unchanged.
pub fn truncate_description(description: &str) -> String {
    match description.char_indices().nth(DESCRIPTION_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &description[..cut]),
        None => description.to_string(),
    }
}

/// One completed call out of [`PostDetailView::load`].
enum Fetched {
    Details(ClientResult<Post>),
    Favorited(ClientResult<bool>),
    Traveled(ClientResult<bool>),
    Reviews(ClientResult<ReviewsPage>),
}

/// Runs `fut` unless `token` fires first.
async fn guarded<F: Future>(token: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        out = fut => Some(out),
    }
}

pub struct PostDetailView {
    client: ApiClient,
    session: Session,
    post_id: i64,
    post: PostSummary,
    average_rating: f64,
    favorite: Membership,
    traveled: Membership,
    selected_image: String,
    show_full_description: bool,
    show_more_reviews: bool,
    reviews: Vec<Review>,
    reviews_total: i64,
    reviews_page: u32,
    alerts: Vec<Alert>,
    lifecycle: CancellationToken,
}

impl PostDetailView {
    pub fn new(client: ApiClient, session: Session, post_id: i64, post: PostSummary) -> Self {
        Self {
            client,
            session,
            post_id,
            selected_image: post.image.clone(),
            post,
            average_rating: 0.0,
            favorite: Membership::Unknown,
            traveled: Membership::Unknown,
            show_full_description: false,
            show_more_reviews: false,
            reviews: Vec::new(),
            reviews_total: 0,
            reviews_page: 0,
            alerts: Vec::new(),
            lifecycle: CancellationToken::new(),
        }
    }

    // ---- lifecycle ----

    /// A handle that closes the view when cancelled, usable from another task
    /// while a load is in flight.
    pub fn lifecycle_token(&self) -> CancellationToken {
        self.lifecycle.clone()
    }

    pub fn close(&self) {
        self.lifecycle.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_cancelled()
    }

    // ---- server synchronisation ----

    /// Fires the detail fetch, both membership checks and the first review
    /// page together. Each result is applied as soon as it arrives, so a slow
    /// call never holds back the others. Closing the view aborts whatever is
    /// still pending.
    pub async fn load(&mut self) {
        if self.is_closed() {
            return;
        }
        let post_id = self.post_id;

        let mut pending = JoinSet::new();
        let client = self.client.clone();
        pending.spawn(async move { Fetched::Details(client.post_details(post_id).await) });
        let (client, session) = (self.client.clone(), self.session.clone());
        pending.spawn(async move {
            Fetched::Favorited(client.check_favorited(&session, post_id).await)
        });
        let (client, session) = (self.client.clone(), self.session.clone());
        pending.spawn(async move {
            Fetched::Traveled(client.check_traveled(&session, post_id).await)
        });
        let client = self.client.clone();
        pending.spawn(async move {
            Fetched::Reviews(client.reviews(post_id, 1, REVIEWS_PER_PAGE).await)
        });

        loop {
            let Some(next) = guarded(&self.lifecycle, pending.join_next()).await else {
                debug!(post_id, remaining = pending.len(), "View closed before load finished");
                return;
            };
            match next {
                None => break,
                Some(Ok(Fetched::Details(result))) => self.apply_details(result),
                Some(Ok(Fetched::Favorited(result))) => {
                    self.apply_check(Relation::Favourites, result)
                }
                Some(Ok(Fetched::Traveled(result))) => self.apply_check(Relation::Traveled, result),
                Some(Ok(Fetched::Reviews(result))) => self.apply_reviews(result),
                Some(Err(e)) => error!(post_id, error = %e, "Load task failed"),
            }
        }
    }

    pub async fn fetch_post_details(&mut self) {
        let call = self.client.post_details(self.post_id);
        let Some(result) = guarded(&self.lifecycle, call).await else {
            return;
        };
        self.apply_details(result);
    }

    pub async fn check_favorited(&mut self) {
        self.refresh_membership(Relation::Favourites).await
    }

    pub async fn check_traveled(&mut self) {
        self.refresh_membership(Relation::Traveled).await
    }

    async fn refresh_membership(&mut self, relation: Relation) {
        let call = self.client.check(&self.session, relation, self.post_id);
        let Some(result) = guarded(&self.lifecycle, call).await else {
            return;
        };
        self.apply_check(relation, result);
    }

    pub async fn toggle_favorite(&mut self) {
        self.toggle(Relation::Favourites).await
    }

    pub async fn toggle_traveled(&mut self) {
        self.toggle(Relation::Traveled).await
    }

    async fn toggle(&mut self, relation: Relation) {
        let call = self.client.toggle(&self.session, relation, self.post_id);
        let Some(result) = guarded(&self.lifecycle, call).await else {
            return;
        };

        match result {
            Ok(status) => {
                *self.membership_mut(relation) = status.into();
                self.alerts.push(Alert::success(relation.message(status)));
            }
            Err(ClientError::UnexpectedResponse(body)) => {
                warn!(post_id = self.post_id, %body, "Unrecognised {relation} toggle response");
                self.alerts.push(Alert::error(UNEXPECTED_RESPONSE));
            }
            Err(e) => {
                error!(post_id = self.post_id, error = %e, "Error adding/removing post to/from {relation}");
                self.alerts
                    .push(Alert::error(format!("Failed to update {relation}")));
            }
        }
    }

    /// Fetches the page after the last one loaded and appends it.
    pub async fn load_more_reviews(&mut self) {
        if !self.has_more_reviews() {
            return;
        }
        let call = self
            .client
            .reviews(self.post_id, self.reviews_page + 1, REVIEWS_PER_PAGE);
        let Some(result) = guarded(&self.lifecycle, call).await else {
            return;
        };
        self.apply_reviews(result);
    }

    fn apply_details(&mut self, result: ClientResult<Post>) {
        match result {
            Ok(post) => {
                self.average_rating = post.average_rating;
                self.post.average_rating = Some(post.average_rating);
            }
            Err(e) => {
                error!(post_id = self.post_id, error = %e, "Error fetching post details");
                self.alerts.push(Alert::error("Failed to fetch post details"));
            }
        }
    }

    // Check failures stay in the log; the flag keeps its last value.
    fn apply_check(&mut self, relation: Relation, result: ClientResult<bool>) {
        match result {
            Ok(member) => *self.membership_mut(relation) = member.into(),
            Err(e) => {
                warn!(post_id = self.post_id, error = %e, "Error checking if post is in {relation}");
            }
        }
    }

    /// Page one replaces what is held; later pages append.
    fn apply_reviews(&mut self, result: ClientResult<ReviewsPage>) {
        match result {
            Ok(page) => {
                if page.page <= 1 {
                    self.reviews = page.reviews;
                } else {
                    self.reviews.extend(page.reviews);
                }
                self.reviews_page = page.page;
                self.reviews_total = page.total;
            }
            Err(e) => {
                warn!(post_id = self.post_id, error = %e, "Error fetching reviews");
            }
        }
    }

    fn membership_mut(&mut self, relation: Relation) -> &mut Membership {
        match relation {
            Relation::Favourites => &mut self.favorite,
            Relation::Traveled => &mut self.traveled,
        }
    }

    // ---- local UI state ----

    /// Makes `uri` the main image. Unknown images are ignored.
    pub fn select_image(&mut self, uri: &str) -> Option<ScrollTo> {
        if !self.images().any(|i| i == uri) {
            return None;
        }
        self.selected_image = uri.to_string();
        Some(ScrollTo::Top)
    }

    pub fn toggle_description(&mut self) {
        self.show_full_description = !self.show_full_description;
    }

    /// Expanding asks for a scroll to the end so the new reviews are visible.
    pub fn toggle_reviews(&mut self) -> Option<ScrollTo> {
        self.show_more_reviews = !self.show_more_reviews;
        self.show_more_reviews.then_some(ScrollTo::End)
    }

    /// Alerts raised since the last call, oldest first.
    pub fn take_alerts(&mut self) -> Vec<Alert> {
        std::mem::take(&mut self.alerts)
    }

    // ---- read side ----

    pub fn post_id(&self) -> i64 {
        self.post_id
    }

    pub fn post(&self) -> &PostSummary {
        &self.post
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn average_rating(&self) -> f64 {
        self.average_rating
    }

    pub fn rating_label(&self) -> String {
        format!("{:.1} out of 5", self.average_rating)
    }

    pub fn favorite(&self) -> Membership {
        self.favorite
    }

    pub fn traveled(&self) -> Membership {
        self.traveled
    }

    pub fn is_favorited(&self) -> bool {
        self.favorite.is_member()
    }

    pub fn is_traveled(&self) -> bool {
        self.traveled.is_member()
    }

    pub fn main_image(&self) -> &str {
        &self.selected_image
    }

    fn images(&self) -> impl Iterator<Item = &str> {
        [
            self.post.image2.as_deref(),
            self.post.image3.as_deref(),
            self.post.image4.as_deref(),
            Some(self.post.image.as_str()),
        ]
        .into_iter()
        .flatten()
    }

    /// Every image except the one currently shown as main.
    pub fn thumbnails(&self) -> Vec<&str> {
        self.images().filter(|i| *i != self.selected_image).collect()
    }

    pub fn description(&self) -> String {
        if self.show_full_description {
            self.post.description.clone()
        } else {
            truncate_description(&self.post.description)
        }
    }

    pub fn description_expanded(&self) -> bool {
        self.show_full_description
    }

    pub fn read_more_label(&self) -> &'static str {
        if self.show_full_description {
            "Read Less"
        } else {
            "Read More"
        }
    }

    pub fn reviews_expanded(&self) -> bool {
        self.show_more_reviews
    }

    /// Only the first review while collapsed.
    pub fn visible_reviews(&self) -> &[Review] {
        if self.show_more_reviews {
            &self.reviews
        } else {
            &self.reviews[..self.reviews.len().min(1)]
        }
    }

    pub fn reviews_label(&self) -> &'static str {
        if self.show_more_reviews {
            "Hide reviews"
        } else {
            "See more reviews"
        }
    }

    pub fn has_more_reviews(&self) -> bool {
        (self.reviews.len() as i64) < self.reviews_total
    }
}

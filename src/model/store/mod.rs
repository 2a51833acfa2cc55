//! Persistence for questions, choices and admin accounts.
//!
//! Handlers talk to a [`Store`], which wraps whichever [`PollStore`] backend
//! was selected at ignition: MongoDB, or an in-process store for development
//! and tests.

mod memory;
mod mongo;

use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mongodb::Database;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome, Request},
};

use crate::error::{Error, Result};
use crate::model::{
    common::{is_published, ChoiceId, QuestionId},
    db::{Admin, Choice, NewAdmin, NewChoice, NewQuestion, Question, QuestionCore},
    mongodb::Id,
};

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Which questions a query selects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFilter {
    /// Only questions published at or before this instant.
    pub published_at: Option<DateTime<Utc>>,
    /// Only questions dated within `[from, until)`.
    pub pub_date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Only questions whose text contains this, ignoring case.
    pub text_contains: Option<String>,
}

impl QuestionFilter {
    /// Every question, published or not.
    pub fn all() -> Self {
        Self::default()
    }

    /// The questions the public may see at `now`.
    pub fn published(now: DateTime<Utc>) -> Self {
        Self {
            published_at: Some(now),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_contains = Some(text.into());
        self
    }

    pub fn with_date_range(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.pub_date_range = Some((from, until));
        self
    }

    /// Does the given question pass this filter?
    pub fn matches(&self, question: &QuestionCore) -> bool {
        if let Some(now) = self.published_at {
            if !is_published(question.pub_date, now) {
                return false;
            }
        }
        if let Some((from, until)) = self.pub_date_range {
            if question.pub_date < from || question.pub_date >= until {
                return false;
            }
        }
        if let Some(ref text) = self.text_contains {
            if !question
                .text
                .to_lowercase()
                .contains(&text.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

/// A slice of an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub limit: Option<u64>,
}

impl Window {
    /// The whole result set.
    pub fn all() -> Self {
        Self {
            skip: 0,
            limit: None,
        }
    }
}

/// Storage operations over questions, their choices, and admins.
///
/// Question listings are ordered newest `pub_date` first, with ties kept in
/// creation order. Choices are always returned in creation order.
#[rocket::async_trait]
pub trait PollStore: Send + Sync {
    /// Insert a question, allocating its ID.
    async fn create_question(&self, question: NewQuestion) -> Result<Question>;

    /// Fetch any question by ID, published or not.
    async fn question(&self, id: QuestionId) -> Result<Option<Question>>;

    /// Fetch the questions passing `filter`, in listing order.
    async fn questions(&self, filter: &QuestionFilter, window: Window) -> Result<Vec<Question>>;

    /// Count the questions passing `filter`.
    async fn count_questions(&self, filter: &QuestionFilter) -> Result<u64>;

    /// Overwrite a question's data. Returns false if it does not exist.
    async fn update_question(&self, id: QuestionId, question: QuestionCore) -> Result<bool>;

    /// Delete a question and every choice it owns. Returns false if it did not exist.
    async fn delete_question(&self, id: QuestionId) -> Result<bool>;

    /// Insert a choice, allocating its ID. The owning question must exist.
    async fn create_choice(&self, choice: NewChoice) -> Result<Choice>;

    /// Fetch the choices owned by a question.
    async fn choices(&self, question_id: QuestionId) -> Result<Vec<Choice>>;

    /// Overwrite a choice's text and votes. Returns false unless the choice
    /// exists and belongs to `choice.question_id`.
    async fn update_choice(&self, choice: &Choice) -> Result<bool>;

    /// Delete one choice of a question. Returns false if there was no such choice.
    async fn delete_choice(&self, question_id: QuestionId, choice_id: ChoiceId) -> Result<bool>;

    /// Atomically add one vote to a choice of the given question.
    /// Returns the updated choice, or `None` if the question has no such choice.
    async fn add_vote(&self, question_id: QuestionId, choice_id: ChoiceId)
        -> Result<Option<Choice>>;

    /// Insert an admin. Fails with a bad request if the username is taken.
    async fn create_admin(&self, admin: NewAdmin) -> Result<Admin>;

    async fn admin(&self, id: Id) -> Result<Option<Admin>>;

    async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>>;

    /// All admins, in creation order.
    async fn admins(&self) -> Result<Vec<Admin>>;

    async fn count_admins(&self) -> Result<u64>;

    /// Delete an admin by username. Returns false if there was no such admin.
    /// Fails with [`last_admin_error`] rather than leave no admins behind.
    async fn delete_admin(&self, username: &str) -> Result<bool>;

    /// Fetch a question only if the public may see it at `now`.
    ///
    /// Missing and unpublished questions give the same not-found error.
    async fn published_question(&self, id: QuestionId, now: DateTime<Utc>) -> Result<Question> {
        self.question(id)
            .await?
            .filter(|question| question.is_published(now))
            .ok_or_else(|| Error::not_found(format!("Published question with ID '{id}'")))
    }
}

/// Deleting the only remaining admin is refused.
pub fn last_admin_error() -> Error {
    Error::Status(
        Status::UnprocessableEntity,
        "Cannot delete last admin!".to_string(),
    )
}

/// Shared handle on the selected [`PollStore`] backend.
#[derive(Clone)]
pub struct Store(Arc<dyn PollStore>);

impl Store {
    /// A fresh, empty in-process store.
    pub fn memory() -> Self {
        Self(Arc::new(MemoryStore::default()))
    }

    /// A store backed by the given MongoDB database.
    pub fn mongo(db: Database) -> Self {
        Self(Arc::new(MongoStore::new(db)))
    }
}

impl Deref for Store {
    type Target = dyn PollStore;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Store {
    type Error = ();

    /// Get the store from the managed state.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match req.rocket().state::<Store>() {
            Some(store) => Outcome::Success(store.clone()),
            None => Outcome::Failure((Status::InternalServerError, ())),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn published_filter_uses_visibility_rule() {
        let now = Utc::now();
        let filter = QuestionFilter::published(now);
        assert!(filter.matches(&QuestionCore::example("past", -30)));
        assert!(!filter.matches(&QuestionCore::example("future", 30)));
        let exactly_now = QuestionCore {
            text: "now".to_string(),
            pub_date: now,
        };
        assert!(filter.matches(&exactly_now));
    }

    #[test]
    fn text_filter_ignores_case() {
        let filter = QuestionFilter::all().with_text("MONO");
        assert!(filter.matches(&QuestionCore::example("¿que es un mono?", 0)));
        assert!(!filter.matches(&QuestionCore::example("¿que es una rana?", 0)));
    }

    #[test]
    fn date_range_is_half_open() {
        let now = Utc::now();
        let filter = QuestionFilter::all().with_date_range(now - Duration::days(1), now);
        let at = |pub_date| QuestionCore {
            text: "q".to_string(),
            pub_date,
        };
        assert!(filter.matches(&at(now - Duration::days(1))));
        assert!(filter.matches(&at(now - Duration::seconds(1))));
        assert!(!filter.matches(&at(now)));
        assert!(!filter.matches(&at(now - Duration::days(2))));
    }
}

use mongodb::{
    bson::{doc, Document, Regex},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Database,
};
use rocket::{futures::TryStreamExt, http::Status};

use crate::error::{Error, Result};
use crate::model::{
    common::{ChoiceId, QuestionId},
    db::{Admin, Choice, NewAdmin, NewChoice, NewQuestion, Question, QuestionCore},
    mongodb::{
        is_duplicate_key_error, u32_id_filter, Coll, Counter, Id, MongoCollection,
        CHOICE_ID_COUNTER, QUESTION_ID_COUNTER,
    },
};

use super::{last_admin_error, PollStore, QuestionFilter, Window};

/// A store backed by MongoDB collections.
///
/// IDs come from the `counters` collection, so `_id` order is creation order.
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn coll<T: MongoCollection>(&self) -> Coll<T> {
        Coll::from_db(&self.db)
    }
}

/// Escape regex metacharacters so user input matches literally.
fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Translate a [`QuestionFilter`] into a query document.
fn filter_doc(filter: &QuestionFilter) -> Document {
    let mut pub_date = Document::new();
    if let Some(now) = filter.published_at {
        pub_date.insert("$lte", now);
    }
    if let Some((from, until)) = filter.pub_date_range {
        pub_date.insert("$gte", from);
        pub_date.insert("$lt", until);
    }

    let mut query = Document::new();
    if !pub_date.is_empty() {
        query.insert("pub_date", pub_date);
    }
    if let Some(ref text) = filter.text_contains {
        query.insert(
            "text",
            Regex {
                pattern: escape_regex(text),
                options: "i".to_string(),
            },
        );
    }
    query
}

/// Listing order: newest first, then creation order.
fn listing_sort() -> Document {
    doc! { "pub_date": -1, "_id": 1 }
}

fn choice_filter(question_id: QuestionId, choice_id: ChoiceId) -> Document {
    doc! { "_id": choice_id, "question_id": question_id }
}

#[rocket::async_trait]
impl PollStore for MongoStore {
    async fn create_question(&self, question: NewQuestion) -> Result<Question> {
        let id = Counter::next(&self.coll(), QUESTION_ID_COUNTER).await?;
        let question = Question { id, question };
        self.coll::<Question>().insert_one(&question, None).await?;
        Ok(question)
    }

    async fn question(&self, id: QuestionId) -> Result<Option<Question>> {
        Ok(self
            .coll::<Question>()
            .find_one(u32_id_filter(id), None)
            .await?)
    }

    async fn questions(&self, filter: &QuestionFilter, window: Window) -> Result<Vec<Question>> {
        let limit = window
            .limit
            .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));
        let options = FindOptions::builder()
            .sort(listing_sort())
            .skip(window.skip)
            .limit(limit)
            .build();
        let questions = self
            .coll::<Question>()
            .find(filter_doc(filter), options)
            .await?
            .try_collect()
            .await?;
        Ok(questions)
    }

    async fn count_questions(&self, filter: &QuestionFilter) -> Result<u64> {
        Ok(self
            .coll::<Question>()
            .count_documents(filter_doc(filter), None)
            .await?)
    }

    async fn update_question(&self, id: QuestionId, question: QuestionCore) -> Result<bool> {
        let update = doc! {
            "$set": {
                "text": question.text,
                "pub_date": question.pub_date,
            }
        };
        let result = self
            .coll::<Question>()
            .update_one(u32_id_filter(id), update, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_question(&self, id: QuestionId) -> Result<bool> {
        let result = self
            .coll::<Question>()
            .delete_one(u32_id_filter(id), None)
            .await?;
        if result.deleted_count == 0 {
            return Ok(false);
        }
        // Orphans would be unreachable anyway, so the question goes first.
        self.coll::<Choice>()
            .delete_many(doc! { "question_id": id }, None)
            .await?;
        Ok(true)
    }

    async fn create_choice(&self, choice: NewChoice) -> Result<Choice> {
        if self.question(choice.question_id).await?.is_none() {
            return Err(Error::not_found(format!(
                "Question with ID '{}'",
                choice.question_id
            )));
        }
        let id = Counter::next(&self.coll(), CHOICE_ID_COUNTER).await?;
        let choice = Choice { id, choice };
        self.coll::<Choice>().insert_one(&choice, None).await?;
        Ok(choice)
    }

    async fn choices(&self, question_id: QuestionId) -> Result<Vec<Choice>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let choices = self
            .coll::<Choice>()
            .find(doc! { "question_id": question_id }, options)
            .await?
            .try_collect()
            .await?;
        Ok(choices)
    }

    async fn update_choice(&self, choice: &Choice) -> Result<bool> {
        let update = doc! {
            "$set": {
                "text": choice.text.clone(),
                "votes": choice.votes,
            }
        };
        let result = self
            .coll::<Choice>()
            .update_one(choice_filter(choice.question_id, choice.id), update, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_choice(&self, question_id: QuestionId, choice_id: ChoiceId) -> Result<bool> {
        let result = self
            .coll::<Choice>()
            .delete_one(choice_filter(question_id, choice_id), None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn add_vote(
        &self,
        question_id: QuestionId,
        choice_id: ChoiceId,
    ) -> Result<Option<Choice>> {
        let update = doc! {
            "$inc": { "votes": 1 }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .coll::<Choice>()
            .find_one_and_update(choice_filter(question_id, choice_id), update, options)
            .await?)
    }

    async fn create_admin(&self, admin: NewAdmin) -> Result<Admin> {
        let inserted = match self.coll::<NewAdmin>().insert_one(&admin, None).await {
            Ok(inserted) => inserted,
            Err(err) if is_duplicate_key_error(&err) => {
                return Err(Error::bad_request(format!(
                    "Admin username already in use: {}",
                    admin.username
                )));
            }
            Err(err) => return Err(err.into()),
        };
        let id: Id = inserted
            .inserted_id
            .as_object_id()
            .ok_or_else(|| {
                Error::Status(
                    Status::InternalServerError,
                    "Admin was inserted without an ObjectId".to_string(),
                )
            })?
            .into();
        Ok(Admin { id, admin })
    }

    async fn admin(&self, id: Id) -> Result<Option<Admin>> {
        Ok(self.coll::<Admin>().find_one(id.as_doc(), None).await?)
    }

    async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        Ok(self
            .coll::<Admin>()
            .find_one(doc! { "username": username }, None)
            .await?)
    }

    async fn admins(&self) -> Result<Vec<Admin>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let admins = self
            .coll::<Admin>()
            .find(None, options)
            .await?
            .try_collect()
            .await?;
        Ok(admins)
    }

    async fn count_admins(&self) -> Result<u64> {
        Ok(self.coll::<Admin>().count_documents(None, None).await?)
    }

    async fn delete_admin(&self, username: &str) -> Result<bool> {
        let admins = self.coll::<Admin>();
        if admins.count_documents(None, None).await? == 1 {
            return match admins.find_one(doc! { "username": username }, None).await? {
                Some(_) => Err(last_admin_error()),
                None => Ok(false),
            };
        }
        let Some(deleted) = admins
            .find_one_and_delete(doc! { "username": username }, None)
            .await?
        else {
            return Ok(false);
        };
        // A concurrent delete may have taken the other admins; put this one back.
        if admins.count_documents(None, None).await? == 0 {
            admins.insert_one(&deleted, None).await?;
            return Err(last_admin_error());
        }
        Ok(true)
    }
}

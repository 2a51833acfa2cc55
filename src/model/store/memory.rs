use std::collections::BTreeMap;

use rocket::tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::model::{
    common::{ChoiceId, QuestionId},
    db::{Admin, Choice, ChoiceCore, NewAdmin, NewChoice, NewQuestion, Question, QuestionCore},
    mongodb::Id,
};

use super::{last_admin_error, PollStore, QuestionFilter, Window};

/// The tables behind a [`MemoryStore`]. IDs start at 1.
#[derive(Default)]
struct Tables {
    questions: BTreeMap<QuestionId, QuestionCore>,
    choices: BTreeMap<ChoiceId, ChoiceCore>,
    admins: Vec<Admin>,
    last_question_id: QuestionId,
    last_choice_id: ChoiceId,
}

impl Tables {
    fn matching_questions<'a>(
        &'a self,
        filter: &'a QuestionFilter,
    ) -> impl Iterator<Item = (&'a QuestionId, &'a QuestionCore)> + 'a {
        self.questions
            .iter()
            .filter(move |(_, question)| filter.matches(question))
    }
}

/// An in-process store. Contents are lost when the server stops.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[rocket::async_trait]
impl PollStore for MemoryStore {
    async fn create_question(&self, question: NewQuestion) -> Result<Question> {
        let mut tables = self.tables.write().await;
        tables.last_question_id += 1;
        let id = tables.last_question_id;
        tables.questions.insert(id, question.clone());
        Ok(Question { id, question })
    }

    async fn question(&self, id: QuestionId) -> Result<Option<Question>> {
        let tables = self.tables.read().await;
        Ok(tables.questions.get(&id).map(|question| Question {
            id,
            question: question.clone(),
        }))
    }

    async fn questions(&self, filter: &QuestionFilter, window: Window) -> Result<Vec<Question>> {
        let tables = self.tables.read().await;
        // IDs ascend with creation, and the sort is stable, so equal dates
        // stay in creation order.
        let mut questions = tables
            .matching_questions(filter)
            .map(|(&id, question)| Question {
                id,
                question: question.clone(),
            })
            .collect::<Vec<_>>();
        questions.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
        let skip = usize::try_from(window.skip).unwrap_or(usize::MAX);
        let limit = window
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(questions.into_iter().skip(skip).take(limit).collect())
    }

    async fn count_questions(&self, filter: &QuestionFilter) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables.matching_questions(filter).count() as u64)
    }

    async fn update_question(&self, id: QuestionId, question: QuestionCore) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.questions.get_mut(&id) {
            Some(existing) => {
                *existing = question;
                true
            }
            None => false,
        })
    }

    async fn delete_question(&self, id: QuestionId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.questions.remove(&id).is_none() {
            return Ok(false);
        }
        tables.choices.retain(|_, choice| choice.question_id != id);
        Ok(true)
    }

    async fn create_choice(&self, choice: NewChoice) -> Result<Choice> {
        let mut tables = self.tables.write().await;
        if !tables.questions.contains_key(&choice.question_id) {
            return Err(Error::not_found(format!(
                "Question with ID '{}'",
                choice.question_id
            )));
        }
        tables.last_choice_id += 1;
        let id = tables.last_choice_id;
        tables.choices.insert(id, choice.clone());
        Ok(Choice { id, choice })
    }

    async fn choices(&self, question_id: QuestionId) -> Result<Vec<Choice>> {
        let tables = self.tables.read().await;
        Ok(tables
            .choices
            .iter()
            .filter(|(_, choice)| choice.question_id == question_id)
            .map(|(&id, choice)| Choice {
                id,
                choice: choice.clone(),
            })
            .collect())
    }

    async fn update_choice(&self, choice: &Choice) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.choices.get_mut(&choice.id) {
            Some(existing) if existing.question_id == choice.question_id => {
                *existing = choice.choice.clone();
                true
            }
            _ => false,
        })
    }

    async fn delete_choice(&self, question_id: QuestionId, choice_id: ChoiceId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .choices
            .get(&choice_id)
            .map_or(false, |choice| choice.question_id == question_id);
        if owned {
            tables.choices.remove(&choice_id);
        }
        Ok(owned)
    }

    async fn add_vote(
        &self,
        question_id: QuestionId,
        choice_id: ChoiceId,
    ) -> Result<Option<Choice>> {
        let mut tables = self.tables.write().await;
        Ok(match tables.choices.get_mut(&choice_id) {
            Some(choice) if choice.question_id == question_id => {
                choice.votes = choice.votes.saturating_add(1);
                Some(Choice {
                    id: choice_id,
                    choice: choice.clone(),
                })
            }
            _ => None,
        })
    }

    async fn create_admin(&self, admin: NewAdmin) -> Result<Admin> {
        let mut tables = self.tables.write().await;
        if tables
            .admins
            .iter()
            .any(|existing| existing.username == admin.username)
        {
            return Err(Error::bad_request(format!(
                "Admin username already in use: {}",
                admin.username
            )));
        }
        let admin = Admin {
            id: Id::new(),
            admin,
        };
        tables.admins.push(admin.clone());
        Ok(admin)
    }

    async fn admin(&self, id: Id) -> Result<Option<Admin>> {
        let tables = self.tables.read().await;
        Ok(tables.admins.iter().find(|admin| admin.id == id).cloned())
    }

    async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        let tables = self.tables.read().await;
        Ok(tables
            .admins
            .iter()
            .find(|admin| admin.username == username)
            .cloned())
    }

    async fn admins(&self) -> Result<Vec<Admin>> {
        Ok(self.tables.read().await.admins.clone())
    }

    async fn count_admins(&self) -> Result<u64> {
        Ok(self.tables.read().await.admins.len() as u64)
    }

    async fn delete_admin(&self, username: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(index) = tables
            .admins
            .iter()
            .position(|admin| admin.username == username)
        else {
            return Ok(false);
        };
        if tables.admins.len() == 1 {
            return Err(last_admin_error());
        }
        tables.admins.remove(index);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rocket::http::Status;

    use super::*;

    async fn question_with_choices(
        store: &MemoryStore,
        days: i64,
        choices: &[&str],
    ) -> (Question, Vec<Choice>) {
        let question = store
            .create_question(QuestionCore::example("Question", days))
            .await
            .unwrap();
        let mut created = Vec::new();
        for text in choices {
            let choice = store
                .create_choice(ChoiceCore::new(question.id, text.to_string()))
                .await
                .unwrap();
            created.push(choice);
        }
        (question, created)
    }

    #[rocket::async_test]
    async fn ids_follow_creation_order() {
        let store = MemoryStore::default();
        let first = store
            .create_question(QuestionCore::example("first", 0))
            .await
            .unwrap();
        let second = store
            .create_question(QuestionCore::example("second", 0))
            .await
            .unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[rocket::async_test]
    async fn listing_is_newest_first_with_stable_ties() {
        let store = MemoryStore::default();
        let pub_date = Utc::now() - Duration::days(3);
        let tie = |text: &str| QuestionCore {
            text: text.to_string(),
            pub_date,
        };
        let older = store
            .create_question(QuestionCore::example("older", -10))
            .await
            .unwrap();
        let tie_a = store.create_question(tie("tie a")).await.unwrap();
        let newest = store
            .create_question(QuestionCore::example("newest", -1))
            .await
            .unwrap();
        let tie_b = store.create_question(tie("tie b")).await.unwrap();
        let future = store
            .create_question(QuestionCore::example("future", 5))
            .await
            .unwrap();

        let all = store
            .questions(&QuestionFilter::all(), Window::all())
            .await
            .unwrap();
        assert_eq!(all, vec![future, newest.clone(), tie_a.clone(), tie_b.clone(), older.clone()]);

        let published = store
            .questions(&QuestionFilter::published(Utc::now()), Window::all())
            .await
            .unwrap();
        assert_eq!(published, vec![newest, tie_a, tie_b.clone(), older.clone()]);

        let page = store
            .questions(
                &QuestionFilter::published(Utc::now()),
                Window {
                    skip: 2,
                    limit: Some(5),
                },
            )
            .await
            .unwrap();
        assert_eq!(page, vec![tie_b, older]);
        assert_eq!(
            store
                .count_questions(&QuestionFilter::published(Utc::now()))
                .await
                .unwrap(),
            4
        );
    }

    #[rocket::async_test]
    async fn deleting_a_question_cascades_to_its_choices() {
        let store = MemoryStore::default();
        let (doomed, _) = question_with_choices(&store, -1, &["a", "b"]).await;
        let (kept, kept_choices) = question_with_choices(&store, -1, &["c"]).await;

        assert!(store.delete_question(doomed.id).await.unwrap());
        assert!(!store.delete_question(doomed.id).await.unwrap());
        assert!(store.question(doomed.id).await.unwrap().is_none());
        assert!(store.choices(doomed.id).await.unwrap().is_empty());
        assert_eq!(store.choices(kept.id).await.unwrap(), kept_choices);
    }

    #[rocket::async_test]
    async fn choices_need_an_owner() {
        let store = MemoryStore::default();
        let result = store.create_choice(ChoiceCore::new(42, "orphan".into())).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[rocket::async_test]
    async fn votes_only_count_for_the_owning_question() {
        let store = MemoryStore::default();
        let (question, choices) = question_with_choices(&store, -1, &["yes", "no"]).await;
        let (other, _) = question_with_choices(&store, -1, &["maybe"]).await;

        let voted = store
            .add_vote(question.id, choices[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(voted.votes, 1);
        assert!(store.add_vote(other.id, choices[0].id).await.unwrap().is_none());
        assert!(store.add_vote(question.id, 999).await.unwrap().is_none());

        let votes = store
            .choices(question.id)
            .await
            .unwrap()
            .into_iter()
            .map(|choice| choice.votes)
            .collect::<Vec<_>>();
        assert_eq!(votes, vec![1, 0]);
    }

    #[rocket::async_test]
    async fn choice_updates_respect_ownership() {
        let store = MemoryStore::default();
        let (question, choices) = question_with_choices(&store, -1, &["yes"]).await;
        let (other, _) = question_with_choices(&store, -1, &[]).await;

        let mut stolen = choices[0].clone();
        stolen.question_id = other.id;
        stolen.text = "stolen".to_string();
        assert!(!store.update_choice(&stolen).await.unwrap());
        assert!(!store.delete_choice(other.id, choices[0].id).await.unwrap());

        let mut edited = choices[0].clone();
        edited.text = "definitely".to_string();
        edited.votes = 7;
        assert!(store.update_choice(&edited).await.unwrap());
        assert_eq!(store.choices(question.id).await.unwrap(), vec![edited]);
    }

    #[rocket::async_test]
    async fn admin_usernames_are_unique() {
        let store = MemoryStore::default();
        let admin = NewAdmin {
            username: "coordinator".to_string(),
            password_hash: "hash".to_string(),
        };
        let created = store.create_admin(admin.clone()).await.unwrap();
        assert!(store.create_admin(admin).await.is_err());
        assert_eq!(store.count_admins().await.unwrap(), 1);
        assert_eq!(
            store.admin(created.id).await.unwrap().unwrap().username,
            "coordinator"
        );

        let second = NewAdmin {
            username: "bobthesuperadmin".to_string(),
            password_hash: "hash".to_string(),
        };
        store.create_admin(second).await.unwrap();
        assert!(store.delete_admin("coordinator").await.unwrap());
        assert!(store.admin_by_username("coordinator").await.unwrap().is_none());
        assert!(!store.delete_admin("coordinator").await.unwrap());
    }

    #[rocket::async_test]
    async fn last_admin_is_kept() {
        let store = MemoryStore::default();
        let admin = NewAdmin {
            username: "coordinator".to_string(),
            password_hash: "hash".to_string(),
        };
        store.create_admin(admin).await.unwrap();

        let err = store.delete_admin("coordinator").await.unwrap_err();
        assert_eq!(err.status(), Status::UnprocessableEntity);
        assert!(!store.delete_admin("ghost").await.unwrap());
        assert_eq!(store.count_admins().await.unwrap(), 1);
    }
}

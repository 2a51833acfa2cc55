use chrono::Utc;
use log::info;
use rocket::{serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            admin::{AdminCredentials, AdminQuestionDescription, AdminQuestionSummary, QuestionSpec},
            auth::AuthToken,
            date_filter::PubDateFilter,
            pagination::{Paginated, PaginationRequest},
        },
        common::{clean_text, QuestionId},
        db::{Choice, ChoiceCore, NewAdmin, Question},
        store::{QuestionFilter, Store},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        get_admins,
        create_admin,
        delete_admin,
        questions,
        question,
        create_question,
        modify_question,
        delete_question,
    ]
}

#[get("/admins")]
async fn get_admins(_token: AuthToken, store: Store) -> Result<Json<Vec<String>>> {
    let admin_names = store
        .admins()
        .await?
        .into_iter()
        .map(|admin| admin.admin.username)
        .collect();
    Ok(Json(admin_names))
}

#[post("/admins", data = "<new_admin>", format = "json")]
async fn create_admin(
    _token: AuthToken,
    new_admin: Json<AdminCredentials>,
    store: Store,
) -> Result<()> {
    // Check username uniqueness before paying for the hash.
    if store
        .admin_by_username(&new_admin.username)
        .await?
        .is_some()
    {
        return Err(Error::bad_request(format!(
            "Admin username already in use: {}",
            new_admin.username
        )));
    }

    let admin: NewAdmin = new_admin.0.try_into()?;
    info!("Creating admin {}", admin.username);
    store.create_admin(admin).await?;
    Ok(())
}

#[delete("/admins", data = "<username>", format = "json")]
async fn delete_admin(_token: AuthToken, username: Json<String>, store: Store) -> Result<()> {
    // The store refuses to delete the last admin.
    if store.delete_admin(&username).await? {
        info!("Deleted admin {}", username.0);
        Ok(())
    } else {
        Err(Error::not_found(format!("Admin {}", username.0)))
    }
}

/// All questions, published or not, newest first.
///
/// `pub_date`, `page_num` and `page_size` are read by their request guards.
#[get("/admin/questions?<q>")]
async fn questions(
    _token: AuthToken,
    q: Option<String>,
    pub_date: PubDateFilter,
    pagination: PaginationRequest,
    store: Store,
) -> Result<Json<Paginated<AdminQuestionSummary>>> {
    let now = Utc::now();
    let window = pagination.window()?;

    let mut filter = QuestionFilter::all();
    if let Some(q) = q.filter(|q| !q.trim().is_empty()) {
        filter = filter.with_text(q.trim());
    }
    if let Some((from, until)) = pub_date.range(now) {
        filter = filter.with_date_range(from, until);
    }

    let page = store
        .questions(&filter, window)
        .await?
        .into_iter()
        .map(|question| AdminQuestionSummary::new(question, now))
        .collect();
    let total = store.count_questions(&filter).await?;
    Ok(Json(pagination.to_paginated(total, page)))
}

#[get("/admin/questions/<question_id>")]
async fn question(
    _token: AuthToken,
    question_id: QuestionId,
    store: Store,
) -> Result<Json<AdminQuestionDescription>> {
    let question = get_question(&store, question_id).await?;
    describe(&store, question).await
}

#[post("/admin/questions", data = "<spec>", format = "json")]
async fn create_question(
    _token: AuthToken,
    spec: Json<QuestionSpec>,
    store: Store,
) -> Result<Json<AdminQuestionDescription>> {
    // Validate everything up front so a bad row creates nothing.
    let new_question = spec.question()?;
    let mut new_choices = Vec::new();
    for row in spec.filled_choices() {
        if row.id.is_some() || row.delete {
            return Err(Error::bad_request(
                "New questions cannot refer to existing choices",
            ));
        }
        new_choices.push((clean_text("Choice text", &row.text)?, row.votes.unwrap_or(0)));
    }

    let question = store.create_question(new_question).await?;
    for (text, votes) in new_choices {
        store
            .create_choice(ChoiceCore {
                question_id: question.id,
                text,
                votes,
            })
            .await?;
    }
    info!("Created question {}", question.id);
    describe(&store, question).await
}

#[put("/admin/questions/<question_id>", data = "<spec>", format = "json")]
async fn modify_question(
    _token: AuthToken,
    question_id: QuestionId,
    spec: Json<QuestionSpec>,
    store: Store,
) -> Result<Json<AdminQuestionDescription>> {
    let mut question = get_question(&store, question_id).await?;
    let existing = store.choices(question_id).await?;

    // Validate everything up front so a bad row changes nothing.
    let question_core = spec.question()?;
    let mut updates = Vec::new();
    let mut deletions = Vec::new();
    let mut creations = Vec::new();
    for row in spec.filled_choices() {
        match row.id {
            Some(choice_id) => {
                let current = existing
                    .iter()
                    .find(|choice| choice.id == choice_id)
                    .ok_or_else(|| {
                        Error::bad_request(format!(
                            "Choice {choice_id} does not belong to question {question_id}"
                        ))
                    })?;
                if row.delete {
                    deletions.push(choice_id);
                } else {
                    let mut updated: Choice = current.clone();
                    updated.text = clean_text("Choice text", &row.text)?;
                    if let Some(votes) = row.votes {
                        updated.votes = votes;
                    }
                    updates.push(updated);
                }
            }
            // Marked for deletion before ever being saved.
            None if row.delete => {}
            None => creations.push(ChoiceCore {
                question_id,
                text: clean_text("Choice text", &row.text)?,
                votes: row.votes.unwrap_or(0),
            }),
        }
    }

    if !store.update_question(question_id, question_core.clone()).await? {
        return Err(Error::not_found(format!("Question with ID '{question_id}'")));
    }
    question.question = question_core;
    for choice in &updates {
        store.update_choice(choice).await?;
    }
    for choice_id in deletions {
        store.delete_choice(question_id, choice_id).await?;
    }
    for choice in creations {
        store.create_choice(choice).await?;
    }
    info!("Modified question {question_id}");
    describe(&store, question).await
}

#[delete("/admin/questions/<question_id>")]
async fn delete_question(_token: AuthToken, question_id: QuestionId, store: Store) -> Result<()> {
    if store.delete_question(question_id).await? {
        info!("Deleted question {question_id} and its choices");
        Ok(())
    } else {
        Err(Error::not_found(format!("Question with ID '{question_id}'")))
    }
}

/// Fetch any question, published or not.
async fn get_question(store: &Store, question_id: QuestionId) -> Result<Question> {
    store
        .question(question_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Question with ID '{question_id}'")))
}

async fn describe(store: &Store, question: Question) -> Result<Json<AdminQuestionDescription>> {
    let choices = store.choices(question.id).await?;
    Ok(Json(AdminQuestionDescription::new(
        question,
        choices,
        Utc::now(),
    )))
}

use chrono::Utc;
use rocket::{serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::question::{IndexView, QuestionDetail, QuestionResults, QuestionSummary, VoteRequest},
    common::QuestionId,
    store::{QuestionFilter, Store, Window},
};

pub fn routes() -> Vec<Route> {
    routes![index, detail, results, vote]
}

/// Every published question, newest first.
#[get("/polls")]
pub async fn index(store: Store) -> Result<Json<IndexView>> {
    let now = Utc::now();
    let latest = store
        .questions(&QuestionFilter::published(now), Window::all())
        .await?
        .into_iter()
        .map(|question| QuestionSummary::new(question, now))
        .collect::<Vec<_>>();
    Ok(Json(latest.into()))
}

#[get("/polls/<question_id>")]
pub async fn detail(question_id: QuestionId, store: Store) -> Result<Json<QuestionDetail>> {
    let question = store.published_question(question_id, Utc::now()).await?;
    let choices = store.choices(question.id).await?;
    Ok(Json(QuestionDetail::new(question, choices)))
}

#[get("/polls/<question_id>/results")]
pub async fn results(question_id: QuestionId, store: Store) -> Result<Json<QuestionResults>> {
    let question = store.published_question(question_id, Utc::now()).await?;
    let choices = store.choices(question.id).await?;
    Ok(Json(QuestionResults::new(question, choices)))
}

#[post("/polls/<question_id>/vote", data = "<vote>", format = "json")]
pub async fn vote(
    question_id: QuestionId,
    vote: Json<VoteRequest>,
    store: Store,
) -> Result<Json<QuestionResults>> {
    let question = store.published_question(question_id, Utc::now()).await?;
    store
        .add_vote(question.id, vote.choice)
        .await?
        .ok_or_else(|| Error::bad_request("You didn't select a choice."))?;
    let choices = store.choices(question.id).await?;
    Ok(Json(QuestionResults::new(question, choices)))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{json, serde_json},
    };

    use crate::model::{
        api::question::NO_POLLS_NOTICE,
        db::{ChoiceCore, Question, QuestionCore},
    };

    use super::*;

    /// Create a question published `days` from now; negative for the past.
    async fn create_question(store: &Store, text: &str, days: i64) -> Question {
        store
            .create_question(QuestionCore::example(text, days))
            .await
            .unwrap()
    }

    async fn get_index(client: &Client) -> IndexView {
        let response = client.get(uri!(index)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let raw_response = response.into_string().await.unwrap();
        serde_json::from_str(&raw_response).unwrap()
    }

    fn ids(view: &IndexView) -> Vec<QuestionId> {
        view.latest_question_list.iter().map(|q| q.id).collect()
    }

    #[backend_test]
    async fn no_questions(client: Client) {
        let view = get_index(&client).await;
        assert!(view.latest_question_list.is_empty());
        assert_eq!(view.notice.as_deref(), Some(NO_POLLS_NOTICE));
    }

    #[backend_test]
    async fn future_question_is_not_listed(client: Client, store: Store) {
        create_question(&store, "¿que es un mono?", 30).await;

        let view = get_index(&client).await;
        assert!(view.latest_question_list.is_empty());
        assert_eq!(view.notice.as_deref(), Some(NO_POLLS_NOTICE));
    }

    #[backend_test]
    async fn past_question_is_listed(client: Client, store: Store) {
        let question = create_question(&store, "¿que es un mono?", -30).await;

        let view = get_index(&client).await;
        assert_eq!(ids(&view), vec![question.id]);
        assert_eq!(view.latest_question_list[0].text, "¿que es un mono?");
        assert!(!view.latest_question_list[0].was_published_recently);
        assert_eq!(view.notice, None);
    }

    #[backend_test]
    async fn future_question_and_past_question(client: Client, store: Store) {
        let past_question = create_question(&store, "¿que es un mono?", -30).await;
        create_question(&store, "¿que es una rana?", 30).await;

        let view = get_index(&client).await;
        assert_eq!(ids(&view), vec![past_question.id]);
    }

    #[backend_test]
    async fn only_future_questions(client: Client, store: Store) {
        create_question(&store, "¿que es un mono?", 40).await;
        create_question(&store, "¿que es una rana?", 50).await;

        let view = get_index(&client).await;
        assert!(view.latest_question_list.is_empty());
        assert_eq!(view.notice.as_deref(), Some(NO_POLLS_NOTICE));
    }

    #[backend_test]
    async fn two_past_questions(client: Client, store: Store) {
        // Created oldest-last to show the order comes from the dates.
        let past_question_1 = create_question(&store, "¿que es un mono?", -30).await;
        let past_question_2 = create_question(&store, "¿Que es una rana?", -40).await;

        let view = get_index(&client).await;
        assert_eq!(ids(&view), vec![past_question_1.id, past_question_2.id]);
    }

    #[backend_test]
    async fn listing_is_newest_first(client: Client, store: Store) {
        let oldest = create_question(&store, "oldest", -40).await;
        let newest = create_question(&store, "newest", 0).await;
        let middle = create_question(&store, "middle", -10).await;

        let view = get_index(&client).await;
        assert_eq!(ids(&view), vec![newest.id, middle.id, oldest.id]);
        assert!(view.latest_question_list[0].was_published_recently);
    }

    #[backend_test]
    async fn detail_of_future_question_is_not_found(client: Client, store: Store) {
        let future_question = create_question(&store, "¿que es un mono?", 5).await;

        let response = client
            .get(uri!(detail(future_question.id)))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn detail_of_past_question(client: Client, store: Store) {
        let past_question = create_question(&store, "¿que es un mono?", -5).await;
        store
            .create_choice(ChoiceCore::new(past_question.id, "Un animal".into()))
            .await
            .unwrap();

        let response = client
            .get(uri!(detail(past_question.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let raw_response = response.into_string().await.unwrap();
        assert!(raw_response.contains("¿que es un mono?"));

        let detail = serde_json::from_str::<QuestionDetail>(&raw_response).unwrap();
        assert_eq!(detail.id, past_question.id);
        assert_eq!(detail.choices.len(), 1);
        assert_eq!(detail.choices[0].text, "Un animal");
    }

    #[backend_test]
    async fn detail_of_missing_question_is_not_found(client: Client) {
        let response = client.get(uri!(detail(1))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn results_of_missing_question_is_not_found(client: Client) {
        let response = client.get(uri!(results(1))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn results_of_future_question_is_not_found(client: Client, store: Store) {
        let future_question = create_question(&store, "Future question", 30).await;

        let response = client
            .get(uri!(results(future_question.id)))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn hidden_and_missing_questions_look_the_same(client: Client, store: Store) {
        let future_question = create_question(&store, "Future question", 30).await;

        let hidden = client
            .get(uri!(results(future_question.id)))
            .dispatch()
            .await;
        let hidden = (hidden.status(), hidden.into_string().await);
        let missing = client.get(uri!(results(9999))).dispatch().await;
        let missing = (missing.status(), missing.into_string().await);
        assert_eq!(hidden, missing);
    }

    #[backend_test]
    async fn results_of_past_question(client: Client, store: Store) {
        let past_question = create_question(&store, "Past question", -10).await;

        let response = client
            .get(uri!(results(past_question.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let raw_response = response.into_string().await.unwrap();
        assert!(raw_response.contains("Past question"));
    }

    #[backend_test]
    async fn display_question_choices_and_votes(client: Client, store: Store) {
        let question = create_question(&store, "Question", -1).await;
        let mut first = ChoiceCore::new(question.id, "Choice 1".into());
        first.votes = 1;
        store.create_choice(first).await.unwrap();
        for text in ["Choice 2", "Choice 3", "Choice 4", "Choice 5"] {
            store
                .create_choice(ChoiceCore::new(question.id, text.into()))
                .await
                .unwrap();
        }

        let response = client.get(uri!(results(question.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let raw_response = response.into_string().await.unwrap();
        let results = serde_json::from_str::<QuestionResults>(&raw_response).unwrap();

        assert_eq!(results.text, "Question");
        let summaries = results
            .choices
            .iter()
            .map(|choice| choice.summary.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            summaries,
            vec![
                "Choice 1 -- 1 vote",
                "Choice 2 -- 0 votes",
                "Choice 3 -- 0 votes",
                "Choice 4 -- 0 votes",
                "Choice 5 -- 0 votes",
            ]
        );
    }

    #[backend_test]
    async fn vote_counts_once(client: Client, store: Store) {
        let question = create_question(&store, "Question", -1).await;
        let yes = store
            .create_choice(ChoiceCore::new(question.id, "Yes".into()))
            .await
            .unwrap();
        store
            .create_choice(ChoiceCore::new(question.id, "No".into()))
            .await
            .unwrap();

        for expected in ["Yes -- 1 vote", "Yes -- 2 votes"] {
            let response = client
                .post(uri!(vote(question.id)))
                .header(ContentType::JSON)
                .body(json!(VoteRequest { choice: yes.id }).to_string())
                .dispatch()
                .await;
            assert_eq!(Status::Ok, response.status());
            let raw_response = response.into_string().await.unwrap();
            let results = serde_json::from_str::<QuestionResults>(&raw_response).unwrap();
            assert_eq!(results.choices[0].summary, expected);
            assert_eq!(results.choices[1].summary, "No -- 0 votes");
        }
    }

    #[backend_test]
    async fn vote_on_future_question_is_not_found(client: Client, store: Store) {
        let question = create_question(&store, "Question", 3).await;
        let choice = store
            .create_choice(ChoiceCore::new(question.id, "Yes".into()))
            .await
            .unwrap();

        let response = client
            .post(uri!(vote(question.id)))
            .header(ContentType::JSON)
            .body(json!(VoteRequest { choice: choice.id }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
        assert_eq!(store.choices(question.id).await.unwrap()[0].votes, 0);
    }

    #[backend_test]
    async fn vote_for_another_questions_choice_is_rejected(client: Client, store: Store) {
        let question = create_question(&store, "Question", -1).await;
        let other = create_question(&store, "Other", -1).await;
        let foreign = store
            .create_choice(ChoiceCore::new(other.id, "Elsewhere".into()))
            .await
            .unwrap();

        let response = client
            .post(uri!(vote(question.id)))
            .header(ContentType::JSON)
            .body(json!(VoteRequest { choice: foreign.id }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        assert_eq!(store.choices(other.id).await.unwrap()[0].votes, 0);
    }
}
